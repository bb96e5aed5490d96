use std::sync::Arc;

use chrono::Utc;
use tracing::debug;

use journey_types::models::{GroupId, Message, MessageId};

use crate::error::{ServiceError, internal};
use crate::repository::ChatRepository;

/// `author: content\t YYYY-MM-DD HH:MM:SS`, the wire form of a chat line.
pub fn format_line(message: &Message) -> String {
    format!(
        "{}: {}\t {}",
        message.author,
        message.content,
        message.sent_at.format("%Y-%m-%d %H:%M:%S")
    )
}

pub struct ChatService {
    messages: Arc<dyn ChatRepository>,
}

impl ChatService {
    pub fn new(messages: Arc<dyn ChatRepository>) -> Self {
        Self { messages }
    }

    /// Stamps the message with the receive time and appends it to the log.
    pub fn save_message(
        &self,
        group_id: &GroupId,
        author: &str,
        content: &str,
    ) -> Result<Message, ServiceError> {
        let message = Message {
            id: MessageId::new(),
            group_id: *group_id,
            author: author.to_string(),
            content: content.to_string(),
            sent_at: Utc::now(),
        };
        self.messages
            .insert_message(&message)
            .map_err(internal("failed to save message"))?;
        debug!("stored message {} in group {}", message.id, group_id);
        Ok(message)
    }

    pub fn history(&self, group_id: &GroupId) -> Result<Vec<Message>, ServiceError> {
        self.messages
            .messages_for_group(group_id)
            .map_err(internal("failed to load chat history"))
    }
}
