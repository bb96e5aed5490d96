use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use axum::extract::ws::{CloseFrame, Message, WebSocket, close_code};
use futures_util::stream::SplitSink;
use futures_util::{SinkExt, StreamExt};
use tracing::{error, info, warn};

use journey_core::ChatService;
use journey_core::chat::format_line;
use journey_types::models::{GroupId, MessageId};

use crate::hub::{ChatHub, DUPLICATE_NOTICE, Outbound};

/// Heartbeat interval: server sends a Ping every 15 seconds.
/// If 2 consecutive Pongs are missed (~30s), the connection is dropped.
const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(15);

const HISTORY_ERROR: &str = "failed to load chat history";
const SEND_ERROR: &str = "failed to send message, please try again";

type Sink = SplitSink<WebSocket, Message>;

async fn close_with(sender: &mut Sink, notice: String) {
    let _ = sender.send(Message::Text(notice.into())).await;
    let _ = sender
        .send(Message::Close(Some(CloseFrame {
            code: close_code::NORMAL,
            reason: "".into(),
        })))
        .await;
}

/// Replays the group's history line by line. On a store failure a single
/// error line goes out instead. Returns the replayed message ids, or `None`
/// once the socket is gone.
async fn replay_history(
    sender: &mut Sink,
    chat: &Arc<ChatService>,
    group_id: GroupId,
) -> Option<HashSet<MessageId>> {
    let chat = chat.clone();
    let mut replayed = HashSet::new();
    let history = tokio::task::spawn_blocking(move || chat.history(&group_id)).await;
    let lines: Vec<String> = match history {
        Ok(Ok(messages)) => messages
            .iter()
            .map(|m| {
                replayed.insert(m.id);
                format_line(m)
            })
            .collect(),
        Ok(Err(e)) => {
            warn!("history unavailable for group {}: {}", group_id, e);
            vec![HISTORY_ERROR.to_string()]
        }
        Err(e) => {
            error!("history task failed for group {}: {}", group_id, e);
            vec![HISTORY_ERROR.to_string()]
        }
    };

    for line in lines {
        if sender.send(Message::Text(line.into())).await.is_err() {
            return None;
        }
    }
    Some(replayed)
}

/// Drives one upgraded chat socket. Membership was checked at the HTTP
/// upgrade, so the caller is known to belong to `group_id`.
pub async fn handle_connection(
    socket: WebSocket,
    hub: ChatHub,
    chat: Arc<ChatService>,
    login: String,
    group_id: GroupId,
) {
    let (mut sender, mut receiver) = socket.split();

    let Some((conn_id, mut outbound_rx)) = hub.register(&login, &group_id) else {
        warn!("{} already has a chat connection to group {}", login, group_id);
        close_with(&mut sender, DUPLICATE_NOTICE.to_string()).await;
        return;
    };
    info!("{} connected to chat of group {}", login, group_id);

    // Registered before the replay so nothing posted meanwhile is missed;
    // queued messages the replay already covered are skipped below.
    let Some(mut replayed) = replay_history(&mut sender, &chat, group_id).await else {
        hub.unregister(&login, &group_id, conn_id);
        return;
    };

    let pong_received = Arc::new(AtomicBool::new(true));
    let pong_flag_send = pong_received.clone();
    let pong_flag_recv = pong_received.clone();

    // Hub queue + heartbeat -> client
    let mut send_task = tokio::spawn(async move {
        let mut heartbeat = tokio::time::interval(HEARTBEAT_INTERVAL);
        heartbeat.tick().await;
        let mut missed_heartbeats: u8 = 0;

        loop {
            tokio::select! {
                msg = outbound_rx.recv() => {
                    match msg {
                        Some(Outbound::Chat { id, line }) => {
                            if replayed.remove(&id) {
                                continue;
                            }
                            if sender.send(Message::Text(line.into())).await.is_err() {
                                break;
                            }
                        }
                        Some(Outbound::Line(line)) => {
                            if sender.send(Message::Text(line.into())).await.is_err() {
                                break;
                            }
                        }
                        Some(Outbound::Close(notice)) => {
                            close_with(&mut sender, notice).await;
                            break;
                        }
                        None => break,
                    }
                }
                _ = heartbeat.tick() => {
                    if pong_flag_send.swap(false, Ordering::Acquire) {
                        missed_heartbeats = 0;
                    } else {
                        missed_heartbeats += 1;
                        if missed_heartbeats >= 2 {
                            warn!(
                                "Heartbeat timeout (missed {} pongs), dropping connection",
                                missed_heartbeats
                            );
                            break;
                        }
                    }
                    if sender.send(Message::Ping(vec![].into())).await.is_err() {
                        break;
                    }
                }
            }
        }
    });

    // Client -> store -> everyone in the group
    let hub_recv = hub.clone();
    let login_recv = login.clone();
    let mut recv_task = tokio::spawn(async move {
        while let Some(Ok(msg)) = receiver.next().await {
            match msg {
                Message::Text(text) => {
                    let content = text.as_str().trim().to_string();
                    if content.is_empty() {
                        continue;
                    }
                    let chat = chat.clone();
                    let author = login_recv.clone();
                    let saved = tokio::task::spawn_blocking(move || {
                        chat.save_message(&group_id, &author, &content)
                    })
                    .await;

                    match saved {
                        Ok(Ok(message)) => {
                            hub_recv.broadcast(&message);
                        }
                        Ok(Err(e)) => {
                            warn!("{} could not post to group {}: {}", login_recv, group_id, e);
                            let notice = Outbound::Line(SEND_ERROR.into());
                            hub_recv.send_to(&login_recv, &group_id, notice);
                        }
                        Err(e) => {
                            error!("save task failed for group {}: {}", group_id, e);
                            let notice = Outbound::Line(SEND_ERROR.into());
                            hub_recv.send_to(&login_recv, &group_id, notice);
                        }
                    }
                }
                Message::Pong(_) => {
                    pong_flag_recv.store(true, Ordering::Release);
                }
                Message::Close(_) => break,
                _ => {}
            }
        }
    });

    // Wait for either task to finish
    tokio::select! {
        _ = &mut send_task => recv_task.abort(),
        _ = &mut recv_task => send_task.abort(),
    }

    hub.unregister(&login, &group_id, conn_id);
    info!("{} disconnected from chat of group {}", login, group_id);
}
