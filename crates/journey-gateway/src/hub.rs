use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use journey_core::DisconnectNotifier;
use journey_core::chat::format_line;
use journey_types::models::{GroupId, Message, MessageId};

/// Sent to a user whose membership ended while connected.
pub const REMOVED_NOTICE: &str = "You are not a member of this group anymore";

/// Sent to a second connection for a (user, group) pair that is already live.
pub const DUPLICATE_NOTICE: &str = "You are already connected to this group's chat";

/// What the send task of a connection should do next.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outbound {
    Line(String),
    /// A stored chat message, tagged so a replay can skip it.
    Chat { id: MessageId, line: String },
    /// Deliver the notice, then close the socket.
    Close(String),
}

type Key = (String, GroupId);

struct Peer {
    conn_id: Uuid,
    tx: mpsc::UnboundedSender<Outbound>,
}

/// Registry of live chat connections, at most one per (user, group).
///
/// A single mutex guards the map: registration, broadcast and disconnect
/// never interleave. Sends on unbounded channels never block, so the lock is
/// not held across an await.
#[derive(Clone, Default)]
pub struct ChatHub {
    inner: Arc<Mutex<HashMap<Key, Peer>>>,
}

impl ChatHub {
    pub fn new() -> Self {
        Self::default()
    }

    fn peers(&self) -> MutexGuard<'_, HashMap<Key, Peer>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Claims the slot for `(login, group_id)`. Returns `None` if a live
    /// connection already holds it; a slot whose receiver is gone is free.
    pub fn register(
        &self,
        login: &str,
        group_id: &GroupId,
    ) -> Option<(Uuid, mpsc::UnboundedReceiver<Outbound>)> {
        let mut peers = self.peers();
        let key = (login.to_string(), *group_id);
        if let Some(existing) = peers.get(&key) {
            if !existing.tx.is_closed() {
                return None;
            }
            debug!("replacing stale chat entry for {} in {}", login, group_id);
        }

        let conn_id = Uuid::new_v4();
        let (tx, rx) = mpsc::unbounded_channel();
        peers.insert(key, Peer { conn_id, tx });
        Some((conn_id, rx))
    }

    /// Removes the entry only if it still belongs to `conn_id`.
    pub fn unregister(&self, login: &str, group_id: &GroupId, conn_id: Uuid) {
        let mut peers = self.peers();
        let key = (login.to_string(), *group_id);
        if peers.get(&key).is_some_and(|p| p.conn_id == conn_id) {
            peers.remove(&key);
        }
    }

    /// Fans `message` out to every connection in its group, sender included.
    /// Peers whose queue is gone are dropped; the rest still get the line.
    pub fn broadcast(&self, message: &Message) -> usize {
        let line = format_line(message);
        let mut peers = self.peers();
        let mut delivered = 0;
        peers.retain(|(login, group), peer| {
            if *group != message.group_id {
                return true;
            }
            let out = Outbound::Chat { id: message.id, line: line.clone() };
            match peer.tx.send(out) {
                Ok(()) => {
                    delivered += 1;
                    true
                }
                Err(_) => {
                    warn!("dropping unreachable chat peer {} in {}", login, group);
                    false
                }
            }
        });
        delivered
    }

    /// Targeted delivery to one connection. False if nobody is listening.
    pub fn send_to(&self, login: &str, group_id: &GroupId, msg: Outbound) -> bool {
        self.peers()
            .get(&(login.to_string(), *group_id))
            .is_some_and(|p| p.tx.send(msg).is_ok())
    }

    #[cfg(test)]
    fn is_connected(&self, login: &str, group_id: &GroupId) -> bool {
        self.peers()
            .get(&(login.to_string(), *group_id))
            .is_some_and(|p| !p.tx.is_closed())
    }

    #[cfg(test)]
    fn connection_count(&self) -> usize {
        self.peers().len()
    }
}

impl DisconnectNotifier for ChatHub {
    fn disconnect(&self, login: &str, group_id: &GroupId) {
        let peer = self.peers().remove(&(login.to_string(), *group_id));
        if let Some(peer) = peer {
            // The connection may already be on its way out.
            let _ = peer.tx.send(Outbound::Close(REMOVED_NOTICE.to_string()));
            info!("disconnected {} from chat of group {}", login, group_id);
        }
    }
}
