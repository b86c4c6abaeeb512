use crate::id::CardId;
use crate::remap::SocketUpdateEvent;
use crate::socket::SocketSet;
use serde::{Deserialize, Serialize};

/// The persisted and emitted shape of a card: its uuid, sockets and opaque payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CardSnapshot {
    pub id: CardId,
    #[serde(default)]
    pub sockets: SocketSet,
    #[serde(default)]
    pub payload: serde_json::Value,
}

/// Notifications a card emits upward to the canvas.
#[derive(Debug, Clone, PartialEq)]
pub enum CardEvent {
    /// A socket array changed structurally; connections must follow.
    SocketsUpdated(SocketUpdateEvent),
    /// The card's current state, for the canvas-level state owner.
    UpdateCard(CardSnapshot),
}
