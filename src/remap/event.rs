use super::{ReindexMap, SocketUpdate};
use crate::id::{CardId, SocketId};
use crate::socket::{Socket, SocketType};
use serde::{Deserialize, Serialize};

/// The payload a card emits upward after a structural change to one socket array.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SocketUpdateEvent {
    pub card_id: CardId,
    pub old_sockets: Vec<Socket>,
    pub new_sockets: Vec<Socket>,
    pub reindex_map: ReindexMap,
    pub deleted_socket_ids: Vec<SocketId>,
    #[serde(rename = "type")]
    pub socket_type: SocketType,
}

/// Packages the result of [`update_socket_array`](super::update_socket_array) for the canvas.
pub fn create_socket_update_event(card_id: CardId, update: SocketUpdate) -> SocketUpdateEvent {
    SocketUpdateEvent {
        card_id,
        old_sockets: update.old_sockets,
        new_sockets: update.reindexed_sockets,
        reindex_map: update.reindex_map,
        deleted_socket_ids: update.deleted_socket_ids,
        socket_type: update.socket_type,
    }
}
