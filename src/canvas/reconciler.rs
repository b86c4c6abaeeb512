use crate::connection::ConnectionStore;
use crate::id::{ConnectionId, SocketId};
use crate::remap::SocketUpdateEvent;
use ahash::AHashSet;

/// What a reconciliation pass did to the connections of one card side.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    /// Dropped because their socket was deleted.
    pub pruned: Vec<ConnectionId>,
    /// Pointed at a different socket id after the reindex.
    pub remapped: Vec<ConnectionId>,
    /// Could not be resolved through the reindex map; left untouched.
    pub unresolved: Vec<ConnectionId>,
}

impl ReconcileReport {
    pub fn is_noop(&self) -> bool {
        self.pruned.is_empty() && self.remapped.is_empty() && self.unresolved.is_empty()
    }
}

/// Applies a `SocketsUpdated` event to the connection list.
///
/// Pruning runs first, so a connection is never both kept and pointed at a deleted
/// socket. Surviving connections on the affected side are then followed through the
/// reindex map to the socket now at their new position.
pub fn reconcile_connections(
    connections: &mut ConnectionStore,
    event: &SocketUpdateEvent,
) -> ReconcileReport {
    let side = event.socket_type;
    let deleted: AHashSet<&SocketId> = event.deleted_socket_ids.iter().collect();

    let pruned = connections.retain(|c| {
        let (card_id, socket_id) = c.endpoint(side);
        !(card_id == &event.card_id && deleted.contains(socket_id))
    });

    let mut remapped = Vec::new();
    let mut unresolved = Vec::new();
    for connection in connections.iter_mut() {
        let (card_id, socket_id) = connection.endpoint(side);
        if card_id != &event.card_id {
            continue;
        }
        let socket_id = socket_id.clone();

        let Some(old_position) = event.old_sockets.iter().position(|s| s.id == socket_id) else {
            // Wired to a socket created by this very update: nothing to follow.
            if !event.new_sockets.iter().any(|s| s.id == socket_id) {
                tracing::warn!(
                    connection_id = %connection.id,
                    %socket_id,
                    card_id = %event.card_id,
                    "connection references a socket unknown to the update"
                );
                unresolved.push(connection.id.clone());
            }
            continue;
        };

        let target = event
            .reindex_map
            .new_position(old_position)
            .and_then(|position| event.new_sockets.get(position));
        match target {
            Some(socket) if socket.id != socket_id => {
                *connection.endpoint_socket_mut(side) = socket.id.clone();
                remapped.push(connection.id.clone());
            }
            Some(_) => {}
            None => {
                tracing::warn!(
                    connection_id = %connection.id,
                    %socket_id,
                    old_position,
                    "socket vanished without deletion; leaving connection as-is"
                );
                unresolved.push(connection.id.clone());
            }
        }
    }

    if !pruned.is_empty() || !remapped.is_empty() {
        tracing::debug!(
            card_id = %event.card_id,
            side = %side,
            pruned = pruned.len(),
            remapped = remapped.len(),
            "connections reconciled"
        );
    }

    ReconcileReport {
        pruned,
        remapped,
        unresolved,
    }
}
