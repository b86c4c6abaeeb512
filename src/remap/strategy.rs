use crate::id::SocketId;
use crate::socket::Socket;
use ahash::AHashSet;
use serde::{Deserialize, Serialize};

/// How sockets of a new array are matched to the sockets they replace.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RemapStrategy {
    /// Identity is the socket id. The normal case for user-driven edits.
    #[default]
    ById,
    /// A new socket with an unknown id adopts the id of an old socket with the same
    /// `(name, source)`. Used for sockets derived from parsed text, which are rebuilt
    /// from scratch on every edit of that text.
    ByNameAndSource,
}

/// Rewrites ids in `new_sockets` according to `strategy` so that logical sockets keep
/// their identity. Each old socket is adopted at most once; deleted ids are never adopted.
/// An adopting socket without a value of its own inherits the old socket's value.
pub(crate) fn resolve_identities(
    old_sockets: &[Socket],
    mut new_sockets: Vec<Socket>,
    deleted_socket_ids: &AHashSet<&SocketId>,
    strategy: RemapStrategy,
) -> Vec<Socket> {
    if strategy == RemapStrategy::ById {
        return new_sockets;
    }

    let mut claimed: AHashSet<SocketId> = new_sockets
        .iter()
        .filter(|s| old_sockets.iter().any(|old| old.id == s.id))
        .map(|s| s.id.clone())
        .collect();

    for socket in new_sockets.iter_mut() {
        if claimed.contains(&socket.id) {
            continue;
        }
        let adopted = old_sockets.iter().find(|old| {
            old.name == socket.name
                && old.source == socket.source
                && !deleted_socket_ids.contains(&old.id)
                && !claimed.contains(&old.id)
        });
        if let Some(old) = adopted {
            tracing::trace!(from = %socket.id, to = %old.id, name = %old.name, "adopted socket identity");
            socket.id = old.id.clone();
            if socket.value.is_null() {
                socket.value = old.value.clone();
            }
            claimed.insert(old.id.clone());
        }
    }
    new_sockets
}

/// Old socket ids that are neither explicitly deleted nor present in `new_sockets`.
pub(crate) fn vanished_ids(
    old_sockets: &[Socket],
    new_sockets: &[Socket],
    deleted_socket_ids: &AHashSet<&SocketId>,
) -> Vec<SocketId> {
    let present: AHashSet<&SocketId> = new_sockets.iter().map(|s| &s.id).collect();
    old_sockets
        .iter()
        .filter(|old| !present.contains(&old.id) && !deleted_socket_ids.contains(&old.id))
        .map(|old| old.id.clone())
        .collect()
}
