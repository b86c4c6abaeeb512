use super::ChangeSource;
use crate::id::SocketId;
use crate::socket::{Moment, Socket, SocketType};
use ahash::AHashMap;

/// The parts of a socket the watcher compares. Other fields may churn freely.
#[derive(Debug, Clone, PartialEq)]
pub struct SnapshotEntry {
    pub value: serde_json::Value,
    pub name: String,
    pub index: usize,
    pub moment_updated: Moment,
}

impl From<&Socket> for SnapshotEntry {
    fn from(socket: &Socket) -> Self {
        Self {
            value: socket.value.clone(),
            name: socket.name.clone(),
            index: socket.index,
            moment_updated: socket.moment_updated,
        }
    }
}

/// The last accepted state of one socket array, keyed by socket id.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SocketSnapshot {
    entries: AHashMap<SocketId, SnapshotEntry>,
    order: Vec<SocketId>,
}

impl SocketSnapshot {
    pub fn capture(sockets: &[Socket]) -> Self {
        Self {
            entries: sockets
                .iter()
                .map(|s| (s.id.clone(), SnapshotEntry::from(s)))
                .collect(),
            order: sockets.iter().map(|s| s.id.clone()).collect(),
        }
    }

    pub fn get(&self, id: &SocketId) -> Option<&SnapshotEntry> {
        self.entries.get(id)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Socket ids in the order they were captured.
    pub fn ids(&self) -> &[SocketId] {
        &self.order
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChangeKind {
    Added,
    Removed,
    Modified,
}

/// One classified change to a socket, as delivered to business callbacks.
#[derive(Debug, Clone, PartialEq)]
pub struct SocketChange {
    pub kind: ChangeKind,
    pub socket_type: SocketType,
    pub socket_id: SocketId,
    /// The socket as it is now. `None` for removals.
    pub current: Option<Socket>,
    /// What the snapshot held before. `None` for additions.
    pub previous: Option<SnapshotEntry>,
    pub moment: Moment,
    pub source: ChangeSource,
}

/// Classifies `current` against `snapshot`.
///
/// Additions and modifications come in current array order, removals after them in
/// snapshot order. A pure reorder is not a change.
pub fn diff_sockets(
    snapshot: &SocketSnapshot,
    current: &[Socket],
    socket_type: SocketType,
    source: ChangeSource,
) -> Vec<SocketChange> {
    let mut changes = Vec::new();

    for socket in current {
        match snapshot.get(&socket.id) {
            None => changes.push(SocketChange {
                kind: ChangeKind::Added,
                socket_type,
                socket_id: socket.id.clone(),
                current: Some(socket.clone()),
                previous: None,
                moment: socket.moment_updated,
                source,
            }),
            Some(previous) if previous.value != socket.value || previous.name != socket.name => {
                changes.push(SocketChange {
                    kind: ChangeKind::Modified,
                    socket_type,
                    socket_id: socket.id.clone(),
                    current: Some(socket.clone()),
                    previous: Some(previous.clone()),
                    moment: socket.moment_updated,
                    source,
                })
            }
            Some(_) => {}
        }
    }

    for id in snapshot.ids() {
        if current.iter().any(|s| &s.id == id) {
            continue;
        }
        if let Some(previous) = snapshot.get(id) {
            changes.push(SocketChange {
                kind: ChangeKind::Removed,
                socket_type,
                socket_id: id.clone(),
                current: None,
                previous: Some(previous.clone()),
                moment: previous.moment_updated,
                source,
            });
        }
    }

    changes
}
