//! The socket remapping engine.
//!
//! Given the socket array a card had and the array it wants, the engine works out which
//! old socket became which new one, produces a [`ReindexMap`] for the canvas reconciler,
//! and returns the canonical, densely indexed socket array.
//!
//! [`update_socket_array`] is the single entry point for structural edits: it couples
//! the pure remap with the registry and connection cleanup the edit requires, so the
//! two never drift apart.

mod event;
mod reindex;
mod strategy;

pub use event::*;
pub use reindex::*;
pub use strategy::RemapStrategy;

use crate::connection::ConnectionStore;
use crate::id::SocketId;
use crate::registry::{SocketRegistry, cleanup_socket};
use crate::socket::{Moment, Socket, SocketType};
use ahash::{AHashMap, AHashSet};
use itertools::Itertools;
use strategy::{resolve_identities, vanished_ids};

/// Allocates a fresh socket id: a ULID, so time-ordered with a random suffix.
pub fn generate_socket_id() -> SocketId {
    SocketId::generate()
}

/// Everything needed to create a socket. Unset fields fall back to defaults.
#[derive(Debug, Clone)]
pub struct SocketSpec {
    pub socket_type: SocketType,
    pub index: usize,
    pub existing_id: Option<SocketId>,
    pub value: Option<serde_json::Value>,
    pub name: Option<String>,
    pub source: Option<String>,
}

impl SocketSpec {
    pub fn new(socket_type: SocketType, index: usize) -> Self {
        Self {
            socket_type,
            index,
            existing_id: None,
            value: None,
            name: None,
            source: None,
        }
    }

    pub fn with_id(mut self, id: SocketId) -> Self {
        self.existing_id = Some(id);
        self
    }

    pub fn with_value(mut self, value: serde_json::Value) -> Self {
        self.value = Some(value);
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }
}

/// Creates a socket, preserving `existing_id` when one is given.
pub fn create_socket(spec: SocketSpec) -> Socket {
    let name = spec
        .name
        .filter(|n| !n.trim().is_empty())
        .unwrap_or_else(|| spec.socket_type.default_name(spec.index));
    Socket {
        id: spec
            .existing_id
            .filter(|id| !id.is_empty())
            .unwrap_or_else(generate_socket_id),
        socket_type: spec.socket_type,
        index: spec.index,
        name,
        value: spec.value.unwrap_or(serde_json::Value::Null),
        source: spec.source,
        moment_updated: Moment::now(),
    }
}

/// The pure result of a remap.
#[derive(Debug, Clone, PartialEq)]
pub struct Remapping {
    pub reindex_map: ReindexMap,
    pub reindexed_sockets: Vec<Socket>,
}

/// Computes the reindex map and canonical socket array for one socket type.
///
/// Array order of `new_sockets` is authoritative. An old socket whose id is in
/// `deleted_socket_ids` always maps to [`Slot::Deleted`], and such an id is also kept out
/// of the result even if `new_sockets` still carries it.
pub fn create_socket_remapping(
    old_sockets: &[Socket],
    new_sockets: Vec<Socket>,
    deleted_socket_ids: &[SocketId],
    socket_type: SocketType,
    strategy: RemapStrategy,
) -> Remapping {
    let deleted: AHashSet<&SocketId> = deleted_socket_ids.iter().collect();
    let resolved = resolve_identities(old_sockets, new_sockets, &deleted, strategy);

    let mut seen = AHashSet::new();
    let survivors: Vec<Socket> = resolved
        .into_iter()
        .filter(|socket| {
            if deleted.contains(&socket.id) {
                tracing::warn!(socket_id = %socket.id, "deleted socket still present in new array; dropping it");
                return false;
            }
            if !seen.insert(socket.id.clone()) {
                tracing::warn!(socket_id = %socket.id, "duplicate socket id in new array; keeping first");
                return false;
            }
            true
        })
        .collect();

    let positions: AHashMap<SocketId, usize> = survivors
        .iter()
        .enumerate()
        .map(|(position, socket)| (socket.id.clone(), position))
        .collect();

    let slots: Vec<Slot> = old_sockets
        .iter()
        .map(|old| {
            if deleted.contains(&old.id) {
                return Slot::Deleted;
            }
            match positions.get(&old.id) {
                Some(&position) => Slot::Kept(position),
                None => {
                    if strategy == RemapStrategy::ById {
                        tracing::warn!(
                            socket_id = %old.id,
                            %socket_type,
                            "socket vanished without being marked deleted"
                        );
                    }
                    Slot::Deleted
                }
            }
        })
        .collect();

    let reindexed_sockets = survivors
        .into_iter()
        .enumerate()
        .map(|(index, mut socket)| {
            if socket.socket_type != socket_type {
                tracing::warn!(socket_id = %socket.id, found = %socket.socket_type, expected = %socket_type, "coercing socket type");
                socket.socket_type = socket_type;
            }
            socket.index = index;
            if !socket.has_name() {
                socket.name = socket_type.default_name(index);
            }
            socket.touch();
            socket
        })
        .collect();

    Remapping {
        reindex_map: ReindexMap::from_slots(slots),
        reindexed_sockets,
    }
}

/// A requested structural change to one socket array of a card.
#[derive(Debug, Clone)]
pub struct SocketArrayUpdate {
    pub socket_type: SocketType,
    pub old_sockets: Vec<Socket>,
    pub new_sockets: Vec<Socket>,
    pub deleted_socket_ids: Vec<SocketId>,
    pub strategy: RemapStrategy,
}

impl SocketArrayUpdate {
    pub fn new(socket_type: SocketType, old_sockets: Vec<Socket>, new_sockets: Vec<Socket>) -> Self {
        Self {
            socket_type,
            old_sockets,
            new_sockets,
            deleted_socket_ids: Vec::new(),
            strategy: RemapStrategy::default(),
        }
    }

    pub fn deleting(mut self, ids: impl IntoIterator<Item = SocketId>) -> Self {
        self.deleted_socket_ids.extend(ids);
        self
    }

    pub fn with_strategy(mut self, strategy: RemapStrategy) -> Self {
        self.strategy = strategy;
        self
    }
}

/// The outcome of [`update_socket_array`], ready to be packaged into an event.
#[derive(Debug, Clone, PartialEq)]
pub struct SocketUpdate {
    pub reindex_map: ReindexMap,
    pub reindexed_sockets: Vec<Socket>,
    pub old_sockets: Vec<Socket>,
    pub deleted_socket_ids: Vec<SocketId>,
    pub socket_type: SocketType,
}

/// Applies a structural change: cleans up every deleted socket (registry handles and
/// connections, canvas-wide), then computes the remap.
///
/// With [`RemapStrategy::ByNameAndSource`], old sockets that no longer match anything in
/// the new array are treated as deleted as well.
pub fn update_socket_array(
    update: SocketArrayUpdate,
    registry: &mut SocketRegistry,
    connections: &mut ConnectionStore,
) -> SocketUpdate {
    let SocketArrayUpdate {
        socket_type,
        old_sockets,
        mut new_sockets,
        deleted_socket_ids,
        strategy,
    } = update;

    let mut deleted_socket_ids: Vec<SocketId> = deleted_socket_ids.into_iter().unique().collect();

    if strategy == RemapStrategy::ByNameAndSource {
        let vanished = {
            let deleted: AHashSet<&SocketId> = deleted_socket_ids.iter().collect();
            new_sockets = resolve_identities(&old_sockets, new_sockets, &deleted, strategy);
            vanished_ids(&old_sockets, &new_sockets, &deleted)
        };
        deleted_socket_ids.extend(vanished);
    }

    for socket_id in &deleted_socket_ids {
        cleanup_socket(socket_id, registry, connections);
    }

    let Remapping {
        reindex_map,
        reindexed_sockets,
    } = create_socket_remapping(
        &old_sockets,
        new_sockets,
        &deleted_socket_ids,
        socket_type,
        strategy,
    );

    SocketUpdate {
        reindex_map,
        reindexed_sockets,
        old_sockets,
        deleted_socket_ids,
        socket_type,
    }
}
