//! Per-card bookkeeping of mounted socket handles and their cleanup callbacks.

use crate::connection::{ConnectionStore, Point};
use crate::id::{ConnectionId, SocketId};
use ahash::{AHashMap, AHashSet};
use std::fmt;

/// The visual handle of a mounted socket, as supplied by the rendering layer.
pub trait SocketElement {
    /// Current on-screen anchor of the socket, if it is laid out.
    fn anchor(&self) -> Option<Point>;
}

/// An element pinned at a fixed point. Useful for headless canvases and tests.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FixedAnchor(pub Point);

impl SocketElement for FixedAnchor {
    fn anchor(&self) -> Option<Point> {
        Some(self.0)
    }
}

impl<F> SocketElement for F
where
    F: Fn() -> Option<Point>,
{
    fn anchor(&self) -> Option<Point> {
        self()
    }
}

pub type CleanupFn = Box<dyn FnOnce()>;

/// Emitted by the rendering layer once a socket's visual representation exists.
pub struct SocketMountEvent {
    pub socket_id: SocketId,
    pub element: Box<dyn SocketElement>,
    pub cleanup: Vec<CleanupFn>,
}

impl SocketMountEvent {
    pub fn new(socket_id: SocketId, element: impl SocketElement + 'static) -> Self {
        Self {
            socket_id,
            element: Box::new(element),
            cleanup: Vec::new(),
        }
    }

    pub fn with_cleanup(mut self, cleanup: impl FnOnce() + 'static) -> Self {
        self.cleanup.push(Box::new(cleanup));
        self
    }
}

struct SocketHandle {
    element: Box<dyn SocketElement>,
    cleanup: Vec<CleanupFn>,
}

impl SocketHandle {
    fn release(self) -> usize {
        let count = self.cleanup.len();
        for cleanup in self.cleanup {
            cleanup();
        }
        count
    }
}

/// Map from socket id to its mounted handle, owned by one card instance.
#[derive(Default)]
pub struct SocketRegistry {
    entries: AHashMap<SocketId, SocketHandle>,
    tracked_connections: AHashSet<ConnectionId>,
}

impl SocketRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a mounted socket. A re-mount releases the previous handle first.
    pub fn handle_socket_mount(&mut self, event: SocketMountEvent) {
        let handle = SocketHandle {
            element: event.element,
            cleanup: event.cleanup,
        };
        if let Some(previous) = self.entries.insert(event.socket_id.clone(), handle) {
            let released = previous.release();
            tracing::debug!(socket_id = %event.socket_id, released, "socket re-mounted");
        }
    }

    /// Attaches another cleanup callback to a mounted socket. Returns `false` if the
    /// socket is not mounted, in which case the callback is dropped without running.
    pub fn add_cleanup(&mut self, socket_id: &SocketId, cleanup: impl FnOnce() + 'static) -> bool {
        match self.entries.get_mut(socket_id) {
            Some(handle) => {
                handle.cleanup.push(Box::new(cleanup));
                true
            }
            None => false,
        }
    }

    pub fn anchor(&self, socket_id: &SocketId) -> Option<Point> {
        self.entries.get(socket_id).and_then(|h| h.element.anchor())
    }

    pub fn contains(&self, socket_id: &SocketId) -> bool {
        self.entries.contains_key(socket_id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Records a connection as touching this card.
    pub fn track_connection(&mut self, connection_id: ConnectionId) {
        self.tracked_connections.insert(connection_id);
    }

    pub fn untrack_connection(&mut self, connection_id: &ConnectionId) {
        self.tracked_connections.remove(connection_id);
    }

    /// Forgets tracked connections for which `keep` returns `false`.
    pub fn retain_tracked(&mut self, keep: impl FnMut(&ConnectionId) -> bool) {
        self.tracked_connections.retain(keep);
    }

    pub fn tracked_connections(&self) -> impl Iterator<Item = &ConnectionId> {
        self.tracked_connections.iter()
    }

    /// Runs the cleanups of a single socket and forgets it. Returns the number run.
    fn release(&mut self, socket_id: &SocketId) -> usize {
        self.entries
            .remove(socket_id)
            .map(SocketHandle::release)
            .unwrap_or(0)
    }

    /// Card teardown: runs every registered cleanup and clears all state.
    pub fn cleanup(&mut self) -> usize {
        let released: usize = self.entries.drain().map(|(_, h)| h.release()).sum();
        self.tracked_connections.clear();
        released
    }
}

impl fmt::Debug for SocketRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SocketRegistry")
            .field("sockets", &self.entries.keys().collect::<Vec<_>>())
            .field("tracked_connections", &self.tracked_connections)
            .finish()
    }
}

/// Makes a socket id "gone": drops every connection referencing it, runs its cleanups,
/// and removes its registry entry. Returns the ids of the connections removed.
pub fn cleanup_socket(
    socket_id: &SocketId,
    registry: &mut SocketRegistry,
    connections: &mut ConnectionStore,
) -> Vec<ConnectionId> {
    let removed = connections.remove_referencing_socket(socket_id);
    for connection_id in &removed {
        registry.untrack_connection(connection_id);
    }
    let released = registry.release(socket_id);
    tracing::debug!(
        %socket_id,
        connections = removed.len(),
        released,
        "socket cleaned up"
    );
    removed
}

impl Drop for SocketRegistry {
    fn drop(&mut self) {
        if !self.entries.is_empty() {
            self.cleanup();
        }
    }
}
