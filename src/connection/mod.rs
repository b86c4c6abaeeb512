//! The canvas-wide list of directed edges between card sockets.
//!
//! A [`ConnectionStore`] is shared state of one canvas. Its structural mutators are
//! crate-private: only the reconciler, socket cleanup and the canvas's own connect /
//! disconnect / remove-card operations change it. Card-level code reads it through
//! [`ConnectionsView`].

mod view;

pub use view::ConnectionsView;

use crate::id::{CardId, ConnectionId, SocketId};
use crate::socket::SocketType;
use serde::{Deserialize, Serialize};

/// A point in canvas coordinates.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// A directed edge from one card's output socket to another card's input socket.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Connection {
    pub id: ConnectionId,
    pub source_card_id: CardId,
    pub source_socket_id: SocketId,
    pub target_card_id: CardId,
    pub target_socket_id: SocketId,
    /// Cached endpoint geometry, recomputed on demand.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_point: Option<Point>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_point: Option<Point>,
}

impl Connection {
    pub fn new(
        source_card_id: CardId,
        source_socket_id: SocketId,
        target_card_id: CardId,
        target_socket_id: SocketId,
    ) -> Self {
        Self {
            id: ConnectionId::generate(),
            source_card_id,
            source_socket_id,
            target_card_id,
            target_socket_id,
            source_point: None,
            target_point: None,
        }
    }

    pub fn references_socket(&self, socket_id: &SocketId) -> bool {
        &self.source_socket_id == socket_id || &self.target_socket_id == socket_id
    }

    pub fn touches_card(&self, card_id: &CardId) -> bool {
        &self.source_card_id == card_id || &self.target_card_id == card_id
    }

    /// The card and socket on the given side: target for inputs, source for outputs.
    pub fn endpoint(&self, side: SocketType) -> (&CardId, &SocketId) {
        match side {
            SocketType::Input => (&self.target_card_id, &self.target_socket_id),
            SocketType::Output => (&self.source_card_id, &self.source_socket_id),
        }
    }

    pub(crate) fn endpoint_socket_mut(&mut self, side: SocketType) -> &mut SocketId {
        match side {
            SocketType::Input => &mut self.target_socket_id,
            SocketType::Output => &mut self.source_socket_id,
        }
    }
}

/// The single authoritative connection list of a canvas.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConnectionStore {
    connections: Vec<Connection>,
}

impl ConnectionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a store from a persisted flat connection array, verbatim.
    pub fn from_connections(connections: Vec<Connection>) -> Self {
        Self { connections }
    }

    pub fn view(&self) -> ConnectionsView<'_> {
        ConnectionsView::new(&self.connections)
    }

    pub fn len(&self) -> usize {
        self.connections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Connection> {
        self.connections.iter()
    }

    pub fn get(&self, id: &ConnectionId) -> Option<&Connection> {
        self.connections.iter().find(|c| &c.id == id)
    }

    pub fn as_slice(&self) -> &[Connection] {
        &self.connections
    }

    pub fn into_vec(self) -> Vec<Connection> {
        self.connections
    }

    pub(crate) fn push(&mut self, connection: Connection) {
        self.connections.push(connection);
    }

    pub(crate) fn remove(&mut self, id: &ConnectionId) -> Option<Connection> {
        let position = self.connections.iter().position(|c| &c.id == id)?;
        Some(self.connections.remove(position))
    }

    /// Keeps the connections matching `keep` and returns the ids of the ones dropped.
    pub(crate) fn retain(&mut self, mut keep: impl FnMut(&Connection) -> bool) -> Vec<ConnectionId> {
        let mut removed = Vec::new();
        self.connections.retain(|c| {
            let kept = keep(c);
            if !kept {
                removed.push(c.id.clone());
            }
            kept
        });
        removed
    }

    pub(crate) fn remove_referencing_socket(&mut self, socket_id: &SocketId) -> Vec<ConnectionId> {
        self.retain(|c| !c.references_socket(socket_id))
    }

    pub(crate) fn remove_touching_card(&mut self, card_id: &CardId) -> Vec<ConnectionId> {
        self.retain(|c| !c.touches_card(card_id))
    }

    pub(crate) fn iter_mut(&mut self) -> impl Iterator<Item = &mut Connection> {
        self.connections.iter_mut()
    }
}
