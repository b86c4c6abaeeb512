use super::Connection;
use crate::id::{CardId, ConnectionId, SocketId};

/// Read-only access to the canvas connections, handed to card-level code.
#[derive(Debug, Clone, Copy)]
pub struct ConnectionsView<'a> {
    connections: &'a [Connection],
}

impl<'a> ConnectionsView<'a> {
    pub(crate) fn new(connections: &'a [Connection]) -> Self {
        Self { connections }
    }

    pub fn iter(&self) -> std::slice::Iter<'a, Connection> {
        self.connections.iter()
    }

    pub fn len(&self) -> usize {
        self.connections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }

    pub fn get(&self, id: &ConnectionId) -> Option<&'a Connection> {
        self.connections.iter().find(|c| &c.id == id)
    }

    /// Whether any connection ends at this socket of this card, on either side.
    pub fn is_socket_connected(&self, card_id: &CardId, socket_id: &SocketId) -> bool {
        self.connections.iter().any(|c| {
            (&c.source_card_id == card_id && &c.source_socket_id == socket_id)
                || (&c.target_card_id == card_id && &c.target_socket_id == socket_id)
        })
    }

    /// Connections feeding into the given input socket.
    pub fn incoming(&self, card_id: &CardId, socket_id: &SocketId) -> Vec<&'a Connection> {
        self.connections
            .iter()
            .filter(|c| &c.target_card_id == card_id && &c.target_socket_id == socket_id)
            .collect()
    }

    /// Connections leaving the given output socket.
    pub fn outgoing(&self, card_id: &CardId, socket_id: &SocketId) -> Vec<&'a Connection> {
        self.connections
            .iter()
            .filter(|c| &c.source_card_id == card_id && &c.source_socket_id == socket_id)
            .collect()
    }

    pub fn connections_for_card(&self, card_id: &CardId) -> Vec<&'a Connection> {
        self.connections
            .iter()
            .filter(|c| c.touches_card(card_id))
            .collect()
    }
}
