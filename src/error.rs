use crate::id::{CardId, ConnectionId, SocketId};
use crate::socket::SocketType;
use thiserror::Error;

/// Errors raised while validating socket data at the boundary.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SocketError {
    #[error("Socket id '{0}' appears more than once on the same card")]
    DuplicateSocketId(SocketId),

    #[error("Socket '{socket_id}' is stored as {found} but sits in the {expected} array")]
    TypeMismatch {
        socket_id: SocketId,
        expected: SocketType,
        found: SocketType,
    },

    #[error("Socket '{socket_id}' has index {found}, expected {expected}")]
    IndexGap {
        socket_id: SocketId,
        expected: usize,
        found: usize,
    },

    #[error("Invalid reindex slot {0}: expected a position or -1")]
    InvalidSlot(i64),
}

/// Errors returned by canvas-level operations.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CanvasError {
    #[error("Card '{0}' not found on the canvas")]
    CardNotFound(CardId),

    #[error("Card '{0}' is already on the canvas")]
    DuplicateCard(CardId),

    #[error("Socket '{socket_id}' not found on card '{card_id}'")]
    SocketNotFound { card_id: CardId, socket_id: SocketId },

    #[error("Cannot connect '{source_socket_id}' to '{target_socket_id}': {message}")]
    IncompatibleSockets {
        source_socket_id: SocketId,
        target_socket_id: SocketId,
        message: String,
    },

    #[error("Connection '{0}' not found")]
    ConnectionNotFound(ConnectionId),

    #[error(transparent)]
    Socket(#[from] SocketError),
}

/// Errors from loading or saving a canvas document.
#[derive(Error, Debug)]
pub enum PersistenceError {
    #[error("Failed to parse canvas JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Could not access '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Canvas(#[from] CanvasError),
}

/// The error a business callback may return. It is logged, never propagated.
pub type CallbackError = Box<dyn std::error::Error + Send + Sync>;
