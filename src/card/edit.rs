use crate::id::SocketId;
use crate::socket::{Socket, SocketType};

/// A change a card (or its business logic) wants to make to its own sockets.
///
/// Structural edits go through the remapping engine. `Rename` and `SetValue` touch a
/// single socket in place.
#[derive(Debug, Clone, PartialEq)]
pub enum SocketEdit {
    /// Appends a socket.
    Add {
        socket_type: SocketType,
        name: Option<String>,
        value: serde_json::Value,
    },
    Remove {
        socket_type: SocketType,
        socket_id: SocketId,
    },
    Rename {
        socket_id: SocketId,
        name: String,
    },
    SetValue {
        socket_id: SocketId,
        value: serde_json::Value,
    },
    /// Replaces a whole socket array, e.g. after a reorder. Array order is authoritative.
    /// Under `ById`, old sockets missing from `sockets` count as deleted even when not
    /// listed in `deleted`. Ids owned by the other side of the card are rejected.
    Replace {
        socket_type: SocketType,
        sockets: Vec<Socket>,
        deleted: Vec<SocketId>,
    },
    /// Rebuilds the sockets tagged with `source` from the `{{placeholders}}` of `text`.
    SyncTemplate {
        socket_type: SocketType,
        text: String,
        source: String,
    },
}

impl SocketEdit {
    pub fn add(socket_type: SocketType) -> Self {
        SocketEdit::Add {
            socket_type,
            name: None,
            value: serde_json::Value::Null,
        }
    }

    pub fn add_named(socket_type: SocketType, name: impl Into<String>) -> Self {
        SocketEdit::Add {
            socket_type,
            name: Some(name.into()),
            value: serde_json::Value::Null,
        }
    }

    pub fn remove(socket_type: SocketType, socket_id: SocketId) -> Self {
        SocketEdit::Remove {
            socket_type,
            socket_id,
        }
    }

    pub fn rename(socket_id: SocketId, name: impl Into<String>) -> Self {
        SocketEdit::Rename {
            socket_id,
            name: name.into(),
        }
    }

    pub fn set_value(socket_id: SocketId, value: serde_json::Value) -> Self {
        SocketEdit::SetValue { socket_id, value }
    }

    pub fn sync_template(
        socket_type: SocketType,
        text: impl Into<String>,
        source: impl Into<String>,
    ) -> Self {
        SocketEdit::SyncTemplate {
            socket_type,
            text: text.into(),
            source: source.into(),
        }
    }

    pub fn is_structural(&self) -> bool {
        !matches!(self, SocketEdit::Rename { .. } | SocketEdit::SetValue { .. })
    }
}
