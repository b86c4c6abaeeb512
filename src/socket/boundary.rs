//! Validation for socket data entering from outside the engine.
//!
//! Persisted canvases and card props arrive as loosely shaped JSON: entries may be
//! `null`, fields may be missing, indices may have gaps. Everything is normalized here,
//! once, so the rest of the crate only ever sees well-formed [`Socket`]s.

use super::{Moment, Socket, SocketSet, SocketType};
use crate::error::SocketError;
use crate::id::SocketId;
use ahash::AHashSet;
use serde::Deserialize;

/// A socket as it may appear in persisted or externally supplied data.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawSocket {
    pub id: Option<SocketId>,
    #[serde(rename = "type")]
    pub socket_type: Option<SocketType>,
    pub index: Option<usize>,
    pub name: Option<String>,
    #[serde(default)]
    pub value: serde_json::Value,
    pub source: Option<String>,
    pub moment_updated: Option<Moment>,
}

/// The `sockets` object of a card before validation.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawSocketSet {
    #[serde(default)]
    pub inputs: Vec<Option<RawSocket>>,
    #[serde(default)]
    pub outputs: Vec<Option<RawSocket>>,
}

/// Turns a raw socket array into canonical sockets of the given type.
///
/// Null entries are dropped. Missing ids are generated, missing names get the default
/// pattern, and indices are reassigned from array order. A socket declaring the other
/// type is coerced to the array it was found in.
pub fn normalize_sockets(raw: Vec<Option<RawSocket>>, socket_type: SocketType) -> Vec<Socket> {
    let total = raw.len();
    let sockets: Vec<Socket> = raw
        .into_iter()
        .flatten()
        .enumerate()
        .map(|(index, raw)| {
            if let Some(declared) = raw.socket_type.filter(|t| *t != socket_type) {
                tracing::warn!(
                    socket_id = ?raw.id,
                    %declared,
                    expected = %socket_type,
                    "socket stored under the wrong side; coercing"
                );
            }
            let id = raw
                .id
                .filter(|id| !id.is_empty())
                .unwrap_or_else(SocketId::generate);
            let name = raw
                .name
                .filter(|n| !n.trim().is_empty())
                .unwrap_or_else(|| socket_type.default_name(index));
            Socket {
                id,
                socket_type,
                index,
                name,
                value: raw.value,
                source: raw.source,
                moment_updated: raw.moment_updated.unwrap_or_else(Moment::now),
            }
        })
        .collect();

    if sockets.len() != total {
        tracing::debug!(
            dropped = total - sockets.len(),
            %socket_type,
            "dropped null socket entries"
        );
    }
    sockets
}

impl TryFrom<RawSocketSet> for SocketSet {
    type Error = SocketError;

    fn try_from(raw: RawSocketSet) -> Result<Self, Self::Error> {
        let set = SocketSet {
            inputs: normalize_sockets(raw.inputs, SocketType::Input),
            outputs: normalize_sockets(raw.outputs, SocketType::Output),
        };

        let mut seen = AHashSet::new();
        for socket in set.inputs.iter().chain(set.outputs.iter()) {
            if !seen.insert(&socket.id) {
                return Err(SocketError::DuplicateSocketId(socket.id.clone()));
            }
        }
        Ok(set)
    }
}
