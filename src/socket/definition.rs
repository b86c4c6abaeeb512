use super::Moment;
use crate::error::SocketError;
use crate::id::SocketId;
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Which side of a card a socket sits on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SocketType {
    Input,
    Output,
}

impl SocketType {
    pub const ALL: [SocketType; 2] = [SocketType::Input, SocketType::Output];

    pub fn opposite(self) -> SocketType {
        match self {
            SocketType::Input => SocketType::Output,
            SocketType::Output => SocketType::Input,
        }
    }

    /// Capitalized label used in default socket names.
    pub fn label(self) -> &'static str {
        match self {
            SocketType::Input => "Input",
            SocketType::Output => "Output",
        }
    }

    /// The name a socket gets when nothing more specific was supplied: `"Input 1"`, `"Output 3"`.
    pub fn default_name(self, index: usize) -> String {
        format!("{} {}", self.label(), index + 1)
    }
}

impl fmt::Display for SocketType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SocketType::Input => write!(f, "input"),
            SocketType::Output => write!(f, "output"),
        }
    }
}

/// A typed attachment point on a card through which a value flows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Socket {
    pub id: SocketId,
    #[serde(rename = "type")]
    pub socket_type: SocketType,
    /// Engine-assigned position among siblings of the same type. Never hand-set by cards.
    pub index: usize,
    pub name: String,
    #[serde(default)]
    pub value: serde_json::Value,
    /// Origin tag for sockets derived from text, e.g. which prompt a placeholder came from.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    pub moment_updated: Moment,
}

impl Socket {
    /// Replaces the value and bumps the moment.
    pub fn set_value(&mut self, value: serde_json::Value) {
        self.value = value;
        self.touch();
    }

    /// Replaces the display name and bumps the moment.
    pub fn rename(&mut self, name: impl Into<String>) {
        self.name = name.into();
        self.touch();
    }

    pub fn touch(&mut self) {
        self.moment_updated = Moment::now();
    }

    pub fn has_name(&self) -> bool {
        !self.name.trim().is_empty()
    }
}

/// The `sockets` sub-structure of a card: its inputs and outputs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "super::boundary::RawSocketSet")]
pub struct SocketSet {
    pub inputs: Vec<Socket>,
    pub outputs: Vec<Socket>,
}

impl SocketSet {
    pub fn new(inputs: Vec<Socket>, outputs: Vec<Socket>) -> Self {
        Self { inputs, outputs }
    }

    pub fn of(&self, socket_type: SocketType) -> &[Socket] {
        match socket_type {
            SocketType::Input => &self.inputs,
            SocketType::Output => &self.outputs,
        }
    }

    pub fn of_mut(&mut self, socket_type: SocketType) -> &mut Vec<Socket> {
        match socket_type {
            SocketType::Input => &mut self.inputs,
            SocketType::Output => &mut self.outputs,
        }
    }

    pub fn find(&self, id: &SocketId) -> Option<&Socket> {
        self.inputs
            .iter()
            .chain(self.outputs.iter())
            .find(|s| &s.id == id)
    }

    pub fn find_mut(&mut self, id: &SocketId) -> Option<&mut Socket> {
        self.inputs
            .iter_mut()
            .chain(self.outputs.iter_mut())
            .find(|s| &s.id == id)
    }

    pub fn contains(&self, id: &SocketId) -> bool {
        self.find(id).is_some()
    }

    pub fn len(&self) -> usize {
        self.inputs.len() + self.outputs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inputs.is_empty() && self.outputs.is_empty()
    }

    /// Fails on the first id shared by two sockets, across both arrays.
    pub fn check_unique_ids(&self) -> Result<(), SocketError> {
        match self
            .inputs
            .iter()
            .chain(self.outputs.iter())
            .map(|s| &s.id)
            .duplicates()
            .next()
        {
            Some(duplicate) => Err(SocketError::DuplicateSocketId(duplicate.clone())),
            None => Ok(()),
        }
    }

    /// Verifies the structural invariants: unique ids, matching types, dense indices.
    pub fn check_dense(&self) -> Result<(), SocketError> {
        self.check_unique_ids()?;

        for socket_type in SocketType::ALL {
            for (position, socket) in self.of(socket_type).iter().enumerate() {
                if socket.socket_type != socket_type {
                    return Err(SocketError::TypeMismatch {
                        socket_id: socket.id.clone(),
                        expected: socket_type,
                        found: socket.socket_type,
                    });
                }
                if socket.index != position {
                    return Err(SocketError::IndexGap {
                        socket_id: socket.id.clone(),
                        expected: position,
                        found: socket.index,
                    });
                }
            }
        }
        Ok(())
    }
}
