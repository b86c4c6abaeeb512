use crate::error::SocketError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Where an old socket position ended up after a remap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "i64", try_from = "i64")]
pub enum Slot {
    Kept(usize),
    Deleted,
}

impl Slot {
    pub fn position(self) -> Option<usize> {
        match self {
            Slot::Kept(position) => Some(position),
            Slot::Deleted => None,
        }
    }
}

// Serialized as the new position, or -1 for a deleted socket.
impl From<Slot> for i64 {
    fn from(slot: Slot) -> Self {
        match slot {
            Slot::Kept(position) => position as i64,
            Slot::Deleted => -1,
        }
    }
}

impl TryFrom<i64> for Slot {
    type Error = SocketError;

    fn try_from(raw: i64) -> Result<Self, Self::Error> {
        match raw {
            -1 => Ok(Slot::Deleted),
            n if n >= 0 => Ok(Slot::Kept(n as usize)),
            n => Err(SocketError::InvalidSlot(n)),
        }
    }
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", i64::from(*self))
    }
}

/// Old array position → new position or deleted, for one remap operation.
///
/// Every old socket has exactly one slot; the map is indexed by old position.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReindexMap(Vec<Slot>);

impl ReindexMap {
    pub fn from_slots(slots: Vec<Slot>) -> Self {
        Self(slots)
    }

    pub fn get(&self, old_position: usize) -> Option<Slot> {
        self.0.get(old_position).copied()
    }

    /// The new position of the socket previously at `old_position`, if it survived.
    pub fn new_position(&self, old_position: usize) -> Option<usize> {
        self.get(old_position).and_then(Slot::position)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// True when every old position maps onto itself.
    pub fn is_identity(&self) -> bool {
        self.0
            .iter()
            .enumerate()
            .all(|(old, slot)| *slot == Slot::Kept(old))
    }

    pub fn iter(&self) -> impl Iterator<Item = (usize, Slot)> + '_ {
        self.0.iter().copied().enumerate()
    }

    pub fn deleted_positions(&self) -> impl Iterator<Item = usize> + '_ {
        self.iter()
            .filter(|(_, slot)| *slot == Slot::Deleted)
            .map(|(old, _)| old)
    }
}

impl fmt::Display for ReindexMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{")?;
        for (old, slot) in self.iter() {
            if old > 0 {
                write!(f, ",")?;
            }
            write!(f, "{}:{}", old, slot)?;
        }
        write!(f, "}}")
    }
}
