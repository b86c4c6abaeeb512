use super::{ChangeKind, ChangeSource, SocketChange};
use crate::id::SocketId;
use crate::socket::Moment;
use ahash::AHashSet;
use std::collections::VecDeque;

/// What makes two observed changes "the same change".
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ChangeKey {
    pub socket_id: SocketId,
    pub moment: Moment,
    pub source: ChangeSource,
    pub kind: ChangeKind,
}

impl From<&SocketChange> for ChangeKey {
    fn from(change: &SocketChange) -> Self {
        Self {
            socket_id: change.socket_id.clone(),
            moment: change.moment,
            source: change.source,
            kind: change.kind,
        }
    }
}

/// Remembers recently emitted changes so a re-observation is delivered only once.
///
/// Bounded: once `capacity` keys are held, the oldest is forgotten.
#[derive(Debug, Clone)]
pub struct EmissionGuard {
    capacity: usize,
    recent: VecDeque<ChangeKey>,
    index: AHashSet<ChangeKey>,
}

impl EmissionGuard {
    pub const DEFAULT_CAPACITY: usize = 256;

    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            recent: VecDeque::new(),
            index: AHashSet::new(),
        }
    }

    /// Returns `true` the first time a key is seen, `false` for a duplicate.
    pub fn admit(&mut self, key: ChangeKey) -> bool {
        if self.index.contains(&key) {
            return false;
        }
        if self.recent.len() == self.capacity {
            if let Some(oldest) = self.recent.pop_front() {
                self.index.remove(&oldest);
            }
        }
        self.index.insert(key.clone());
        self.recent.push_back(key);
        true
    }

    pub fn len(&self) -> usize {
        self.recent.len()
    }

    pub fn is_empty(&self) -> bool {
        self.recent.is_empty()
    }

    pub fn clear(&mut self) {
        self.recent.clear();
        self.index.clear();
    }
}

impl Default for EmissionGuard {
    fn default() -> Self {
        Self::new(Self::DEFAULT_CAPACITY)
    }
}
