use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

static LAST_MOMENT: AtomicU64 = AtomicU64::new(0);

/// A version marker bumped on every socket mutation.
///
/// Moments are wall-clock milliseconds, but strictly increasing within the process:
/// two mutations in the same millisecond still receive distinct, ordered moments.
/// This is what lets the watcher tell a genuinely new change from a re-observation.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Moment(u64);

impl Moment {
    pub const ZERO: Moment = Moment(0);

    /// Returns the next moment, never equal to or lower than any moment handed out before.
    pub fn now() -> Self {
        let wall = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0);
        let previous = LAST_MOMENT
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |last| {
                Some(wall.max(last + 1))
            })
            .unwrap_or(wall);
        Moment(wall.max(previous + 1))
    }

    pub fn from_raw(raw: u64) -> Self {
        Moment(raw)
    }

    pub fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for Moment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "@{}", self.0)
    }
}
