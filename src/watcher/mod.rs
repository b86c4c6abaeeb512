//! Per-card detection of socket changes for business callbacks.
//!
//! The watcher keeps an explicit snapshot per socket type and diffs the card's socket
//! arrays against it after every mutation. Each accepted change reaches the card's
//! [`SocketChangeHandler`] exactly once: duplicates are filtered by an
//! [`EmissionGuard`], and observations made while the card is mid-update are ignored.
//!
//! Overlapping comparison passes cannot happen: `observe` takes the watcher by exclusive
//! reference, and handlers only get a [`ChangeContext`] through which they may queue
//! follow-up edits for the next tick.

mod diff;
mod guard;

pub use diff::*;
pub use guard::*;

use crate::card::SocketEdit;
use crate::error::CallbackError;
use crate::socket::{SocketSet, SocketType};
use serde::{Deserialize, Serialize};

/// Where an observed change came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ChangeSource {
    /// The card's own edit of its sockets.
    Local,
    /// State pushed into the card from outside: upstream propagation, undo, reload.
    External,
    /// Synthetic additions fired once on mount for pre-existing sockets.
    Initialization,
}

pub type CallbackResult = Result<(), CallbackError>;

/// Lets a business callback request further socket edits. They are applied on the
/// next tick, never inside the pass that triggered them.
#[derive(Debug, Default)]
pub struct ChangeContext {
    requested: Vec<SocketEdit>,
}

impl ChangeContext {
    pub fn request(&mut self, edit: SocketEdit) {
        self.requested.push(edit);
    }

    pub fn requested(&self) -> &[SocketEdit] {
        &self.requested
    }
}

/// Card-specific business logic reacting to socket changes.
pub trait SocketChangeHandler {
    fn on_input_change(&mut self, change: &SocketChange, ctx: &mut ChangeContext) -> CallbackResult {
        let _ = (change, ctx);
        Ok(())
    }

    fn on_output_change(&mut self, change: &SocketChange, ctx: &mut ChangeContext) -> CallbackResult {
        let _ = (change, ctx);
        Ok(())
    }
}

/// A handler that ignores everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopHandler;

impl SocketChangeHandler for NoopHandler {}

/// Per-batch delivery counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchReport {
    /// Changes handed to a callback, including ones whose callback failed.
    pub delivered: usize,
    /// Changes dropped as re-observations of an already emitted change.
    pub suppressed: usize,
    /// Callbacks that returned an error.
    pub failed: usize,
}

impl BatchReport {
    fn merge(&mut self, other: BatchReport) {
        self.delivered += other.delivered;
        self.suppressed += other.suppressed;
        self.failed += other.failed;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoreReason {
    /// The card is mid-update; the observation would be an echo of its own change.
    Processing,
    /// Initialization already ran for this card.
    AlreadyInitialized,
}

/// The outcome of one observation pass.
#[derive(Debug, Clone, PartialEq)]
pub enum Observation {
    Ignored(IgnoreReason),
    /// Nothing differed from the snapshot.
    Unchanged,
    /// Differences were found but every one was a duplicate.
    Suppressed(usize),
    /// At least one change reached a callback. The card should emit one update.
    Delivered {
        report: BatchReport,
        requested: Vec<SocketEdit>,
    },
}

impl Observation {
    pub fn is_delivered(&self) -> bool {
        matches!(self, Observation::Delivered { .. })
    }

    pub fn delivered(&self) -> usize {
        match self {
            Observation::Delivered { report, .. } => report.delivered,
            _ => 0,
        }
    }
}

/// Snapshot-diffing change detector for one card instance.
#[derive(Debug, Clone, Default)]
pub struct SocketWatcher {
    inputs: SocketSnapshot,
    outputs: SocketSnapshot,
    guard: EmissionGuard,
    initialized: bool,
}

impl SocketWatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// A watcher remembering up to `history` emitted changes for duplicate detection.
    pub fn with_history(history: usize) -> Self {
        Self {
            guard: EmissionGuard::new(history),
            ..Self::default()
        }
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    pub fn snapshot(&self, socket_type: SocketType) -> &SocketSnapshot {
        match socket_type {
            SocketType::Input => &self.inputs,
            SocketType::Output => &self.outputs,
        }
    }

    fn snapshot_mut(&mut self, socket_type: SocketType) -> &mut SocketSnapshot {
        match socket_type {
            SocketType::Input => &mut self.inputs,
            SocketType::Output => &mut self.outputs,
        }
    }

    /// Seeds the callbacks with one `Added` per pre-existing socket. Runs once per
    /// watcher, regardless of the card's processing state.
    pub fn initialize(
        &mut self,
        sockets: &SocketSet,
        handler: &mut dyn SocketChangeHandler,
    ) -> Observation {
        if self.initialized {
            return Observation::Ignored(IgnoreReason::AlreadyInitialized);
        }
        self.initialized = true;
        self.inputs = SocketSnapshot::default();
        self.outputs = SocketSnapshot::default();
        self.pass(sockets, ChangeSource::Initialization, handler)
    }

    /// Diffs both socket arrays against the snapshot and delivers the accepted changes.
    pub fn observe(
        &mut self,
        sockets: &SocketSet,
        source: ChangeSource,
        is_processing: bool,
        handler: &mut dyn SocketChangeHandler,
    ) -> Observation {
        if is_processing && source != ChangeSource::Initialization {
            tracing::trace!(?source, "observation ignored while card is processing");
            return Observation::Ignored(IgnoreReason::Processing);
        }
        self.pass(sockets, source, handler)
    }

    fn pass(
        &mut self,
        sockets: &SocketSet,
        source: ChangeSource,
        handler: &mut dyn SocketChangeHandler,
    ) -> Observation {
        let mut ctx = ChangeContext::default();
        let mut report = BatchReport::default();
        let mut found = 0;

        for socket_type in SocketType::ALL {
            let current = sockets.of(socket_type);
            let changes = diff_sockets(self.snapshot(socket_type), current, socket_type, source);
            if changes.is_empty() {
                continue;
            }
            found += changes.len();

            let batch = self.deliver(&changes, handler, &mut ctx);
            if batch.delivered > 0 {
                *self.snapshot_mut(socket_type) = SocketSnapshot::capture(current);
            }
            report.merge(batch);
        }

        match (found, report.delivered) {
            (0, _) => Observation::Unchanged,
            (_, 0) => Observation::Suppressed(report.suppressed),
            _ => Observation::Delivered {
                report,
                requested: ctx.requested,
            },
        }
    }

    fn deliver(
        &mut self,
        changes: &[SocketChange],
        handler: &mut dyn SocketChangeHandler,
        ctx: &mut ChangeContext,
    ) -> BatchReport {
        let mut report = BatchReport::default();
        for change in changes {
            if !self.guard.admit(ChangeKey::from(change)) {
                report.suppressed += 1;
                continue;
            }
            report.delivered += 1;

            let result = match change.socket_type {
                SocketType::Input => handler.on_input_change(change, ctx),
                SocketType::Output => handler.on_output_change(change, ctx),
            };
            if let Err(error) = result {
                report.failed += 1;
                tracing::warn!(
                    socket_id = %change.socket_id,
                    kind = ?change.kind,
                    source = ?change.source,
                    %error,
                    "socket change callback failed"
                );
            }
        }
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remap::{SocketSpec, create_socket};
    use serde_json::json;
    use tracing_test::traced_test;

    struct Failing;

    impl SocketChangeHandler for Failing {
        fn on_input_change(&mut self, change: &SocketChange, _ctx: &mut ChangeContext) -> CallbackResult {
            if change.current.as_ref().map(|s| s.index) == Some(0) {
                return Err("prompt rebuild failed".into());
            }
            Ok(())
        }
    }

    #[test]
    #[traced_test]
    fn test_callback_failure_is_logged_and_batch_continues() {
        let sockets = SocketSet::new(
            vec![
                create_socket(SocketSpec::new(SocketType::Input, 0).with_value(json!("a"))),
                create_socket(SocketSpec::new(SocketType::Input, 1).with_value(json!("b"))),
            ],
            vec![],
        );
        let mut watcher = SocketWatcher::new();

        let observation = watcher.initialize(&sockets, &mut Failing);

        match observation {
            Observation::Delivered { report, .. } => {
                assert_eq!(report.delivered, 2);
                assert_eq!(report.failed, 1);
            }
            other => panic!("expected delivery, got {:?}", other),
        }
        assert!(logs_contain("socket change callback failed"));
        assert!(logs_contain("prompt rebuild failed"));
        assert_eq!(watcher.snapshot(SocketType::Input).len(), 2);
    }
}
