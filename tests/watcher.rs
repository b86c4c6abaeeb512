//! Tests for change detection, duplicate suppression and the processing guard.
//!
mod common;
use common::*;
use serde_json::json;
use tsunagi::prelude::*;
use tsunagi::watcher::{ChangeKey, EmissionGuard, IgnoreReason, SocketSnapshot, diff_sockets};

/// Requests an output for every input the card adds to itself.
struct Mirror;

impl SocketChangeHandler for Mirror {
    fn on_input_change(&mut self, change: &SocketChange, ctx: &mut ChangeContext) -> CallbackResult {
        if change.kind == ChangeKind::Added && change.source == ChangeSource::Local {
            ctx.request(SocketEdit::add(SocketType::Output));
        }
        Ok(())
    }
}

/// Requests an output once input `a` receives a value from upstream.
struct Echo;

impl SocketChangeHandler for Echo {
    fn on_input_change(&mut self, change: &SocketChange, ctx: &mut ChangeContext) -> CallbackResult {
        if change.kind == ChangeKind::Modified
            && change.source == ChangeSource::External
            && change.socket_id.as_str() == "a"
        {
            ctx.request(SocketEdit::add(SocketType::Output));
        }
        Ok(())
    }
}

#[cfg(test)]
mod diff_tests {
    use super::*;

    #[test]
    fn test_diff_classifies_changes() {
        let before = inputs(&["a", "b", "c"]);
        let snapshot = SocketSnapshot::capture(&before);

        let mut renamed = before[0].clone();
        renamed.rename("Context");
        let current = vec![before[2].clone(), renamed, input("d", 2)];

        let changes = diff_sockets(&snapshot, &current, SocketType::Input, ChangeSource::Local);
        let summary: Vec<(ChangeKind, &str)> = changes
            .iter()
            .map(|c| (c.kind, c.socket_id.as_str()))
            .collect();

        assert_eq!(
            summary,
            vec![
                (ChangeKind::Modified, "a"),
                (ChangeKind::Added, "d"),
                (ChangeKind::Removed, "b"),
            ]
        );
        assert!(changes[2].current.is_none());
        assert_eq!(changes[0].previous.as_ref().map(|p| p.name.as_str()), Some("Input 1"));
    }

    #[test]
    fn test_reorder_and_moment_churn_are_not_changes() {
        let before = inputs(&["a", "b"]);
        let snapshot = SocketSnapshot::capture(&before);
        let mut touched = before[0].clone();
        touched.touch();
        touched.index = 1;
        let current = vec![before[1].clone(), touched];

        let changes = diff_sockets(&snapshot, &current, SocketType::Input, ChangeSource::External);

        assert!(changes.is_empty());
    }
}

#[cfg(test)]
mod guard_tests {
    use super::*;

    fn key(id: &str, moment: u64) -> ChangeKey {
        ChangeKey {
            socket_id: SocketId::new(id),
            moment: Moment::from_raw(moment),
            source: ChangeSource::Local,
            kind: ChangeKind::Modified,
        }
    }

    #[test]
    fn test_guard_admits_each_change_once() {
        let mut guard = EmissionGuard::default();

        assert!(guard.admit(key("a", 1)));
        assert!(!guard.admit(key("a", 1)));
        assert!(guard.admit(key("a", 2)));
        assert!(guard.admit(key("b", 1)));
        assert_eq!(guard.len(), 3);
    }

    #[test]
    fn test_guard_forgets_oldest_beyond_capacity() {
        let mut guard = EmissionGuard::new(2);

        assert!(guard.admit(key("a", 1)));
        assert!(guard.admit(key("a", 2)));
        assert!(guard.admit(key("a", 3)));

        assert_eq!(guard.len(), 2);
        assert!(guard.admit(key("a", 1)));
        assert!(!guard.admit(key("a", 3)));
    }
}

#[cfg(test)]
mod watcher_tests {
    use super::*;

    #[test]
    fn test_initialization_runs_once() {
        let mut recorder = Recorder::new();
        let set = SocketSet::new(inputs(&["a", "b"]), vec![]);
        let mut watcher = SocketWatcher::new();

        let first = watcher.initialize(&set, &mut recorder);
        let second = watcher.initialize(&set, &mut recorder);

        assert_eq!(first.delivered(), 2);
        assert_eq!(second, Observation::Ignored(IgnoreReason::AlreadyInitialized));
        assert_eq!(recorder.count(ChangeKind::Added), 2);
        assert!(
            recorder
                .changes()
                .iter()
                .all(|r| r.source == ChangeSource::Initialization)
        );
    }

    #[test]
    fn test_stale_reobservation_is_suppressed() {
        let mut recorder = Recorder::new();
        let mut set = SocketSet::new(inputs(&["a"]), vec![]);
        let mut watcher = SocketWatcher::new();
        watcher.initialize(&set, &mut recorder);

        let original = set.inputs[0].clone();
        set.inputs[0].set_value(json!("edited"));
        let edited = set.inputs[0].clone();
        let observation = watcher.observe(&set, ChangeSource::External, false, &mut recorder);
        assert_eq!(observation.delivered(), 1);

        // Undo, then redo the very same state.
        set.inputs[0] = original;
        assert!(
            watcher
                .observe(&set, ChangeSource::External, false, &mut recorder)
                .is_delivered()
        );
        set.inputs[0] = edited;
        let observation = watcher.observe(&set, ChangeSource::External, false, &mut recorder);

        assert_eq!(observation, Observation::Suppressed(1));
        assert_eq!(recorder.count(ChangeKind::Modified), 2);
    }

    #[test]
    fn test_processing_ignores_all_but_initialization() {
        let mut recorder = Recorder::new();
        let set = SocketSet::new(inputs(&["a"]), vec![]);
        let mut watcher = SocketWatcher::new();

        let ignored = watcher.observe(&set, ChangeSource::Local, true, &mut recorder);
        assert_eq!(ignored, Observation::Ignored(IgnoreReason::Processing));
        assert!(recorder.changes().is_empty());

        let seeded = watcher.observe(&set, ChangeSource::Initialization, true, &mut recorder);
        assert_eq!(seeded.delivered(), 1);
        assert_eq!(
            watcher.observe(&set, ChangeSource::Local, false, &mut recorder),
            Observation::Unchanged
        );
    }
}

#[cfg(test)]
mod card_tests {
    use super::*;

    #[test]
    fn test_mount_fires_one_added_per_socket() {
        let recorder = Recorder::new();
        let id = CardId::new("agent");
        let mut canvas = Canvas::new(CanvasConfig::default());

        canvas
            .add_card(
                CardInstance::new(id.clone(), SocketSet::new(inputs(&["a"]), vec![output("out", 0)]))
                    .with_handler(recorder.clone()),
            )
            .expect("Failed to add card");

        assert_eq!(recorder.count(ChangeKind::Added), 2);
        let sides: Vec<SocketType> = recorder.changes().iter().map(|r| r.socket_type).collect();
        assert_eq!(sides, vec![SocketType::Input, SocketType::Output]);

        let again = canvas.card_mut(&id).expect("Card missing").mount();
        assert_eq!(again, Observation::Ignored(IgnoreReason::AlreadyInitialized));
        assert_eq!(recorder.changes().len(), 2);
    }

    #[test]
    fn test_identical_value_writes_fire_once() {
        let recorder = Recorder::new();
        let (mut canvas, _source, target) =
            wired_canvas_with(source_card(), abc_card().with_handler(recorder.clone()));
        recorder.clear();
        canvas.take_card_updates();

        let first = canvas
            .edit_card(&target, SocketEdit::set_value(SocketId::new("a"), json!("x")))
            .expect("Failed to set value");
        let second = canvas
            .edit_card(&target, SocketEdit::set_value(SocketId::new("a"), json!("x")))
            .expect("Failed to set value");

        assert!(matches!(first, EditOutcome::Applied(ref o) if o.is_delivered()));
        assert_eq!(second, EditOutcome::Applied(Observation::Unchanged));
        assert_eq!(recorder.count(ChangeKind::Modified), 1);

        let updates = canvas.take_card_updates();
        assert_eq!(updates.len(), 1);
        assert_eq!(updates[0].id, target);
        assert_eq!(updates[0].sockets.inputs[0].value, json!("x"));
    }

    #[test]
    fn test_edits_while_processing_run_next_tick() {
        let (mut canvas, _source, target) = wired_canvas();
        canvas
            .card_mut(&target)
            .expect("Target card missing")
            .set_processing(true);

        let outcome = canvas
            .edit_card(&target, SocketEdit::add(SocketType::Input))
            .expect("Failed to submit edit");
        assert_eq!(outcome, EditOutcome::Deferred);
        assert_eq!(canvas.card(&target).expect("Target card missing").deferred_len(), 1);
        assert_eq!(canvas.tick().deferred_applied, 0);

        canvas
            .card_mut(&target)
            .expect("Target card missing")
            .set_processing(false);
        let report = canvas.tick();

        assert_eq!(report.deferred_applied, 1);
        let card = canvas.card(&target).expect("Target card missing");
        assert_eq!(card.sockets().inputs.len(), 4);
        assert_eq!(card.deferred_len(), 0);
        assert_eq!(canvas.take_socket_updates().len(), 1);
    }

    #[test]
    fn test_external_values_wait_for_processing_to_end() {
        let recorder = Recorder::new();
        let (mut canvas, source, target) =
            wired_canvas_with(source_card(), abc_card().with_handler(recorder.clone()));
        recorder.clear();
        canvas
            .edit_card(&source, SocketEdit::set_value(SocketId::new("out"), json!(7)))
            .expect("Failed to set output value");
        canvas
            .card_mut(&target)
            .expect("Target card missing")
            .set_processing(true);

        canvas.propagate(&source).expect("Failed to propagate");
        assert!(recorder.changes().is_empty());

        canvas
            .card_mut(&target)
            .expect("Target card missing")
            .set_processing(false);
        canvas.tick();

        assert_eq!(recorder.count(ChangeKind::Modified), 3);
        assert!(recorder.changes().iter().all(|r| r.source == ChangeSource::External));
    }

    #[test]
    fn test_requested_edits_apply_on_next_tick() {
        let id = CardId::new("mirror");
        let mut canvas = Canvas::new(CanvasConfig::default());
        canvas
            .add_card(CardInstance::new(id.clone(), SocketSet::default()).with_handler(Mirror))
            .expect("Failed to add card");

        let outcome = canvas
            .edit_card(&id, SocketEdit::add(SocketType::Input))
            .expect("Failed to add input");

        match outcome {
            EditOutcome::Applied(Observation::Delivered { requested, .. }) => {
                assert_eq!(requested, vec![SocketEdit::add(SocketType::Output)]);
            }
            other => panic!("Expected a delivered observation, got {:?}", other),
        }
        assert!(canvas.card(&id).expect("Card missing").sockets().outputs.is_empty());

        let report = canvas.tick();

        assert_eq!(report.deferred_applied, 1);
        let card = canvas.card(&id).expect("Card missing");
        assert_eq!(card.sockets().outputs.len(), 1);
        assert_eq!(card.sockets().outputs[0].name, "Output 1");
        assert_eq!(card.deferred_len(), 0);
    }

    #[test]
    fn test_requests_from_postponed_observation_wait_a_tick() {
        let (mut canvas, source, target) = wired_canvas_with(source_card(), abc_card().with_handler(Echo));
        canvas
            .edit_card(&source, SocketEdit::set_value(SocketId::new("out"), json!(7)))
            .expect("Failed to set output value");
        canvas
            .card_mut(&target)
            .expect("Target card missing")
            .set_processing(true);
        canvas.propagate(&source).expect("Failed to propagate");
        canvas
            .card_mut(&target)
            .expect("Target card missing")
            .set_processing(false);

        let first = canvas.tick();

        assert_eq!(first.deferred_applied, 0);
        let card = canvas.card(&target).expect("Target card missing");
        assert!(card.sockets().outputs.is_empty());
        assert_eq!(card.deferred_len(), 1);

        let second = canvas.tick();

        assert_eq!(second.deferred_applied, 1);
        let card = canvas.card(&target).expect("Target card missing");
        assert_eq!(card.sockets().outputs.len(), 1);
        assert_eq!(card.deferred_len(), 0);
    }
}
