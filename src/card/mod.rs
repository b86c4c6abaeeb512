//! Runtime state of one card instance on the canvas.

mod edit;
mod event;

pub use edit::SocketEdit;
pub use event::*;

use crate::canvas::CanvasConfig;
use crate::connection::ConnectionStore;
use crate::error::{CanvasError, SocketError};
use crate::id::{CardId, SocketId};
use crate::registry::{SocketMountEvent, SocketRegistry};
use crate::remap::{
    RemapStrategy, SocketArrayUpdate, SocketSpec, SocketUpdateEvent, create_socket,
    create_socket_update_event, update_socket_array,
};
use crate::socket::{SocketSet, SocketType, extract_placeholders};
use crate::watcher::{
    ChangeSource, IgnoreReason, NoopHandler, Observation, SocketChangeHandler, SocketWatcher,
};
use std::collections::VecDeque;
use std::fmt;

/// What happened to an edit submitted to a card.
#[derive(Debug, Clone, PartialEq)]
pub enum EditOutcome {
    /// Applied now; carries what the watcher made of it.
    Applied(Observation),
    /// The card was processing; the edit runs on the next tick.
    Deferred,
}

/// A card's sockets together with the machinery that keeps them consistent: the socket
/// registry, the change watcher, the processing guard and the outbox of events for the
/// canvas.
pub struct CardInstance {
    id: CardId,
    sockets: SocketSet,
    payload: serde_json::Value,
    registry: SocketRegistry,
    watcher: SocketWatcher,
    handler: Box<dyn SocketChangeHandler>,
    strategy: Option<RemapStrategy>,
    is_processing: bool,
    deferred: VecDeque<SocketEdit>,
    pending_observation: Option<ChangeSource>,
    outbox: Vec<CardEvent>,
}

impl CardInstance {
    pub fn new(id: CardId, sockets: SocketSet) -> Self {
        Self {
            id,
            sockets,
            payload: serde_json::Value::Null,
            registry: SocketRegistry::new(),
            watcher: SocketWatcher::new(),
            handler: Box::new(NoopHandler),
            strategy: None,
            is_processing: false,
            deferred: VecDeque::new(),
            pending_observation: None,
            outbox: Vec::new(),
        }
    }

    pub fn from_snapshot(snapshot: CardSnapshot) -> Self {
        Self::new(snapshot.id, snapshot.sockets).with_payload(snapshot.payload)
    }

    pub fn with_handler(mut self, handler: impl SocketChangeHandler + 'static) -> Self {
        self.handler = Box::new(handler);
        self
    }

    pub fn with_payload(mut self, payload: serde_json::Value) -> Self {
        self.payload = payload;
        self
    }

    /// Overrides the canvas-wide remap strategy for this card.
    pub fn with_strategy(mut self, strategy: RemapStrategy) -> Self {
        self.strategy = Some(strategy);
        self
    }

    pub(crate) fn configure(&mut self, config: &CanvasConfig) {
        if self.strategy.is_none() {
            self.strategy = Some(config.strategy);
        }
        if !self.watcher.is_initialized() {
            self.watcher = SocketWatcher::with_history(config.dedup_history);
        }
    }

    pub fn id(&self) -> &CardId {
        &self.id
    }

    pub fn sockets(&self) -> &SocketSet {
        &self.sockets
    }

    pub fn payload(&self) -> &serde_json::Value {
        &self.payload
    }

    pub fn registry(&self) -> &SocketRegistry {
        &self.registry
    }

    pub(crate) fn registry_mut(&mut self) -> &mut SocketRegistry {
        &mut self.registry
    }

    pub fn watcher(&self) -> &SocketWatcher {
        &self.watcher
    }

    pub fn strategy(&self) -> RemapStrategy {
        self.strategy.unwrap_or_default()
    }

    pub fn is_processing(&self) -> bool {
        self.is_processing
    }

    /// Marks the card busy, e.g. while its business action runs. Edits submitted in the
    /// meantime are deferred and external observations postponed until it is cleared.
    pub fn set_processing(&mut self, processing: bool) {
        self.is_processing = processing;
    }

    pub fn deferred_len(&self) -> usize {
        self.deferred.len()
    }

    pub fn snapshot(&self) -> CardSnapshot {
        CardSnapshot {
            id: self.id.clone(),
            sockets: self.sockets.clone(),
            payload: self.payload.clone(),
        }
    }

    /// Fires the one-time initialization events for the sockets the card starts with.
    pub fn mount(&mut self) -> Observation {
        let observation = self.watcher.initialize(&self.sockets, self.handler.as_mut());
        self.absorb(&observation, ChangeSource::Initialization);
        observation
    }

    /// Registers the visual handle of one of this card's sockets.
    pub fn handle_socket_mount(&mut self, event: SocketMountEvent) {
        if !self.sockets.contains(&event.socket_id) {
            tracing::warn!(card_id = %self.id, socket_id = %event.socket_id, "mounting a socket the card does not own");
        }
        self.registry.handle_socket_mount(event);
    }

    /// Applies an edit now, or defers it to the next tick while the card is processing.
    pub fn apply(
        &mut self,
        edit: SocketEdit,
        connections: &mut ConnectionStore,
    ) -> Result<EditOutcome, CanvasError> {
        if self.is_processing {
            tracing::debug!(card_id = %self.id, ?edit, "card is processing; deferring edit");
            self.deferred.push_back(edit);
            return Ok(EditOutcome::Deferred);
        }

        self.is_processing = true;
        let result = self.apply_now(edit, connections);
        self.is_processing = false;

        if let Some(event) = result? {
            self.outbox.push(CardEvent::SocketsUpdated(event));
        }
        Ok(EditOutcome::Applied(self.observe(ChangeSource::Local)))
    }

    fn apply_now(
        &mut self,
        edit: SocketEdit,
        connections: &mut ConnectionStore,
    ) -> Result<Option<SocketUpdateEvent>, CanvasError> {
        let update = match edit {
            SocketEdit::Rename { socket_id, name } => {
                self.socket_mut(&socket_id)?.rename(name);
                return Ok(None);
            }
            SocketEdit::SetValue { socket_id, value } => {
                self.socket_mut(&socket_id)?.set_value(value);
                return Ok(None);
            }
            SocketEdit::Add {
                socket_type,
                name,
                value,
            } => {
                let old = self.sockets.of(socket_type).to_vec();
                let mut spec = SocketSpec::new(socket_type, old.len()).with_value(value);
                spec.name = name;
                let mut new = old.clone();
                new.push(create_socket(spec));
                SocketArrayUpdate::new(socket_type, old, new)
            }
            SocketEdit::Remove {
                socket_type,
                socket_id,
            } => {
                let old = self.sockets.of(socket_type).to_vec();
                if !old.iter().any(|s| s.id == socket_id) {
                    return Err(self.not_found(socket_id));
                }
                let new = old.iter().filter(|s| s.id != socket_id).cloned().collect();
                SocketArrayUpdate::new(socket_type, old, new).deleting([socket_id])
            }
            SocketEdit::Replace {
                socket_type,
                sockets,
                mut deleted,
            } => {
                let other_side = self.sockets.of(socket_type.opposite());
                if let Some(clash) = sockets.iter().find(|s| other_side.iter().any(|o| o.id == s.id)) {
                    return Err(SocketError::DuplicateSocketId(clash.id.clone()).into());
                }
                let old = self.sockets.of(socket_type).to_vec();
                // By id, a socket left out of the new array is a deletion.
                if self.strategy() == RemapStrategy::ById {
                    deleted.extend(
                        old.iter()
                            .filter(|s| !sockets.iter().any(|n| n.id == s.id))
                            .map(|s| s.id.clone()),
                    );
                }
                SocketArrayUpdate::new(socket_type, old, sockets).deleting(deleted)
            }
            SocketEdit::SyncTemplate {
                socket_type,
                text,
                source,
            } => {
                let old = self.sockets.of(socket_type).to_vec();
                // Sockets from other sources stay in place; this source's follow in
                // placeholder order.
                let mut new: Vec<_> = old
                    .iter()
                    .filter(|s| s.source.as_deref() != Some(source.as_str()))
                    .cloned()
                    .collect();
                for placeholder in extract_placeholders(&text, &source) {
                    let spec = SocketSpec::new(socket_type, new.len())
                        .with_name(placeholder.name)
                        .with_source(placeholder.source);
                    new.push(create_socket(spec));
                }
                return Ok(Some(self.run_update(
                    SocketArrayUpdate::new(socket_type, old, new)
                        .with_strategy(RemapStrategy::ByNameAndSource),
                    connections,
                )));
            }
        };

        let update = update.with_strategy(self.strategy());
        Ok(Some(self.run_update(update, connections)))
    }

    fn run_update(
        &mut self,
        update: SocketArrayUpdate,
        connections: &mut ConnectionStore,
    ) -> SocketUpdateEvent {
        let result = update_socket_array(update, &mut self.registry, connections);
        *self.sockets.of_mut(result.socket_type) = result.reindexed_sockets.clone();
        create_socket_update_event(self.id.clone(), result)
    }

    /// Adopts socket state pushed in from outside (reload, undo, collaboration).
    ///
    /// Sockets missing from `external` are cleaned up like any deletion, so the adoption
    /// never leaves dangling connections behind. Ignored while the card is processing,
    /// since the pushed state would be an echo of the card's own in-flight update.
    pub fn sync_external(
        &mut self,
        external: SocketSet,
        connections: &mut ConnectionStore,
    ) -> Observation {
        if self.is_processing {
            tracing::debug!(card_id = %self.id, "ignoring external socket state while processing");
            return Observation::Ignored(IgnoreReason::Processing);
        }

        self.is_processing = true;
        for socket_type in SocketType::ALL {
            let old = self.sockets.of(socket_type).to_vec();
            let new = external.of(socket_type).to_vec();
            if old == new {
                continue;
            }
            let deleted: Vec<SocketId> = old
                .iter()
                .filter(|s| !new.iter().any(|n| n.id == s.id))
                .map(|s| s.id.clone())
                .collect();
            let update = SocketArrayUpdate::new(socket_type, old, new)
                .deleting(deleted)
                .with_strategy(RemapStrategy::ById);
            let event = self.run_update(update, connections);
            self.outbox.push(CardEvent::SocketsUpdated(event));
        }
        self.is_processing = false;

        self.observe(ChangeSource::External)
    }

    /// Writes a value arriving over a connection into one of this card's inputs.
    pub fn receive_value(
        &mut self,
        socket_id: &SocketId,
        value: serde_json::Value,
    ) -> Result<Observation, CanvasError> {
        let socket = self
            .sockets
            .inputs
            .iter_mut()
            .find(|s| &s.id == socket_id)
            .ok_or_else(|| CanvasError::SocketNotFound {
                card_id: self.id.clone(),
                socket_id: socket_id.clone(),
            })?;
        if socket.value == value {
            return Ok(Observation::Unchanged);
        }
        socket.set_value(value);
        Ok(self.observe(ChangeSource::External))
    }

    fn observe(&mut self, source: ChangeSource) -> Observation {
        let observation = self.watcher.observe(
            &self.sockets,
            source,
            self.is_processing,
            self.handler.as_mut(),
        );
        self.absorb(&observation, source);
        observation
    }

    // One outward update per delivered batch; follow-up edits wait for the next tick.
    fn absorb(&mut self, observation: &Observation, source: ChangeSource) {
        match observation {
            Observation::Delivered { requested, .. } => {
                self.deferred.extend(requested.iter().cloned());
                self.outbox.push(CardEvent::UpdateCard(self.snapshot()));
            }
            Observation::Ignored(IgnoreReason::Processing) => {
                self.pending_observation.get_or_insert(source);
            }
            _ => {}
        }
    }

    /// Runs what was postponed while the card was processing: a pending observation and
    /// the deferred edits. Edits requested during this flush wait for the next one.
    pub fn flush(&mut self, connections: &mut ConnectionStore) -> usize {
        if self.is_processing {
            return 0;
        }
        let batch: Vec<SocketEdit> = self.deferred.drain(..).collect();
        if let Some(source) = self.pending_observation.take() {
            self.observe(source);
        }

        let mut applied = 0;
        for edit in batch {
            match self.apply(edit, connections) {
                Ok(_) => applied += 1,
                Err(error) => {
                    tracing::warn!(card_id = %self.id, %error, "deferred socket edit failed");
                }
            }
        }
        applied
    }

    /// Drains the events emitted since the last call.
    pub fn take_events(&mut self) -> Vec<CardEvent> {
        std::mem::take(&mut self.outbox)
    }

    /// Card removal: releases every registered socket handle and drops pending work.
    pub fn teardown(&mut self) -> usize {
        self.deferred.clear();
        self.pending_observation = None;
        self.outbox.clear();
        self.registry.cleanup()
    }

    fn socket_mut(&mut self, socket_id: &SocketId) -> Result<&mut crate::socket::Socket, CanvasError> {
        let card_id = self.id.clone();
        self.sockets
            .find_mut(socket_id)
            .ok_or_else(|| CanvasError::SocketNotFound {
                card_id,
                socket_id: socket_id.clone(),
            })
    }

    fn not_found(&self, socket_id: SocketId) -> CanvasError {
        CanvasError::SocketNotFound {
            card_id: self.id.clone(),
            socket_id,
        }
    }
}

impl fmt::Debug for CardInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CardInstance")
            .field("id", &self.id)
            .field("sockets", &self.sockets)
            .field("registry", &self.registry)
            .field("is_processing", &self.is_processing)
            .field("deferred", &self.deferred.len())
            .finish()
    }
}
