//! The canvas: the explicit context owning every card instance and the one
//! authoritative connection list, and the reconciler that keeps them consistent.

mod config;
mod document;
mod geometry;
mod reconciler;

pub use config::CanvasConfig;
pub use document::CanvasDocument;
pub use reconciler::{ReconcileReport, reconcile_connections};

use crate::card::{CardEvent, CardInstance, CardSnapshot, EditOutcome, SocketEdit};
use crate::connection::{Connection, ConnectionStore, ConnectionsView};
use crate::error::CanvasError;
use crate::id::{CardId, ConnectionId, SocketId};
use crate::remap::{RemapStrategy, SocketUpdateEvent};
use crate::socket::SocketSet;
use crate::watcher::Observation;
use ahash::AHashMap;
use geometry::refresh_geometry;

/// Counts from one [`Canvas::tick`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickReport {
    pub deferred_applied: usize,
    pub events_dispatched: usize,
    pub geometry_refreshed: usize,
}

pub struct CanvasBuilder {
    config: CanvasConfig,
    cards: Vec<CardInstance>,
    connections: Vec<Connection>,
}

impl CanvasBuilder {
    pub fn new() -> Self {
        Self {
            config: CanvasConfig::default(),
            cards: Vec::new(),
            connections: Vec::new(),
        }
    }

    pub fn with_config(mut self, config: CanvasConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_strategy(mut self, strategy: RemapStrategy) -> Self {
        self.config.strategy = strategy;
        self
    }

    pub fn with_card(mut self, card: CardInstance) -> Self {
        self.cards.push(card);
        self
    }

    /// Adopts a persisted connection array verbatim.
    pub fn with_connections(mut self, connections: Vec<Connection>) -> Self {
        self.connections = connections;
        self
    }

    pub fn build(self) -> Result<Canvas, CanvasError> {
        let mut canvas = Canvas::new(self.config);
        for card in self.cards {
            canvas.insert_card(card)?;
        }
        for connection in &self.connections {
            canvas.track(connection);
        }
        canvas.connections = ConnectionStore::from_connections(self.connections);

        let dangling = canvas.find_dangling_connections();
        if !dangling.is_empty() {
            tracing::warn!(count = dangling.len(), "canvas loaded with dangling connections");
        }
        canvas.dispatch();
        Ok(canvas)
    }
}

impl Default for CanvasBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// One open canvas. Cards and connections live here and nowhere else.
pub struct Canvas {
    config: CanvasConfig,
    cards: AHashMap<CardId, CardInstance>,
    order: Vec<CardId>,
    connections: ConnectionStore,
    pending_geometry: Vec<CardId>,
    card_updates: Vec<CardSnapshot>,
    socket_updates: Vec<SocketUpdateEvent>,
}

impl Canvas {
    pub fn new(config: CanvasConfig) -> Self {
        Self {
            config,
            cards: AHashMap::new(),
            order: Vec::new(),
            connections: ConnectionStore::new(),
            pending_geometry: Vec::new(),
            card_updates: Vec::new(),
            socket_updates: Vec::new(),
        }
    }

    pub fn builder() -> CanvasBuilder {
        CanvasBuilder::new()
    }

    /// Restores a canvas from its persisted form.
    pub fn from_document(document: CanvasDocument, config: CanvasConfig) -> Result<Self, CanvasError> {
        document
            .cards
            .into_iter()
            .map(CardInstance::from_snapshot)
            .fold(CanvasBuilder::new().with_config(config), CanvasBuilder::with_card)
            .with_connections(document.connections)
            .build()
    }

    pub fn to_document(&self) -> CanvasDocument {
        CanvasDocument {
            cards: self.cards().map(CardInstance::snapshot).collect(),
            connections: self.connections.as_slice().to_vec(),
        }
    }

    pub fn config(&self) -> &CanvasConfig {
        &self.config
    }

    /// Cards in insertion order.
    pub fn cards(&self) -> impl Iterator<Item = &CardInstance> {
        self.order.iter().filter_map(|id| self.cards.get(id))
    }

    pub fn card(&self, card_id: &CardId) -> Option<&CardInstance> {
        self.cards.get(card_id)
    }

    /// Mutable access for the rendering layer (socket mounts, processing flag). Socket
    /// edits go through [`Canvas::edit_card`] so connections follow them.
    pub fn card_mut(&mut self, card_id: &CardId) -> Option<&mut CardInstance> {
        self.cards.get_mut(card_id)
    }

    /// Read-only connections, as handed to card-level code.
    pub fn connections(&self) -> ConnectionsView<'_> {
        self.connections.view()
    }

    /// Adds and mounts a card, firing its initialization events.
    pub fn add_card(&mut self, card: CardInstance) -> Result<(), CanvasError> {
        self.insert_card(card)?;
        self.dispatch();
        Ok(())
    }

    fn insert_card(&mut self, mut card: CardInstance) -> Result<(), CanvasError> {
        if self.cards.contains_key(card.id()) {
            return Err(CanvasError::DuplicateCard(card.id().clone()));
        }
        card.sockets().check_dense()?;
        card.configure(&self.config);
        card.mount();
        let id = card.id().clone();
        self.order.push(id.clone());
        self.cards.insert(id, card);
        Ok(())
    }

    /// Removes a card: tears down its registry and drops every connection touching it.
    pub fn remove_card(&mut self, card_id: &CardId) -> Result<CardInstance, CanvasError> {
        let mut card = self
            .cards
            .remove(card_id)
            .ok_or_else(|| CanvasError::CardNotFound(card_id.clone()))?;
        self.order.retain(|id| id != card_id);
        self.pending_geometry.retain(|id| id != card_id);

        let released = card.teardown();
        let removed = self.connections.remove_touching_card(card_id);
        for other in self.cards.values_mut() {
            for connection_id in &removed {
                other.registry_mut().untrack_connection(connection_id);
            }
        }
        tracing::info!(%card_id, released, connections = removed.len(), "card removed");
        Ok(card)
    }

    /// Wires an output socket of one card to an input socket of another.
    pub fn connect(
        &mut self,
        source_card_id: &CardId,
        source_socket_id: &SocketId,
        target_card_id: &CardId,
        target_socket_id: &SocketId,
    ) -> Result<ConnectionId, CanvasError> {
        let source = self.require_card(source_card_id)?;
        if !source.sockets().outputs.iter().any(|s| &s.id == source_socket_id) {
            return Err(self.incompatible(
                source_socket_id,
                target_socket_id,
                format!("'{}' is not an output of card '{}'", source_socket_id, source_card_id),
            ));
        }
        let target = self.require_card(target_card_id)?;
        if !target.sockets().inputs.iter().any(|s| &s.id == target_socket_id) {
            return Err(self.incompatible(
                source_socket_id,
                target_socket_id,
                format!("'{}' is not an input of card '{}'", target_socket_id, target_card_id),
            ));
        }

        let connection = Connection::new(
            source_card_id.clone(),
            source_socket_id.clone(),
            target_card_id.clone(),
            target_socket_id.clone(),
        );
        let id = connection.id.clone();
        self.track(&connection);
        self.connections.push(connection);
        self.schedule_geometry(source_card_id);
        self.schedule_geometry(target_card_id);
        Ok(id)
    }

    /// Explicit user deletion of a connection.
    pub fn disconnect(&mut self, connection_id: &ConnectionId) -> Result<Connection, CanvasError> {
        let connection = self
            .connections
            .remove(connection_id)
            .ok_or_else(|| CanvasError::ConnectionNotFound(connection_id.clone()))?;
        for card_id in [&connection.source_card_id, &connection.target_card_id] {
            if let Some(card) = self.cards.get_mut(card_id) {
                card.registry_mut().untrack_connection(connection_id);
            }
        }
        Ok(connection)
    }

    /// Submits a socket edit to a card and reconciles whatever it emitted.
    pub fn edit_card(&mut self, card_id: &CardId, edit: SocketEdit) -> Result<EditOutcome, CanvasError> {
        let card = self
            .cards
            .get_mut(card_id)
            .ok_or_else(|| CanvasError::CardNotFound(card_id.clone()))?;
        let outcome = card.apply(edit, &mut self.connections)?;
        self.dispatch();
        Ok(outcome)
    }

    /// Pushes externally supplied socket state into a card (reload, undo). Rejected
    /// without touching the card when an id appears more than once across both arrays.
    pub fn sync_card(&mut self, card_id: &CardId, sockets: SocketSet) -> Result<Observation, CanvasError> {
        let card = self
            .cards
            .get_mut(card_id)
            .ok_or_else(|| CanvasError::CardNotFound(card_id.clone()))?;
        sockets.check_unique_ids()?;
        let observation = card.sync_external(sockets, &mut self.connections);
        self.dispatch();
        Ok(observation)
    }

    /// Copies each output value of a card into the inputs wired to it. Returns how many
    /// input sockets changed.
    pub fn propagate(&mut self, card_id: &CardId) -> Result<usize, CanvasError> {
        let source = self.require_card(card_id)?;
        let deliveries: Vec<(CardId, SocketId, serde_json::Value)> = self
            .connections
            .iter()
            .filter(|c| &c.source_card_id == card_id)
            .filter_map(|c| {
                let value = source.sockets().find(&c.source_socket_id)?.value.clone();
                Some((c.target_card_id.clone(), c.target_socket_id.clone(), value))
            })
            .collect();

        let mut changed = 0;
        for (target_card_id, target_socket_id, value) in deliveries {
            let Some(target) = self.cards.get_mut(&target_card_id) else {
                tracing::warn!(%target_card_id, "propagation target card is missing");
                continue;
            };
            match target.receive_value(&target_socket_id, value) {
                Ok(Observation::Unchanged) => {}
                Ok(_) => changed += 1,
                Err(error) => tracing::warn!(%error, "propagation skipped"),
            }
        }
        self.dispatch();
        Ok(changed)
    }

    /// The reconciler: prunes and remaps the connections a card's update affects, then
    /// schedules a geometry refresh for that card.
    pub fn handle_sockets_updated(&mut self, event: &SocketUpdateEvent) -> ReconcileReport {
        let report = reconcile_connections(&mut self.connections, event);
        // Socket cleanup may have dropped connections of other cards too.
        let connections = &self.connections;
        for card in self.cards.values_mut() {
            card.registry_mut()
                .retain_tracked(|id| connections.get(id).is_some());
        }
        self.schedule_geometry(&event.card_id);
        report
    }

    /// Routes every event the cards emitted to the reconciler or the update log.
    pub fn dispatch(&mut self) -> usize {
        let mut events = Vec::new();
        for id in &self.order {
            if let Some(card) = self.cards.get_mut(id) {
                events.extend(card.take_events());
            }
        }

        let count = events.len();
        for event in events {
            match event {
                CardEvent::SocketsUpdated(update) => {
                    self.handle_sockets_updated(&update);
                    self.socket_updates.push(update);
                }
                CardEvent::UpdateCard(snapshot) => self.card_updates.push(snapshot),
            }
        }
        count
    }

    /// The next-tick flush: deferred card work, the events it emits, then geometry.
    pub fn tick(&mut self) -> TickReport {
        let mut report = TickReport::default();
        for id in self.order.clone() {
            if let Some(card) = self.cards.get_mut(&id) {
                report.deferred_applied += card.flush(&mut self.connections);
            }
        }
        report.events_dispatched = self.dispatch();

        for card_id in std::mem::take(&mut self.pending_geometry) {
            report.geometry_refreshed += refresh_geometry(&mut self.connections, &card_id, &self.cards);
        }
        report
    }

    /// Drains the `update-card` snapshots emitted since the last call.
    pub fn take_card_updates(&mut self) -> Vec<CardSnapshot> {
        std::mem::take(&mut self.card_updates)
    }

    /// Drains the `SocketsUpdated` events reconciled since the last call.
    pub fn take_socket_updates(&mut self) -> Vec<SocketUpdateEvent> {
        std::mem::take(&mut self.socket_updates)
    }

    /// Connections whose source is not an output, or whose target is not an input, of
    /// an existing card.
    pub fn find_dangling_connections(&self) -> Vec<ConnectionId> {
        self.connections
            .iter()
            .filter(|c| {
                let source_ok = self
                    .cards
                    .get(&c.source_card_id)
                    .is_some_and(|card| card.sockets().outputs.iter().any(|s| s.id == c.source_socket_id));
                let target_ok = self
                    .cards
                    .get(&c.target_card_id)
                    .is_some_and(|card| card.sockets().inputs.iter().any(|s| s.id == c.target_socket_id));
                !(source_ok && target_ok)
            })
            .map(|c| c.id.clone())
            .collect()
    }

    /// Canvas teardown: every card releases its socket handles, all state is dropped.
    pub fn close(&mut self) {
        let mut released = 0;
        for card in self.cards.values_mut() {
            released += card.teardown();
        }
        self.cards.clear();
        self.order.clear();
        self.connections = ConnectionStore::new();
        self.pending_geometry.clear();
        self.card_updates.clear();
        self.socket_updates.clear();
        tracing::info!(released, "canvas closed");
    }

    fn schedule_geometry(&mut self, card_id: &CardId) {
        if !self.config.defer_geometry {
            refresh_geometry(&mut self.connections, card_id, &self.cards);
            return;
        }
        if !self.pending_geometry.contains(card_id) {
            self.pending_geometry.push(card_id.clone());
        }
    }

    fn track(&mut self, connection: &Connection) {
        for card_id in [&connection.source_card_id, &connection.target_card_id] {
            if let Some(card) = self.cards.get_mut(card_id) {
                card.registry_mut().track_connection(connection.id.clone());
            }
        }
    }

    fn require_card(&self, card_id: &CardId) -> Result<&CardInstance, CanvasError> {
        self.cards
            .get(card_id)
            .ok_or_else(|| CanvasError::CardNotFound(card_id.clone()))
    }

    fn incompatible(&self, source: &SocketId, target: &SocketId, message: String) -> CanvasError {
        CanvasError::IncompatibleSockets {
            source_socket_id: source.clone(),
            target_socket_id: target.clone(),
            message,
        }
    }
}
