use crate::card::CardInstance;
use crate::connection::ConnectionStore;
use crate::id::CardId;
use ahash::AHashMap;

/// Recomputes the cached endpoints of every connection touching `card_id` from the
/// socket anchors registered by the rendering layer. Returns how many were refreshed.
///
/// An endpoint whose socket is not mounted loses its cached point.
pub(crate) fn refresh_geometry(
    connections: &mut ConnectionStore,
    card_id: &CardId,
    cards: &AHashMap<CardId, CardInstance>,
) -> usize {
    let mut refreshed = 0;
    for connection in connections.iter_mut().filter(|c| c.touches_card(card_id)) {
        connection.source_point = cards
            .get(&connection.source_card_id)
            .and_then(|card| card.registry().anchor(&connection.source_socket_id));
        connection.target_point = cards
            .get(&connection.target_card_id)
            .and_then(|card| card.registry().anchor(&connection.target_socket_id));
        refreshed += 1;
    }
    refreshed
}
