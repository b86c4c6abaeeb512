//! Prelude module for convenient imports
//!
//! This module re-exports the most commonly used types and functions from the tsunagi
//! crate. Import it to get the canvas, cards, sockets and the remapping engine without
//! importing each type individually.
//!
//! # Example
//!
//! ```rust,no_run
//! use tsunagi::prelude::*;
//!
//! # fn run_example() -> Result<()> {
//! let document = CanvasDocument::from_file("path/to/canvas.json")?;
//! let canvas = Canvas::from_document(document, CanvasConfig::default())?;
//!
//! let dangling = canvas.find_dangling_connections();
//! println!("{} dangling connections", dangling.len());
//! # Ok(())
//! # }
//! ```

// Canvas and cards
pub use crate::canvas::{
    Canvas, CanvasBuilder, CanvasConfig, CanvasDocument, ReconcileReport, TickReport,
    reconcile_connections,
};
pub use crate::card::{CardEvent, CardInstance, CardSnapshot, EditOutcome, SocketEdit};

// Data model
pub use crate::connection::{Connection, ConnectionStore, ConnectionsView, Point};
pub use crate::id::{CardId, ConnectionId, SocketId};
pub use crate::socket::{Moment, Socket, SocketSet, SocketType};

// Remapping engine and registry
pub use crate::registry::{FixedAnchor, SocketMountEvent, SocketRegistry, cleanup_socket};
pub use crate::remap::{
    ReindexMap, RemapStrategy, Slot, SocketArrayUpdate, SocketSpec, SocketUpdate,
    SocketUpdateEvent, create_socket, create_socket_remapping, create_socket_update_event,
    generate_socket_id, update_socket_array,
};

// Change watching
pub use crate::watcher::{
    CallbackResult, ChangeContext, ChangeKind, ChangeSource, Observation, SocketChange,
    SocketChangeHandler, SocketWatcher,
};

// Error types
pub use crate::error::{CanvasError, PersistenceError, SocketError};

// Result type alias for convenience
pub type Result<T> = std::result::Result<T, Box<dyn std::error::Error>>;
