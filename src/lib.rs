//! # Tsunagi - Socket & Connection Consistency Engine
//!
//! **Tsunagi** keeps the sockets of node-editor cards, the canvas-wide connection list and
//! the cached wiring geometry consistent while sockets are added, removed, renamed and
//! reordered. It is the core underneath a card-based visual editor: rendering, forms and
//! per-card business logic live elsewhere and talk to it through a small set of calls.
//!
//! ## Core Workflow
//!
//! 1.  **Open a Canvas**: Build a [`Canvas`] with [`Canvas::builder`], or restore one from a
//!     saved [`CanvasDocument`]. The canvas owns every card and the one authoritative
//!     connection list.
//! 2.  **Add Cards**: Wrap each card's sockets in a [`CardInstance`], optionally with a
//!     [`SocketChangeHandler`] carrying its business logic. Mounting fires one `Added`
//!     initialization event per pre-existing socket.
//! 3.  **Edit Sockets**: Submit [`SocketEdit`]s through [`Canvas::edit_card`]. Each edit runs
//!     cleanup, then the remapping engine, then emits a `SocketsUpdated` event which the
//!     reconciler applies to the connections.
//! 4.  **Tick**: Call [`Canvas::tick`] once per frame to run deferred edits and refresh
//!     connection geometry.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use tsunagi::prelude::*;
//!
//! fn main() -> Result<()> {
//!     let prompt = CardId::new("prompt");
//!     let agent = CardId::new("agent");
//!
//!     let mut canvas = Canvas::builder()
//!         .with_card(CardInstance::new(prompt.clone(), SocketSet::default()))
//!         .with_card(CardInstance::new(agent.clone(), SocketSet::default()))
//!         .build()?;
//!
//!     // Give each card a socket to wire together.
//!     canvas.edit_card(&prompt, SocketEdit::add(SocketType::Output))?;
//!     canvas.edit_card(&agent, SocketEdit::add(SocketType::Input))?;
//!
//!     let output = canvas.card(&prompt).unwrap().sockets().outputs[0].id.clone();
//!     let input = canvas.card(&agent).unwrap().sockets().inputs[0].id.clone();
//!     canvas.connect(&prompt, &output, &agent, &input)?;
//!
//!     // Removing the input socket removes the connection in the same step.
//!     canvas.edit_card(&agent, SocketEdit::remove(SocketType::Input, input))?;
//!     assert!(canvas.connections().is_empty());
//!
//!     canvas.tick();
//!     Ok(())
//! }
//! ```

pub mod canvas;
pub mod card;
pub mod connection;
pub mod error;
pub mod id;
pub mod prelude;
pub mod registry;
pub mod remap;
pub mod socket;
pub mod watcher;

pub use canvas::{Canvas, CanvasBuilder, CanvasConfig, CanvasDocument};
pub use card::{CardInstance, SocketEdit};
pub use watcher::SocketChangeHandler;
