use serde::{Deserialize, Serialize};
use std::fmt;
use ulid::Ulid;

/// Defines an opaque string identifier with the conversions every id in the crate shares.
macro_rules! define_string_ids {
    ( $( $(#[$meta:meta])* $name:ident ),* $(,)? ) => {
        $(
            $(#[$meta])*
            #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
            #[serde(transparent)]
            pub struct $name(String);

            impl $name {
                /// Wraps an existing identifier, e.g. one loaded from a saved canvas.
                pub fn new(id: impl Into<String>) -> Self {
                    Self(id.into())
                }

                /// Allocates a fresh, collision-resistant identifier.
                pub fn generate() -> Self {
                    Self(Ulid::new().to_string())
                }

                pub fn as_str(&self) -> &str {
                    &self.0
                }

                pub fn is_empty(&self) -> bool {
                    self.0.trim().is_empty()
                }
            }

            impl fmt::Display for $name {
                fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                    f.write_str(&self.0)
                }
            }

            impl From<&str> for $name {
                fn from(id: &str) -> Self {
                    Self(id.to_string())
                }
            }

            impl From<String> for $name {
                fn from(id: String) -> Self {
                    Self(id)
                }
            }

            impl AsRef<str> for $name {
                fn as_ref(&self) -> &str {
                    &self.0
                }
            }
        )*
    };
}

define_string_ids! {
    /// Stable identity of a socket. Never reused within a document.
    SocketId,
    /// The uuid of a card on the canvas.
    CardId,
    /// Identity of a single connection between two sockets.
    ConnectionId,
}
