pub mod boundary;
pub mod definition;
pub mod moment;
pub mod template;

pub use boundary::{RawSocket, RawSocketSet, normalize_sockets};
pub use definition::*;
pub use moment::*;
pub use template::*;
