//! Transport module - frame I/O over the daemon descriptor.
//!
//! Provides:
//! - [`Connection`] over any async read/write pair
//! - [`InheritedConnection`] over the socket inherited on descriptor 0 (Unix)

mod connection;

pub use connection::{Connection, INHERITED_FD};

#[cfg(unix)]
pub use connection::InheritedConnection;
