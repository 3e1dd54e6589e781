//! Stream transport for talking to a Flic button daemon.
//!
//! The daemon listens on a plain TCP socket (port 5551 by default). This is
//! the lowest layer of fliclink: it resolves a host, connects, and hands out
//! a [`FlicStream`] that the framing layer reads and writes. It never looks
//! at the bytes it carries.

pub mod error;
pub mod tcp;
pub mod traits;

pub use error::{Result, TransportError};
pub use tcp::{TcpTransport, DEFAULT_PORT};
pub use traits::FlicStream;
