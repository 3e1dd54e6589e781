//! Client for the Flic button daemon protocol.
//!
//! fliclink talks to a Flic daemon over TCP: it frames and decodes the
//! daemon's binary records and keeps track of the identifiers a client uses
//! to open connection channels, scanners, battery listeners and pairing
//! wizards.
//!
//! # Crate Structure
//!
//! - [`transport`]: TCP connect and the raw byte stream
//! - [`frame`]: 2-byte length-prefixed record framing
//! - [`protocol`]: addresses, commands, events and their byte layouts
//! - [`session`]: identifier bookkeeping and the blocking client (behind the
//!   `session` feature)

/// Re-export transport types.
pub mod transport {
    pub use fliclink_transport::*;
}

/// Re-export frame types.
pub mod frame {
    pub use fliclink_frame::*;
}

/// Re-export protocol types.
pub mod protocol {
    pub use fliclink_protocol::*;
}

/// Re-export session types (requires `session` feature).
#[cfg(feature = "session")]
pub mod session {
    pub use fliclink_session::*;
}
