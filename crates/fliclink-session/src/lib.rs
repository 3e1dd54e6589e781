//! Session layer for the Flic daemon protocol.
//!
//! Ties the lower layers together: a TCP stream from `fliclink-transport`,
//! record framing from `fliclink-frame` and typed records from
//! `fliclink-protocol`. On top it keeps the per-connection identifier
//! tables that let asynchronous events be attributed to the button or
//! pairing session they belong to.

pub mod client;
pub mod config;
pub mod connector;
pub mod error;
pub mod state;

pub use client::{FlicClient, SessionEvent};
pub use config::{ClientConfig, DEFAULT_AUTO_DISCONNECT_TIME};
pub use connector::{connect, connect_with_config, TcpClient};
pub use error::{Result, SessionError, StateError};
pub use state::{EventContext, IdTable, SessionState, WizardProgress};
