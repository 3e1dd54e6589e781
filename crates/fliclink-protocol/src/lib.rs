//! Typed records for the Flic daemon protocol.
//!
//! Every record starts with a one-byte opcode followed by fixed fields with
//! no padding; multi-byte integers are little-endian. Commands flow from the
//! client to the daemon, events flow back. A handful of events end in a
//! variable-length tail (names, address lists) whose size is given by a
//! header field and checked against the record before anything is read.
//!
//! This crate performs no I/O. It turns [`Command`] values into bytes and
//! record bytes (already unframed) into [`Event`] values.

pub mod address;
pub mod command;
mod cursor;
pub mod enums;
pub mod error;
pub mod event;
pub mod ids;

pub use address::BdAddr;
pub use command::{Command, CommandOpcode};
pub use enums::{
    BatteryStatus, BdAddrType, BluetoothControllerState, ClickType, ConnectionStatus,
    CreateConnectionChannelError, DisconnectReason, LatencyMode, RemovedReason, ScanWizardResult,
};
pub use error::{ProtocolError, Result};
pub use event::{
    AdvertisementPacket, BatteryStatusEvent, ButtonEvent, ButtonInfo, Event, EventOpcode,
    ServerInfo, MAX_NAME_LEN,
};
pub use ids::{ConnectionId, IdClass, Identifier, ListenerId, ScanId, WizardId};
