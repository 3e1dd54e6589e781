//! Inbound records.
//!
//! [`Event::decode`] takes one complete record (opcode byte first, length
//! prefix already stripped) and parses it field by field. Every read is
//! bounds-checked; variable tails are sized from their header field and
//! checked against the record before they are materialized.

use std::fmt;

use serde::{Serialize, Serializer};
use tracing::{debug, trace};

use crate::address::BdAddr;
use crate::cursor::RecordCursor;
use crate::enums::{
    BatteryStatus, BdAddrType, BluetoothControllerState, ClickType, ConnectionStatus,
    CreateConnectionChannelError, DisconnectReason, RemovedReason, ScanWizardResult,
};
use crate::error::{ProtocolError, Result};
use crate::ids::{ConnectionId, ListenerId, ScanId, WizardId};

/// Capacity of the fixed name slot in advertisement and wizard records.
pub const MAX_NAME_LEN: usize = 16;

/// Opcode byte of each event record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum EventOpcode {
    AdvertisementPacket = 0,
    CreateConnectionChannelResponse = 1,
    ConnectionStatusChanged = 2,
    ConnectionChannelRemoved = 3,
    ButtonUpOrDown = 4,
    ButtonClickOrHold = 5,
    ButtonSingleOrDoubleClick = 6,
    ButtonSingleOrDoubleClickOrHold = 7,
    NewVerifiedButton = 8,
    GetInfoResponse = 9,
    NoSpaceForNewConnection = 10,
    GotSpaceForNewConnection = 11,
    BluetoothControllerStateChange = 12,
    PingResponse = 13,
    GetButtonInfoResponse = 14,
    ScanWizardFoundPrivateButton = 15,
    ScanWizardFoundPublicButton = 16,
    ScanWizardButtonConnected = 17,
    ScanWizardCompleted = 18,
    ButtonDeleted = 19,
    BatteryStatus = 20,
}

impl EventOpcode {
    pub fn as_u8(self) -> u8 {
        self as u8
    }
}

impl TryFrom<u8> for EventOpcode {
    type Error = ProtocolError;

    fn try_from(raw: u8) -> Result<Self> {
        use EventOpcode::*;
        Ok(match raw {
            0 => AdvertisementPacket,
            1 => CreateConnectionChannelResponse,
            2 => ConnectionStatusChanged,
            3 => ConnectionChannelRemoved,
            4 => ButtonUpOrDown,
            5 => ButtonClickOrHold,
            6 => ButtonSingleOrDoubleClick,
            7 => ButtonSingleOrDoubleClickOrHold,
            8 => NewVerifiedButton,
            9 => GetInfoResponse,
            10 => NoSpaceForNewConnection,
            11 => GotSpaceForNewConnection,
            12 => BluetoothControllerStateChange,
            13 => PingResponse,
            14 => GetButtonInfoResponse,
            15 => ScanWizardFoundPrivateButton,
            16 => ScanWizardFoundPublicButton,
            17 => ScanWizardButtonConnected,
            18 => ScanWizardCompleted,
            19 => ButtonDeleted,
            20 => BatteryStatus,
            other => return Err(ProtocolError::UnknownOpcode(other)),
        })
    }
}

/// A button advertisement seen by a raw scanner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AdvertisementPacket {
    pub scan_id: ScanId,
    pub bd_addr: BdAddr,
    pub name: String,
    pub rssi: i8,
    pub is_private: bool,
    pub already_verified: bool,
    pub already_connected_to_this_device: bool,
    pub already_connected_to_other_device: bool,
}

/// Shared body of the four button press events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ButtonEvent {
    pub conn_id: ConnectionId,
    pub click_type: ClickType,
    pub was_queued: bool,
    /// Seconds between the press and delivery, for queued events.
    pub time_diff: u32,
}

/// Daemon and controller snapshot returned for `GetInfo`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ServerInfo {
    pub bluetooth_controller_state: BluetoothControllerState,
    pub my_bd_addr: BdAddr,
    pub my_bd_addr_type: BdAddrType,
    pub max_pending_connections: u8,
    pub max_concurrently_connected_buttons: i16,
    pub current_pending_connections: u8,
    pub currently_no_space_for_new_connection: bool,
    pub verified_buttons: Vec<BdAddr>,
}

/// Stored metadata for one verified button.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ButtonInfo {
    pub bd_addr: BdAddr,
    #[serde(serialize_with = "serialize_hex")]
    pub uuid: Vec<u8>,
    pub name: String,
    pub color: i32,
    pub serial_number: String,
    pub flic_version: u8,
    pub firmware_version: u32,
}

impl ButtonInfo {
    /// The uuid as lowercase hex, or an empty string when the button is
    /// unknown to the daemon.
    pub fn uuid_hex(&self) -> String {
        hex(&self.uuid)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BatteryStatusEvent {
    pub listener_id: ListenerId,
    /// Always within 0..=100 once decoded.
    pub battery_percentage: u8,
    /// Seconds since the Unix epoch when the level was last read.
    pub timestamp: u64,
}

impl BatteryStatusEvent {
    pub fn status(&self) -> BatteryStatus {
        BatteryStatus::from_percentage(self.battery_percentage)
    }
}

/// A decoded event record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum Event {
    AdvertisementPacket(AdvertisementPacket),
    CreateConnectionChannelResponse {
        conn_id: ConnectionId,
        error: CreateConnectionChannelError,
        connection_status: ConnectionStatus,
    },
    ConnectionStatusChanged {
        conn_id: ConnectionId,
        connection_status: ConnectionStatus,
        disconnect_reason: DisconnectReason,
        bd_addr: BdAddr,
    },
    ConnectionChannelRemoved {
        conn_id: ConnectionId,
        removed_reason: RemovedReason,
    },
    ButtonUpOrDown(ButtonEvent),
    ButtonClickOrHold(ButtonEvent),
    ButtonSingleOrDoubleClick(ButtonEvent),
    ButtonSingleOrDoubleClickOrHold(ButtonEvent),
    NewVerifiedButton {
        bd_addr: BdAddr,
    },
    GetInfoResponse(ServerInfo),
    NoSpaceForNewConnection {
        max_concurrently_connected_buttons: u8,
    },
    GotSpaceForNewConnection {
        max_concurrently_connected_buttons: u8,
    },
    BluetoothControllerStateChange {
        state: BluetoothControllerState,
    },
    PingResponse {
        ping_id: u32,
    },
    GetButtonInfoResponse(ButtonInfo),
    ScanWizardFoundPrivateButton {
        scan_wizard_id: WizardId,
    },
    ScanWizardFoundPublicButton {
        scan_wizard_id: WizardId,
        bd_addr: BdAddr,
        name: String,
    },
    ScanWizardButtonConnected {
        scan_wizard_id: WizardId,
    },
    ScanWizardCompleted {
        scan_wizard_id: WizardId,
        result: ScanWizardResult,
    },
    ButtonDeleted {
        bd_addr: BdAddr,
        deleted_by_this_client: bool,
    },
    BatteryStatus(BatteryStatusEvent),
    /// An opcode outside the known set, kept with the full record bytes.
    Unrecognized {
        opcode: u8,
        #[serde(serialize_with = "serialize_hex")]
        raw: Vec<u8>,
    },
}

impl Event {
    /// Decode one unframed record.
    pub fn decode(record: &[u8]) -> Result<Event> {
        let Some(&opcode) = record.first() else {
            return Err(ProtocolError::EmptyRecord);
        };

        let op = match EventOpcode::try_from(opcode) {
            Ok(op) => op,
            Err(ProtocolError::UnknownOpcode(opcode)) => {
                debug!(opcode, len = record.len(), "unrecognized event opcode");
                return Ok(Event::Unrecognized {
                    opcode,
                    raw: record.to_vec(),
                });
            }
            Err(other) => return Err(other),
        };

        let mut cur = RecordCursor::new(opcode, record);
        let event = decode_body(op, &mut cur)?;

        if cur.remaining() > 0 {
            trace!(
                opcode,
                trailing = cur.remaining(),
                "ignoring trailing bytes after known fields"
            );
        }
        Ok(event)
    }

    /// The opcode byte this event was decoded from.
    pub fn opcode(&self) -> u8 {
        match self {
            Event::AdvertisementPacket(_) => 0,
            Event::CreateConnectionChannelResponse { .. } => 1,
            Event::ConnectionStatusChanged { .. } => 2,
            Event::ConnectionChannelRemoved { .. } => 3,
            Event::ButtonUpOrDown(_) => 4,
            Event::ButtonClickOrHold(_) => 5,
            Event::ButtonSingleOrDoubleClick(_) => 6,
            Event::ButtonSingleOrDoubleClickOrHold(_) => 7,
            Event::NewVerifiedButton { .. } => 8,
            Event::GetInfoResponse(_) => 9,
            Event::NoSpaceForNewConnection { .. } => 10,
            Event::GotSpaceForNewConnection { .. } => 11,
            Event::BluetoothControllerStateChange { .. } => 12,
            Event::PingResponse { .. } => 13,
            Event::GetButtonInfoResponse(_) => 14,
            Event::ScanWizardFoundPrivateButton { .. } => 15,
            Event::ScanWizardFoundPublicButton { .. } => 16,
            Event::ScanWizardButtonConnected { .. } => 17,
            Event::ScanWizardCompleted { .. } => 18,
            Event::ButtonDeleted { .. } => 19,
            Event::BatteryStatus(_) => 20,
            Event::Unrecognized { opcode, .. } => *opcode,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Event::AdvertisementPacket(_) => "AdvertisementPacket",
            Event::CreateConnectionChannelResponse { .. } => "CreateConnectionChannelResponse",
            Event::ConnectionStatusChanged { .. } => "ConnectionStatusChanged",
            Event::ConnectionChannelRemoved { .. } => "ConnectionChannelRemoved",
            Event::ButtonUpOrDown(_) => "ButtonUpOrDown",
            Event::ButtonClickOrHold(_) => "ButtonClickOrHold",
            Event::ButtonSingleOrDoubleClick(_) => "ButtonSingleOrDoubleClick",
            Event::ButtonSingleOrDoubleClickOrHold(_) => "ButtonSingleOrDoubleClickOrHold",
            Event::NewVerifiedButton { .. } => "NewVerifiedButton",
            Event::GetInfoResponse(_) => "GetInfoResponse",
            Event::NoSpaceForNewConnection { .. } => "NoSpaceForNewConnection",
            Event::GotSpaceForNewConnection { .. } => "GotSpaceForNewConnection",
            Event::BluetoothControllerStateChange { .. } => "BluetoothControllerStateChange",
            Event::PingResponse { .. } => "PingResponse",
            Event::GetButtonInfoResponse(_) => "GetButtonInfoResponse",
            Event::ScanWizardFoundPrivateButton { .. } => "ScanWizardFoundPrivateButton",
            Event::ScanWizardFoundPublicButton { .. } => "ScanWizardFoundPublicButton",
            Event::ScanWizardButtonConnected { .. } => "ScanWizardButtonConnected",
            Event::ScanWizardCompleted { .. } => "ScanWizardCompleted",
            Event::ButtonDeleted { .. } => "ButtonDeleted",
            Event::BatteryStatus(_) => "BatteryStatus",
            Event::Unrecognized { .. } => "Unrecognized",
        }
    }

    /// Body of the four button press events, if this is one.
    pub fn as_button_event(&self) -> Option<&ButtonEvent> {
        match self {
            Event::ButtonUpOrDown(b)
            | Event::ButtonClickOrHold(b)
            | Event::ButtonSingleOrDoubleClick(b)
            | Event::ButtonSingleOrDoubleClickOrHold(b) => Some(b),
            _ => None,
        }
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

fn decode_body(op: EventOpcode, cur: &mut RecordCursor<'_>) -> Result<Event> {
    let event = match op {
        EventOpcode::AdvertisementPacket => {
            let scan_id = ScanId(cur.u32_le()?);
            let bd_addr = cur.addr()?;
            let name_len = cur.u8()?;
            let name = cur.fixed_text(name_len, MAX_NAME_LEN)?;
            Event::AdvertisementPacket(AdvertisementPacket {
                scan_id,
                bd_addr,
                name,
                rssi: cur.i8()?,
                is_private: cur.bool()?,
                already_verified: cur.bool()?,
                already_connected_to_this_device: cur.bool()?,
                already_connected_to_other_device: cur.bool()?,
            })
        }
        EventOpcode::CreateConnectionChannelResponse => Event::CreateConnectionChannelResponse {
            conn_id: ConnectionId(cur.u32_le()?),
            error: cur.u8()?.into(),
            connection_status: cur.u8()?.into(),
        },
        EventOpcode::ConnectionStatusChanged => Event::ConnectionStatusChanged {
            conn_id: ConnectionId(cur.u32_le()?),
            connection_status: cur.u8()?.into(),
            disconnect_reason: cur.u8()?.into(),
            bd_addr: cur.addr()?,
        },
        EventOpcode::ConnectionChannelRemoved => Event::ConnectionChannelRemoved {
            conn_id: ConnectionId(cur.u32_le()?),
            removed_reason: cur.u8()?.into(),
        },
        EventOpcode::ButtonUpOrDown => Event::ButtonUpOrDown(button_event(cur)?),
        EventOpcode::ButtonClickOrHold => Event::ButtonClickOrHold(button_event(cur)?),
        EventOpcode::ButtonSingleOrDoubleClick => {
            Event::ButtonSingleOrDoubleClick(button_event(cur)?)
        }
        EventOpcode::ButtonSingleOrDoubleClickOrHold => {
            Event::ButtonSingleOrDoubleClickOrHold(button_event(cur)?)
        }
        EventOpcode::NewVerifiedButton => Event::NewVerifiedButton {
            bd_addr: cur.addr()?,
        },
        EventOpcode::GetInfoResponse => Event::GetInfoResponse(server_info(cur)?),
        EventOpcode::NoSpaceForNewConnection => Event::NoSpaceForNewConnection {
            max_concurrently_connected_buttons: cur.u8()?,
        },
        EventOpcode::GotSpaceForNewConnection => Event::GotSpaceForNewConnection {
            max_concurrently_connected_buttons: cur.u8()?,
        },
        EventOpcode::BluetoothControllerStateChange => Event::BluetoothControllerStateChange {
            state: cur.u8()?.into(),
        },
        EventOpcode::PingResponse => Event::PingResponse {
            ping_id: cur.u32_le()?,
        },
        EventOpcode::GetButtonInfoResponse => {
            let bd_addr = cur.addr()?;
            let uuid = cur.prefixed_bytes()?.to_vec();
            let name = cur.prefixed_text()?;
            let color = cur.i32_le()?;
            let serial_number = cur.prefixed_text()?;
            Event::GetButtonInfoResponse(ButtonInfo {
                bd_addr,
                uuid,
                name,
                color,
                serial_number,
                flic_version: cur.u8()?,
                firmware_version: cur.u32_le()?,
            })
        }
        EventOpcode::ScanWizardFoundPrivateButton => Event::ScanWizardFoundPrivateButton {
            scan_wizard_id: WizardId(cur.u32_le()?),
        },
        EventOpcode::ScanWizardFoundPublicButton => {
            let scan_wizard_id = WizardId(cur.u32_le()?);
            let bd_addr = cur.addr()?;
            let name_len = cur.u8()?;
            Event::ScanWizardFoundPublicButton {
                scan_wizard_id,
                bd_addr,
                name: cur.fixed_text(name_len, MAX_NAME_LEN)?,
            }
        }
        EventOpcode::ScanWizardButtonConnected => Event::ScanWizardButtonConnected {
            scan_wizard_id: WizardId(cur.u32_le()?),
        },
        EventOpcode::ScanWizardCompleted => Event::ScanWizardCompleted {
            scan_wizard_id: WizardId(cur.u32_le()?),
            result: cur.u8()?.into(),
        },
        EventOpcode::ButtonDeleted => Event::ButtonDeleted {
            bd_addr: cur.addr()?,
            deleted_by_this_client: cur.bool()?,
        },
        EventOpcode::BatteryStatus => {
            let listener_id = ListenerId(cur.u32_le()?);
            let percentage = cur.i8()?;
            let battery_percentage = u8::try_from(percentage)
                .ok()
                .filter(|p| *p <= 100)
                .ok_or(ProtocolError::InvalidTelemetry {
                    field: "battery_percentage",
                    value: i64::from(percentage),
                })?;
            Event::BatteryStatus(BatteryStatusEvent {
                listener_id,
                battery_percentage,
                timestamp: cur.u64_le()?,
            })
        }
    };
    Ok(event)
}

fn button_event(cur: &mut RecordCursor<'_>) -> Result<ButtonEvent> {
    Ok(ButtonEvent {
        conn_id: ConnectionId(cur.u32_le()?),
        click_type: cur.u8()?.into(),
        was_queued: cur.bool()?,
        time_diff: cur.u32_le()?,
    })
}

fn server_info(cur: &mut RecordCursor<'_>) -> Result<ServerInfo> {
    let bluetooth_controller_state = cur.u8()?.into();
    let my_bd_addr = cur.addr()?;
    let my_bd_addr_type = cur.u8()?.into();
    let max_pending_connections = cur.u8()?;
    let max_concurrently_connected_buttons = cur.i16_le()?;
    let current_pending_connections = cur.u8()?;
    let currently_no_space_for_new_connection = cur.bool()?;
    let count = cur.u16_le()? as usize;

    cur.require(count * 6)?;
    let mut verified_buttons = Vec::with_capacity(count);
    for _ in 0..count {
        verified_buttons.push(cur.addr()?);
    }

    Ok(ServerInfo {
        bluetooth_controller_state,
        my_bd_addr,
        my_bd_addr_type,
        max_pending_connections,
        max_concurrently_connected_buttons,
        current_pending_connections,
        currently_no_space_for_new_connection,
        verified_buttons,
    })
}

fn hex(bytes: &[u8]) -> String {
    use std::fmt::Write;
    let mut out = String::with_capacity(bytes.len() * 2);
    for b in bytes {
        let _ = write!(out, "{b:02x}");
    }
    out
}

fn serialize_hex<T, S>(bytes: &T, serializer: S) -> std::result::Result<S::Ok, S::Error>
where
    T: AsRef<[u8]>,
    S: Serializer,
{
    serializer.serialize_str(&hex(bytes.as_ref()))
}
