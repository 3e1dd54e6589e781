//! Outbound records.
//!
//! Encoding is pure serialization into a caller-supplied buffer. Nothing is
//! validated against session state here; that happens one layer up.

use std::fmt;

use bytes::{BufMut, Bytes, BytesMut};
use serde::Serialize;

use crate::address::BdAddr;
use crate::enums::LatencyMode;
use crate::ids::{ConnectionId, ListenerId, ScanId, WizardId};

/// Opcode byte of each command record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum CommandOpcode {
    GetInfo = 0,
    CreateScanner = 1,
    RemoveScanner = 2,
    CreateConnectionChannel = 3,
    RemoveConnectionChannel = 4,
    ForceDisconnect = 5,
    ChangeModeParameters = 6,
    Ping = 7,
    GetButtonInfo = 8,
    CreateScanWizard = 9,
    CancelScanWizard = 10,
    DeleteButton = 11,
    CreateBatteryStatusListener = 12,
    RemoveBatteryStatusListener = 13,
}

impl CommandOpcode {
    pub fn as_u8(self) -> u8 {
        self as u8
    }

    pub fn name(self) -> &'static str {
        match self {
            CommandOpcode::GetInfo => "GetInfo",
            CommandOpcode::CreateScanner => "CreateScanner",
            CommandOpcode::RemoveScanner => "RemoveScanner",
            CommandOpcode::CreateConnectionChannel => "CreateConnectionChannel",
            CommandOpcode::RemoveConnectionChannel => "RemoveConnectionChannel",
            CommandOpcode::ForceDisconnect => "ForceDisconnect",
            CommandOpcode::ChangeModeParameters => "ChangeModeParameters",
            CommandOpcode::Ping => "Ping",
            CommandOpcode::GetButtonInfo => "GetButtonInfo",
            CommandOpcode::CreateScanWizard => "CreateScanWizard",
            CommandOpcode::CancelScanWizard => "CancelScanWizard",
            CommandOpcode::DeleteButton => "DeleteButton",
            CommandOpcode::CreateBatteryStatusListener => "CreateBatteryStatusListener",
            CommandOpcode::RemoveBatteryStatusListener => "RemoveBatteryStatusListener",
        }
    }
}

impl fmt::Display for CommandOpcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A command sent from the client to the daemon.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum Command {
    GetInfo,
    CreateScanner {
        scan_id: ScanId,
    },
    RemoveScanner {
        scan_id: ScanId,
    },
    CreateConnectionChannel {
        conn_id: ConnectionId,
        bd_addr: BdAddr,
        latency_mode: LatencyMode,
        auto_disconnect_time: i16,
    },
    RemoveConnectionChannel {
        conn_id: ConnectionId,
    },
    ForceDisconnect {
        bd_addr: BdAddr,
    },
    ChangeModeParameters {
        conn_id: ConnectionId,
        latency_mode: LatencyMode,
        auto_disconnect_time: i16,
    },
    Ping {
        ping_id: u32,
    },
    GetButtonInfo {
        bd_addr: BdAddr,
    },
    CreateScanWizard {
        scan_wizard_id: WizardId,
    },
    CancelScanWizard {
        scan_wizard_id: WizardId,
    },
    DeleteButton {
        bd_addr: BdAddr,
    },
    CreateBatteryStatusListener {
        listener_id: ListenerId,
        bd_addr: BdAddr,
    },
    RemoveBatteryStatusListener {
        listener_id: ListenerId,
    },
}

impl Command {
    pub fn opcode(&self) -> CommandOpcode {
        match self {
            Command::GetInfo => CommandOpcode::GetInfo,
            Command::CreateScanner { .. } => CommandOpcode::CreateScanner,
            Command::RemoveScanner { .. } => CommandOpcode::RemoveScanner,
            Command::CreateConnectionChannel { .. } => CommandOpcode::CreateConnectionChannel,
            Command::RemoveConnectionChannel { .. } => CommandOpcode::RemoveConnectionChannel,
            Command::ForceDisconnect { .. } => CommandOpcode::ForceDisconnect,
            Command::ChangeModeParameters { .. } => CommandOpcode::ChangeModeParameters,
            Command::Ping { .. } => CommandOpcode::Ping,
            Command::GetButtonInfo { .. } => CommandOpcode::GetButtonInfo,
            Command::CreateScanWizard { .. } => CommandOpcode::CreateScanWizard,
            Command::CancelScanWizard { .. } => CommandOpcode::CancelScanWizard,
            Command::DeleteButton { .. } => CommandOpcode::DeleteButton,
            Command::CreateBatteryStatusListener { .. } => {
                CommandOpcode::CreateBatteryStatusListener
            }
            Command::RemoveBatteryStatusListener { .. } => {
                CommandOpcode::RemoveBatteryStatusListener
            }
        }
    }

    /// Size of the encoded record, opcode included.
    pub fn encoded_len(&self) -> usize {
        1 + match self {
            Command::GetInfo => 0,
            Command::CreateScanner { .. }
            | Command::RemoveScanner { .. }
            | Command::RemoveConnectionChannel { .. }
            | Command::Ping { .. }
            | Command::CreateScanWizard { .. }
            | Command::CancelScanWizard { .. }
            | Command::RemoveBatteryStatusListener { .. } => 4,
            Command::ForceDisconnect { .. }
            | Command::GetButtonInfo { .. }
            | Command::DeleteButton { .. } => 6,
            Command::CreateConnectionChannel { .. } => 4 + 6 + 1 + 2,
            Command::ChangeModeParameters { .. } => 4 + 1 + 2,
            Command::CreateBatteryStatusListener { .. } => 4 + 6,
        }
    }

    /// Append the record bytes (no length prefix) to `dst`.
    pub fn encode(&self, dst: &mut BytesMut) {
        dst.reserve(self.encoded_len());
        dst.put_u8(self.opcode().as_u8());

        match self {
            Command::GetInfo => {}
            Command::CreateScanner { scan_id } | Command::RemoveScanner { scan_id } => {
                dst.put_u32_le(scan_id.0);
            }
            Command::CreateConnectionChannel {
                conn_id,
                bd_addr,
                latency_mode,
                auto_disconnect_time,
            } => {
                dst.put_u32_le(conn_id.0);
                dst.put_slice(bd_addr.as_bytes());
                dst.put_u8((*latency_mode).into());
                dst.put_i16_le(*auto_disconnect_time);
            }
            Command::RemoveConnectionChannel { conn_id } => {
                dst.put_u32_le(conn_id.0);
            }
            Command::ForceDisconnect { bd_addr }
            | Command::GetButtonInfo { bd_addr }
            | Command::DeleteButton { bd_addr } => {
                dst.put_slice(bd_addr.as_bytes());
            }
            Command::ChangeModeParameters {
                conn_id,
                latency_mode,
                auto_disconnect_time,
            } => {
                dst.put_u32_le(conn_id.0);
                dst.put_u8((*latency_mode).into());
                dst.put_i16_le(*auto_disconnect_time);
            }
            Command::Ping { ping_id } => {
                dst.put_u32_le(*ping_id);
            }
            Command::CreateScanWizard { scan_wizard_id }
            | Command::CancelScanWizard { scan_wizard_id } => {
                dst.put_u32_le(scan_wizard_id.0);
            }
            Command::CreateBatteryStatusListener {
                listener_id,
                bd_addr,
            } => {
                dst.put_u32_le(listener_id.0);
                dst.put_slice(bd_addr.as_bytes());
            }
            Command::RemoveBatteryStatusListener { listener_id } => {
                dst.put_u32_le(listener_id.0);
            }
        }
    }

    pub fn to_bytes(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(self.encoded_len());
        self.encode(&mut buf);
        buf.freeze()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr() -> BdAddr {
        BdAddr::from_wire([0x0c, 0x2b, 0x71, 0xda, 0xe4, 0x80])
    }

    #[test]
    fn get_info_is_a_bare_opcode() {
        assert_eq!(Command::GetInfo.to_bytes().as_ref(), &[0x00]);
    }

    #[test]
    fn create_connection_channel_layout() {
        let cmd = Command::CreateConnectionChannel {
            conn_id: ConnectionId(0x0102_0304),
            bd_addr: addr(),
            latency_mode: LatencyMode::Low,
            auto_disconnect_time: 0x1ff,
        };
        assert_eq!(
            cmd.to_bytes().as_ref(),
            &[
                0x03, // opcode
                0x04, 0x03, 0x02, 0x01, // conn_id
                0x0c, 0x2b, 0x71, 0xda, 0xe4, 0x80, // bd_addr, wire order
                0x01, // latency
                0xff, 0x01, // auto_disconnect_time
            ]
        );
        assert_eq!(cmd.encoded_len(), 14);
    }

    #[test]
    fn change_mode_parameters_layout() {
        let cmd = Command::ChangeModeParameters {
            conn_id: ConnectionId(7),
            latency_mode: LatencyMode::High,
            auto_disconnect_time: -1,
        };
        assert_eq!(
            cmd.to_bytes().as_ref(),
            &[0x06, 7, 0, 0, 0, 0x02, 0xff, 0xff]
        );
    }

    #[test]
    fn address_commands_carry_wire_order_bytes() {
        let a = addr();
        for (cmd, op) in [
            (Command::ForceDisconnect { bd_addr: a }, 0x05),
            (Command::GetButtonInfo { bd_addr: a }, 0x08),
            (Command::DeleteButton { bd_addr: a }, 0x0b),
        ] {
            let bytes = cmd.to_bytes();
            assert_eq!(bytes[0], op);
            assert_eq!(&bytes[1..], a.as_bytes());
        }
    }

    #[test]
    fn id_only_commands() {
        let cases = [
            (Command::CreateScanner { scan_id: ScanId(1) }, 0x01),
            (Command::RemoveScanner { scan_id: ScanId(1) }, 0x02),
            (
                Command::RemoveConnectionChannel {
                    conn_id: ConnectionId(1),
                },
                0x04,
            ),
            (Command::Ping { ping_id: 1 }, 0x07),
            (
                Command::CreateScanWizard {
                    scan_wizard_id: WizardId(1),
                },
                0x09,
            ),
            (
                Command::CancelScanWizard {
                    scan_wizard_id: WizardId(1),
                },
                0x0a,
            ),
            (
                Command::RemoveBatteryStatusListener {
                    listener_id: ListenerId(1),
                },
                0x0d,
            ),
        ];
        for (cmd, op) in cases {
            assert_eq!(cmd.to_bytes().as_ref(), &[op, 1, 0, 0, 0], "{cmd:?}");
            assert_eq!(cmd.opcode().as_u8(), op);
        }
    }

    #[test]
    fn battery_listener_layout() {
        let cmd = Command::CreateBatteryStatusListener {
            listener_id: ListenerId(0xaabb),
            bd_addr: addr(),
        };
        assert_eq!(
            cmd.to_bytes().as_ref(),
            &[0x0c, 0xbb, 0xaa, 0, 0, 0x0c, 0x2b, 0x71, 0xda, 0xe4, 0x80]
        );
    }

    #[test]
    fn encode_appends_to_existing_buffer() {
        let mut buf = BytesMut::from(&b"xx"[..]);
        Command::Ping { ping_id: 2 }.encode(&mut buf);
        assert_eq!(buf.as_ref(), b"xx\x07\x02\x00\x00\x00");
    }

    #[test]
    fn serializes_with_command_tag() {
        let json = serde_json::to_value(Command::DeleteButton { bd_addr: addr() }).unwrap();
        assert_eq!(json["command"], "delete_button");
        assert_eq!(json["bd_addr"], "80:e4:da:71:2b:0c");
    }
}
