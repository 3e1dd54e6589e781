//! Single-byte enumerations carried inside records.
//!
//! Every enum keeps an `Unknown(u8)` variant. A value the client doesn't
//! recognize usually means the daemon speaks a newer protocol revision, and
//! callers need to tell that apart from a recognized-but-unexpected value.

use std::fmt;

use serde::{Serialize, Serializer};

macro_rules! wire_enum {
    (
        $(#[$meta:meta])*
        $name:ident {
            $( $(#[$vmeta:meta])* $variant:ident = $value:literal => $label:literal, )+
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum $name {
            $( $(#[$vmeta])* $variant, )+
            /// A value outside the known range, kept verbatim.
            Unknown(u8),
        }

        impl $name {
            /// Human-readable label.
            pub fn label(self) -> std::borrow::Cow<'static, str> {
                match self {
                    $( $name::$variant => std::borrow::Cow::Borrowed($label), )+
                    $name::Unknown(raw) => std::borrow::Cow::Owned(format!("unknown({raw})")),
                }
            }

            /// True when the value was not recognized.
            pub fn is_unknown(self) -> bool {
                matches!(self, $name::Unknown(_))
            }
        }

        impl From<u8> for $name {
            fn from(raw: u8) -> Self {
                match raw {
                    $( $value => $name::$variant, )+
                    other => $name::Unknown(other),
                }
            }
        }

        impl From<$name> for u8 {
            fn from(value: $name) -> u8 {
                match value {
                    $( $name::$variant => $value, )+
                    $name::Unknown(raw) => raw,
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.label())
            }
        }

        impl Serialize for $name {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.collect_str(self)
            }
        }
    };
}

wire_enum! {
    /// Outcome carried by a connection-channel creation response.
    CreateConnectionChannelError {
        NoError = 0 => "no error",
        MaxPendingConnectionsReached = 1 => "max pending connections reached",
    }
}

wire_enum! {
    ConnectionStatus {
        Disconnected = 0 => "disconnected",
        Connected = 1 => "connected",
        Ready = 2 => "ready",
    }
}

wire_enum! {
    DisconnectReason {
        Unspecified = 0 => "unspecified",
        ConnectionEstablishmentFailed = 1 => "connection establishment failed",
        TimedOut = 2 => "timed out",
        BondingKeysMismatch = 3 => "bonding keys mismatch",
    }
}

wire_enum! {
    /// Why the daemon dropped a connection channel.
    RemovedReason {
        RemovedByThisClient = 0 => "removed by this client",
        ForceDisconnectedByThisClient = 1 => "force disconnected by this client",
        ForceDisconnectedByOtherClient = 2 => "force disconnected by other client",
        ButtonIsPrivate = 3 => "button is private",
        VerifyTimeout = 4 => "verify timeout",
        InternetBackendError = 5 => "internet backend error",
        InvalidData = 6 => "invalid data",
        CouldntLoadDevice = 7 => "couldn't load device",
        DeletedByThisClient = 8 => "deleted by this client",
        DeletedByOtherClient = 9 => "deleted by other client",
        ButtonBelongsToOtherPartner = 10 => "button belongs to other partner",
        DeletedFromButton = 11 => "deleted from button",
    }
}

wire_enum! {
    ClickType {
        ButtonDown = 0 => "down",
        ButtonUp = 1 => "up",
        ButtonClick = 2 => "click",
        ButtonSingleClick = 3 => "single click",
        ButtonDoubleClick = 4 => "double click",
        ButtonHold = 5 => "hold",
    }
}

wire_enum! {
    BdAddrType {
        Public = 0 => "public",
        Random = 1 => "random",
    }
}

wire_enum! {
    #[derive(Default)]
    LatencyMode {
        #[default]
        Normal = 0 => "normal",
        Low = 1 => "low",
        High = 2 => "high",
    }
}

wire_enum! {
    BluetoothControllerState {
        Detached = 0 => "detached",
        Resetting = 1 => "resetting",
        Attached = 2 => "attached",
    }
}

wire_enum! {
    /// Final outcome of a scan wizard.
    ScanWizardResult {
        Success = 0 => "success",
        CancelledByUser = 1 => "cancelled by user",
        FailedTimeout = 2 => "failed (timeout)",
        ButtonIsPrivate = 3 => "button is private",
        BluetoothUnavailable = 4 => "bluetooth unavailable",
        InternetBackendError = 5 => "internet backend error",
        InvalidData = 6 => "invalid data",
        ButtonBelongsToOtherPartner = 7 => "button belongs to other partner",
        ButtonAlreadyConnectedToOtherDevice = 8 => "button already connected to other device",
    }
}

wire_enum! {
    /// Coarse battery bucket. Not sent on the wire; derived from a percentage.
    BatteryStatus {
        Ok = 0 => "ok",
        Low = 1 => "low",
        Critical = 2 => "critical",
    }
}

impl BatteryStatus {
    /// Bucket a 0–100 percentage.
    pub fn from_percentage(percentage: u8) -> Self {
        match percentage {
            0..=5 => BatteryStatus::Critical,
            6..=15 => BatteryStatus::Low,
            _ => BatteryStatus::Ok,
        }
    }
}
