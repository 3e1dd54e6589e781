use std::fmt;
use std::str::FromStr;

use serde::{Serialize, Serializer};

use crate::error::{ProtocolError, Result};

/// Length of the display form, `xx:xx:xx:xx:xx:xx`.
pub const DISPLAY_LEN: usize = 17;

/// A 6-byte Bluetooth device address.
///
/// Stored in wire order: byte 0 is the least significant octet, exactly as it
/// is transmitted. The display form prints the most significant octet first.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct BdAddr([u8; 6]);

impl BdAddr {
    /// Build from the six bytes as they appear on the wire.
    pub const fn from_wire(bytes: [u8; 6]) -> Self {
        Self(bytes)
    }

    /// The six bytes in wire order.
    pub const fn to_wire(self) -> [u8; 6] {
        self.0
    }

    /// Borrow the bytes in wire order.
    pub fn as_bytes(&self) -> &[u8; 6] {
        &self.0
    }

    /// Parse the canonical colon-hex display form.
    ///
    /// Exactly 17 characters, colons at positions 2, 5, 8, 11 and 14, hex
    /// digits everywhere else (either case).
    pub fn parse(text: &str) -> Result<Self> {
        let malformed = |reason| ProtocolError::MalformedAddress {
            input: text.to_string(),
            reason,
        };

        let raw = text.as_bytes();
        if raw.len() != DISPLAY_LEN {
            return Err(malformed("expected 17 characters"));
        }

        let mut bytes = [0u8; 6];
        for (pair, chunk) in raw.chunks(3).enumerate() {
            if chunk.len() == 3 && chunk[2] != b':' {
                return Err(malformed("expected ':' separator"));
            }
            let hi = hex_value(chunk[0]).ok_or_else(|| malformed("invalid hex digit"))?;
            let lo = hex_value(chunk[1]).ok_or_else(|| malformed("invalid hex digit"))?;
            bytes[5 - pair] = (hi << 4) | lo;
        }

        Ok(Self(bytes))
    }
}

fn hex_value(c: u8) -> Option<u8> {
    match c {
        b'0'..=b'9' => Some(c - b'0'),
        b'a'..=b'f' => Some(c - b'a' + 10),
        b'A'..=b'F' => Some(c - b'A' + 10),
        _ => None,
    }
}

impl FromStr for BdAddr {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for BdAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let b = &self.0;
        write!(
            f,
            "{:02x}:{:02x}:{:02x}:{:02x}:{:02x}:{:02x}",
            b[5], b[4], b[3], b[2], b[1], b[0]
        )
    }
}

impl fmt::Debug for BdAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BdAddr({self})")
    }
}

impl From<[u8; 6]> for BdAddr {
    fn from(bytes: [u8; 6]) -> Self {
        Self::from_wire(bytes)
    }
}

impl Serialize for BdAddr {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}
