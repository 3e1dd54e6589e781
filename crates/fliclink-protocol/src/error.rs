/// Errors raised while parsing addresses or decoding event records.
///
/// All of these are scoped to a single record: the framing layer has already
/// consumed the frame, so the next record decodes independently.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProtocolError {
    /// Text is not a `xx:xx:xx:xx:xx:xx` hardware address.
    #[error("malformed address {input:?}: {reason}")]
    MalformedAddress { input: String, reason: &'static str },

    /// The opcode is outside the known event set.
    #[error("unknown event opcode {0}")]
    UnknownOpcode(u8),

    /// A zero-length record has no opcode to dispatch on.
    #[error("empty record")]
    EmptyRecord,

    /// The record ends before a field (or a declared tail) does.
    #[error("truncated record (opcode {opcode}): need {needed} bytes, have {available}")]
    TruncatedRecord {
        opcode: u8,
        needed: usize,
        available: usize,
    },

    /// A declared name length exceeds the fixed name capacity.
    #[error("name length {len} exceeds capacity {max} (opcode {opcode})")]
    NameTooLong { opcode: u8, len: usize, max: usize },

    /// A telemetry value is outside the range the protocol defines.
    #[error("invalid {field} value {value}")]
    InvalidTelemetry { field: &'static str, value: i64 },
}

pub type Result<T> = std::result::Result<T, ProtocolError>;
