use bytes::{Buf, BufMut, Bytes, BytesMut};
use tracing::warn;

use crate::error::{FrameError, Result};

/// Frame header: a single little-endian `u16` record length.
pub const HEADER_SIZE: usize = 2;

/// Largest record the 16-bit length prefix can describe.
pub const MAX_RECORD_SIZE: usize = u16::MAX as usize;

/// One complete record lifted off the wire, prefix removed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// The record bytes, opcode first.
    pub record: Bytes,
}

impl Frame {
    /// Create a new frame.
    pub fn new(record: impl Into<Bytes>) -> Self {
        Self {
            record: record.into(),
        }
    }

    /// The first byte of the record, if there is one.
    pub fn opcode(&self) -> Option<u8> {
        self.record.first().copied()
    }

    /// The total wire size of this frame (prefix + record).
    pub fn wire_size(&self) -> usize {
        HEADER_SIZE + self.record.len()
    }
}

/// Encode a record into the wire format.
///
/// Wire format:
/// ```text
/// ┌──────────────┬──────────────────────┐
/// │ Length       │ Record               │
/// │ (2B LE)      │ (Length bytes)       │
/// └──────────────┴──────────────────────┘
/// ```
pub fn encode_frame(record: &[u8], dst: &mut BytesMut) -> Result<()> {
    if record.len() > MAX_RECORD_SIZE {
        return Err(FrameError::RecordTooLarge {
            size: record.len(),
            max: MAX_RECORD_SIZE,
        });
    }
    dst.reserve(HEADER_SIZE + record.len());
    dst.put_u16_le(record.len() as u16);
    dst.put_slice(record);
    Ok(())
}

/// Decode a frame from a buffer.
///
/// Returns `Ok(None)` if the buffer doesn't contain a complete frame yet.
/// On success, consumes the frame bytes from the buffer. An oversized length
/// prefix is reported before any body byte is awaited and leaves the buffer
/// untouched.
pub fn decode_frame(src: &mut BytesMut, max_record: usize) -> Result<Option<Frame>> {
    if src.len() < HEADER_SIZE {
        return Ok(None);
    }

    let record_len = u16::from_le_bytes([src[0], src[1]]) as usize;
    if record_len > max_record {
        return Err(FrameError::RecordTooLarge {
            size: record_len,
            max: max_record,
        });
    }

    let total = HEADER_SIZE + record_len;
    if src.len() < total {
        return Ok(None);
    }

    src.advance(HEADER_SIZE);
    let record = src.split_to(record_len).freeze();

    Ok(Some(Frame { record }))
}

/// Resumable, I/O-free frame extractor.
///
/// Push bytes in whatever pieces the transport delivers them, then pull
/// complete frames out. Splitting the input at any byte boundary yields the
/// same frames as pushing it whole.
#[derive(Debug)]
pub struct FrameDecoder {
    buf: BytesMut,
    max_record: usize,
}

impl FrameDecoder {
    /// Create a decoder that rejects records longer than `max_record`.
    pub fn new(max_record: usize) -> Self {
        Self {
            buf: BytesMut::with_capacity(HEADER_SIZE + max_record.min(1024)),
            max_record,
        }
    }

    /// Append freshly received bytes.
    pub fn push(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    /// Pull the next complete frame, or `Ok(None)` if more bytes are needed.
    pub fn next_frame(&mut self) -> Result<Option<Frame>> {
        decode_frame(&mut self.buf, self.max_record).inspect_err(|err| {
            warn!(error = %err, "rejecting frame");
        })
    }

    /// Number of bytes held that do not yet form a complete frame.
    pub fn buffered(&self) -> usize {
        self.buf.len()
    }

    /// True when no partial frame is pending.
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Current maximum record size.
    pub fn max_record(&self) -> usize {
        self.max_record
    }

    /// Update the maximum record size for subsequent frames.
    pub fn set_max_record(&mut self, max_record: usize) {
        self.max_record = max_record;
    }
}

impl Default for FrameDecoder {
    fn default() -> Self {
        Self::new(MAX_RECORD_SIZE)
    }
}

/// Configuration for the frame codec.
#[derive(Debug, Clone)]
pub struct FrameConfig {
    /// Maximum record size in bytes. Default: 65535 (the prefix limit).
    pub max_record_size: usize,
    /// Read timeout for blocking operations.
    pub read_timeout: Option<std::time::Duration>,
    /// Write timeout for blocking operations.
    pub write_timeout: Option<std::time::Duration>,
}

impl Default for FrameConfig {
    fn default() -> Self {
        Self {
            max_record_size: MAX_RECORD_SIZE,
            read_timeout: None,
            write_timeout: None,
        }
    }
}
