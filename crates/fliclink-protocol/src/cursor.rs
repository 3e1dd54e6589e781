use bytes::Buf;

use crate::address::BdAddr;
use crate::error::{ProtocolError, Result};

/// Bounds-checked field reader over one record.
///
/// Every accessor checks the remaining length before touching the buffer
/// and reports how many bytes the record would have needed.
pub(crate) struct RecordCursor<'a> {
    opcode: u8,
    total: usize,
    buf: &'a [u8],
}

impl<'a> RecordCursor<'a> {
    /// `record` includes the opcode byte; the cursor starts just past it.
    pub(crate) fn new(opcode: u8, record: &'a [u8]) -> Self {
        Self {
            opcode,
            total: record.len(),
            buf: record.get(1..).unwrap_or_default(),
        }
    }

    fn position(&self) -> usize {
        self.total - self.buf.len()
    }

    /// Fail unless `len` more bytes are available.
    pub(crate) fn require(&self, len: usize) -> Result<()> {
        if self.buf.remaining() < len {
            return Err(ProtocolError::TruncatedRecord {
                opcode: self.opcode,
                needed: self.position() + len,
                available: self.total,
            });
        }
        Ok(())
    }

    pub(crate) fn u8(&mut self) -> Result<u8> {
        self.require(1)?;
        Ok(self.buf.get_u8())
    }

    pub(crate) fn i8(&mut self) -> Result<i8> {
        self.require(1)?;
        Ok(self.buf.get_i8())
    }

    pub(crate) fn bool(&mut self) -> Result<bool> {
        Ok(self.u8()? != 0)
    }

    pub(crate) fn u16_le(&mut self) -> Result<u16> {
        self.require(2)?;
        Ok(self.buf.get_u16_le())
    }

    pub(crate) fn i16_le(&mut self) -> Result<i16> {
        self.require(2)?;
        Ok(self.buf.get_i16_le())
    }

    pub(crate) fn u32_le(&mut self) -> Result<u32> {
        self.require(4)?;
        Ok(self.buf.get_u32_le())
    }

    pub(crate) fn i32_le(&mut self) -> Result<i32> {
        self.require(4)?;
        Ok(self.buf.get_i32_le())
    }

    pub(crate) fn u64_le(&mut self) -> Result<u64> {
        self.require(8)?;
        Ok(self.buf.get_u64_le())
    }

    pub(crate) fn bytes(&mut self, len: usize) -> Result<&'a [u8]> {
        self.require(len)?;
        let (head, tail) = self.buf.split_at(len);
        self.buf = tail;
        Ok(head)
    }

    pub(crate) fn addr(&mut self) -> Result<BdAddr> {
        let raw = self.bytes(6)?;
        let mut bytes = [0u8; 6];
        bytes.copy_from_slice(raw);
        Ok(BdAddr::from_wire(bytes))
    }

    /// A text field stored in a fixed `capacity`-byte slot whose meaningful
    /// length comes from a separate, already-read length byte.
    pub(crate) fn fixed_text(&mut self, len: u8, capacity: usize) -> Result<String> {
        let len = len as usize;
        if len > capacity {
            return Err(ProtocolError::NameTooLong {
                opcode: self.opcode,
                len,
                max: capacity,
            });
        }
        let slot = self.bytes(capacity)?;
        Ok(String::from_utf8_lossy(&slot[..len]).into_owned())
    }

    /// A `u8` length followed by exactly that many bytes.
    pub(crate) fn prefixed_bytes(&mut self) -> Result<&'a [u8]> {
        let len = self.u8()? as usize;
        self.bytes(len)
    }

    pub(crate) fn prefixed_text(&mut self) -> Result<String> {
        let raw = self.prefixed_bytes()?;
        Ok(String::from_utf8_lossy(raw).into_owned())
    }

    pub(crate) fn remaining(&self) -> usize {
        self.buf.len()
    }
}
