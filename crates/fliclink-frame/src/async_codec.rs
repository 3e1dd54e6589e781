//! `tokio_util::codec` adapter over the same framing rules.

use bytes::{Bytes, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

use crate::codec::{decode_frame, encode_frame, Frame, FrameConfig};
use crate::error::{FrameError, Result};

/// Codec for use with `tokio_util::codec::Framed` and friends.
#[derive(Debug, Clone)]
pub struct FlicCodec {
    config: FrameConfig,
}

impl FlicCodec {
    pub fn new() -> Self {
        Self::with_config(FrameConfig::default())
    }

    pub fn with_config(config: FrameConfig) -> Self {
        Self { config }
    }
}

impl Default for FlicCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl Decoder for FlicCodec {
    type Item = Frame;
    type Error = FrameError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>> {
        decode_frame(src, self.config.max_record_size)
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>> {
        match self.decode(src)? {
            Some(frame) => Ok(Some(frame)),
            None if src.is_empty() => Ok(None),
            None => Err(FrameError::ClosedMidRecord {
                buffered: src.len(),
            }),
        }
    }
}

impl Encoder<Bytes> for FlicCodec {
    type Error = FrameError;

    fn encode(&mut self, item: Bytes, dst: &mut BytesMut) -> Result<()> {
        if item.len() > self.config.max_record_size {
            return Err(FrameError::RecordTooLarge {
                size: item.len(),
                max: self.config.max_record_size,
            });
        }
        encode_frame(&item, dst)
    }
}

impl Encoder<Frame> for FlicCodec {
    type Error = FrameError;

    fn encode(&mut self, item: Frame, dst: &mut BytesMut) -> Result<()> {
        Encoder::<Bytes>::encode(self, item.record, dst)
    }
}
