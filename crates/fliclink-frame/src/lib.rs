//! Length-prefixed record framing for the Flic daemon protocol.
//!
//! Every record on the wire is preceded by a 2-byte little-endian length.
//! This layer wraps and unwraps that prefix and nothing else: record bodies
//! are opaque bytes here, interpreted one layer up.
//!
//! Decoding is resumable. Feed bytes as they arrive and ask for the next
//! complete record; an incomplete prefix or body is "need more bytes", never
//! an error.

#[cfg(feature = "async")]
pub mod async_codec;
pub mod codec;
pub mod error;
pub mod reader;
pub mod writer;

#[cfg(feature = "async")]
pub use async_codec::FlicCodec;
pub use codec::{
    decode_frame, encode_frame, Frame, FrameConfig, FrameDecoder, HEADER_SIZE, MAX_RECORD_SIZE,
};
pub use error::{FrameError, Result};
pub use reader::FrameReader;
pub use writer::FrameWriter;
