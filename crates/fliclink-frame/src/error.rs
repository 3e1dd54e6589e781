/// Errors that can occur during frame encoding/decoding.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// The declared (or requested) record length exceeds the allowed maximum.
    #[error("record too large ({size} bytes, max {max})")]
    RecordTooLarge { size: usize, max: usize },

    /// An I/O error occurred while reading or writing frames.
    #[error("frame I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The peer closed the connection cleanly between records.
    #[error("connection closed")]
    ConnectionClosed,

    /// The peer closed the connection with part of a record still buffered.
    #[error("connection closed mid-record ({buffered} bytes buffered)")]
    ClosedMidRecord { buffered: usize },
}

impl FrameError {
    /// True when the peer shut down at a record boundary.
    pub fn is_orderly_shutdown(&self) -> bool {
        matches!(self, FrameError::ConnectionClosed)
    }

    /// True when a configured read or write timeout expired.
    pub fn is_timeout(&self) -> bool {
        matches!(
            self,
            FrameError::Io(err)
                if matches!(err.kind(), std::io::ErrorKind::WouldBlock | std::io::ErrorKind::TimedOut)
        )
    }
}

pub type Result<T> = std::result::Result<T, FrameError>;
