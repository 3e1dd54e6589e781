use fliclink_protocol::IdClass;

/// Caller-logic errors from identifier bookkeeping.
///
/// These come from a command the caller tried to issue, never from bytes the
/// daemon sent, and they leave the connection untouched.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StateError {
    /// The id is already tracked for this class.
    #[error("{class} id {id} is already in use")]
    DuplicateId { class: IdClass, id: u32 },

    /// The id is not tracked for this class.
    #[error("{class} id {id} is not tracked")]
    UnknownId { class: IdClass, id: u32 },
}

/// Errors that can occur in session operations.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// Resolving or connecting to the daemon failed.
    #[error("transport error: {0}")]
    Transport(#[from] fliclink_transport::TransportError),

    /// Reading or writing a frame failed, or the daemon went away.
    #[error("frame error: {0}")]
    Frame(#[from] fliclink_frame::FrameError),

    /// One record could not be decoded. The stream is still usable.
    #[error("protocol error: {0}")]
    Protocol(#[from] fliclink_protocol::ProtocolError),

    /// The command conflicts with tracked identifiers.
    #[error(transparent)]
    State(#[from] StateError),

    /// No complete record arrived within the configured read timeout.
    ///
    /// Bytes of a partially received record stay buffered and the next
    /// [`FlicClient::next_event`](crate::FlicClient::next_event) call resumes
    /// them. A timeout while writing is reported as [`SessionError::Frame`]
    /// instead, since part of a frame may already be on the wire.
    #[error("read timed out: {0}")]
    ReadTimeout(std::io::Error),
}

impl SessionError {
    /// Classify an error from reading the next frame.
    pub(crate) fn from_read(err: fliclink_frame::FrameError) -> Self {
        match err {
            fliclink_frame::FrameError::Io(io) if is_timeout_kind(io.kind()) => {
                SessionError::ReadTimeout(io)
            }
            other => SessionError::Frame(other),
        }
    }

    /// True when the connection can no longer be used.
    pub fn is_fatal(&self) -> bool {
        matches!(self, SessionError::Transport(_) | SessionError::Frame(_))
    }

    /// True when a read timeout expired with the connection still healthy.
    pub fn is_timeout(&self) -> bool {
        matches!(self, SessionError::ReadTimeout(_))
    }

    /// True when the daemon closed the connection between records.
    pub fn is_orderly_shutdown(&self) -> bool {
        matches!(self, SessionError::Frame(err) if err.is_orderly_shutdown())
    }
}

fn is_timeout_kind(kind: std::io::ErrorKind) -> bool {
    matches!(
        kind,
        std::io::ErrorKind::WouldBlock | std::io::ErrorKind::TimedOut
    )
}

pub type Result<T> = std::result::Result<T, SessionError>;
