use uuid::Uuid;

/// Errors surfaced by replica sessions, the server, and the wire codecs.
///
/// Protocol errors are fatal to the connection they occur on: the session
/// closes and every outstanding call fails with [`RemodelError::TransportClosed`].
#[derive(Debug, thiserror::Error)]
pub enum RemodelError {
    /// The peer closed the connection at a frame boundary.
    #[error("transport closed")]
    TransportClosed,
    /// The connection ended in the middle of a frame.
    #[error("truncated frame")]
    Truncated,
    /// A frame or its inflated payload exceeds the configured cap.
    #[error("payload of {length} bytes exceeds the limit of {limit} bytes")]
    Oversize { length: usize, limit: usize },
    /// The payload could not be decoded.
    #[error("malformed payload: {0}")]
    Malformed(String),
    /// The message kind byte is outside the known set.
    #[error("unknown message kind {0}")]
    UnknownKind(u8),
    /// A method call named a method outside the dispatch table.
    #[error("unknown method {0:?}")]
    UnknownMethod(String),
    /// A signal emission named a signal outside the dispatch table.
    #[error("unknown signal {0:?}")]
    UnknownSignal(String),
    /// A request id was reused while the first request was still pending.
    #[error("duplicate request id {0}")]
    DuplicateUuid(Uuid),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl RemodelError {
    pub(crate) fn malformed(message: impl Into<String>) -> Self {
        RemodelError::Malformed(message.into())
    }
}

pub type Result<T, E = RemodelError> = std::result::Result<T, E>;
