use std::io;

/// The taxonomy of failures the demuxer surfaces on its error stream, one
/// event per connection it could not (or chose not to) route.
#[derive(Debug, thiserror::Error)]
pub enum DemuxError {
    /// The peeked bytes are not a valid HTTP request start.
    #[error("bad request")]
    BadRequest,
    /// The request was well-formed but `Host` matched no binding.
    #[error("vhost not found: {0}")]
    NotFound(String),
    /// The connection closed before headers completed.
    #[error("connection closed before headers completed")]
    Closed,
    /// A transport-level error while reading or routing the connection.
    #[error("transport error: {0}")]
    OpError(#[source] io::Error),
    /// Anything else.
    #[error("{0}")]
    Other(String),
}

impl DemuxError {
    /// True for the one `OpError` sub-case that is expected during shutdown:
    /// reads racing a locally-closed listener/socket.
    pub fn is_closed_network_connection(&self) -> bool {
        matches!(
            self,
            DemuxError::OpError(e)
                if matches!(
                    e.kind(),
                    io::ErrorKind::NotConnected
                        | io::ErrorKind::BrokenPipe
                        | io::ErrorKind::ConnectionAborted
                )
        )
    }
}

/// Error returned when reserving or releasing a name on the demuxer.
#[derive(Debug, thiserror::Error)]
pub enum BindError {
    #[error("vhost {0} is already bound")]
    AlreadyBound(String),
    #[error("demuxer is closed")]
    Closed,
}
