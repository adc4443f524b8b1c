use comms::transport::client::TransportError;

/// Errors returned by the operations of a [super::RoomSessionController].
///
/// None of them are fatal, the session stays usable and the operation can be retried.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    /// Local validation failed, nothing has been sent to the server
    #[error("{0}")]
    InvalidInput(&'static str),
    #[error("no user identity has been established")]
    IdentityMissing,
    #[error("create or join a room first")]
    NotInRoom,
    /// The server rejected the request, or could not be reached
    #[error("{0}")]
    RemoteRequestFailed(String),
}

impl SessionError {
    pub(crate) fn remote(context: &str, err: TransportError) -> Self {
        SessionError::RemoteRequestFailed(format!("{context}: {err}"))
    }
}
