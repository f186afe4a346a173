//! Session and send-path error types.

/// How a session ended, as reported by [`Transport::connect_and_serve`].
///
/// [`Transport::connect_and_serve`]: crate::transport::Transport::connect_and_serve
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    /// The connection went away (EOF, reset, router goodbye, dial failure).
    /// Callers are expected to reconnect.
    #[error("got disconnected: {0}")]
    Disconnected(String),

    /// The session cannot continue and reconnecting would not help
    /// (protocol violation, undecodable frames, bad challenge).
    #[error("{0}")]
    Fatal(String),
}

impl SessionError {
    /// True for the expected "got disconnected" outcome.
    pub fn is_disconnect(&self) -> bool {
        matches!(self, Self::Disconnected(_))
    }
}

/// Errors from [`ClientHandle`](crate::client::ClientHandle) send operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SendError {
    /// The session this handle belonged to has ended.
    #[error("session closed")]
    SessionClosed,

    /// The session's command queue is full; the command was not queued.
    #[error("session command queue is full")]
    Full,
}
