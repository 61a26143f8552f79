use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    /// The stored credential is stale. The session layer has already fired
    /// the expiry signal; callers must not surface this a second time.
    #[error("session expired")]
    SessionExpired,

    /// Text content was empty after trimming. Rejected before any network
    /// call is made.
    #[error("message content is empty")]
    EmptyMessage,

    /// The server rejected this specific request (bad credentials, invalid
    /// payload). Recoverable; not a sign the session itself is stale.
    #[error("request rejected: {0}")]
    Rejected(String),

    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("malformed response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("push channel error: {0}")]
    Push(String),

    #[error("conversation cache error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("config error: {0}")]
    Config(String),
}

impl ApiError {
    /// True when the error was already surfaced through a dedicated signal,
    /// so generic error reporting should stay quiet.
    pub fn is_handled(&self) -> bool {
        matches!(self, ApiError::SessionExpired)
    }
}
