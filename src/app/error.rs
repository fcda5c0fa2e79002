use thiserror::Error;

#[derive(Error, Debug)]
pub enum FetchPoolError {
    #[error("Invalid pool configuration: {0}")]
    InvalidConfig(String),

    #[error("Fetch pool has not been started")]
    NotStarted,

    #[error("Fetch pool is already running")]
    AlreadyStarted,

    #[error("Fetch pool has been shut down")]
    Closed,

    #[error("Submission cancelled after {submitted} URLs")]
    Cancelled { submitted: usize },

    #[error("No tokio runtime available to spawn workers")]
    NoRuntime,

    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, FetchPoolError>;

/// Failure reported by a [`Transport`](crate::fetcher::Transport).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("request timed out: {0}")]
    Timeout(String),

    #[error("connection failed: {0}")]
    Connect(String),

    #[error("failed to read response body: {0}")]
    Body(String),

    #[error("request failed: {0}")]
    Request(String),
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        let message = error_chain(&err);
        if err.is_timeout() {
            TransportError::Timeout(message)
        } else if err.is_connect() {
            TransportError::Connect(message)
        } else if err.is_body() || err.is_decode() {
            TransportError::Body(message)
        } else {
            TransportError::Request(message)
        }
    }
}

/// Flatten an error and its sources into one line.
fn error_chain(err: &dyn std::error::Error) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}
