use std::error::Error;
use std::fmt;

/// Failure modes of one provider lookup. All of these downgrade to the
/// "API Error" status at the batch layer; none of them aborts the run.
#[derive(Debug)]
pub enum ProviderError {
    Transport(String),
    Bootstrap(String),
    Blocked(String),
    Status(u16),
    Json(String),
}

impl fmt::Display for ProviderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProviderError::Transport(msg) => write!(f, "Network error: {msg}"),
            ProviderError::Bootstrap(msg) => write!(f, "Session bootstrap failed: {msg}"),
            ProviderError::Blocked(msg) => write!(f, "Blocked by site: {msg}"),
            ProviderError::Status(code) => write!(f, "Unexpected status code: {code}"),
            ProviderError::Json(msg) => write!(f, "JSON parse error: {msg}"),
        }
    }
}

impl Error for ProviderError {}

impl From<crate::transport::TransportError> for ProviderError {
    fn from(err: crate::transport::TransportError) -> Self {
        ProviderError::Transport(err.to_string())
    }
}
