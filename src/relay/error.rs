//! Relay error types.
//!
//! Every variant is contained within a single connection pair; none of them is
//! fatal to the process.

use std::time::Duration;

use thiserror::Error;
use tokio_tungstenite::tungstenite;

pub type RelayResult<T> = Result<T, RelayError>;

#[derive(Debug, Error)]
pub enum RelayError {
    /// Read or write failure on the browser-facing socket.
    #[error("Client connection error: {0}")]
    Client(#[source] axum::Error),

    /// Handshake, read or write failure on the upstream socket.
    #[error("Upstream connection error: {0}")]
    Upstream(#[from] tungstenite::Error),

    #[error("Invalid upstream request: {0}")]
    InvalidRequest(String),

    #[error("Upstream handshake timed out after {0:?}")]
    ConnectTimeout(Duration),
}

impl RelayError {
    /// Whether the failure originated on the upstream side of the pair.
    pub fn is_upstream(&self) -> bool {
        !matches!(self, RelayError::Client(_))
    }
}

#[cfg(test)]
mod tests {
    use std::io;

    use super::*;

    #[test]
    fn test_error_side_classification() {
        let client = RelayError::Client(axum::Error::new(io::Error::other("reset")));
        assert!(!client.is_upstream());

        let upstream = RelayError::Upstream(tungstenite::Error::ConnectionClosed);
        assert!(upstream.is_upstream());

        let timeout = RelayError::ConnectTimeout(Duration::from_secs(5));
        assert!(timeout.is_upstream());
        assert_eq!(
            timeout.to_string(),
            "Upstream handshake timed out after 5s"
        );
    }
}
