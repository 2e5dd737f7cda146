use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CdpError {
    #[error("Connection error: {0}")]
    Connection(#[from] reqwest::Error),

    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    #[error("Request timeout after {0:?}")]
    Timeout(Duration),

    #[error("Protocol error: {code} - {message}")]
    Protocol { code: i64, message: String },

    #[error("Deserialization error: {0}")]
    Deserialize(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Target not found: {0}")]
    TargetNotFound(String),

    #[error("Not attached to target: {0}")]
    NotAttached(String),
}

impl CdpError {
    pub fn protocol(code: i64, message: impl Into<String>) -> Self {
        Self::Protocol {
            code,
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_protocol_error_construction() {
        let err = CdpError::protocol(-32000, "Could not find object with given id");
        match err {
            CdpError::Protocol { code, message } => {
                assert_eq!(code, -32000);
                assert_eq!(message, "Could not find object with given id");
            }
            _ => panic!("Expected Protocol variant"),
        }
    }

    #[test]
    fn test_error_display_messages() {
        let timeout_err = CdpError::Timeout(Duration::from_secs(5));
        assert_eq!(timeout_err.to_string(), "Request timeout after 5s");

        let protocol_err = CdpError::protocol(-32601, "Method not found");
        assert_eq!(
            protocol_err.to_string(),
            "Protocol error: -32601 - Method not found"
        );

        let not_attached = CdpError::NotAttached("page-7".to_string());
        assert_eq!(not_attached.to_string(), "Not attached to target: page-7");
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "socket gone");
        let cdp_err: CdpError = io_err.into();
        match cdp_err {
            CdpError::Io(e) => assert_eq!(e.kind(), std::io::ErrorKind::NotFound),
            _ => panic!("Expected Io variant"),
        }
    }
}
