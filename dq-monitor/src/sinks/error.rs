use thiserror::Error;

/// Errors raised while delivering metrics or alerts.
#[derive(Debug, Error)]
pub enum SinkError {
    /// Network error (connection failed, timeout, etc.).
    #[error("Network error: {message}")]
    Network { message: String },

    /// The destination answered with an error status.
    #[error("Server error ({status}): {message}")]
    Server { status: u16, message: String },

    /// The payload could not be serialized.
    #[error("Serialization error: {message}")]
    Serialization { message: String },

    /// The sink is misconfigured.
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    /// The sink cannot accept deliveries right now.
    #[error("Sink unavailable: {message}")]
    Unavailable { message: String },
}

impl SinkError {
    /// Returns true if this error is transient and the delivery could be retried.
    pub fn is_retryable(&self) -> bool {
        match self {
            SinkError::Network { .. } | SinkError::Unavailable { .. } => true,
            SinkError::Server { status, .. } => *status >= 500 || *status == 429,
            _ => false,
        }
    }
}

impl From<serde_json::Error> for SinkError {
    fn from(err: serde_json::Error) -> Self {
        SinkError::Serialization {
            message: err.to_string(),
        }
    }
}

/// Result type for sink deliveries.
pub type SinkResult<T> = std::result::Result<T, SinkError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_retryable() {
        assert!(SinkError::Network {
            message: "reset".to_string()
        }
        .is_retryable());
        assert!(SinkError::Server {
            status: 503,
            message: "unavailable".to_string()
        }
        .is_retryable());
        assert!(SinkError::Server {
            status: 429,
            message: "slow down".to_string()
        }
        .is_retryable());
        assert!(!SinkError::Server {
            status: 400,
            message: "bad request".to_string()
        }
        .is_retryable());
        assert!(!SinkError::Configuration {
            message: "no url".to_string()
        }
        .is_retryable());
    }

    #[test]
    fn test_display() {
        let err = SinkError::Server {
            status: 502,
            message: "bad gateway".to_string(),
        };
        assert_eq!(err.to_string(), "Server error (502): bad gateway");
    }
}
