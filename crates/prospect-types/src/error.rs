use thiserror::Error;

/// Errors from the completion backend (trait defined in prospect-core).
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("provider error: {message}")]
    Provider { message: String },

    #[error("rate limited by provider")]
    RateLimited,

    #[error("request timed out")]
    Timeout,

    #[error("invalid backend configuration: {0}")]
    InvalidConfig(String),

    #[error("backend returned an empty completion")]
    EmptyCompletion,
}

/// Errors from outbound reply delivery (trait defined in prospect-core).
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("chat {0} has no connected receiver")]
    NoReceiver(i64),

    #[error("delivery failed: {0}")]
    Delivery(String),

    #[error("invalid transport configuration: {0}")]
    InvalidConfig(String),
}

/// Errors from the transcript store (trait defined in prospect-core).
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database connection error")]
    Connection,

    #[error("query error: {0}")]
    Query(String),

    #[error("record not found")]
    NotFound,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_error_display() {
        let err = BackendError::Provider {
            message: "upstream 502".to_string(),
        };
        assert_eq!(err.to_string(), "provider error: upstream 502");
    }

    #[test]
    fn test_transport_error_display() {
        let err = TransportError::NoReceiver(42);
        assert_eq!(err.to_string(), "chat 42 has no connected receiver");
    }

    #[test]
    fn test_store_error_display() {
        let err = StoreError::Query("syntax error".to_string());
        assert_eq!(err.to_string(), "query error: syntax error");
    }
}
