//! Error types for depgauge-pipeline

use depgauge_core::StoreError;
use thiserror::Error;

/// Errors that can occur while enriching or sizing repositories
#[derive(Error, Debug)]
pub enum PipelineError {
    // =========================================================================
    // Remote service errors
    // =========================================================================
    /// Connection, timeout or other transport failure
    #[error("Request to {url} failed: {message}")]
    Transport { url: String, message: String },

    /// Credentials rejected (401/403)
    #[error("Authentication failed for {url}: {message}")]
    Auth { url: String, message: String },

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Rate limited by {url}, retry after {retry_after:?} seconds")]
    RateLimited {
        url: String,
        retry_after: Option<u64>,
    },

    /// Any other non-success HTTP status
    #[error("Request to {url} failed with status {status}: {body}")]
    Status {
        url: String,
        status: u16,
        body: String,
    },

    /// Response body could not be decoded
    #[error("Invalid response from {url}: {message}")]
    InvalidResponse { url: String, message: String },

    /// GraphQL `errors` array was present
    #[error("GraphQL error: {0}")]
    GraphQl(String),

    // =========================================================================
    // Sizing errors
    // =========================================================================
    /// External tool could not be started or exited unsuccessfully
    #[error("{program} failed: {message}")]
    Process { program: String, message: String },

    /// Line counter output could not be interpreted
    #[error("Unreadable {program} output: {message}")]
    ToolOutput { program: String, message: String },

    #[error("{what} timed out after {secs}s")]
    Timeout { what: String, secs: u64 },

    #[error("Operation cancelled")]
    Cancelled,

    /// A worker task panicked or was aborted
    #[error("Worker task failed: {0}")]
    Join(String),

    // =========================================================================
    // Wrapped errors
    // =========================================================================
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for pipeline operations
pub type Result<T> = std::result::Result<T, PipelineError>;

impl PipelineError {
    pub fn transport(url: impl Into<String>, message: impl ToString) -> Self {
        Self::Transport {
            url: url.into(),
            message: message.to_string(),
        }
    }

    pub fn invalid_response(url: impl Into<String>, message: impl ToString) -> Self {
        Self::InvalidResponse {
            url: url.into(),
            message: message.to_string(),
        }
    }

    pub fn process(program: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Process {
            program: program.into(),
            message: message.into(),
        }
    }

    pub fn tool_output(program: impl Into<String>, message: impl ToString) -> Self {
        Self::ToolOutput {
            program: program.into(),
            message: message.to_string(),
        }
    }

    pub fn join(err: tokio::task::JoinError) -> Self {
        Self::Join(err.to_string())
    }

    /// Whether a failed remote call is worth another attempt.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Transport { .. } | Self::RateLimited { .. } => true,
            Self::Status { status, .. } => *status >= 500,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_classification() {
        assert!(PipelineError::transport("http://x", "connection reset").is_retryable());
        assert!(PipelineError::RateLimited {
            url: "http://x".into(),
            retry_after: Some(3)
        }
        .is_retryable());
        assert!(PipelineError::Status {
            url: "http://x".into(),
            status: 502,
            body: String::new()
        }
        .is_retryable());

        assert!(!PipelineError::Auth {
            url: "http://x".into(),
            message: "bad token".into()
        }
        .is_retryable());
        assert!(!PipelineError::GraphQl("Could not resolve".into()).is_retryable());
        assert!(!PipelineError::NotFound("acme/widget".into()).is_retryable());
    }

    #[test]
    fn test_error_display() {
        let err = PipelineError::Timeout {
            what: "acme/widget".into(),
            secs: 30,
        };
        assert_eq!(err.to_string(), "acme/widget timed out after 30s");

        let err = PipelineError::from(StoreError::record_not_found(7));
        assert!(err.to_string().contains("Repository 7 not found"));
    }
}
