//! Domain-level error taxonomy for revhunt.

/// revhunt domain errors.
///
/// Every variant is a tooling failure that aborts the current run. Outcomes
/// such as "no blame found" or "no gap to fill" are not errors and are
/// reported through `Ok` values instead.
#[derive(Debug, thiserror::Error)]
pub enum RevhuntError {
    #[error("git error: {0}")]
    Git(String),

    #[error("checkout of {revision} failed: {reason}")]
    Checkout { revision: String, reason: String },

    #[error("validator error: {0}")]
    Validator(String),

    #[error("build ledger error: {0}")]
    Ledger(String),

    #[error("invalid revision {value:?}: {reason}")]
    InvalidRevision { value: String, reason: String },

    #[error("invalid revision range: {0}")]
    InvalidRange(String),

    #[error("invalid lookback window: {0}")]
    InvalidWindow(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for revhunt domain operations.
pub type Result<T> = std::result::Result<T, RevhuntError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_revhunt_error_display() {
        let err = RevhuntError::Git("not a git repository".to_string());
        assert!(err.to_string().contains("git error"));

        let err = RevhuntError::Ledger("HTTP 401".to_string());
        assert!(err.to_string().contains("build ledger error"));
        assert!(err.to_string().contains("HTTP 401"));
    }

    #[test]
    fn test_checkout_error_names_revision() {
        let err = RevhuntError::Checkout {
            revision: "abc123".to_string(),
            reason: "pathspec did not match".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("abc123"));
        assert!(msg.contains("pathspec did not match"));
    }

    #[test]
    fn test_io_error_converts() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "git");
        let err: RevhuntError = io.into();
        assert!(matches!(err, RevhuntError::Io(_)));
    }
}
