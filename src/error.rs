/// Unified error types for the gallery token tool
use thiserror::Error;

/// Main error type for token store, backup, issuing and report operations
#[derive(Error, Debug)]
pub enum GalleryError {
    /// Operator input or configuration that failed validation
    #[error("Validation error: {0}")]
    Validation(String),

    /// Unknown token id or missing file
    #[error("Not found: {0}")]
    NotFound(String),

    /// Serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Operator pressed Ctrl-C or closed the input stream
    #[error("Operation cancelled by operator")]
    Interrupted,
}

impl GalleryError {
    /// Whether the menu shell should re-prompt instead of aborting the operation
    pub fn is_retryable(&self) -> bool {
        matches!(self, GalleryError::Validation(_))
    }
}

/// Result type alias for gallery operations
pub type GalleryResult<T> = Result<T, GalleryError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_is_retryable() {
        assert!(GalleryError::Validation("bad".to_string()).is_retryable());
        assert!(!GalleryError::NotFound("abc".to_string()).is_retryable());
        assert!(!GalleryError::Interrupted.is_retryable());
    }

    #[test]
    fn test_io_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "nope");
        let err: GalleryError = io.into();
        assert!(err.to_string().starts_with("IO error"));
    }
}
