use crate::flows::FlowError;
use thiserror::Error;

/// Application-level error types
#[derive(Error, Debug)]
pub enum AppError {
    /// Caller contract violations (negative counts, non-finite money)
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(String),

    /// Not found errors
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// Unauthorized access errors
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Business logic errors
    #[error("Business logic error: {0}")]
    BusinessLogic(String),

    /// External service errors (payment gateway, ad verifier)
    #[error("External service error: {0}")]
    ExternalService(String),

    /// Entry flow step errors
    #[error("Flow error: {0}")]
    Flow(#[from] FlowError),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Generic error with message
    #[error("{0}")]
    Message(String),
}

/// Result type alias for application errors
pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    /// Check if error is a not found error
    pub fn is_not_found(&self) -> bool {
        matches!(self, AppError::NotFound(_))
    }

    /// Check if the user can recover by retrying the action ("Try Again")
    pub fn is_retryable(&self) -> bool {
        matches!(self, AppError::ExternalService(_) | AppError::Flow(_))
    }

    /// Get HTTP status code for the error
    pub fn status_code(&self) -> u16 {
        match self {
            AppError::NotFound(_) => 404,
            AppError::Unauthorized(_) => 401,
            AppError::InvalidArgument(_) | AppError::Validation(_) => 400,
            AppError::BusinessLogic(_) | AppError::Flow(_) => 409,
            AppError::ExternalService(_) => 502,
            _ => 500,
        }
    }
}

/// Repository-specific error types
#[derive(Error, Debug)]
pub enum RepositoryError {
    /// Record not found
    #[error("Record not found: {0}")]
    NotFound(String),

    /// Duplicate record (e.g. a proof redeemed twice)
    #[error("Duplicate record: {0}")]
    Duplicate(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Business rule violation (e.g. ticket limit reached)
    #[error("Business rule violation: {0}")]
    BusinessRule(String),
}

impl From<RepositoryError> for AppError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound(msg) => AppError::NotFound(msg),
            RepositoryError::Duplicate(msg) => AppError::BusinessLogic(format!("Duplicate: {}", msg)),
            RepositoryError::InvalidInput(msg) => AppError::Validation(msg),
            RepositoryError::BusinessRule(msg) => AppError::BusinessLogic(msg),
        }
    }
}

/// Result type for repository operations
pub type RepositoryResult<T> = Result<T, RepositoryError>;

/// Convenience function to convert Option<T> to Result<T, AppError>
pub fn option_to_result<T>(opt: Option<T>, error_msg: &str) -> AppResult<T> {
    opt.ok_or_else(|| AppError::NotFound(error_msg.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(AppError::InvalidArgument("x".into()).status_code(), 400);
        assert_eq!(AppError::NotFound("x".into()).status_code(), 404);
        assert_eq!(AppError::ExternalService("x".into()).status_code(), 502);
        assert_eq!(AppError::Config("x".into()).status_code(), 500);
    }

    #[test]
    fn test_repository_error_mapping() {
        let err: AppError = RepositoryError::BusinessRule("limit".into()).into();
        assert!(matches!(err, AppError::BusinessLogic(_)));
        let err: AppError = RepositoryError::NotFound("instance".into()).into();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_option_to_result() {
        let missing: Option<u32> = None;
        let err = option_to_result(missing, "lottery type daily_pi").unwrap_err();
        assert!(err.is_not_found());
        assert!(err.to_string().contains("daily_pi"));
    }
}
