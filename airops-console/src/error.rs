use airops_core::CoreError;
use airops_shared::IdParseError;
use tracing::{error, warn};

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Your role may not {0}")]
    Unauthorized(&'static str),
    #[error("'{0}' is not one of the listed choices")]
    InvalidChoice(String),
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("input closed")]
    EndOfInput,
    #[error(transparent)]
    Core(#[from] CoreError),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl From<IdParseError> for AppError {
    fn from(err: IdParseError) -> Self {
        AppError::Core(err.into())
    }
}

impl AppError {
    /// Whether the menu loop can keep going after reporting this error.
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, AppError::EndOfInput | AppError::Io(_))
    }

    /// Text shown at the console. Storage details are logged, not printed.
    pub fn user_message(&self) -> String {
        match self {
            AppError::Unauthorized(action) => format!("Your role may not {}.", action.to_lowercase()),
            AppError::Core(CoreError::NotFound(msg)) => format!("Not found: {}", msg),
            AppError::Core(CoreError::ValidationError(msg)) => format!("Invalid input: {}", msg),
            AppError::Core(CoreError::Conflict(msg)) => {
                warn!("Conflict: {}", msg);
                "The request conflicts with the current data, nothing was saved.".to_string()
            }
            AppError::Core(CoreError::Timeout(msg)) => {
                warn!("Timed out: {}", msg);
                "The flight is busy right now, nothing was saved. Please try again.".to_string()
            }
            AppError::Core(CoreError::StorageError(msg)) => {
                error!("Storage error: {}", msg);
                "The database could not complete the request, nothing was saved.".to_string()
            }
            other => other.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storage_details_stay_out_of_the_console() {
        let err = AppError::from(CoreError::StorageError("connection reset by 10.0.0.7".into()));
        assert!(!err.user_message().contains("10.0.0.7"));
        assert!(err.is_recoverable());
    }

    #[test]
    fn test_id_parse_errors_are_validation_errors() {
        let err: AppError = "abc".parse::<airops_shared::CustomerId>().unwrap_err().into();
        assert!(matches!(err, AppError::Core(CoreError::ValidationError(_))));
        assert!(err.user_message().starts_with("Invalid input"));
    }

    #[test]
    fn test_closed_input_ends_the_loop() {
        assert!(!AppError::EndOfInput.is_recoverable());
        assert!(AppError::InvalidChoice("7".into()).is_recoverable());
    }
}
