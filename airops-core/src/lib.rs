pub mod allocator;
pub mod flight;
pub mod identity;
pub mod maintenance;
pub mod repository;
pub mod reservation;

pub use allocator::SeatAllocator;
pub use maintenance::MaintenanceDesk;

use airops_shared::IdParseError;

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Conflict: {0}")]
    Conflict(String),
    #[error("Storage error: {0}")]
    StorageError(String),
    #[error("Timed out: {0}")]
    Timeout(String),
    #[error("Validation failed: {0}")]
    ValidationError(String),
}

impl From<IdParseError> for CoreError {
    fn from(err: IdParseError) -> Self {
        CoreError::ValidationError(err.to_string())
    }
}

pub type CoreResult<T> = Result<T, CoreError>;
