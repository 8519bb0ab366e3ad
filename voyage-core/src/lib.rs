pub mod repository;

use uuid::Uuid;

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Validation failed: {0}")]
    ValidationError(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Trip {trip_id} has {remaining} seats left, {requested} requested")]
    CapacityExceeded {
        trip_id: Uuid,
        requested: u32,
        remaining: u32,
    },
    #[error("Storage error: {0}")]
    StorageError(String),
    #[error("Event publishing failed: {0}")]
    EventError(String),
    #[error("Internal service error: {0}")]
    InternalError(String),
}

pub type CoreResult<T> = Result<T, CoreError>;
