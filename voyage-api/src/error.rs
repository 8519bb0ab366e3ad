use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{json, Value};
use voyage_booking::{DraftError, EngineError};
use voyage_core::CoreError;

#[derive(Debug)]
pub enum AppError {
    BadRequest(String),
    /// The request was understood but the selection cannot proceed.
    Unprocessable(String, Option<Value>),
    NotFoundError(String),
    ConflictError(String, Option<Value>),
    InternalServerError(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message, details) = match self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg, None),
            AppError::Unprocessable(msg, details) => (StatusCode::UNPROCESSABLE_ENTITY, msg, details),
            AppError::NotFoundError(msg) => (StatusCode::NOT_FOUND, msg, None),
            AppError::ConflictError(msg, details) => (StatusCode::CONFLICT, msg, details),
            AppError::InternalServerError(msg) => {
                tracing::error!("Internal Server Error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error".to_string(), None)
            }
        };

        let mut body = json!({
            "error": error_message,
        });
        if let Some(details) = details {
            body["details"] = details;
        }

        (status, Json(body)).into_response()
    }
}

impl From<DraftError> for AppError {
    fn from(err: DraftError) -> Self {
        match err {
            DraftError::TripMismatch(_) => AppError::ConflictError(err.to_string(), None),
            _ => AppError::Unprocessable(err.to_string(), None),
        }
    }
}

impl From<CoreError> for AppError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::ValidationError(msg) => AppError::BadRequest(msg),
            CoreError::NotFound(msg) => AppError::NotFoundError(msg),
            CoreError::CapacityExceeded { trip_id, requested, remaining } => AppError::ConflictError(
                err.to_string(),
                Some(json!({
                    "trip_id": trip_id,
                    "requested": requested,
                    "remaining": remaining,
                })),
            ),
            CoreError::StorageError(_) | CoreError::EventError(_) | CoreError::InternalError(_) => {
                AppError::InternalServerError(err.to_string())
            }
        }
    }
}

impl From<EngineError> for AppError {
    fn from(err: EngineError) -> Self {
        match err {
            EngineError::Validation(e) => {
                let details = serde_json::to_value(&e).ok();
                AppError::Unprocessable(e.to_string(), details)
            }
            EngineError::Draft(e) => e.into(),
            EngineError::Core(e) => e.into(),
            EngineError::PackageNotFound(_)
            | EngineError::OptionNotFound(_)
            | EngineError::TripNotFound(_) => AppError::NotFoundError(err.to_string()),
        }
    }
}
