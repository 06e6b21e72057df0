//! Error handling

use axum::{
    extract::multipart::MultipartError,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use agrimen_core::{AlignError, ServingError};

pub type AppResult<T> = Result<T, AppError>;

#[derive(Debug, Error)]
pub enum AppError {
    // Resource errors
    #[error("not found: {0}")]
    NotFound(String),

    // Input errors
    #[error("bad request: {0}")]
    BadRequest(String),
    #[error("unprocessable input: {0}")]
    Unprocessable(String),
    #[error("payload too large: {0}")]
    PayloadTooLarge(String),

    // Validation errors
    #[error("validation failed: {0}")]
    ValidationError(String),

    // Model errors (artifacts or predictor misbehaving)
    #[error("model error: {0}")]
    ModelError(String),

    // Generic errors
    #[error("internal error: {0}")]
    InternalError(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match &self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.as_str()),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.as_str()),
            AppError::Unprocessable(msg) => (StatusCode::UNPROCESSABLE_ENTITY, msg.as_str()),
            AppError::PayloadTooLarge(msg) => (StatusCode::PAYLOAD_TOO_LARGE, msg.as_str()),
            AppError::ValidationError(msg) => (StatusCode::BAD_REQUEST, msg.as_str()),
            AppError::ModelError(_) => {
                tracing::error!("{}", self);
                (StatusCode::INTERNAL_SERVER_ERROR, "Model error occurred")
            }
            AppError::InternalError(_) => {
                tracing::error!("{}", self);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
            }
        };

        let body = Json(json!({
            "error": error_message,
            "status": status.as_u16()
        }));

        (status, body).into_response()
    }
}

impl From<ServingError> for AppError {
    fn from(err: ServingError) -> Self {
        match &err {
            ServingError::UnknownModel(name) => AppError::NotFound(format!("Model '{}' not found", name)),
            ServingError::Align(align) => match align.root() {
                AlignError::MissingColumns(_) => AppError::BadRequest(err.to_string()),
                AlignError::UnknownCategory { .. } | AlignError::InvalidNumber { .. } | AlignError::Row { .. } => {
                    AppError::Unprocessable(err.to_string())
                }
            },
            ServingError::Table(_) => AppError::BadRequest(err.to_string()),
            ServingError::Inference(_) | ServingError::Artifact(_) => AppError::ModelError(err.to_string()),
        }
    }
}

impl From<MultipartError> for AppError {
    fn from(err: MultipartError) -> Self {
        if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
            AppError::PayloadTooLarge(err.body_text())
        } else {
            AppError::BadRequest(err.body_text())
        }
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(err: validator::ValidationErrors) -> Self {
        AppError::ValidationError(err.to_string())
    }
}

impl From<tokio::task::JoinError> for AppError {
    fn from(err: tokio::task::JoinError) -> Self {
        AppError::InternalError(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use agrimen_core::InferenceError;

    fn status_of(err: ServingError) -> StatusCode {
        AppError::from(err).into_response().status()
    }

    #[test]
    fn test_status_mapping() {
        assert_eq!(status_of(ServingError::UnknownModel("x".into())), StatusCode::NOT_FOUND);
        assert_eq!(
            status_of(AlignError::MissingColumns(vec!["Pesticide".into()]).into()),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_of(AlignError::UnknownCategory { column: "Crop".into(), value: "Barley".into() }.into()),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            status_of(InferenceError::ShapeMismatch { expected: 7, actual: 6 }.into()),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_row_error_maps_by_root() {
        let err = AlignError::Row {
            row: 3,
            source: Box::new(AlignError::InvalidNumber { column: "Area".into(), value: "abc".into() }),
        };
        assert_eq!(status_of(err.into()), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[test]
    fn test_display_keeps_detail() {
        let err = AppError::from(ServingError::from(InferenceError::ShapeMismatch { expected: 7, actual: 6 }));
        assert!(matches!(err, AppError::ModelError(_)));
        assert!(err.to_string().starts_with("model error: "));
        assert!(err.to_string().contains('7'));

        let err = AppError::NotFound("Model 'x' not found".into());
        assert_eq!(err.to_string(), "not found: Model 'x' not found");
    }
}
