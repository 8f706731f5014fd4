use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

#[derive(Debug)]
pub enum AppError {
    InternalServerError(String),
    BadRequest(String),
    NotFound(String),
    Validation(Vec<String>),
}

impl AppError {
    pub fn storage(context: &str, error: sqlx::Error) -> Self {
        tracing::error!("{context}: {error:?}");
        AppError::InternalServerError(context.to_string())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message, errors) = match self {
            AppError::InternalServerError(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg, None),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg, None),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg, None),
            AppError::Validation(messages) => (
                StatusCode::BAD_REQUEST,
                "Validation error".to_string(),
                Some(messages),
            ),
        };

        // Standardized failure response matching ApiResponse structure
        let body = Json(json!({
            "success": false,
            "message": error_message,
            "errors": errors,
            "data": null
        }));

        (status, body).into_response()
    }
}
