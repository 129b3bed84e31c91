use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use oj_core::EngineError;
use serde::Serialize;

/// The HTTP surface's single error type. Every handler returns
/// `Result<_, ApiError>`; `IntoResponse` maps it to a status code and a
/// `{"error": "<kind>", "message": "<detail>"}` body.
pub struct ApiError {
    status: StatusCode,
    kind: String,
    message: String,
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
    message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        tracing::warn!(kind = %self.kind, message = %self.message, "request failed");
        (self.status, Json(ErrorBody { error: self.kind, message: self.message })).into_response()
    }
}

impl From<EngineError> for ApiError {
    fn from(err: EngineError) -> Self {
        let status = match &err {
            EngineError::AlreadyRunning => StatusCode::CONFLICT,
            EngineError::NotFound => StatusCode::NOT_FOUND,
            EngineError::InputInvalid(_) => StatusCode::BAD_REQUEST,
        };
        Self { status, kind: err.kind().to_string(), message: err.to_string() }
    }
}

impl ApiError {
    pub fn not_found(message: impl Into<String>) -> Self {
        Self { status: StatusCode::NOT_FOUND, kind: "not_found".to_string(), message: message.into() }
    }
}
