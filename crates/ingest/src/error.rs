use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use otell_core::error::OtellError;
use serde_json::json;

/// Wraps `OtellError` so the HTTP surface can implement `IntoResponse`
/// without pulling axum into `otell-core`.
pub struct ApiError(pub OtellError);

impl From<OtellError> for ApiError {
    fn from(err: OtellError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            OtellError::MalformedBody(_) => StatusCode::BAD_REQUEST,
            OtellError::NotFound(_) => StatusCode::NOT_FOUND,
            OtellError::Backend(_) => StatusCode::INTERNAL_SERVER_ERROR,
            OtellError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(json!({ "status": "error", "message": self.0.to_string() }))).into_response()
    }
}
