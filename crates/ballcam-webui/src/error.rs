use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use ballcam_esc::EscError;
use ballcam_vision::SampleError;
use serde_json::json;

/// Errors returned by the HTTP handlers, rendered as `{"error": "..."}`.
#[derive(Debug)]
pub enum ApiError {
    Sample(SampleError),
    Esc(EscError),
    BadRequest(String),
    Internal(anyhow::Error),
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::Sample(SampleError::NoFrameAvailable) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Sample(SampleError::OutOfBounds { .. }) => StatusCode::BAD_REQUEST,
            ApiError::Esc(EscError::InvalidPulse(_)) => StatusCode::BAD_REQUEST,
            ApiError::Esc(_) => StatusCode::BAD_GATEWAY,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn message(&self) -> String {
        match self {
            ApiError::Sample(err) => err.to_string(),
            ApiError::Esc(err) => err.to_string(),
            ApiError::BadRequest(msg) => msg.clone(),
            ApiError::Internal(err) => format!("{:#}", err),
        }
    }
}

impl From<SampleError> for ApiError {
    fn from(err: SampleError) -> Self {
        ApiError::Sample(err)
    }
}

impl From<EscError> for ApiError {
    fn from(err: EscError) -> Self {
        ApiError::Esc(err)
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        ApiError::Internal(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!("Request failed: {}", self.message());
        }
        (status, Json(json!({ "error": self.message() }))).into_response()
    }
}
