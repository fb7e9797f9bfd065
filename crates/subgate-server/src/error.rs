//! API error type and HTTP status mapping.

use axum::Json;
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use subgate_render::RenderError;
use subgate_store::StoreError;

/// Error surfaced to HTTP clients.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Token unknown or subscription disabled. Deliberately the same
    /// status either way, so tokens cannot be probed.
    #[error("invalid or disabled token")]
    Forbidden,

    /// Admin credential mismatch.
    #[error("invalid credentials")]
    Unauthorized,

    #[error("customer not found")]
    NotFound,

    #[error("token already exists")]
    Conflict,

    #[error("{0}")]
    BadRequest(String),

    /// The store could not be locked within its configured bound.
    #[error("store busy")]
    Busy,

    #[error("internal server error")]
    Internal,
}

impl ApiError {
    pub(crate) fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Forbidden => StatusCode::FORBIDDEN,
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::NotFound => StatusCode::NOT_FOUND,
            ApiError::Conflict => StatusCode::CONFLICT,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Busy => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound => ApiError::NotFound,
            StoreError::Conflict => ApiError::Conflict,
            StoreError::EmptyOverride => ApiError::BadRequest(e.to_string()),
            StoreError::Busy => ApiError::Busy,
            StoreError::Io(_) | StoreError::Serialize(_) => {
                tracing::error!(error = %e, "store failure");
                ApiError::Internal
            }
        }
    }
}

impl From<RenderError> for ApiError {
    fn from(e: RenderError) -> Self {
        match e {
            RenderError::NoRenderableProxy => ApiError::BadRequest(e.to_string()),
            RenderError::Yaml(_) => {
                tracing::error!(error = %e, "render failure");
                ApiError::Internal
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = Json(serde_json::json!({ "error": self.to_string() }));
        if matches!(self, ApiError::Unauthorized) {
            (status, [(header::WWW_AUTHENTICATE, "Basic")], body).into_response()
        } else {
            (status, body).into_response()
        }
    }
}
