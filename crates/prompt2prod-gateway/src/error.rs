//! External error taxonomy and its HTTP rendering

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;
use tracing::error;

use prompt2prod_core::UpstreamFailure;

use crate::protocol::ErrorBody;

/// Upstream bodies longer than this are cut before being echoed to callers
pub const MAX_UPSTREAM_DETAIL_BYTES: usize = 4096;

#[derive(Debug, Error)]
pub enum ApiError {
    /// Request body failed decoding; nothing was sent upstream
    #[error("{0}")]
    Validation(String),

    #[error("Request body too large")]
    PayloadTooLarge,

    #[error("LLM timeout")]
    UpstreamTimeout,

    /// Upstream answered non-2xx; its status is propagated
    #[error("LLM error: {body}")]
    UpstreamHttp { status: u16, body: String },

    /// Full description is logged, never returned
    #[error("Unexpected error: upstream request failed")]
    Unexpected { description: String },
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            Self::UpstreamTimeout => StatusCode::GATEWAY_TIMEOUT,
            Self::UpstreamHttp { status, .. } => {
                StatusCode::from_u16(*status).unwrap_or(StatusCode::BAD_GATEWAY)
            }
            Self::Unexpected { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<UpstreamFailure> for ApiError {
    fn from(failure: UpstreamFailure) -> Self {
        match failure {
            UpstreamFailure::Timeout => Self::UpstreamTimeout,
            UpstreamFailure::Http { status, body } => Self::UpstreamHttp {
                status,
                body: truncate_detail(body),
            },
            UpstreamFailure::Unexpected { description } => Self::Unexpected { description },
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
            return Self::PayloadTooLarge;
        }
        Self::Validation(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if let Self::Unexpected { description } = &self {
            error!("Unexpected error while generating: {}", description);
        }
        let status = self.status();
        let body = ErrorBody {
            detail: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

/// Cut to at most [`MAX_UPSTREAM_DETAIL_BYTES`] on a char boundary
fn truncate_detail(mut body: String) -> String {
    if body.len() > MAX_UPSTREAM_DETAIL_BYTES {
        let mut end = MAX_UPSTREAM_DETAIL_BYTES;
        while !body.is_char_boundary(end) {
            end -= 1;
        }
        body.truncate(end);
        body.push_str("...");
    }
    body
}
