// Error handling for the gateway
//
// This module defines the route-level error type and how each variant maps to
// an HTTP status. Every error body has the shape `{"detail": "<message>"}`.

use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use thiserror::Error;

use crate::metrics::MetricsError;
use crate::models::ErrorResponse;
use crate::upstream::UpstreamError;

/// Errors surfaced by the route handlers
#[derive(Error, Debug)]
pub enum GatewayError {
    /// Missing or wrong API key
    #[error("Could not validate API key")]
    Forbidden,

    /// The metadata provider returned no item for the video
    #[error("Video not found")]
    VideoNotFound,

    /// Missing or malformed query parameter
    #[error("{0}")]
    InvalidRequest(String),

    /// Any other adapter failure
    #[error("{0}")]
    Upstream(UpstreamError),

    #[error("Failed to export metrics: {0}")]
    Metrics(#[from] MetricsError),
}

impl GatewayError {
    pub fn invalid_request<S: Into<String>>(msg: S) -> Self {
        Self::InvalidRequest(msg.into())
    }
}

impl From<UpstreamError> for GatewayError {
    fn from(err: UpstreamError) -> Self {
        match err {
            UpstreamError::VideoNotFound(_) => GatewayError::VideoNotFound,
            other => GatewayError::Upstream(other),
        }
    }
}

impl ResponseError for GatewayError {
    fn status_code(&self) -> StatusCode {
        match self {
            GatewayError::Forbidden => StatusCode::FORBIDDEN,
            GatewayError::VideoNotFound => StatusCode::NOT_FOUND,
            GatewayError::InvalidRequest(_) => StatusCode::UNPROCESSABLE_ENTITY,
            GatewayError::Upstream(_) | GatewayError::Metrics(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(ErrorResponse {
            detail: self.to_string(),
        })
    }
}
