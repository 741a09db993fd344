//! Unified error type for gemini-relay.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use thiserror::Error;

/// Errors that can occur while relaying a request to the model.
#[derive(Debug, Error)]
pub enum RelayError {
    /// The upstream API returned an error response.
    #[error("API error ({status}): {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Error message from the API.
        message: String,
    },

    /// A network error occurred.
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration error.
    #[error("Config error: {0}")]
    Config(String),

    /// Invalid argument supplied by the client.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// A payload or uploaded file could not be decoded.
    #[error("Decode error: {0}")]
    Decode(String),

    /// The model answered but produced nothing usable.
    #[error("Generation error: {0}")]
    Generation(String),

    /// A recorded interaction could not be served.
    #[error("Replay error: {0}")]
    Replay(String),

    /// The request body exceeds the configured upload limit.
    #[error("Payload too large: {0}")]
    PayloadTooLarge(String),

    /// A stored image does not exist or its name is not a generated-image name.
    #[error("Not found: {0}")]
    NotFound(String),

    /// No API key configured for the upstream service.
    #[error("No API key for Gemini. Set {env_var} or add it to config file.")]
    MissingApiKey {
        /// The environment variable name.
        env_var: String,
    },
}

impl RelayError {
    /// HTTP status the error maps to at the endpoint boundary.
    #[must_use]
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidArgument(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Whether the error originated from the upstream service.
    #[must_use]
    pub fn is_upstream(&self) -> bool {
        matches!(self, Self::Api { .. } | Self::Network(_) | Self::Replay(_))
    }
}

impl IntoResponse for RelayError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(upstream = self.is_upstream(), "Request failed: {self}");
        } else {
            tracing::debug!("Client error: {self}");
        }

        (status, Json(serde_json::json!({ "error": self.to_string() }))).into_response()
    }
}
