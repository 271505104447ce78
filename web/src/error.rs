//! HTTP error mapping.
//!
//! Supervisor and storage failures become an [`AppError`], which renders as
//! `{"code": "...", "message": "..."}` with the matching status.

use crate::config_store::ConfigStoreError;
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use std::fmt;
use ticket_pool_runtime::SupervisorError;

/// Stable machine-readable error codes sent to clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Rejected configuration or worker parameters
    ValidationError,
    /// Live-pool operation while no simulation runs
    NotStarted,
    /// Lifecycle change refused while a simulation runs
    AlreadyRunning,
    /// Requested resource does not exist
    NotFound,
    /// Server-side failure
    InternalServerError,
}

impl ErrorCode {
    /// HTTP status sent with this code.
    #[must_use]
    pub const fn status(self) -> StatusCode {
        match self {
            Self::ValidationError => StatusCode::UNPROCESSABLE_ENTITY,
            Self::NotStarted | Self::AlreadyRunning => StatusCode::CONFLICT,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::InternalServerError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Wire name of the code.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ValidationError => "VALIDATION_ERROR",
            Self::NotStarted => "NOT_STARTED",
            Self::AlreadyRunning => "ALREADY_RUNNING",
            Self::NotFound => "NOT_FOUND",
            Self::InternalServerError => "INTERNAL_SERVER_ERROR",
        }
    }
}

/// Error returned by handlers.
///
/// The cause, when there is one, is logged and never sent to the client.
///
/// ```ignore
/// async fn start(State(state): State<AppState>) -> Result<String, AppError> {
///     Ok(state.supervisor.start().await?)
/// }
/// ```
#[derive(Debug)]
pub struct AppError {
    code: ErrorCode,
    message: String,
    cause: Option<anyhow::Error>,
}

impl AppError {
    /// Error with the given code and user-facing message.
    #[must_use]
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            cause: None,
        }
    }

    /// 404 with `NOT_FOUND`.
    #[must_use]
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::NotFound, message)
    }

    /// Attach an internal cause for logging.
    #[must_use]
    pub fn caused_by(mut self, cause: impl Into<anyhow::Error>) -> Self {
        self.cause = Some(cause.into());
        self
    }

    /// Client-facing error code.
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        self.code
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code.as_str(), self.message)
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.cause
            .as_ref()
            .map(|cause| &**cause as &(dyn std::error::Error + 'static))
    }
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    code: ErrorCode,
    message: &'a str,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.code.status();
        match &self.cause {
            Some(cause) => tracing::error!(%status, message = %self.message, error = %cause, "Request failed"),
            None if status.is_server_error() => tracing::error!(%status, message = %self.message, "Request failed"),
            None => tracing::debug!(%status, code = self.code.as_str(), "Request rejected"),
        }

        let body = ErrorBody {
            code: self.code,
            message: &self.message,
        };
        (status, Json(body)).into_response()
    }
}

impl From<SupervisorError> for AppError {
    fn from(err: SupervisorError) -> Self {
        let code = match err {
            SupervisorError::Validation(_) => ErrorCode::ValidationError,
            SupervisorError::NotStarted => ErrorCode::NotStarted,
            SupervisorError::AlreadyRunning => ErrorCode::AlreadyRunning,
        };
        let message = match &err {
            SupervisorError::Validation(inner) => inner.to_string(),
            other => other.to_string(),
        };
        Self::new(code, message)
    }
}

impl From<ConfigStoreError> for AppError {
    fn from(err: ConfigStoreError) -> Self {
        Self::new(ErrorCode::InternalServerError, "Failed to persist configuration").caused_by(err)
    }
}
