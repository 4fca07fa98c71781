//! Error kinds surfaced by the scoreboard core.

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};

/// Result type for game operations
pub type GameResult<T> = Result<T, GameError>;

/// Errors that can occur while loading words or applying a transition.
///
/// Every transition checks its preconditions before touching state, so an
/// `Err` means nothing was mutated or persisted.
#[derive(Debug, Clone, thiserror::Error, PartialEq)]
pub enum GameError {
    #[error("{0}")]
    SourceUnavailable(String),

    #[error("Invalid word index")]
    InvalidIndex,

    #[error("Steal limit reached for this round")]
    StealLimitExceeded,

    #[error("{0}")]
    InvalidInput(String),

    #[error("{0}")]
    InvalidMediaType(String),

    #[error("Failed to save state: {0}")]
    Storage(String),
}

impl GameError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            GameError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
            _ => StatusCode::BAD_REQUEST,
        }
    }
}

impl From<JsonRejection> for GameError {
    fn from(rejection: JsonRejection) -> Self {
        GameError::InvalidInput(rejection.body_text())
    }
}

impl IntoResponse for GameError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!("{}", self);
        } else {
            tracing::debug!("Rejected request: {}", self);
        }
        (status, Json(serde_json::json!({ "error": self.to_string() }))).into_response()
    }
}
