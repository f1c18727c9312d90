use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use sea_orm::DbErr;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Failures of a single task operation.
#[derive(Error, Debug)]
pub enum TaskError {
    /// The request failed validation and never reached the store.
    #[error("{0}")]
    InvalidInput(String),

    /// No row has this id. Holds the id as the caller wrote it, so ids that
    /// are not integers report the same way as ids with no row.
    #[error("Task {0} not found.")]
    NotFound(String),

    /// The store could not be reached or the statement failed.
    #[error("Store unavailable: {0}")]
    StoreUnavailable(#[from] DbErr),
}

pub type TaskResult<T> = Result<T, TaskError>;

/// JSON body carried by every non-success response and by the update acknowledgment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageBody {
    pub message: String,
}

impl MessageBody {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl TaskError {
    pub fn status(&self) -> StatusCode {
        match self {
            TaskError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            TaskError::NotFound(_) => StatusCode::NOT_FOUND,
            TaskError::StoreUnavailable(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for TaskError {
    fn into_response(self) -> Response {
        // Store errors are logged by the handler; the client only gets a generic message.
        let message = match &self {
            TaskError::StoreUnavailable(_) => "Task store is unavailable.".to_string(),
            other => other.to_string(),
        };
        (self.status(), Json(MessageBody::new(message))).into_response()
    }
}
