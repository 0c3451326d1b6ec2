use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use tracing::{error, warn};
use utoipa::ToSchema;

use crate::services::{ServiceError, SyncError};

/// JSON body of every error response
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorBody {
    pub error: String,
    /// Business key of the record involved, when there is one
    pub frame_number: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error(transparent)]
    Service(#[from] ServiceError),

    #[error("{0}")]
    Unauthorized(&'static str),

    #[error("{0}")]
    BadRequest(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Service(e) => match e {
                ServiceError::Parse(_) => StatusCode::BAD_REQUEST,
                ServiceError::Validation { .. } => StatusCode::UNPROCESSABLE_ENTITY,
                ServiceError::Sync(SyncError::MissingFrameNumber { .. })
                | ServiceError::Sync(SyncError::InvalidArrivalDate(_)) => {
                    StatusCode::UNPROCESSABLE_ENTITY
                }
                ServiceError::Sync(SyncError::Constraint { .. })
                | ServiceError::Constraint { .. } => StatusCode::CONFLICT,
                ServiceError::NotFound(_) => StatusCode::NOT_FOUND,
                ServiceError::Permission(_) => StatusCode::FORBIDDEN,
                ServiceError::InvalidCredentials => StatusCode::UNAUTHORIZED,
                ServiceError::Sync(SyncError::Store { .. })
                | ServiceError::Export(_)
                | ServiceError::Task(_)
                | ServiceError::Db(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
        }
    }

    fn frame_number(&self) -> Option<String> {
        match self {
            ApiError::Service(e) => e.frame_number().map(str::to_string),
            _ => None,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();

        let message = if status.is_server_error() {
            error!("Request failed: {}", self);
            match &self {
                ApiError::Service(ServiceError::Sync(SyncError::Store {
                    frame_number,
                    committed,
                    ..
                })) => format!(
                    "Failed to store vehicle {frame_number} \
                     ({committed} records were stored before the failure)"
                ),
                _ => "Internal server error".to_string(),
            }
        } else {
            warn!("Request rejected with {}: {}", status, self);
            self.to_string()
        };

        let body = ErrorBody {
            error: message,
            frame_number: self.frame_number(),
        };

        (status, Json(body)).into_response()
    }
}
