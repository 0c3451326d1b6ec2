use thiserror::Error;

use crate::auth::Role;
use crate::db::{DbError, FieldError};
use crate::importers::SheetError;
use crate::services::record_sync::SyncError;

/// Failures surfaced by the service layer
#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("Unreadable spreadsheet: {0}")]
    Parse(#[from] SheetError),

    #[error(transparent)]
    Sync(#[from] SyncError),

    #[error("{message}")]
    Validation {
        frame_number: Option<String>,
        message: String,
    },

    #[error("Vehicle {frame_number} was rejected: {message}")]
    Constraint {
        frame_number: String,
        message: String,
    },

    #[error("Vehicle {0} not found")]
    NotFound(String),

    #[error("The {0} role cannot modify records")]
    Permission(Role),

    #[error("Invalid login or password")]
    InvalidCredentials,

    #[error("Failed to write spreadsheet: {0}")]
    Export(#[from] rust_xlsxwriter::XlsxError),

    #[error("Background task failed: {0}")]
    Task(#[from] tokio::task::JoinError),

    #[error(transparent)]
    Db(DbError),
}

impl ServiceError {
    pub fn validation(frame_number: Option<&str>, message: impl Into<String>) -> Self {
        ServiceError::Validation {
            frame_number: frame_number.map(str::to_string),
            message: message.into(),
        }
    }

    pub fn invalid_field(frame_number: Option<&str>, err: FieldError) -> Self {
        Self::validation(frame_number, err.to_string())
    }

    /// Frame number of the offending record, when known
    pub fn frame_number(&self) -> Option<&str> {
        match self {
            ServiceError::Sync(e) => e.frame_number(),
            ServiceError::Validation { frame_number, .. } => frame_number.as_deref(),
            ServiceError::Constraint { frame_number, .. } => Some(frame_number),
            ServiceError::NotFound(frame_number) => Some(frame_number),
            _ => None,
        }
    }
}

impl From<DbError> for ServiceError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::Duplicate(frame_number) => ServiceError::Constraint {
                frame_number,
                message: "frame number already exists".to_string(),
            },
            DbError::Rejected { key, message } => ServiceError::Constraint {
                frame_number: key,
                message,
            },
            DbError::NotFound(frame_number) => ServiceError::NotFound(frame_number),
            other => ServiceError::Db(other),
        }
    }
}

/// Gate for every mutating operation
pub fn ensure_can_write(role: Role) -> Result<(), ServiceError> {
    if role.can_write() {
        Ok(())
    } else {
        Err(ServiceError::Permission(role))
    }
}
