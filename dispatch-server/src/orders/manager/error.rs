use super::super::storage::StorageError;
use crate::directory::DirectoryError;
use crate::ledger::LedgerError;
use crate::utils::AppError;
use shared::ErrorCode;
use thiserror::Error;

/// Manager errors
#[derive(Debug, Error)]
pub enum ManagerError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Order not found: {0}")]
    OrderNotFound(String),

    #[error("No providers available for order: {0}")]
    NoProvidersAvailable(String),

    #[error("Provider {provider_id} is not assigned to order {order_id}")]
    PermissionDenied {
        order_id: String,
        provider_id: String,
    },

    #[error("Failed precondition: {0}")]
    FailedPrecondition(String),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Provider directory error: {0}")]
    Directory(#[from] DirectoryError),

    #[error("Ledger error: {0}")]
    Ledger(#[from] LedgerError),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ManagerError {
    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }

    /// Classify into the API error taxonomy
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::InvalidArgument(_) => ErrorCode::InvalidArgument,
            Self::OrderNotFound(_) | Self::NoProvidersAvailable(_) => ErrorCode::NotFound,
            Self::PermissionDenied { .. } => ErrorCode::PermissionDenied,
            Self::FailedPrecondition(_) => ErrorCode::FailedPrecondition,
            Self::Storage(e) => classify_storage_error(e),
            Self::Directory(_) | Self::Ledger(_) | Self::Internal(_) => ErrorCode::Internal,
        }
    }
}

/// Only a missing order is caller-visible; other storage failures are internal
fn classify_storage_error(e: &StorageError) -> ErrorCode {
    match e {
        StorageError::OrderNotFound(_) => ErrorCode::NotFound,
        _ => ErrorCode::Internal,
    }
}

impl From<ManagerError> for AppError {
    fn from(err: ManagerError) -> Self {
        match err.code() {
            ErrorCode::InvalidArgument => AppError::Validation(err.to_string()),
            ErrorCode::NotFound => AppError::NotFound(err.to_string()),
            ErrorCode::PermissionDenied => AppError::Forbidden(err.to_string()),
            ErrorCode::FailedPrecondition => AppError::FailedPrecondition(err.to_string()),
            ErrorCode::Internal => {
                tracing::error!(error = %err, "Order operation failed");
                AppError::Internal(err.to_string())
            }
        }
    }
}

pub type ManagerResult<T> = Result<T, ManagerError>;
