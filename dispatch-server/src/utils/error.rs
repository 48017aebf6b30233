//! 统一错误处理
//!
//! [`AppError`] 是 HTTP 层的错误类型，实现 axum `IntoResponse`。
//!
//! # 状态码
//!
//! | 变体 | HTTP | code |
//! |------|------|------|
//! | Validation | 400 | INVALID_ARGUMENT |
//! | NotFound | 404 | NOT_FOUND |
//! | Forbidden | 403 | PERMISSION_DENIED |
//! | FailedPrecondition | 412 | FAILED_PRECONDITION |
//! | Internal | 500 | INTERNAL |

use axum::{
    Json,
    response::{IntoResponse, Response},
};
use shared::ErrorCode;
use shared::error::ErrorBody;
use tracing::error;

/// 应用错误枚举
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Validation failed: {0}")]
    /// 参数错误 (400)
    Validation(String),

    #[error("Resource not found: {0}")]
    /// 资源不存在 (404)
    NotFound(String),

    #[error("Permission denied: {0}")]
    /// 无权限 (403)
    Forbidden(String),

    #[error("Failed precondition: {0}")]
    /// 状态不允许 (412)
    FailedPrecondition(String),

    #[error("Internal server error: {0}")]
    /// 内部错误 (500)
    Internal(String),
}

impl AppError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    pub fn code(&self) -> ErrorCode {
        match self {
            AppError::Validation(_) => ErrorCode::InvalidArgument,
            AppError::NotFound(_) => ErrorCode::NotFound,
            AppError::Forbidden(_) => ErrorCode::PermissionDenied,
            AppError::FailedPrecondition(_) => ErrorCode::FailedPrecondition,
            AppError::Internal(_) => ErrorCode::Internal,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let code = self.code();
        let message = match self {
            AppError::Validation(msg)
            | AppError::NotFound(msg)
            | AppError::Forbidden(msg)
            | AppError::FailedPrecondition(msg) => msg,
            AppError::Internal(msg) => {
                // 细节仅写入日志
                error!(target: "internal", error = %msg, "Internal error occurred");
                "Internal server error".to_string()
            }
        };

        (code.status_code(), Json(ErrorBody { code, message })).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;

    #[test]
    fn test_status_mapping() {
        let cases = [
            (AppError::validation("x"), StatusCode::BAD_REQUEST),
            (AppError::not_found("x"), StatusCode::NOT_FOUND),
            (AppError::Forbidden("x".into()), StatusCode::FORBIDDEN),
            (
                AppError::FailedPrecondition("x".into()),
                StatusCode::PRECONDITION_FAILED,
            ),
            (AppError::internal("x"), StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (err, status) in cases {
            assert_eq!(err.into_response().status(), status);
        }
    }
}
