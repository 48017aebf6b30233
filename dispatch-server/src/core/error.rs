use crate::directory::DirectoryError;
use crate::ledger::LedgerError;
use crate::orders::StorageError;
use thiserror::Error;

/// 启动与运行期错误（HTTP 处理器使用 [`crate::utils::AppError`]）
#[derive(Error, Debug)]
pub enum ServerError {
    #[error("订单存储初始化失败: {0}")]
    Storage(#[from] StorageError),

    #[error("账本初始化失败: {0}")]
    Ledger(#[from] LedgerError),

    #[error("服务商目录初始化失败: {0}")]
    Directory(#[from] DirectoryError),

    #[error("IO 错误: {0}")]
    Io(#[from] std::io::Error),

    #[error("内部服务器错误: {0}")]
    Internal(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, ServerError>;
