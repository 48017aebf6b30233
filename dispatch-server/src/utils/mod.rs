//! 工具模块 - 通用工具函数和类型
//!
//! - [`AppError`] / [`AppResult`] - HTTP 层错误类型
//! - 日志初始化

pub mod error;
pub mod logger;
pub mod result;

pub use error::AppError;
pub use result::AppResult;
