//! 工具模块
//!
//! - [`error`] - 统一错误类型和响应结构
//! - [`logger`] - tracing 日志初始化

pub mod error;
pub mod logger;

pub use error::{AppError, AppResponse};

/// 处理器的 Result 类型别名
pub type AppResult<T> = Result<T, AppError>;
