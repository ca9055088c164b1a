//! 订单日志修复错误类型
//!
//! 存储读写失败按配送员粒度隔离：批量处理时单个配送员的错误被记录
//! 进汇总结果，不会中断其他配送员的修复。

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ReconcileError {
    #[error("配送员未找到: id={id}")]
    CourierNotFound { id: String },

    #[error("存储操作失败: {operation} - {message}")]
    Store { operation: String, message: String },

    #[error(transparent)]
    Shared(#[from] aqua_shared::error::AquaError),
}

impl ReconcileError {
    /// 构造存储错误
    pub fn store(operation: &str, message: impl Into<String>) -> Self {
        Self::Store {
            operation: operation.to_string(),
            message: message.into(),
        }
    }

    /// 是否为可重试错误
    ///
    /// 存储的瞬时故障可以重试，配送员不存在重试无意义。
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Store { .. } => true,
            Self::CourierNotFound { .. } => false,
            Self::Shared(e) => e.is_retryable(),
        }
    }
}
