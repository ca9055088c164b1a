//! 推送调度错误类型
//!
//! 定义请求校验、目标筛选和渠道发送等场景的错误分类。
//! 校验类错误在任何副作用之前同步返回；渠道发送错误被吸收进
//! 聚合结果，不会作为错误向上抛出。

use thiserror::Error;

#[derive(Debug, Error)]
pub enum DispatchError {
    /// 请求字段缺失或非法，在触达缓存和渠道之前被拒绝
    #[error("通知请求无效: {field} - {message}")]
    InvalidRequest { field: String, message: String },

    /// 过滤后没有任何可用的设备令牌，不产生副作用
    #[error("没有可用的推送目标令牌")]
    NoValidTargets,

    /// 单个令牌的渠道发送失败，仅由适配器内部使用，
    /// 调度器将其吸收进结果计数而不是向调用方抛出
    #[error("渠道发送失败: token={token}, 原因={reason}")]
    ChannelSend { token: String, reason: String },

    #[error(transparent)]
    Shared(#[from] aqua_shared::error::AquaError),
}

impl DispatchError {
    /// 构造字段校验错误
    pub fn invalid(field: &str, message: &str) -> Self {
        Self::InvalidRequest {
            field: field.to_string(),
            message: message.to_string(),
        }
    }
}
