//! 推送渠道适配器
//!
//! 通过 `ChannelAdapter` trait 抽象"向单个设备令牌发送一条消息"的能力，
//! 具体的推送服务商（Expo、FCM 等）各自提供实现。核心只要求适配器
//! 报告按令牌粒度的成功或失败，不关心底层协议。
//!
//! 当前内置的 [`LoggingChannelAdapter`] 为模拟发送（仅记录日志），便于在
//! 无外部依赖的情况下验证调度管道的完整性。接入真实 SDK 时只需实现
//! 同一 trait。

use std::collections::HashMap;

use async_trait::async_trait;
use tracing::info;
use uuid::Uuid;

use crate::error::DispatchError;

/// 发送给单个令牌的消息
///
/// `data` 中的每个值都已是字符串——载荷的字符串化由核心在构造
/// [`crate::request::PushPayload`] 时完成，适配器无需再做类型转换。
#[derive(Debug, Clone)]
pub struct PushMessage {
    pub title: String,
    pub body: String,
    pub data: HashMap<String, String>,
}

/// 单令牌发送回执
///
/// 统一记录发送状态，调度器汇总后决定是否提交去重记录。
#[derive(Debug, Clone)]
pub struct SendReceipt {
    pub ok: bool,
    /// 推送服务商返回的消息标识，用于追踪投递状态
    pub message_id: Option<String>,
    pub error: Option<String>,
}

impl SendReceipt {
    /// 投递成功的回执
    pub fn delivered(message_id: impl Into<String>) -> Self {
        Self {
            ok: true,
            message_id: Some(message_id.into()),
            error: None,
        }
    }

    /// 投递失败的回执
    pub fn failed(reason: impl Into<String>) -> Self {
        Self {
            ok: false,
            message_id: None,
            error: Some(reason.into()),
        }
    }
}

/// 推送渠道适配器 trait
///
/// 每次调用向一个设备令牌发送一条消息。实现应将服务商侧的失败
/// 包装为 `Ok(SendReceipt::failed(..))` 或返回错误——两者都会被
/// 调度器按单令牌失败处理，不会中断其余令牌的发送。
#[async_trait]
pub trait ChannelAdapter: Send + Sync {
    async fn send(&self, token: &str, message: &PushMessage)
    -> Result<SendReceipt, DispatchError>;
}

// ---------------------------------------------------------------------------
// LoggingChannelAdapter — 模拟发送适配器
// ---------------------------------------------------------------------------

/// 模拟推送适配器
///
/// 生产环境中替换为 Expo / FCM 等推送服务的 SDK 调用
pub struct LoggingChannelAdapter;

#[async_trait]
impl ChannelAdapter for LoggingChannelAdapter {
    async fn send(
        &self,
        token: &str,
        message: &PushMessage,
    ) -> Result<SendReceipt, DispatchError> {
        let message_id = Uuid::now_v7().to_string();

        info!(
            token = %token,
            message_id = %message_id,
            title = %message.title,
            payload_fields = message.data.len(),
            "模拟发送推送通知"
        );

        Ok(SendReceipt::delivered(message_id))
    }
}
