//! 通知请求模型
//!
//! 定义一次推送的不可变请求值：标题、正文、目标令牌、状态标签和可选的
//! 订单快照。请求在构造时完成校验，推送数据载荷采用显式的固定字段模式，
//! 所有字段在交给渠道适配器之前都已转换为字符串——部分推送服务商会
//! 拒绝非字符串类型的载荷值。

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::DispatchError;

/// 新订单事件的状态标签，该状态要求请求携带订单快照
pub const STATUS_NEW_ORDER: &str = "newOrder";

/// 请求不携带订单时用于去重键的哨兵标识
pub const NO_ORDER_SENTINEL: &str = "no-order";

// ---------------------------------------------------------------------------
// OrderSnapshot — 订单快照
// ---------------------------------------------------------------------------

/// 订单快照
///
/// 随通知一起下发给客户端的订单摘要，字段集合固定。
/// 上游按需填充可选字段，缺失的字段不会出现在序列化结果中。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderSnapshot {
    pub order_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scheduled_at: Option<String>,
}

impl OrderSnapshot {
    /// 仅携带订单号的最小快照
    pub fn with_id(order_id: impl Into<String>) -> Self {
        Self {
            order_id: order_id.into(),
            status: None,
            client_name: None,
            address: None,
            scheduled_at: None,
        }
    }
}

// ---------------------------------------------------------------------------
// NotificationRequest — 通知请求
// ---------------------------------------------------------------------------

/// 通知请求
///
/// 每个值得通知的业务事件（订单创建、状态变更等）由调用方构造一个请求。
/// 请求不可变，调度完成后即丢弃。`tokens` 允许包含重复或空串，
/// 调度前由 [`NotificationRequest::valid_tokens`] 统一过滤。
#[derive(Debug, Clone)]
pub struct NotificationRequest {
    pub title: String,
    pub body: String,
    pub tokens: Vec<String>,
    pub status_tag: String,
    pub subject: Option<OrderSnapshot>,
}

impl NotificationRequest {
    /// 构造并校验通知请求
    ///
    /// 校验失败的请求无法被构造出来，调度器在入口处还会再次校验，
    /// 保证无论请求来自何处都不会带着非法字段触达缓存或渠道。
    pub fn new(
        title: impl Into<String>,
        body: impl Into<String>,
        tokens: Vec<String>,
        status_tag: impl Into<String>,
        subject: Option<OrderSnapshot>,
    ) -> Result<Self, DispatchError> {
        let request = Self {
            title: title.into(),
            body: body.into(),
            tokens,
            status_tag: status_tag.into(),
            subject,
        };
        request.validate()?;
        Ok(request)
    }

    /// 校验请求的必填字段
    ///
    /// 注意这里不要求 tokens 非空——空目标在调度时单独报告为
    /// [`DispatchError::NoValidTargets`]，与字段缺失区分开。
    pub fn validate(&self) -> Result<(), DispatchError> {
        if self.title.is_empty() {
            return Err(DispatchError::invalid("title", "通知标题不能为空"));
        }
        if self.body.is_empty() {
            return Err(DispatchError::invalid("body", "通知正文不能为空"));
        }
        if self.status_tag.is_empty() {
            return Err(DispatchError::invalid("status_tag", "状态标签不能为空"));
        }
        if self.status_tag == STATUS_NEW_ORDER && self.subject.is_none() {
            return Err(DispatchError::invalid(
                "subject",
                "newOrder 状态的通知缺少订单快照",
            ));
        }
        Ok(())
    }

    /// 过滤出可用的目标令牌
    ///
    /// 去掉空串并去重，保留首次出现的顺序。
    pub fn valid_tokens(&self) -> Vec<String> {
        let mut seen = std::collections::HashSet::new();
        self.tokens
            .iter()
            .filter(|t| !t.is_empty())
            .filter(|t| seen.insert(t.as_str()))
            .cloned()
            .collect()
    }

    /// 请求关联的订单标识，无订单时返回哨兵值
    pub fn subject_identity(&self) -> &str {
        self.subject
            .as_ref()
            .map(|s| s.order_id.as_str())
            .unwrap_or(NO_ORDER_SENTINEL)
    }
}

// ---------------------------------------------------------------------------
// PushPayload — 推送数据载荷
// ---------------------------------------------------------------------------

/// 推送数据载荷
///
/// 固定字段集合，每个字段都是字符串。客户端依赖 `newStatus` 路由
/// 通知内的跳转逻辑，`order` 为订单快照的 JSON 字符串，无订单时为 `{}`。
#[derive(Debug, Clone, PartialEq)]
pub struct PushPayload {
    pub new_status: String,
    pub order: String,
    pub order_id: String,
    pub order_status: String,
}

impl PushPayload {
    /// 从通知请求派生载荷，所有字段保证为字符串
    pub fn from_request(request: &NotificationRequest) -> Self {
        let order = request
            .subject
            .as_ref()
            .and_then(|s| serde_json::to_string(s).ok())
            .unwrap_or_else(|| "{}".to_string());

        let order_id = request
            .subject
            .as_ref()
            .map(|s| s.order_id.clone())
            .unwrap_or_else(|| "unknown".to_string());

        let order_status = request
            .subject
            .as_ref()
            .and_then(|s| s.status.clone())
            .unwrap_or_else(|| request.status_tag.clone());

        Self {
            new_status: request.status_tag.clone(),
            order,
            order_id,
            order_status,
        }
    }

    /// 展开为发送给渠道适配器的键值映射
    ///
    /// 键名与客户端约定保持一致，不做风格转换。
    pub fn into_map(self) -> HashMap<String, String> {
        HashMap::from([
            ("newStatus".to_string(), self.new_status),
            ("order".to_string(), self.order),
            ("orderId".to_string(), self.order_id),
            ("orderStatus".to_string(), self.order_status),
        ])
    }
}

// ---------------------------------------------------------------------------
// 测试
// ---------------------------------------------------------------------------
