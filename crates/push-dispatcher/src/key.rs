//! 去重键派生
//!
//! 从通知的语义内容派生确定性的去重键。令牌集合先去重再按字典序排序，
//! 因此键与调用方传入的令牌顺序和重复无关。字段之间使用控制字符分隔，
//! 不会与人类可读文本或订单标识冲突，无需引入哈希。

use std::collections::BTreeSet;
use std::fmt;

use crate::request::NotificationRequest;

/// 字段分隔符（U+001F UNIT SEPARATOR），不会出现在标题、正文或标识中
const FIELD_SEPARATOR: &str = "\u{1f}";

/// 令牌分隔符（U+001E RECORD SEPARATOR），不会出现在设备令牌中
const TOKEN_SEPARATOR: &str = "\u{1e}";

/// 通知去重键
///
/// 由 `(title, body, 排序去重后的令牌集, status_tag, 订单标识)` 派生。
/// 逻辑内容相同的两个请求（与令牌数组顺序和重复无关）得到相同的键。
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NotificationKey(String);

impl NotificationKey {
    /// 从通知请求派生去重键
    ///
    /// 纯函数，不产生副作用。
    pub fn build(request: &NotificationRequest) -> Self {
        // BTreeSet 同时完成去重和字典序排序
        let token_set: BTreeSet<&str> = request
            .tokens
            .iter()
            .filter(|t| !t.is_empty())
            .map(|t| t.as_str())
            .collect();
        let joined_tokens: Vec<&str> = token_set.into_iter().collect();

        let key = [
            request.title.as_str(),
            request.body.as_str(),
            &joined_tokens.join(TOKEN_SEPARATOR),
            request.status_tag.as_str(),
            request.subject_identity(),
        ]
        .join(FIELD_SEPARATOR);

        Self(key)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NotificationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
