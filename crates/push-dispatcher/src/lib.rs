//! 推送通知调度核心
//!
//! 面向多设备令牌的幂等推送：请求校验、去重键派生、时间窗口去重缓存、
//! 有界并发扇出与结果聚合。单个令牌的发送失败不影响其他令牌的投递，
//! 只有至少一次成功投递才会提交去重记录，全量失败后立即重试不会被抑制。

pub mod adapter;
pub mod dedup;
pub mod dispatcher;
pub mod error;
pub mod key;
pub mod request;
