//! 时间窗口去重缓存
//!
//! 进程内的幂等存储：键 -> 最近一次成功发送的时刻。预约（try_reserve）和
//! 提交（commit）拆分为两步，调度全量失败时不会留下记录污染缓存，
//! 后续重试不会被误判为重复。
//!
//! 两个并发调度对同一键先后通过 try_reserve、都在对方 commit 之前的竞态
//! 是接受的设计取舍：缓存只是尽力而为的建议性协调，减少而非杜绝重复发送。
//! 如需更强保证可将两步合并为原子 check-and-set，代价是全量失败后无法
//! 回滚预约。

use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use dashmap::DashMap;

use crate::key::NotificationKey;

/// 默认去重窗口：30 秒
pub const DEFAULT_DEDUP_WINDOW: Duration = Duration::from_secs(30);

/// 默认记录保留期：5 分钟，独立于去重窗口且长于它
pub const DEFAULT_RETENTION: Duration = Duration::from_secs(300);

/// 预约判定结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReserveDecision {
    /// 窗口内没有相同键的成功记录，允许发送
    Allowed,
    /// 窗口内已有相同键的成功记录，应抑制本次发送
    Duplicate {
        /// 距上次成功发送经过的时间
        since_last: TimeDelta,
    },
}

impl ReserveDecision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Self::Allowed)
    }
}

/// 时间窗口去重缓存
///
/// 按键粒度并发安全（DashMap 分片锁），无全局锁。时间由调用方传入，
/// 缓存自身不读取墙钟，测试可以完全控制时间推进。
pub struct DedupCache {
    records: DashMap<String, DateTime<Utc>>,
    window: TimeDelta,
    retention: TimeDelta,
}

impl DedupCache {
    /// 创建缓存，显式指定去重窗口和保留期
    pub fn new(window: Duration, retention: Duration) -> Self {
        Self {
            records: DashMap::new(),
            window: TimeDelta::seconds(window.as_secs() as i64),
            retention: TimeDelta::seconds(retention.as_secs() as i64),
        }
    }

    /// 预约检查
    ///
    /// 只读操作，不写入任何记录——提交是独立的显式步骤，
    /// 调度全量失败时缓存保持原样。
    pub fn try_reserve(&self, key: &NotificationKey, now: DateTime<Utc>) -> ReserveDecision {
        match self.records.get(key.as_str()) {
            Some(last) => {
                let since_last = now.signed_duration_since(*last.value());
                if since_last < self.window {
                    ReserveDecision::Duplicate { since_last }
                } else {
                    ReserveDecision::Allowed
                }
            }
            None => ReserveDecision::Allowed,
        }
    }

    /// 提交成功记录
    ///
    /// 仅在至少一次成功投递之后调用。已有记录会被刷新到新的时刻。
    pub fn commit(&self, key: &NotificationKey, now: DateTime<Utc>) {
        self.records.insert(key.as_str().to_string(), now);
    }

    /// 惰性清理过期记录
    ///
    /// 移除所有超过保留期的记录，返回清理数量。在每次提交后顺带调用，
    /// 无需独立的清理定时器。
    pub fn evict_expired(&self, now: DateTime<Utc>) -> usize {
        let before = self.records.len();
        self.records
            .retain(|_, last| now.signed_duration_since(*last) <= self.retention);
        before - self.records.len()
    }

    /// 当前缓存的记录数
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl Default for DedupCache {
    fn default() -> Self {
        Self::new(DEFAULT_DEDUP_WINDOW, DEFAULT_RETENTION)
    }
}
