//! 投递调度器
//!
//! 调度一次通知的完整流程：校验请求、筛选目标令牌、去重预约、
//! 通过渠道适配器做有界并发扇出、聚合各令牌结果，并仅在至少一次
//! 成功投递后提交去重记录。
//!
//! 各令牌的发送相互独立，单个令牌的失败、超时或异常不会中断其余
//! 令牌的发送；全部失败时不提交去重记录，调用方可以立即重试而
//! 不会被误判为重复。

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use aqua_shared::clock::Clock;
use aqua_shared::config::DispatchConfig;
use futures::StreamExt;
use tracing::{debug, info, warn};

use crate::adapter::{ChannelAdapter, PushMessage};
use crate::dedup::{DedupCache, ReserveDecision};
use crate::error::DispatchError;
use crate::key::NotificationKey;
use crate::request::{NotificationRequest, PushPayload};

// ---------------------------------------------------------------------------
// DispatcherConfig — 调度器配置
// ---------------------------------------------------------------------------

/// 调度器配置
#[derive(Debug, Clone)]
pub struct DispatcherConfig {
    /// 单次调度内最大并发发送数，禁止无界扇出以保护服务商和调用方
    pub max_in_flight: usize,
    /// 单个令牌的发送超时，超时按该令牌失败计
    pub send_timeout: Duration,
    /// 整次调度的截止时间；到期后放弃在途发送并返回部分结果，
    /// 为空时等待所有发送各自完成或超时
    pub dispatch_deadline: Option<Duration>,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            max_in_flight: 16,
            send_timeout: Duration::from_secs(10),
            dispatch_deadline: None,
        }
    }
}

impl From<&DispatchConfig> for DispatcherConfig {
    fn from(config: &DispatchConfig) -> Self {
        Self {
            max_in_flight: config.max_in_flight,
            send_timeout: config.send_timeout(),
            dispatch_deadline: config.dispatch_deadline(),
        }
    }
}

// ---------------------------------------------------------------------------
// DeliveryOutcome — 聚合投递结果
// ---------------------------------------------------------------------------

/// 一次调度的聚合结果
///
/// 不持久化，返回给调用方用于日志和遥测。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryOutcome {
    pub attempted_tokens: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub suppressed_as_duplicate: bool,
}

impl DeliveryOutcome {
    /// 被去重抑制的结果：零尝试，正常返回而非错误
    pub fn suppressed() -> Self {
        Self {
            attempted_tokens: 0,
            succeeded: 0,
            failed: 0,
            suppressed_as_duplicate: true,
        }
    }

    /// 是否所有令牌都发送失败（渠道整体故障的结果态）
    pub fn is_total_failure(&self) -> bool {
        self.attempted_tokens > 0 && self.succeeded == 0
    }
}

// ---------------------------------------------------------------------------
// DeliveryDispatcher — 投递调度器
// ---------------------------------------------------------------------------

/// 投递调度器
pub struct DeliveryDispatcher {
    adapter: Arc<dyn ChannelAdapter>,
    cache: Arc<DedupCache>,
    clock: Arc<dyn Clock>,
    config: DispatcherConfig,
}

impl DeliveryDispatcher {
    pub fn new(
        adapter: Arc<dyn ChannelAdapter>,
        cache: Arc<DedupCache>,
        clock: Arc<dyn Clock>,
        config: DispatcherConfig,
    ) -> Self {
        Self {
            adapter,
            cache,
            clock,
            config,
        }
    }

    /// 调度一次通知
    ///
    /// 仅在请求格式非法或没有可用目标时返回错误，且都发生在任何副作用
    /// 之前；渠道层的失败一律吸收进 [`DeliveryOutcome`] 的计数。
    pub async fn dispatch(
        &self,
        request: &NotificationRequest,
    ) -> Result<DeliveryOutcome, DispatchError> {
        request.validate()?;

        let targets = request.valid_tokens();
        if targets.is_empty() {
            return Err(DispatchError::NoValidTargets);
        }

        let key = NotificationKey::build(request);
        let now = self.clock.now();

        if let ReserveDecision::Duplicate { since_last } = self.cache.try_reserve(&key, now) {
            info!(
                title = %request.title,
                status_tag = %request.status_tag,
                since_last_secs = since_last.num_seconds(),
                "窗口内已成功发送过相同通知，按重复抑制"
            );
            return Ok(DeliveryOutcome::suppressed());
        }

        let message = PushMessage {
            title: request.title.clone(),
            body: request.body.clone(),
            data: PushPayload::from_request(request).into_map(),
        };

        info!(
            title = %request.title,
            status_tag = %request.status_tag,
            targets = targets.len(),
            "开始向目标设备扇出推送"
        );

        let succeeded = AtomicUsize::new(0);
        let fanout = futures::stream::iter(targets.iter()).for_each_concurrent(
            self.config.max_in_flight,
            |token| {
                let message = &message;
                let succeeded = &succeeded;
                async move {
                    let sent = tokio::time::timeout(
                        self.config.send_timeout,
                        self.adapter.send(token, message),
                    )
                    .await;

                    match sent {
                        Ok(Ok(receipt)) if receipt.ok => {
                            succeeded.fetch_add(1, Ordering::Relaxed);
                            debug!(
                                token = %token,
                                message_id = receipt.message_id.as_deref().unwrap_or(""),
                                "令牌发送成功"
                            );
                        }
                        Ok(Ok(receipt)) => {
                            warn!(
                                token = %token,
                                error = receipt.error.as_deref().unwrap_or("未知原因"),
                                "令牌发送失败"
                            );
                        }
                        Ok(Err(e)) => {
                            warn!(token = %token, error = %e, "渠道适配器执行异常");
                        }
                        Err(_) => {
                            warn!(
                                token = %token,
                                timeout_ms = self.config.send_timeout.as_millis() as u64,
                                "单令牌发送超时"
                            );
                        }
                    }
                }
            },
        );

        match self.config.dispatch_deadline {
            Some(deadline) => {
                if tokio::time::timeout(deadline, fanout).await.is_err() {
                    warn!(
                        deadline_ms = deadline.as_millis() as u64,
                        "整体截止时间已到，放弃仍在途的发送"
                    );
                }
            }
            None => fanout.await,
        }

        let attempted_tokens = targets.len();
        let succeeded = succeeded.load(Ordering::Relaxed);
        // 被放弃的在途发送也计入失败
        let failed = attempted_tokens - succeeded;

        if succeeded > 0 {
            let commit_at = self.clock.now();
            self.cache.commit(&key, commit_at);
            let evicted = self.cache.evict_expired(commit_at);
            if evicted > 0 {
                debug!(evicted, "顺带清理过期去重记录");
            }
            info!(succeeded, failed, "推送完成，已提交去重记录");
        } else {
            warn!(
                attempted_tokens,
                "所有令牌发送失败，不提交去重记录，重试不会被抑制"
            );
        }

        Ok(DeliveryOutcome {
            attempted_tokens,
            succeeded,
            failed,
            suppressed_as_duplicate: false,
        })
    }
}

// ---------------------------------------------------------------------------
// 测试
// ---------------------------------------------------------------------------
