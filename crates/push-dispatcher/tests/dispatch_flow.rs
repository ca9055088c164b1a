//! 调度全流程集成测试
//!
//! 覆盖从请求构造到去重提交的完整链路：部分成功提交去重记录并抑制
//! 重复请求，全量失败不提交，保留期之后记录被清理。

use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use aqua_shared::clock::ManualClock;
use async_trait::async_trait;
use chrono::{TimeDelta, Utc};
use push_dispatcher::adapter::{ChannelAdapter, PushMessage, SendReceipt};
use push_dispatcher::dedup::DedupCache;
use push_dispatcher::dispatcher::{DeliveryDispatcher, DispatcherConfig};
use push_dispatcher::error::DispatchError;
use push_dispatcher::request::{NotificationRequest, OrderSnapshot, STATUS_NEW_ORDER};

/// 按令牌名决定成败的测试适配器
struct FlakyAdapter {
    fail_tokens: HashSet<String>,
    calls: AtomicUsize,
}

impl FlakyAdapter {
    fn new(fail_tokens: &[&str]) -> Self {
        Self {
            fail_tokens: fail_tokens.iter().map(|t| t.to_string()).collect(),
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl ChannelAdapter for FlakyAdapter {
    async fn send(
        &self,
        token: &str,
        message: &PushMessage,
    ) -> Result<SendReceipt, DispatchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        // 载荷值必须全部已字符串化，包括订单快照
        assert!(message.data.contains_key("newStatus"));
        assert!(message.data.contains_key("order"));

        if self.fail_tokens.contains(token) {
            Ok(SendReceipt::failed("DeviceNotRegistered"))
        } else {
            Ok(SendReceipt::delivered(format!("msg-{token}")))
        }
    }
}

fn new_order_request() -> NotificationRequest {
    NotificationRequest::new(
        "Новый заказ",
        "Вам назначен новый заказ на доставку воды",
        vec!["t1".to_string(), "t2".to_string()],
        STATUS_NEW_ORDER,
        Some(OrderSnapshot::with_id("O1")),
    )
    .expect("构造请求失败")
}

#[tokio::test]
async fn partial_success_commits_then_suppresses_identical_request() {
    let adapter = Arc::new(FlakyAdapter::new(&["t2"]));
    let cache = Arc::new(DedupCache::default());
    let clock = Arc::new(ManualClock::at(Utc::now()));
    let dispatcher = DeliveryDispatcher::new(
        adapter.clone(),
        cache.clone(),
        clock.clone(),
        DispatcherConfig::default(),
    );

    // t1 成功、t2 失败：部分成功仍提交去重记录
    let outcome = dispatcher
        .dispatch(&new_order_request())
        .await
        .expect("调度失败");
    assert_eq!(outcome.attempted_tokens, 2);
    assert_eq!(outcome.succeeded, 1);
    assert_eq!(outcome.failed, 1);
    assert!(!outcome.suppressed_as_duplicate);
    assert_eq!(cache.len(), 1);

    // 5 秒后的相同请求被抑制，零次适配器调用
    clock.advance(TimeDelta::seconds(5));
    let second = dispatcher
        .dispatch(&new_order_request())
        .await
        .expect("调度失败");
    assert!(second.suppressed_as_duplicate);
    assert_eq!(second.attempted_tokens, 0);
    assert_eq!(adapter.calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn total_outage_leaves_retry_unsuppressed() {
    let adapter = Arc::new(FlakyAdapter::new(&["t1", "t2"]));
    let cache = Arc::new(DedupCache::default());
    let clock = Arc::new(ManualClock::at(Utc::now()));
    let dispatcher = DeliveryDispatcher::new(
        adapter.clone(),
        cache.clone(),
        clock.clone(),
        DispatcherConfig::default(),
    );

    let outcome = dispatcher
        .dispatch(&new_order_request())
        .await
        .expect("调度失败");
    assert!(outcome.is_total_failure());
    assert!(cache.is_empty());

    // 渠道整体故障后立即重试，不应被当作重复抑制
    let retry = dispatcher
        .dispatch(&new_order_request())
        .await
        .expect("调度失败");
    assert!(!retry.suppressed_as_duplicate);
    assert_eq!(retry.attempted_tokens, 2);
    assert_eq!(adapter.calls.load(Ordering::SeqCst), 4);
}

#[tokio::test]
async fn committed_record_evicted_after_retention_horizon() {
    let adapter = Arc::new(FlakyAdapter::new(&[]));
    let cache = Arc::new(DedupCache::default());
    let clock = Arc::new(ManualClock::at(Utc::now()));
    let dispatcher = DeliveryDispatcher::new(
        adapter.clone(),
        cache.clone(),
        clock.clone(),
        DispatcherConfig::default(),
    );

    dispatcher
        .dispatch(&new_order_request())
        .await
        .expect("调度失败");
    assert_eq!(cache.len(), 1);

    // 超过保留期后，另一条通知的提交顺带清理掉第一条记录
    clock.advance(TimeDelta::seconds(301));
    let other = NotificationRequest::new(
        "Заказ отменён",
        "Клиент отменил заказ",
        vec!["t1".to_string()],
        "cancelled",
        None,
    )
    .expect("构造请求失败");
    dispatcher.dispatch(&other).await.expect("调度失败");

    assert_eq!(cache.len(), 1);
}
