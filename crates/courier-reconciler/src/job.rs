//! 订单日志修复任务
//!
//! 对每个配送员的订单日志做单遍扫描，同一订单号只保留最早插入的条目。
//! 保留最早条目是沿用既有系统的观测行为（最早记录的状态视为权威），
//! 不是经过验证的业务规则。长度没有变化时跳过写回，任务天然幂等。

use std::sync::Arc;

use aqua_shared::retry::{RetryPolicy, retry_with_policy};
use std::collections::HashSet;
use tracing::{debug, info, warn};

use crate::error::ReconcileError;
use crate::store::{CourierRecord, CourierSelector, CourierStore, OrderLogEntry};

// ---------------------------------------------------------------------------
// 结果模型
// ---------------------------------------------------------------------------

/// 单个配送员的修复报告
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconcileReport {
    pub courier_id: String,
    /// 修复前的条目数
    pub before: usize,
    /// 修复后的条目数
    pub after: usize,
}

impl ReconcileReport {
    /// 本次移除的重复条目数
    pub fn removed(&self) -> usize {
        self.before - self.after
    }
}

/// 批量修复中单个配送员的失败记录
#[derive(Debug, Clone)]
pub struct ReconcileFailure {
    pub courier_id: String,
    pub error: String,
}

/// 批量修复汇总
#[derive(Debug, Clone, Default)]
pub struct ReconcileSummary {
    pub reports: Vec<ReconcileReport>,
    pub failures: Vec<ReconcileFailure>,
}

impl ReconcileSummary {
    /// 整批移除的重复条目总数
    pub fn total_removed(&self) -> usize {
        self.reports.iter().map(ReconcileReport::removed).sum()
    }
}

// ---------------------------------------------------------------------------
// dedupe_first_wins — 首次出现保留
// ---------------------------------------------------------------------------

/// 按订单号去重，保留每个订单号最早插入的条目
///
/// 纯函数，保持幸存条目的相对顺序。
pub fn dedupe_first_wins(entries: &[OrderLogEntry]) -> Vec<OrderLogEntry> {
    let mut seen = HashSet::new();
    entries
        .iter()
        .filter(|entry| seen.insert(entry.order_id.as_str()))
        .cloned()
        .collect()
}

// ---------------------------------------------------------------------------
// ReconciliationJob — 修复任务
// ---------------------------------------------------------------------------

/// 订单日志修复任务
///
/// 按需或按计划运行，不持有长期锁；每个配送员一次全量替换写入，
/// 依赖写入的原子性避免与并发追加交错。
pub struct ReconciliationJob {
    store: Arc<dyn CourierStore>,
    retry: RetryPolicy,
}

impl ReconciliationJob {
    pub fn new(store: Arc<dyn CourierStore>) -> Self {
        Self {
            store,
            retry: RetryPolicy::default(),
        }
    }

    /// 覆盖写回时使用的重试策略
    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// 修复单个配送员的订单日志
    pub async fn reconcile(&self, courier_id: &str) -> Result<ReconcileReport, ReconcileError> {
        let courier = self
            .store
            .load_courier(courier_id)
            .await?
            .ok_or_else(|| ReconcileError::CourierNotFound {
                id: courier_id.to_string(),
            })?;

        self.reconcile_record(&courier).await
    }

    /// 批量修复选择器匹配的所有配送员
    ///
    /// 单个配送员的存储失败被记录进汇总，不会中断其余配送员的处理；
    /// 只有批量读取本身失败才会使整个调用出错。
    pub async fn reconcile_all(
        &self,
        selector: CourierSelector,
    ) -> Result<ReconcileSummary, ReconcileError> {
        let couriers = self.store.load_matching(selector).await?;

        info!(couriers = couriers.len(), ?selector, "开始批量修复订单日志");

        let mut summary = ReconcileSummary::default();
        for courier in &couriers {
            match self.reconcile_record(courier).await {
                Ok(report) => summary.reports.push(report),
                Err(e) => {
                    warn!(
                        courier_id = %courier.id,
                        error = %e,
                        "修复该配送员失败，继续处理其余配送员"
                    );
                    summary.failures.push(ReconcileFailure {
                        courier_id: courier.id.clone(),
                        error: e.to_string(),
                    });
                }
            }
        }

        info!(
            processed = summary.reports.len(),
            failed = summary.failures.len(),
            removed = summary.total_removed(),
            "批量修复完成"
        );

        Ok(summary)
    }

    /// 修复一条已加载的配送员记录
    async fn reconcile_record(
        &self,
        courier: &CourierRecord,
    ) -> Result<ReconcileReport, ReconcileError> {
        let before = courier.order_log.len();
        let deduped = dedupe_first_wins(&courier.order_log);
        let after = deduped.len();

        if after != before {
            retry_with_policy(
                &self.retry,
                "replace_order_log",
                ReconcileError::is_retryable,
                || {
                    let entries = deduped.clone();
                    async move { self.store.replace_order_log(&courier.id, entries).await }
                },
            )
            .await?;

            info!(
                courier = %courier.full_name,
                before,
                after,
                removed = before - after,
                "移除重复订单条目并写回"
            );
        } else {
            debug!(courier = %courier.full_name, entries = before, "没有重复条目，跳过写回");
        }

        Ok(ReconcileReport {
            courier_id: courier.id.clone(),
            before,
            after,
        })
    }
}

// ---------------------------------------------------------------------------
// 测试
// ---------------------------------------------------------------------------
