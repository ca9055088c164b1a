//! 配送员存储抽象
//!
//! 修复任务只依赖三个存储能力：按选择器读取配送员、按 id 读取单个
//! 配送员、整体替换订单日志字段。具体的文档库实现由外层注入，
//! 内置的 [`InMemoryCourierStore`] 供测试和开发环境使用。

use async_trait::async_trait;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::error::ReconcileError;

// ---------------------------------------------------------------------------
// 数据模型
// ---------------------------------------------------------------------------

/// 订单日志条目
///
/// `order_id` 是条目的自然键，修复任务按它判定重复。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderLogEntry {
    pub order_id: String,
    pub status: String,
}

impl OrderLogEntry {
    pub fn new(order_id: impl Into<String>, status: impl Into<String>) -> Self {
        Self {
            order_id: order_id.into(),
            status: status.into(),
        }
    }
}

/// 配送员记录
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CourierRecord {
    pub id: String,
    pub full_name: String,
    /// 是否在线接单中
    pub on_shift: bool,
    /// 追加式订单日志，仅由正常追加路径和修复任务修改
    pub order_log: Vec<OrderLogEntry>,
}

/// 配送员选择器
///
/// 批量修复按选择器圈定处理范围，默认只处理在线的配送员——
/// 修复假定在低活跃窗口运行，离线配送员的日志没有并发追加风险，
/// 需要时用 `All` 全量处理。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CourierSelector {
    All,
    OnShift,
}

impl CourierSelector {
    /// 由配置项派生选择器
    pub fn from_on_shift_only(on_shift_only: bool) -> Self {
        if on_shift_only { Self::OnShift } else { Self::All }
    }

    pub fn matches(&self, courier: &CourierRecord) -> bool {
        match self {
            Self::All => true,
            Self::OnShift => courier.on_shift,
        }
    }
}

// ---------------------------------------------------------------------------
// CourierStore trait
// ---------------------------------------------------------------------------

/// 配送员存储 trait
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CourierStore: Send + Sync {
    /// 按 id 读取配送员，不存在时返回 None
    async fn load_courier(&self, id: &str) -> Result<Option<CourierRecord>, ReconcileError>;

    /// 读取选择器匹配的所有配送员
    async fn load_matching(
        &self,
        selector: CourierSelector,
    ) -> Result<Vec<CourierRecord>, ReconcileError>;

    /// 整体替换配送员的订单日志字段
    ///
    /// 单次全量写入而非逐条编辑，避免与并发追加交错产生半成品状态。
    async fn replace_order_log(
        &self,
        id: &str,
        entries: Vec<OrderLogEntry>,
    ) -> Result<(), ReconcileError>;
}

// ---------------------------------------------------------------------------
// InMemoryCourierStore — 内存实现
// ---------------------------------------------------------------------------

/// 内存配送员存储
///
/// 基于 DashMap 实现，适用于测试和开发环境。记录写入次数，
/// 便于测试断言修复任务的幂等性。
#[derive(Debug, Default)]
pub struct InMemoryCourierStore {
    couriers: Arc<DashMap<String, CourierRecord>>,
    writes: AtomicUsize,
}

impl InMemoryCourierStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 插入或覆盖配送员记录
    pub fn insert(&self, courier: CourierRecord) {
        self.couriers.insert(courier.id.clone(), courier);
    }

    /// 累计的订单日志写入次数
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CourierStore for InMemoryCourierStore {
    async fn load_courier(&self, id: &str) -> Result<Option<CourierRecord>, ReconcileError> {
        Ok(self.couriers.get(id).map(|c| c.clone()))
    }

    async fn load_matching(
        &self,
        selector: CourierSelector,
    ) -> Result<Vec<CourierRecord>, ReconcileError> {
        let mut matched: Vec<CourierRecord> = self
            .couriers
            .iter()
            .filter(|entry| selector.matches(entry.value()))
            .map(|entry| entry.value().clone())
            .collect();
        // DashMap 迭代顺序不稳定，按 id 排序保证批量处理顺序可复现
        matched.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(matched)
    }

    async fn replace_order_log(
        &self,
        id: &str,
        entries: Vec<OrderLogEntry>,
    ) -> Result<(), ReconcileError> {
        let mut courier = self
            .couriers
            .get_mut(id)
            .ok_or_else(|| ReconcileError::CourierNotFound { id: id.to_string() })?;
        courier.order_log = entries;
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn courier(id: &str, on_shift: bool, orders: &[(&str, &str)]) -> CourierRecord {
        CourierRecord {
            id: id.to_string(),
            full_name: format!("Курьер {id}"),
            on_shift,
            order_log: orders
                .iter()
                .map(|(oid, status)| OrderLogEntry::new(*oid, *status))
                .collect(),
        }
    }

    #[tokio::test]
    async fn test_load_courier_roundtrip() {
        let store = InMemoryCourierStore::new();
        store.insert(courier("c-1", true, &[("O1", "onTheWay")]));

        let loaded = store
            .load_courier("c-1")
            .await
            .expect("读取失败")
            .expect("配送员应存在");
        assert_eq!(loaded.order_log.len(), 1);

        assert!(store.load_courier("c-404").await.expect("读取失败").is_none());
    }

    #[tokio::test]
    async fn test_load_matching_respects_selector() {
        let store = InMemoryCourierStore::new();
        store.insert(courier("c-1", true, &[]));
        store.insert(courier("c-2", false, &[]));
        store.insert(courier("c-3", true, &[]));

        let on_shift = store
            .load_matching(CourierSelector::OnShift)
            .await
            .expect("读取失败");
        assert_eq!(on_shift.len(), 2);
        assert!(on_shift.iter().all(|c| c.on_shift));

        let all = store
            .load_matching(CourierSelector::All)
            .await
            .expect("读取失败");
        assert_eq!(all.len(), 3);
        // 结果按 id 排序
        assert_eq!(all[0].id, "c-1");
        assert_eq!(all[2].id, "c-3");
    }

    #[tokio::test]
    async fn test_replace_order_log_counts_writes() {
        let store = InMemoryCourierStore::new();
        store.insert(courier("c-1", true, &[("O1", "onTheWay"), ("O2", "delivered")]));
        assert_eq!(store.write_count(), 0);

        store
            .replace_order_log("c-1", vec![OrderLogEntry::new("O1", "onTheWay")])
            .await
            .expect("写入失败");

        assert_eq!(store.write_count(), 1);
        let loaded = store
            .load_courier("c-1")
            .await
            .expect("读取失败")
            .expect("配送员应存在");
        assert_eq!(loaded.order_log.len(), 1);
    }

    #[tokio::test]
    async fn test_replace_order_log_unknown_courier() {
        let store = InMemoryCourierStore::new();
        let result = store.replace_order_log("c-404", vec![]).await;
        assert!(matches!(
            result,
            Err(ReconcileError::CourierNotFound { .. })
        ));
    }

    #[test]
    fn test_selector_from_config() {
        assert_eq!(
            CourierSelector::from_on_shift_only(true),
            CourierSelector::OnShift
        );
        assert_eq!(
            CourierSelector::from_on_shift_only(false),
            CourierSelector::All
        );
    }
}
