//! 配送员订单日志修复
//!
//! 对持久化的配送员订单日志做批量去重：同一订单号的重复条目只保留
//! 最早插入的一条，其余丢弃，修复在去重机制生效之前或上游重试造成的
//! 数据漂移。任务幂等且保持条目相对顺序，单个配送员的失败不会中断
//! 整批处理。

pub mod error;
pub mod job;
pub mod store;
