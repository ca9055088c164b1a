//! 日志初始化模块
//!
//! 基于 tracing-subscriber 提供统一的日志初始化入口，支持 pretty（人类可读）
//! 和 json（结构化）两种输出格式，日志级别可由配置或 RUST_LOG 环境变量控制。

use anyhow::Result;
use tracing_subscriber::{
    EnvFilter,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

use crate::config::ObservabilityConfig;

/// 初始化全局日志订阅器
///
/// RUST_LOG 环境变量优先于配置文件中的 log_level。
/// 重复初始化会返回错误，调用方应只在进程入口调用一次。
pub fn init(config: &ObservabilityConfig) -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let registry = tracing_subscriber::registry().with(env_filter);

    if config.log_format == "json" {
        registry
            .with(
                fmt::layer()
                    .json()
                    .with_span_events(FmtSpan::CLOSE)
                    .with_target(true),
            )
            .try_init()?;
    } else {
        registry
            .with(fmt::layer().with_target(true).with_ansi(true))
            .try_init()?;
    }

    Ok(())
}
