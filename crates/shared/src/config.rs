//! 配置管理模块
//!
//! 支持多格式配置文件加载，环境变量覆盖，以及类型安全的配置访问。

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

/// 推送调度配置
#[derive(Debug, Clone, Deserialize)]
pub struct DispatchConfig {
    /// 去重窗口：窗口内内容相同的通知被视为重复并抑制
    pub dedup_window_seconds: u64,
    /// 去重记录保留期：超过该时长的记录在提交后被惰性清理
    pub retention_seconds: u64,
    /// 单次调度内最大并发发送数
    pub max_in_flight: usize,
    /// 单个令牌的发送超时
    pub send_timeout_seconds: u64,
    /// 整次调度的截止时间，为空时不限制
    pub dispatch_deadline_seconds: Option<u64>,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            dedup_window_seconds: 30,
            retention_seconds: 300,
            max_in_flight: 16,
            send_timeout_seconds: 10,
            dispatch_deadline_seconds: None,
        }
    }
}

impl DispatchConfig {
    pub fn dedup_window(&self) -> Duration {
        Duration::from_secs(self.dedup_window_seconds)
    }

    pub fn retention(&self) -> Duration {
        Duration::from_secs(self.retention_seconds)
    }

    pub fn send_timeout(&self) -> Duration {
        Duration::from_secs(self.send_timeout_seconds)
    }

    pub fn dispatch_deadline(&self) -> Option<Duration> {
        self.dispatch_deadline_seconds.map(Duration::from_secs)
    }
}

/// 订单日志修复任务配置
#[derive(Debug, Clone, Deserialize)]
pub struct ReconcilerConfig {
    /// 仅处理在线（上线接单中）的配送员
    pub on_shift_only: bool,
}

impl Default for ReconcilerConfig {
    fn default() -> Self {
        Self { on_shift_only: true }
    }
}

/// 可观测性配置
#[derive(Debug, Clone, Deserialize)]
pub struct ObservabilityConfig {
    pub log_level: String,
    /// 日志输出格式：json（结构化）或 pretty（人类可读）
    pub log_format: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: "pretty".to_string(),
        }
    }
}

/// 应用配置
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    pub service_name: String,
    pub environment: String,
    pub dispatch: DispatchConfig,
    pub reconciler: ReconcilerConfig,
    pub observability: ObservabilityConfig,
}

impl AppConfig {
    /// 从配置文件和环境变量加载配置
    ///
    /// 加载顺序（后加载的会覆盖先加载的同名配置项）：
    /// 1. config/default.toml（默认配置）
    /// 2. config/{environment}.toml（环境特定配置）
    /// 3. 环境变量（AQUA_ 前缀，如 AQUA_DISPATCH_MAX_IN_FLIGHT -> dispatch.max_in_flight）
    pub fn load(service_name: &str) -> Result<Self, ConfigError> {
        let env = std::env::var("AQUA_ENV").unwrap_or_else(|_| "development".to_string());
        let config_dir = std::env::var("CONFIG_DIR").unwrap_or_else(|_| "config".to_string());

        let builder = Config::builder()
            .set_default("service_name", service_name)?
            .set_default("environment", env.clone())?
            // 加载默认配置文件
            .add_source(File::from(Path::new(&config_dir).join("default.toml")).required(false))
            // 加载环境特定配置
            .add_source(
                File::from(Path::new(&config_dir).join(format!("{}.toml", env))).required(false),
            )
            // 环境变量覆盖
            .add_source(
                Environment::with_prefix("AQUA")
                    .separator("_")
                    .try_parsing(true),
            );

        builder.build()?.try_deserialize()
    }

    /// 是否为生产环境
    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }
}
