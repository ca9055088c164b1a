//! 时钟抽象模块
//!
//! 将"当前时间"抽象为可注入的依赖，去重窗口和记录清理等与时间相关的
//! 逻辑在测试中可以用手动时钟精确推进，而不依赖真实等待。

use std::sync::Arc;

use chrono::{DateTime, TimeDelta, Utc};
use parking_lot::Mutex;

/// 时钟 trait
///
/// 生产环境使用 [`SystemClock`]，测试使用 [`ManualClock`]。
pub trait Clock: Send + Sync {
    /// 返回当前时刻
    fn now(&self) -> DateTime<Utc>;
}

/// 系统时钟，直接读取 UTC 墙钟时间
#[derive(Debug, Default, Clone)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// 手动时钟
///
/// 时间只在显式调用 `set` 或 `advance` 时变化，用于在测试中
/// 确定性地验证窗口过期和记录清理行为。
#[derive(Debug, Clone)]
pub struct ManualClock {
    now: Arc<Mutex<DateTime<Utc>>>,
}

impl ManualClock {
    /// 以指定时刻创建手动时钟
    pub fn at(start: DateTime<Utc>) -> Self {
        Self {
            now: Arc::new(Mutex::new(start)),
        }
    }

    /// 设置当前时刻
    pub fn set(&self, now: DateTime<Utc>) {
        *self.now.lock() = now;
    }

    /// 向前推进时间
    pub fn advance(&self, delta: TimeDelta) {
        let mut now = self.now.lock();
        *now = *now + delta;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock()
    }
}
