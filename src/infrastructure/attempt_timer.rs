//! 作答计时器 - 基础设施层
//!
//! 持有唯一的计时任务，只暴露"读秒"和"停止"的能力

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant};
use tracing::debug;

/// 作答计时器
///
/// - 创建即开始计时，每秒加一
/// - `stop()` 或被丢弃时计时任务立即取消
/// - 不认识 Attempt / Quiz
#[derive(Debug)]
pub struct AttemptTimer {
    elapsed: Arc<AtomicU64>,
    handle: Option<JoinHandle<()>>,
}

impl AttemptTimer {
    /// 开始计时，需要在 tokio 运行时内调用
    pub fn start() -> Self {
        let elapsed = Arc::new(AtomicU64::new(0));
        let counter = Arc::clone(&elapsed);
        let tick = Duration::from_secs(1);

        let handle = tokio::spawn(async move {
            let mut interval = interval_at(Instant::now() + tick, tick);
            loop {
                interval.tick().await;
                counter.fetch_add(1, Ordering::Relaxed);
            }
        });
        debug!("计时开始");

        Self {
            elapsed,
            handle: Some(handle),
        }
    }

    pub fn elapsed_seconds(&self) -> u64 {
        self.elapsed.load(Ordering::Relaxed)
    }

    pub fn is_running(&self) -> bool {
        self.handle.is_some()
    }

    /// 停止计时，返回最终读数
    pub fn stop(&mut self) -> u64 {
        if let Some(handle) = self.handle.take() {
            handle.abort();
            debug!("计时停止: {} 秒", self.elapsed_seconds());
        }
        self.elapsed_seconds()
    }
}

impl Drop for AttemptTimer {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}
