//! 带所有权的采样定时器
//!
//! 封装周期回调: start 后立即触发第一次，stop 使其彻底失效，
//! reschedule 调整间隔并保证最多只有一个活跃定时器。

use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::debug;

type TickFn = Arc<dyn Fn() + Send + Sync>;

/// 周期性采样调度器
pub struct TickScheduler {
    handle: Option<JoinHandle<()>>,
    callback: Option<TickFn>,
    interval: Duration,
}

impl TickScheduler {
    pub fn new() -> Self {
        TickScheduler {
            handle: None,
            callback: None,
            interval: Duration::from_secs(5),
        }
    }

    /// 启动定时器，第一次回调立即执行
    ///
    /// 若已有活跃定时器，先将其停止
    pub fn start<F>(&mut self, interval: Duration, callback: F)
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.stop();
        self.interval = interval;
        let callback: TickFn = Arc::new(callback);
        self.callback = Some(callback.clone());
        self.handle = Some(Self::spawn_loop(interval, callback));
        debug!("定时器已启动，间隔 {:?}", interval);
    }

    /// 停止定时器，之后不会再有任何回调
    pub fn stop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
            debug!("定时器已停止");
        }
    }

    /// 调整间隔
    ///
    /// 仅在定时器运行中才重启循环，停止状态下只记录新间隔
    pub fn reschedule(&mut self, interval: Duration) {
        self.interval = interval;
        if self.handle.is_some() {
            if let Some(callback) = self.callback.clone() {
                self.stop();
                self.handle = Some(Self::spawn_loop(interval, callback));
                debug!("定时器已按新间隔 {:?} 重启", interval);
            }
        }
    }

    pub fn is_running(&self) -> bool {
        self.handle.is_some()
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    fn spawn_loop(interval: Duration, callback: TickFn) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut timer = tokio::time::interval(interval);
            timer.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                timer.tick().await;
                callback();
            }
        })
    }
}

impl Default for TickScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for TickScheduler {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test(start_paused = true)]
    async fn test_first_tick_is_immediate() {
        let count = Arc::new(AtomicUsize::new(0));
        let mut scheduler = TickScheduler::new();
        let c = count.clone();
        scheduler.start(Duration::from_secs(5), move || {
            c.fetch_add(1, Ordering::SeqCst);
        });

        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_tick_cadence() {
        let count = Arc::new(AtomicUsize::new(0));
        let mut scheduler = TickScheduler::new();
        let c = count.clone();
        scheduler.start(Duration::from_secs(5), move || {
            c.fetch_add(1, Ordering::SeqCst);
        });

        // 0s, 5s, 10s, 15s 共 4 次
        tokio::time::sleep(Duration::from_secs(16)).await;
        assert_eq!(count.load(Ordering::SeqCst), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_makes_timer_inert() {
        let count = Arc::new(AtomicUsize::new(0));
        let mut scheduler = TickScheduler::new();
        let c = count.clone();
        scheduler.start(Duration::from_secs(5), move || {
            c.fetch_add(1, Ordering::SeqCst);
        });

        tokio::time::sleep(Duration::from_secs(6)).await;
        scheduler.stop();
        let before = count.load(Ordering::SeqCst);
        assert!(!scheduler.is_running());

        tokio::time::sleep(Duration::from_secs(30)).await;
        assert_eq!(count.load(Ordering::SeqCst), before);
    }

    #[tokio::test(start_paused = true)]
    async fn test_reschedule_changes_cadence() {
        let count = Arc::new(AtomicUsize::new(0));
        let mut scheduler = TickScheduler::new();
        let c = count.clone();
        scheduler.start(Duration::from_secs(5), move || {
            c.fetch_add(1, Ordering::SeqCst);
        });

        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(count.load(Ordering::SeqCst), 1);

        // 重启后第一次回调同样立即执行，之后每 2s 一次
        scheduler.reschedule(Duration::from_secs(2));
        tokio::time::sleep(Duration::from_millis(4100)).await;
        assert_eq!(count.load(Ordering::SeqCst), 4);
        assert_eq!(scheduler.interval(), Duration::from_secs(2));
    }

    #[tokio::test(start_paused = true)]
    async fn test_reschedule_while_stopped_stays_stopped() {
        let count = Arc::new(AtomicUsize::new(0));
        let mut scheduler = TickScheduler::new();
        let c = count.clone();
        scheduler.start(Duration::from_secs(5), move || {
            c.fetch_add(1, Ordering::SeqCst);
        });
        scheduler.stop();

        scheduler.reschedule(Duration::from_secs(1));
        assert!(!scheduler.is_running());
        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }
}
