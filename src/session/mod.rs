//! 采样会话
//!
//! 单个可复用的采样流程抽象: 捕获摄像头与屏幕帧、编码、
//! 提交评分后端、对账分数并广播 aura_update 事件。
//! 仪表盘模式与排位模式复用同一个会话。

use crate::backend::AuraClient;
use crate::capture::{CaptureError, FrameSource};
use crate::config::CaptureConfig;
use crate::encoder::JpegEncoder;
use crate::scoring::{clamp_score, AuraTier, ScoreDelta, ScoreHistory};
use anyhow::Result;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, Mutex};
use tracing::{debug, warn};

/// 捕获遇到 NotReady 时的重试等待
const RETRY_DELAY_MS: u64 = 500;

/// 后端不可用时本地伪随机增量的区间
pub const FALLBACK_DELTA_MIN: i64 = -10;
pub const FALLBACK_DELTA_MAX: i64 = 20;

/// 后端不可用时的候选解释文案
pub const FALLBACK_REASONS: &[&str] = &[
    "Good code structure detected",
    "Efficient algorithm implementation",
    "Clean variable naming",
    "Browsing Stack Overflow too much",
    "Taking too long to solve a bug",
    "Low typing speed detected",
    "Good problem-solving approach",
    "Using proper debugging techniques",
    "Too many console.log statements",
    "Distracted by social media",
    "Using AI tools effectively",
];

/// 每次采样产生的广播事件
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuraUpdate {
    /// 本次的分数变动
    pub change: i64,
    /// 变动后的总分
    pub score: i64,
    /// 当前段位名称
    pub tier: String,
    /// 段位配色 (监控端渐变背景)
    pub tier_color: String,
    /// 解释文案
    pub explanation: String,
    /// base64 编码的摄像头帧
    pub webcam_image: String,
    /// HH:MM:SS 时间戳
    pub timestamp: String,
    /// 是否为本地伪随机回退结果
    pub fallback: bool,
}

/// 会话可变状态
pub struct SessionState {
    pub score: i64,
    pub history: ScoreHistory,
    pub frames_captured: u64,
    pub frames_sent: u64,
    pub last_error: Option<String>,
}

impl SessionState {
    pub fn new(initial_score: i64, history_cap: usize) -> Self {
        SessionState {
            score: initial_score,
            history: ScoreHistory::new(history_cap),
            frames_captured: 0,
            frames_sent: 0,
            last_error: None,
        }
    }

    /// 采纳后端的权威分数
    ///
    /// 变动量以新旧分数之差为准，分数按后端返回原样存储，
    /// 零变动不产生历史记录。返回本次变动量。
    pub fn apply_success(&mut self, updated_score: i64, explanation: &str) -> i64 {
        let change = updated_score - self.score;
        self.score = updated_score;
        if change != 0 {
            self.history.push(ScoreDelta::now(change, explanation));
        }
        self.frames_sent += 1;
        self.last_error = None;
        change
    }

    /// 后端不可用时的本地回退: 伪随机非零增量加固定文案
    ///
    /// 回退分数在本地夹取到 [0, 100]。返回 (变动量, 文案)。
    pub fn apply_fallback<R: Rng>(&mut self, rng: &mut R, error: String) -> (i64, String) {
        let mut change: i64 = 0;
        while change == 0 {
            change = rng.gen_range(FALLBACK_DELTA_MIN..=FALLBACK_DELTA_MAX);
        }
        let reason = FALLBACK_REASONS[rng.gen_range(0..FALLBACK_REASONS.len())];
        self.score = clamp_score(self.score + change);
        self.history.push(ScoreDelta::now(change, reason));
        self.last_error = Some(error);
        (change, reason.to_string())
    }
}

/// 一次完整采样流程的结果
enum TickOutcome {
    Published(AuraUpdate),
    Skipped,
}

/// 可复用的采样会话
pub struct CaptureSession {
    webcam: Mutex<Box<dyn FrameSource>>,
    screen: Mutex<Box<dyn FrameSource>>,
    encoder: JpegEncoder,
    client: AuraClient,
    state: Arc<Mutex<SessionState>>,
    updates: broadcast::Sender<AuraUpdate>,
}

impl CaptureSession {
    pub fn new(
        webcam: Box<dyn FrameSource>,
        screen: Box<dyn FrameSource>,
        client: AuraClient,
        cfg: &CaptureConfig,
    ) -> Self {
        let (updates, _) = broadcast::channel(64);
        CaptureSession {
            webcam: Mutex::new(webcam),
            screen: Mutex::new(screen),
            encoder: JpegEncoder::new(cfg.jpeg_quality, cfg.max_dimension),
            client,
            state: Arc::new(Mutex::new(SessionState::new(
                cfg.initial_score,
                cfg.history_cap,
            ))),
            updates,
        }
    }

    /// 订阅 aura_update 事件流
    pub fn subscribe(&self) -> broadcast::Receiver<AuraUpdate> {
        self.updates.subscribe()
    }

    pub fn state(&self) -> Arc<Mutex<SessionState>> {
        self.state.clone()
    }

    pub async fn current_score(&self) -> i64 {
        self.state.lock().await.score
    }

    /// 执行一次完整采样: 捕获、编码、提交、对账、广播
    pub async fn tick(&self) {
        match self.run_tick().await {
            Ok(TickOutcome::Published(update)) => {
                debug!(
                    "采样完成: 变动 {:+}, 总分 {}, 段位 {}",
                    update.change, update.score, update.tier
                );
                // 无订阅者时发送失败是正常情况
                let _ = self.updates.send(update);
            }
            Ok(TickOutcome::Skipped) => {}
            Err(e) => warn!("采样流程失败: {}", e),
        }
    }

    async fn run_tick(&self) -> Result<TickOutcome> {
        let webcam_frame = match self.capture_one(&self.webcam).await {
            Ok(frame) => frame,
            Err(e) => return self.handle_capture_error("摄像头", e).await,
        };
        let screen_frame = match self.capture_one(&self.screen).await {
            Ok(frame) => frame,
            Err(e) => return self.handle_capture_error("屏幕", e).await,
        };

        {
            let mut state = self.state.lock().await;
            state.frames_captured += 1;
            debug!(
                "画面捕获完成: 摄像头 {}x{}, 屏幕 {}x{} (第 {} 次)",
                webcam_frame.width,
                webcam_frame.height,
                screen_frame.width,
                screen_frame.height,
                state.frames_captured
            );
        }

        let webcam_payload = self.encoder.encode(&webcam_frame)?;
        let screen_payload = self.encoder.encode(&screen_frame)?;

        let current_score = self.current_score().await;
        let result = self
            .client
            .analyze(&webcam_payload.base64, &screen_payload.base64, current_score)
            .await;

        let mut state = self.state.lock().await;
        let (change, explanation, fallback) = match result {
            Ok(response) => {
                let explanation = response.explanation().to_string();
                let change = state.apply_success(response.updated_score, &explanation);
                (change, explanation, false)
            }
            Err(e) => {
                warn!("评分后端不可用，使用本地回退: {}", e);
                let mut rng = rand::thread_rng();
                let (change, reason) = state.apply_fallback(&mut rng, e.to_string());
                (change, reason, true)
            }
        };

        let tier = AuraTier::for_score(state.score);
        Ok(TickOutcome::Published(AuraUpdate {
            change,
            score: state.score,
            tier: tier.label().to_string(),
            tier_color: tier.color_band().to_string(),
            explanation,
            webcam_image: webcam_payload.base64,
            timestamp: chrono::Local::now().format("%H:%M:%S").to_string(),
            fallback,
        }))
    }

    /// 捕获单个来源，NotReady 时等待片刻重试一次
    async fn capture_one(
        &self,
        source: &Mutex<Box<dyn FrameSource>>,
    ) -> Result<crate::capture::Frame, CaptureError> {
        let mut source = source.lock().await;
        match source.capture() {
            Ok(frame) => Ok(frame),
            Err(CaptureError::NotReady) => {
                tokio::time::sleep(Duration::from_millis(RETRY_DELAY_MS)).await;
                source.capture()
            }
            Err(e) => Err(e),
        }
    }

    async fn handle_capture_error(
        &self,
        label: &str,
        error: CaptureError,
    ) -> Result<TickOutcome> {
        match error {
            CaptureError::PermissionDenied(msg) => {
                let mut state = self.state.lock().await;
                state.last_error = Some(format!("{}权限被拒绝: {}", label, msg));
                warn!("{}权限被拒绝，本轮跳过: {}", label, msg);
            }
            CaptureError::NotReady => {
                debug!("{}尚未就绪，本轮跳过", label);
            }
            CaptureError::Unavailable(msg) => {
                debug!("{}不可用，本轮跳过: {}", label, msg);
            }
        }
        Ok(TickOutcome::Skipped)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::{FrameSource, SourceKind, SyntheticSource};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn session_for_test(webcam: SyntheticSource, screen: SyntheticSource) -> CaptureSession {
        let cfg = CaptureConfig {
            interval_secs: 5,
            jpeg_quality: 80,
            max_dimension: None,
            webcam_source: SourceKind::Synthetic,
            screen_source: SourceKind::Synthetic,
            history_cap: 5,
            initial_score: 50,
        };
        // 端口 9 无服务监听，提交必然失败
        let client = AuraClient::new("http://127.0.0.1:9", 1).unwrap();
        CaptureSession::new(Box::new(webcam), Box::new(screen), client, &cfg)
    }

    #[tokio::test]
    async fn test_tick_skips_while_source_warming_up() {
        // 预热 2 次: 首次捕获与重试均未就绪，本轮应静默跳过
        let mut webcam = SyntheticSource::new(32, 24).with_warmup(2);
        let mut screen = SyntheticSource::new(32, 24);
        webcam.start().unwrap();
        screen.start().unwrap();

        let session = session_for_test(webcam, screen);
        let mut updates = session.subscribe();

        session.tick().await;
        {
            let state = session.state();
            let state = state.lock().await;
            assert_eq!(state.frames_captured, 0);
            assert_eq!(state.score, 50);
            assert!(state.history.is_empty());
            assert!(state.last_error.is_none());
        }
        assert!(matches!(
            updates.try_recv(),
            Err(broadcast::error::TryRecvError::Empty)
        ));

        // 预热结束后正常采样，后端不可达走本地回退
        session.tick().await;
        {
            let state = session.state();
            let state = state.lock().await;
            assert_eq!(state.frames_captured, 1);
            assert_eq!(state.history.len(), 1);
            assert!(state.last_error.is_some());
        }
        let update = updates.recv().await.unwrap();
        assert!(update.fallback);
        assert!(!update.webcam_image.is_empty());
    }

    #[test]
    fn test_apply_success_reconciles_against_backend() {
        let mut state = SessionState::new(50, 5);
        let change = state.apply_success(63, "Locked in");
        assert_eq!(change, 13);
        assert_eq!(state.score, 63);
        assert_eq!(state.frames_sent, 1);
        assert_eq!(state.history.len(), 1);
        assert!(state.last_error.is_none());
    }

    #[test]
    fn test_apply_success_zero_change_skips_history() {
        let mut state = SessionState::new(50, 5);
        let change = state.apply_success(50, "Steady");
        assert_eq!(change, 0);
        assert!(state.history.is_empty());
        assert_eq!(state.frames_sent, 1);
    }

    #[test]
    fn test_apply_success_stores_backend_score_verbatim() {
        // 后端分数即使越界也原样采纳
        let mut state = SessionState::new(90, 5);
        state.apply_success(120, "On fire");
        assert_eq!(state.score, 120);
    }

    #[test]
    fn test_apply_fallback_records_exactly_one_entry() {
        let mut rng = StdRng::seed_from_u64(7);
        let mut state = SessionState::new(50, 5);
        let (change, reason) = state.apply_fallback(&mut rng, "connection refused".into());
        assert_ne!(change, 0);
        assert!((FALLBACK_DELTA_MIN..=FALLBACK_DELTA_MAX).contains(&change));
        assert!(FALLBACK_REASONS.contains(&reason.as_str()));
        assert_eq!(state.history.len(), 1);
        assert_eq!(state.score, clamp_score(50 + change));
        assert_eq!(state.last_error.as_deref(), Some("connection refused"));
    }

    #[test]
    fn test_apply_fallback_clamps_to_bounds() {
        let mut rng = StdRng::seed_from_u64(1);
        for initial in [0i64, 2, 98, 100] {
            let mut state = SessionState::new(initial, 5);
            for _ in 0..50 {
                state.apply_fallback(&mut rng, "down".into());
                assert!((0..=100).contains(&state.score));
            }
        }
    }

    #[test]
    fn test_aura_update_serialization() {
        let update = AuraUpdate {
            change: 13,
            score: 63,
            tier: "Function Fanatic".into(),
            tier_color: "from-yellow-300 to-green-400".into(),
            explanation: "Good code structure detected".into(),
            webcam_image: "d2ViY2Ft".into(),
            timestamp: "12:00:00".into(),
            fallback: false,
        };
        let json = serde_json::to_value(&update).unwrap();
        assert_eq!(json["change"], 13);
        assert_eq!(json["score"], 63);
        assert_eq!(json["tier"], "Function Fanatic");
        assert_eq!(json["fallback"], false);
    }
}
