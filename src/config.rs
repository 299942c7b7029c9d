//! 配置管理模块
//!
//! 负责加载和管理应用程序配置

use crate::capture::SourceKind;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use uuid::Uuid;

/// 捕获间隔下限 (秒)
pub const MIN_INTERVAL_SECS: u64 = 1;
/// 捕获间隔上限 (秒)
pub const MAX_INTERVAL_SECS: u64 = 30;

/// 应用程序配置
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    pub backend: BackendConfig,
    pub capture: CaptureConfig,
    /// 排位模式配置
    #[serde(default)]
    pub ranked: RankedConfig,
    /// aura_update 推送配置
    #[serde(default)]
    pub feed: FeedConfig,
    pub logging: LoggingConfig,
}

/// 评分后端配置
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BackendConfig {
    /// 评分后端地址 (HTTP)
    pub url: String,
    /// 设备 ID (自动生成或手动指定)
    #[serde(default = "default_device_id")]
    pub device_id: String,
    /// 请求超时 (秒)
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

/// 捕获配置
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CaptureConfig {
    /// 捕获间隔 (秒)，范围 1-30
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,
    /// JPEG 编码质量 (1-100)
    #[serde(default = "default_jpeg_quality")]
    pub jpeg_quality: u8,
    /// 编码前的最长边限制 (None = 不缩放)
    #[serde(default)]
    pub max_dimension: Option<u32>,
    /// 摄像头画面来源
    #[serde(default = "default_webcam_source")]
    pub webcam_source: SourceKind,
    /// 屏幕画面来源
    #[serde(default = "default_screen_source")]
    pub screen_source: SourceKind,
    /// 分数历史条数上限
    #[serde(default = "default_history_cap")]
    pub history_cap: usize,
    /// 初始气场分数
    #[serde(default = "default_initial_score")]
    pub initial_score: i64,
}

/// 排位模式配置
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RankedConfig {
    /// 对局时长 (分钟)，范围 2-30
    #[serde(default = "default_duration_mins")]
    pub duration_mins: u64,
}

/// aura_update 推送服务配置
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FeedConfig {
    /// WebSocket 监听端口
    #[serde(default = "default_feed_port")]
    pub port: u16,
    /// 新订阅者回放的最近更新条数
    #[serde(default = "default_replay_cap")]
    pub replay_cap: usize,
}

/// 日志配置
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    /// 日志级别: trace, debug, info, warn, error
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            backend: BackendConfig::default(),
            capture: CaptureConfig::default(),
            ranked: RankedConfig::default(),
            feed: FeedConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for BackendConfig {
    fn default() -> Self {
        BackendConfig {
            url: "http://127.0.0.1:5000".to_string(),
            device_id: Uuid::new_v4().to_string(),
            timeout_secs: 10,
        }
    }
}

impl Default for CaptureConfig {
    fn default() -> Self {
        CaptureConfig {
            interval_secs: 5,
            jpeg_quality: 80,
            max_dimension: Some(1280),
            webcam_source: SourceKind::Synthetic,
            screen_source: SourceKind::Screen,
            history_cap: 5,
            initial_score: 50,
        }
    }
}

impl Default for RankedConfig {
    fn default() -> Self {
        RankedConfig { duration_mins: 10 }
    }
}

impl Default for FeedConfig {
    fn default() -> Self {
        FeedConfig {
            port: 9600,
            replay_cap: 10,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        LoggingConfig {
            level: "info".to_string(),
        }
    }
}

fn default_device_id() -> String {
    Uuid::new_v4().to_string()
}

fn default_timeout_secs() -> u64 {
    10
}

fn default_interval_secs() -> u64 {
    5
}

fn default_jpeg_quality() -> u8 {
    80
}

fn default_webcam_source() -> SourceKind {
    SourceKind::Synthetic
}

fn default_screen_source() -> SourceKind {
    SourceKind::Screen
}

fn default_history_cap() -> usize {
    5
}

fn default_initial_score() -> i64 {
    50
}

fn default_duration_mins() -> u64 {
    10
}

fn default_feed_port() -> u16 {
    9600
}

fn default_replay_cap() -> usize {
    10
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Config {
    /// 从文件加载配置
    ///
    /// 如果文件不存在，返回默认配置
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        if !path.exists() {
            tracing::warn!("配置文件不存在: {:?}, 使用默认配置", path);
            return Ok(Config::default());
        }

        let content = fs::read_to_string(path)?;
        let mut config: Config = toml::from_str(&content)
            .map_err(|e| anyhow::anyhow!("配置文件解析失败: {}", e))?;
        config.normalize();

        tracing::info!("配置加载成功: {:?}", path);
        Ok(config)
    }

    /// 保存配置到文件
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        fs::write(path.as_ref(), content)?;
        Ok(())
    }

    /// 将越界的配置值拉回合法范围
    pub fn normalize(&mut self) {
        let interval = self
            .capture
            .interval_secs
            .clamp(MIN_INTERVAL_SECS, MAX_INTERVAL_SECS);
        if interval != self.capture.interval_secs {
            tracing::warn!(
                "捕获间隔 {} 秒越界，已调整为 {} 秒",
                self.capture.interval_secs,
                interval
            );
            self.capture.interval_secs = interval;
        }

        let duration = self.ranked.duration_mins.clamp(2, 30);
        if duration != self.ranked.duration_mins {
            tracing::warn!(
                "对局时长 {} 分钟越界，已调整为 {} 分钟",
                self.ranked.duration_mins,
                duration
            );
            self.ranked.duration_mins = duration;
        }

        if self.capture.jpeg_quality == 0 || self.capture.jpeg_quality > 100 {
            self.capture.jpeg_quality = default_jpeg_quality();
        }
        if self.capture.history_cap == 0 {
            self.capture.history_cap = default_history_cap();
        }
    }

    /// 获取配置文件路径
    ///
    /// 优先级: 命令行指定 > 当前目录 > 用户主目录
    pub fn get_config_path(cli_path: Option<&str>) -> String {
        if let Some(p) = cli_path {
            return p.to_string();
        }

        // 首先检查当前目录
        if Path::new("config.toml").exists() {
            return "config.toml".to_string();
        }

        // 然后检查用户配置目录
        if let Ok(home) = std::env::var("HOME") {
            let config_dir = format!("{}/.config/dmpn", home);
            let config_path = format!("{}/config.toml", config_dir);
            if Path::new(&config_path).exists() {
                return config_path;
            }
        }

        // 默认返回当前目录的配置文件路径
        "config.toml".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.capture.interval_secs, 5);
        assert_eq!(config.capture.initial_score, 50);
        assert_eq!(config.logging.level, "info");
        assert!(!config.backend.device_id.is_empty());
    }

    #[test]
    fn test_config_serialization() {
        let config = Config::default();
        let toml_str = toml::to_string(&config).unwrap();
        let _parsed: Config = toml::from_str(&toml_str).unwrap();
    }

    #[test]
    fn test_normalize_clamps_interval() {
        let mut config = Config::default();
        config.capture.interval_secs = 120;
        config.normalize();
        assert_eq!(config.capture.interval_secs, MAX_INTERVAL_SECS);

        config.capture.interval_secs = 0;
        config.normalize();
        assert_eq!(config.capture.interval_secs, MIN_INTERVAL_SECS);
    }

    #[test]
    fn test_normalize_clamps_duration() {
        let mut config = Config::default();
        config.ranked.duration_mins = 1;
        config.normalize();
        assert_eq!(config.ranked.duration_mins, 2);
    }
}
