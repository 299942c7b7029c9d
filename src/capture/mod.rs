//! 画面捕获模块
//!
//! 提供摄像头/屏幕两路画面的统一抽象

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod screen;
pub mod synthetic;

pub use screen::ScreenSource;
pub use synthetic::SyntheticSource;

/// 视频帧
#[derive(Debug, Clone)]
pub struct Frame {
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>, // RGBA 格式
    pub timestamp: u64, // 时间戳 (毫秒)
}

impl Frame {
    /// 从原始 RGBA 数据创建帧
    pub fn from_raw_data(width: u32, height: u32, data: Vec<u8>) -> Self {
        Frame {
            width,
            height,
            data,
            timestamp: Self::current_timestamp(),
        }
    }

    /// 获取当前时间戳 (毫秒)
    pub fn current_timestamp() -> u64 {
        use std::time::{SystemTime, UNIX_EPOCH};
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0)
    }

    /// 画面是否已就绪 (两个维度均非零)
    pub fn is_ready(&self) -> bool {
        self.width > 0 && self.height > 0
    }
}

/// 捕获错误分类
///
/// 调用方按类别决定处理方式: 权限问题持久提示、画面未就绪
/// 短暂延迟后重试、来源不可用则静默跳过本次采样
#[derive(Debug, Error)]
pub enum CaptureError {
    /// 捕获权限未授予，需要用户干预，不自动重试
    #[error("捕获权限未授予: {0}")]
    PermissionDenied(String),

    /// 画面维度尚未就绪，稍后重试
    #[error("画面尚未就绪")]
    NotReady,

    /// 来源不可用 (设备缺失、枚举失败等)
    #[error("捕获源不可用: {0}")]
    Unavailable(String),
}

/// 画面来源 trait
pub trait FrameSource: Send {
    /// 开始捕获 (申请设备、完成初始化)
    fn start(&mut self) -> Result<(), CaptureError>;

    /// 捕获一帧画面
    fn capture(&mut self) -> Result<Frame, CaptureError>;

    /// 画面宽度 (未就绪时为 0)
    fn width(&self) -> u32;

    /// 画面高度 (未就绪时为 0)
    fn height(&self) -> u32;

    /// 停止捕获并释放设备
    fn stop(&mut self);

    /// 来源名称 (用于日志)
    fn name(&self) -> &str;
}

/// 画面来源类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    /// 主显示器屏幕捕获
    Screen,
    /// 合成测试画面 (摄像头后端就位前的占位来源)
    Synthetic,
}

/// 创建指定类型的画面来源
pub fn create_source(kind: SourceKind) -> Box<dyn FrameSource> {
    match kind {
        SourceKind::Screen => Box::new(ScreenSource::new()),
        SourceKind::Synthetic => Box::new(SyntheticSource::new(640, 480)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_readiness() {
        let frame = Frame::from_raw_data(640, 480, vec![0u8; 640 * 480 * 4]);
        assert!(frame.is_ready());

        let empty = Frame::from_raw_data(0, 0, Vec::new());
        assert!(!empty.is_ready());
    }

    #[test]
    fn test_source_kind_serde() {
        let kind: SourceKind = serde_json::from_str("\"synthetic\"").unwrap();
        assert_eq!(kind, SourceKind::Synthetic);
        let json = serde_json::to_string(&SourceKind::Screen).unwrap();
        assert_eq!(json, "\"screen\"");
    }

    #[test]
    fn test_create_synthetic_source() {
        let mut source = create_source(SourceKind::Synthetic);
        source.start().expect("合成来源应始终可用");
        let frame = source.capture().expect("合成来源捕获失败");
        assert!(frame.is_ready());
    }
}
