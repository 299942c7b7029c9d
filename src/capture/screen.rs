//! 屏幕捕获来源
//!
//! 通过 xcap 捕获主显示器画面

use super::{CaptureError, Frame, FrameSource};
use xcap::Monitor;

/// 主显示器屏幕来源
///
/// 尺寸在 start 时缓存，捕获期间视为不变
pub struct ScreenSource {
    monitor: Option<Monitor>,
    width: u32,
    height: u32,
}

impl ScreenSource {
    pub fn new() -> Self {
        ScreenSource {
            monitor: None,
            width: 0,
            height: 0,
        }
    }

    /// 枚举显示器并选择主显示器
    fn select_monitor() -> Result<Monitor, CaptureError> {
        let mut monitors = Monitor::all()
            .map_err(|e| CaptureError::PermissionDenied(format!("无法枚举显示器: {}", e)))?;

        if monitors.is_empty() {
            return Err(CaptureError::Unavailable("未找到显示器".to_string()));
        }

        // 优先主显示器，否则取第一个
        let idx = monitors
            .iter()
            .position(|m| m.is_primary().unwrap_or(false))
            .unwrap_or(0);
        Ok(monitors.swap_remove(idx))
    }
}

impl Default for ScreenSource {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameSource for ScreenSource {
    fn start(&mut self) -> Result<(), CaptureError> {
        let monitor = Self::select_monitor()?;

        let name = monitor.name().unwrap_or_else(|_| "unknown".to_string());
        self.width = monitor
            .width()
            .map_err(|e| CaptureError::Unavailable(format!("无法读取显示器宽度: {}", e)))?;
        self.height = monitor
            .height()
            .map_err(|e| CaptureError::Unavailable(format!("无法读取显示器高度: {}", e)))?;

        tracing::info!("屏幕来源初始化: {} ({}x{})", name, self.width, self.height);
        self.monitor = Some(monitor);
        Ok(())
    }

    fn capture(&mut self) -> Result<Frame, CaptureError> {
        let monitor = self.monitor.as_ref().ok_or(CaptureError::NotReady)?;

        if self.width == 0 || self.height == 0 {
            return Err(CaptureError::NotReady);
        }

        let image = monitor
            .capture_image()
            .map_err(|e| CaptureError::Unavailable(format!("屏幕捕获失败: {}", e)))?;

        let (width, height) = (image.width(), image.height());
        Ok(Frame::from_raw_data(width, height, image.into_raw()))
    }

    fn width(&self) -> u32 {
        self.width
    }

    fn height(&self) -> u32 {
        self.height
    }

    fn stop(&mut self) {
        self.monitor = None;
        self.width = 0;
        self.height = 0;
    }

    fn name(&self) -> &str {
        "screen"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capture_before_start_not_ready() {
        let mut source = ScreenSource::new();
        assert!(matches!(source.capture(), Err(CaptureError::NotReady)));
        assert_eq!(source.width(), 0);
        assert_eq!(source.height(), 0);
    }
}
