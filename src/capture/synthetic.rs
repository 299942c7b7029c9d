//! 合成测试画面来源
//!
//! 生成确定性的渐变测试图案，用于摄像头占位、演示和测试。
//! 真实摄像头后端可以实现 FrameSource 直接替换。

use super::{CaptureError, Frame, FrameSource};

/// 合成画面来源
pub struct SyntheticSource {
    width: u32,
    height: u32,
    tick: u64,
    /// 前 N 次捕获返回 NotReady，模拟设备预热
    warmup: u32,
    started: bool,
}

impl SyntheticSource {
    pub fn new(width: u32, height: u32) -> Self {
        SyntheticSource {
            width,
            height,
            tick: 0,
            warmup: 0,
            started: false,
        }
    }

    /// 设置预热次数 (前 N 次捕获返回 NotReady)
    pub fn with_warmup(mut self, warmup: u32) -> Self {
        self.warmup = warmup;
        self
    }

    /// 生成第 tick 帧的测试图案
    fn render(&self) -> Vec<u8> {
        let mut data = Vec::with_capacity((self.width * self.height * 4) as usize);
        let t = self.tick as u32;
        for y in 0..self.height {
            for x in 0..self.width {
                data.push(((x + t * 7) % 256) as u8); // R
                data.push((y % 256) as u8); // G
                data.push(((x + y + t * 3) % 256) as u8); // B
                data.push(255); // A
            }
        }
        data
    }
}

impl FrameSource for SyntheticSource {
    fn start(&mut self) -> Result<(), CaptureError> {
        self.started = true;
        tracing::debug!("合成来源初始化: {}x{}", self.width, self.height);
        Ok(())
    }

    fn capture(&mut self) -> Result<Frame, CaptureError> {
        if !self.started {
            return Err(CaptureError::NotReady);
        }
        if self.warmup > 0 {
            self.warmup -= 1;
            return Err(CaptureError::NotReady);
        }

        let data = self.render();
        self.tick += 1;
        Ok(Frame::from_raw_data(self.width, self.height, data))
    }

    fn width(&self) -> u32 {
        self.width
    }

    fn height(&self) -> u32 {
        self.height
    }

    fn stop(&mut self) {
        self.started = false;
    }

    fn name(&self) -> &str {
        "synthetic"
    }
}
