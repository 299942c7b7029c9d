//! 帧编码模块
//!
//! 将 RGBA 帧压缩为 JPEG 并编码为 base64 负载

use crate::capture::{CaptureError, Frame};
use anyhow::{anyhow, Result};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use image::codecs::jpeg::JpegEncoder as ImageJpegEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, RgbaImage};
use std::io::Cursor;

/// 编码后的图像负载
#[derive(Debug, Clone)]
pub struct ImagePayload {
    /// base64 编码的 JPEG 数据 (不含 data URL 前缀)
    pub base64: String,
    pub width: u32,
    pub height: u32,
    /// JPEG 字节数 (base64 编码前)
    pub jpeg_bytes: usize,
}

/// JPEG 帧编码器
pub struct JpegEncoder {
    quality: u8,
    max_dimension: Option<u32>,
}

impl JpegEncoder {
    pub fn new(quality: u8, max_dimension: Option<u32>) -> Self {
        JpegEncoder {
            quality: quality.clamp(1, 100),
            max_dimension,
        }
    }

    /// 编码一帧为 base64 JPEG 负载
    ///
    /// 维度为零的帧视为未就绪，拒绝编码
    pub fn encode(&self, frame: &Frame) -> Result<ImagePayload> {
        if !frame.is_ready() {
            return Err(CaptureError::NotReady.into());
        }

        let rgba = RgbaImage::from_raw(frame.width, frame.height, frame.data.clone())
            .ok_or_else(|| anyhow!("帧数据与维度不匹配: {}x{}", frame.width, frame.height))?;

        // JPEG 不支持透明通道，先转 RGB
        let mut img = DynamicImage::ImageRgba8(rgba);

        // 超出最长边限制时按比例缩小
        if let Some(max_dim) = self.max_dimension {
            if frame.width.max(frame.height) > max_dim {
                img = img.resize(max_dim, max_dim, FilterType::Triangle);
            }
        }

        let rgb = img.to_rgb8();
        let (width, height) = (rgb.width(), rgb.height());

        let mut buf = Cursor::new(Vec::new());
        ImageJpegEncoder::new_with_quality(&mut buf, self.quality)
            .encode_image(&rgb)
            .map_err(|e| anyhow!("JPEG 编码失败: {}", e))?;

        let jpeg = buf.into_inner();
        let jpeg_bytes = jpeg.len();

        Ok(ImagePayload {
            base64: BASE64.encode(jpeg),
            width,
            height,
            jpeg_bytes,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::{FrameSource, SyntheticSource};

    fn test_frame(width: u32, height: u32) -> Frame {
        let mut source = SyntheticSource::new(width, height);
        source.start().unwrap();
        source.capture().unwrap()
    }

    #[test]
    fn test_encode_produces_valid_base64_jpeg() {
        let encoder = JpegEncoder::new(80, None);
        let payload = encoder.encode(&test_frame(64, 48)).unwrap();

        assert_eq!(payload.width, 64);
        assert_eq!(payload.height, 48);
        assert!(payload.jpeg_bytes > 0);

        // base64 解码后应为 JPEG (SOI 标记 0xFFD8)
        let bytes = BASE64.decode(&payload.base64).unwrap();
        assert_eq!(&bytes[..2], &[0xFF, 0xD8]);
    }

    #[test]
    fn test_encode_rejects_empty_frame() {
        let encoder = JpegEncoder::new(80, None);
        let frame = Frame::from_raw_data(0, 0, Vec::new());
        assert!(encoder.encode(&frame).is_err());
    }

    #[test]
    fn test_downscale_respects_max_dimension() {
        let encoder = JpegEncoder::new(80, Some(32));
        let payload = encoder.encode(&test_frame(128, 64)).unwrap();
        assert!(payload.width <= 32);
        assert!(payload.height <= 32);
    }
}
