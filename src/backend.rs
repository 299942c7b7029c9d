//! 评分后端客户端
//!
//! 与外部评分服务的唯一 HTTP 契约: POST /analyze_aura

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// 分析请求体
#[derive(Debug, Serialize)]
pub struct AnalyzeRequest<'a> {
    /// base64 编码的摄像头 JPEG
    pub webcam_image: &'a str,
    /// base64 编码的屏幕截图 JPEG
    pub screenshot: &'a str,
    /// 客户端当前已知分数
    pub current_score: i64,
}

/// 分析响应体
///
/// 后端另外会返回 score_change 字段，容忍但不依赖
#[derive(Debug, Clone, Deserialize)]
pub struct AnalyzeResponse {
    /// 权威的最新分数
    pub updated_score: i64,
    /// 对画面的分析文案
    pub analysis: String,
    /// 变动原因 (可选)
    #[serde(default)]
    pub reason: Option<String>,
    #[serde(default)]
    pub score_change: Option<i64>,
}

impl AnalyzeResponse {
    /// 展示用的解释文案: 优先 reason，其次 analysis
    pub fn explanation(&self) -> &str {
        match self.reason.as_deref() {
            Some(r) if !r.is_empty() => r,
            _ => &self.analysis,
        }
    }
}

/// 评分后端 HTTP 客户端
pub struct AuraClient {
    http: reqwest::Client,
    base_url: String,
}

impl AuraClient {
    /// 创建客户端
    pub fn new(base_url: impl Into<String>, timeout_secs: u64) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| anyhow!("创建 HTTP 客户端失败: {}", e))?;

        Ok(AuraClient {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    /// 提交一次采样并获取权威分数
    pub async fn analyze(
        &self,
        webcam_image: &str,
        screenshot: &str,
        current_score: i64,
    ) -> Result<AnalyzeResponse> {
        let url = format!("{}/analyze_aura", self.base_url);
        let request = AnalyzeRequest {
            webcam_image,
            screenshot,
            current_score,
        };

        let response = self
            .http
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| anyhow!("请求评分后端失败: {}", e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(anyhow!("评分后端返回错误状态 {}: {}", status, body));
        }

        response
            .json::<AnalyzeResponse>()
            .await
            .map_err(|e| anyhow!("解析评分响应失败: {}", e))
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}
