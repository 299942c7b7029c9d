//! dmpn - Developer Monitoring Pseudoscience Network
//!
//! 无界面的开发者气场监控代理: 周期性采集摄像头与屏幕画面，
//! 提交外部评分后端换取权威分数，在后端不可用时本地伪随机兜底，
//! 并通过 WebSocket 向管理监控端实时推送每次更新。

pub mod admin;
pub mod backend;
pub mod capture;
pub mod cli;
pub mod commands;
pub mod config;
pub mod dashboard_mode;
pub mod encoder;
pub mod monitor_mode;
pub mod opponent;
pub mod ranked;
pub mod scheduler;
pub mod scoring;
pub mod session;
