//! 仪表盘模式
//!
//! 常驻的默认模式: 周期性采样、提交评分后端、
//! 在控制台打印每次更新，同时向监控推送服务器转发事件。

use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tracing::{error, info, warn};

use crate::admin::AuraFeedServer;
use crate::backend::AuraClient;
use crate::capture::{self, CaptureError};
use crate::config::Config;
use crate::scheduler::TickScheduler;
use crate::scoring::{reaction_for, AuraTier};
use crate::session::{AuraUpdate, CaptureSession};

/// 运行仪表盘模式
pub async fn run_dashboard_mode(
    config: Config,
    feed_port: Option<u16>,
    enable_feed: bool,
) -> Result<()> {
    info!("dmpn 仪表盘模式启动...");
    info!("设备 ID: {}", config.backend.device_id);

    // 初始化采集来源
    let mut webcam = capture::create_source(config.capture.webcam_source);
    let mut screen = capture::create_source(config.capture.screen_source);

    start_source(webcam.as_mut(), "摄像头");
    start_source(screen.as_mut(), "屏幕");

    let client = AuraClient::new(&config.backend.url, config.backend.timeout_secs)?;
    info!("评分后端: {}", client.base_url());

    let session = Arc::new(CaptureSession::new(webcam, screen, client, &config.capture));

    // 启动监控推送服务器
    let feed_server = if enable_feed {
        let port = feed_port.unwrap_or(config.feed.port);
        let mut server = AuraFeedServer::new(port, config.feed.replay_cap);
        let actual_port = server.start().await?;
        server.forward(session.subscribe());
        print_startup_info(&config, Some(actual_port));
        Some(server)
    } else {
        print_startup_info(&config, None);
        None
    };

    // 控制台输出任务
    let mut updates = session.subscribe();
    let printer = tokio::spawn(async move {
        while let Ok(update) = updates.recv().await {
            print_update(&update);
        }
    });

    // 采样调度，第一次采样立即执行
    let mut scheduler = TickScheduler::new();
    let session_for_tick = session.clone();
    scheduler.start(
        Duration::from_secs(config.capture.interval_secs),
        move || {
            let session = session_for_tick.clone();
            tokio::spawn(async move {
                session.tick().await;
            });
        },
    );

    // 等待退出信号
    if let Err(e) = signal::ctrl_c().await {
        error!("无法监听 Ctrl+C 信号: {}", e);
        return Ok(());
    }
    info!("收到退出信号，正在关闭...");

    // 清理
    scheduler.stop();
    printer.abort();
    if let Some(server) = feed_server {
        server.stop();
    }

    print_summary(&session).await;

    info!("仪表盘模式已退出");
    Ok(())
}

/// 启动采集来源，权限错误只警告不中止
fn start_source(source: &mut dyn capture::FrameSource, label: &str) {
    match source.start() {
        Ok(()) => info!("{}采集已就绪: {}", label, source.name()),
        Err(CaptureError::PermissionDenied(msg)) => {
            warn!("{}权限被拒绝，将跳过该来源: {}", label, msg);
        }
        Err(e) => {
            warn!("{}启动失败，将跳过该来源: {}", label, e);
        }
    }
}

fn print_startup_info(config: &Config, feed_port: Option<u16>) {
    println!();
    println!("========================================");
    println!("  Developer Monitoring Pseudoscience Network");
    println!("========================================");
    println!();
    println!("  评分后端:  {}", config.backend.url);
    println!("  采样间隔:  {} 秒", config.capture.interval_secs);
    println!("  初始分数:  {}", config.capture.initial_score);
    if let Some(port) = feed_port {
        println!();
        println!("管理监控连接命令:");
        println!("  dmpn monitor --url ws://127.0.0.1:{}", port);
    }
    println!();
    println!("监控中... (按 Ctrl+C 退出)");
    println!();
}

fn print_update(update: &AuraUpdate) {
    let reaction = reaction_for(update.change);
    let tag = if update.fallback { " [本地回退]" } else { "" };
    println!(
        "  [{}] {} {:+} -> {} ({}){}  {}",
        update.timestamp, reaction, update.change, update.score, update.tier, tag,
        update.explanation
    );
}

async fn print_summary(session: &CaptureSession) {
    let state = session.state();
    let state = state.lock().await;
    let tier = AuraTier::for_score(state.score);
    println!();
    println!("========================================");
    println!("  会话结束");
    println!("========================================");
    println!();
    println!("  最终分数:  {} ({})", state.score, tier.label());
    println!("  采样帧数:  {}", state.frames_captured);
    println!("  提交成功:  {}", state.frames_sent);
    if let Some(ref err) = state.last_error {
        println!("  最近错误:  {}", err);
    }
    println!();
}
