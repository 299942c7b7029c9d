//! 监控模式
//!
//! 管理端: 通过 WebSocket 连接运行中的仪表盘推送服务器，
//! 实时打印 aura_update 事件。

use anyhow::{Context, Result};
use futures_util::StreamExt;
use tokio_tungstenite::connect_async;
use tracing::{debug, info};
use tungstenite::protocol::Message;

use crate::admin::FeedMessage;
use crate::scoring::reaction_for;
use crate::session::AuraUpdate;

/// 运行监控模式，连接推送服务器并持续打印事件
pub async fn run_monitor_mode(url: &str) -> Result<()> {
    info!("dmpn 监控模式启动...");
    info!("目标地址: {}", url);

    let (ws_stream, _) = connect_async(url)
        .await
        .with_context(|| format!("连接推送服务器失败: {}", url))?;
    let (_, mut ws_receiver) = ws_stream.split();

    println!();
    println!("========================================");
    println!("  DMPN Admin Monitor");
    println!("========================================");
    println!();
    println!("  推送服务器: {}", url);
    println!();
    println!("等待事件中... (按 Ctrl+C 退出)");
    println!();

    loop {
        tokio::select! {
            msg = ws_receiver.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        match serde_json::from_str::<FeedMessage>(&text) {
                            Ok(FeedMessage::AuraUpdate(update)) => print_update(&update),
                            Err(e) => debug!("忽略无法解析的消息: {}", e),
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => {
                        println!();
                        println!("推送服务器已断开");
                        break;
                    }
                    Some(Err(e)) => {
                        anyhow::bail!("接收事件失败: {}", e);
                    }
                    _ => {}
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("收到退出信号，正在关闭...");
                break;
            }
        }
    }

    info!("监控模式已退出");
    Ok(())
}

fn print_update(update: &AuraUpdate) {
    let tag = if update.fallback { " [本地回退]" } else { "" };
    println!(
        "  [{}] {} {:+} -> {} ({}){}  {}",
        update.timestamp,
        reaction_for(update.change),
        update.change,
        update.score,
        update.tier,
        tag,
        update.explanation
    );
}
