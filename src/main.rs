//! dmpn - 开发者气场监控代理
//!
//! 主入口程序

use anyhow::Result;
use clap::Parser;

use dmpn::cli::{Args, Commands};
use dmpn::commands;
use dmpn::config::Config;
use dmpn::{dashboard_mode, monitor_mode, ranked};

#[tokio::main]
async fn main() -> Result<()> {
    // 解析命令行参数
    let args = Args::parse();

    commands::init_logging(args.verbose.unwrap_or(1));

    let command = match args.command {
        Some(Commands::Monitor { url }) => return monitor_mode::run_monitor_mode(&url).await,
        Some(Commands::Config { path }) => return commands::handle_generate_config(path),
        command => command,
    };

    // 加载配置，命令行参数覆盖配置文件
    let config_path = Config::get_config_path(args.config.as_deref());
    let mut config = Config::load(&config_path)?;

    if let Some(server) = args.server {
        config.backend.url = server;
    }
    if let Some(interval) = args.interval {
        config.capture.interval_secs = interval;
    }

    match command {
        Some(Commands::Ranked { duration, interval }) => {
            if let Some(duration) = duration {
                config.ranked.duration_mins = duration;
            }
            if let Some(interval) = interval {
                config.capture.interval_secs = interval;
            }
            config.normalize();
            ranked::run_ranked_mode(config).await
        }
        Some(Commands::Run { feed_port, no_feed }) => {
            config.normalize();
            dashboard_mode::run_dashboard_mode(config, feed_port, !no_feed).await
        }
        // 默认进入仪表盘模式
        _ => {
            config.normalize();
            dashboard_mode::run_dashboard_mode(config, None, true).await
        }
    }
}
