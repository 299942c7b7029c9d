//! CLI argument definitions for dmpn
//!
//! This module contains all command-line argument parsing logic.

use clap::{Parser, Subcommand};

/// dmpn - 命令行参数
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// 配置文件路径
    #[arg(short, long)]
    pub config: Option<String>,

    /// 评分后端 URL
    #[arg(short, long)]
    pub server: Option<String>,

    /// 采样间隔 (秒，1-30)
    #[arg(short, long)]
    pub interval: Option<u64>,

    /// 日志级别 (0=warn, 1=info, 2=debug, 3=trace)
    #[arg(short, long)]
    pub verbose: Option<u8>,
}

/// 子命令
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// 仪表盘模式 - 周期性采样并提交评分后端 (默认)
    Run {
        /// 监控推送服务器端口 (默认 9600)
        #[arg(short, long)]
        feed_port: Option<u16>,

        /// 禁用监控推送服务器
        #[arg(long)]
        no_feed: bool,
    },

    /// 排位模式 - 与模拟对手进行限时对局
    Ranked {
        /// 对局时长 (分钟，2-30)
        #[arg(short, long)]
        duration: Option<u64>,

        /// 采样间隔 (秒，1-30)
        #[arg(short, long)]
        interval: Option<u64>,
    },

    /// 监控模式 - 连接运行中的仪表盘查看实时事件
    Monitor {
        /// 推送服务器地址
        #[arg(long, default_value = "ws://127.0.0.1:9600")]
        url: String,
    },

    /// 生成配置文件
    Config {
        /// 配置文件路径
        #[arg(short, long)]
        path: Option<String>,
    },
}
