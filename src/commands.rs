//! Command handlers for dmpn utility commands
//!
//! This module contains logging setup and the config generation command.

use anyhow::Result;
use std::path::PathBuf;

use crate::config;

/// Initialize logging with the specified verbosity level
pub fn init_logging(verbose: u8) {
    use std::str::FromStr;
    use tracing::Level;

    let log_level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    let level = Level::from_str(log_level).unwrap_or(Level::INFO);

    tracing_subscriber::fmt()
        .with_target(false)
        .with_level(true)
        .with_max_level(level)
        .init();
}

/// Handle config generation command
pub fn handle_generate_config(path: Option<String>) -> Result<()> {
    use anyhow::anyhow;

    let config_path = if let Some(p) = path {
        PathBuf::from(p)
    } else {
        PathBuf::from(config::Config::get_config_path(None))
    };

    println!("生成配置文件: {}", config_path.display());

    // 检查文件是否已存在
    if config_path.exists() {
        println!("⚠ 配置文件已存在");
        print!("是否覆盖? (y/N): ");
        use std::io::Write;
        std::io::stdout().flush().ok();

        let mut input = String::new();
        std::io::stdin().read_line(&mut input).ok();
        if !input.trim().to_lowercase().starts_with('y') {
            println!("已取消");
            return Ok(());
        }
    }

    // 创建默认配置
    let default_config = config::Config::default();

    // 序列化为 TOML
    let toml_string = toml::to_string_pretty(&default_config)
        .map_err(|e| anyhow!("序列化配置失败: {}", e))?;

    // 写入文件
    std::fs::write(&config_path, toml_string)
        .map_err(|e| anyhow!("写入配置文件失败: {}", e))?;

    println!("✓ 配置文件已生成: {}", config_path.display());
    println!();
    println!("配置内容:");
    println!("  设备 ID:   {}", default_config.backend.device_id);
    println!("  评分后端:  {}", default_config.backend.url);
    println!("  采样间隔:  {} 秒", default_config.capture.interval_secs);
    println!("  推送端口:  {}", default_config.feed.port);

    Ok(())
}
