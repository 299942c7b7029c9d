//! 排位模式
//!
//! 限时对局: 本地模拟匹配一个对手，玩家与对手在同一个
//! 采样节奏下各自累积分数，时间到后按分数判定胜负。

use anyhow::Result;
use rand::Rng;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tokio::sync::Mutex;
use tracing::{error, info, warn};

use crate::backend::AuraClient;
use crate::capture::{self, CaptureError};
use crate::config::Config;
use crate::opponent::{self, SimulatedOpponent};
use crate::scheduler::TickScheduler;
use crate::scoring::reaction_for;
use crate::session::CaptureSession;

/// 对局结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchOutcome {
    Victory,
    Defeat,
    Draw,
}

impl MatchOutcome {
    /// 按最终分数判定胜负
    pub fn decide(player_score: i64, opponent_score: i64) -> Self {
        match player_score.cmp(&opponent_score) {
            std::cmp::Ordering::Greater => MatchOutcome::Victory,
            std::cmp::Ordering::Less => MatchOutcome::Defeat,
            std::cmp::Ordering::Equal => MatchOutcome::Draw,
        }
    }

    pub fn verdict(&self) -> &'static str {
        match self {
            MatchOutcome::Victory => "🏆 VICTORY! Your aura reigns supreme!",
            MatchOutcome::Defeat => "💀 DEFEAT! Your opponent's aura was stronger.",
            MatchOutcome::Draw => "🤝 DRAW! Perfectly balanced auras.",
        }
    }
}

/// 运行排位模式
pub async fn run_ranked_mode(config: Config) -> Result<()> {
    info!("dmpn 排位模式启动...");

    let mut webcam = capture::create_source(config.capture.webcam_source);
    let mut screen = capture::create_source(config.capture.screen_source);
    start_source(webcam.as_mut(), "摄像头")?;
    start_source(screen.as_mut(), "屏幕")?;

    let client = AuraClient::new(&config.backend.url, config.backend.timeout_secs)?;
    let session = Arc::new(CaptureSession::new(webcam, screen, client, &config.capture));

    // 模拟匹配
    print_banner(config.ranked.duration_mins);
    let opponent = run_matchmaking(&config).await;
    println!();
    println!("  对手已匹配: {}", opponent.name());
    println!();

    // 倒计时
    for n in (1..=3).rev() {
        println!("  {}...", n);
        tokio::time::sleep(Duration::from_secs(1)).await;
    }
    println!("  GO!");
    println!();

    let opponent = Arc::new(Mutex::new(opponent));

    // 玩家与对手共用同一个采样节奏
    let mut scheduler = TickScheduler::new();
    let session_for_tick = session.clone();
    let opponent_for_tick = opponent.clone();
    scheduler.start(
        Duration::from_secs(config.capture.interval_secs),
        move || {
            let session = session_for_tick.clone();
            let opponent = opponent_for_tick.clone();
            tokio::spawn(async move {
                session.tick().await;
                let mut opponent = opponent.lock().await;
                let mut rng = rand::thread_rng();
                let change = opponent.tick(&mut rng);
                println!(
                    "  {} {} {:+} -> {}",
                    reaction_for(change),
                    opponent.name(),
                    change,
                    opponent.score()
                );
            });
        },
    );

    // 玩家侧实时输出
    let mut updates = session.subscribe();
    let printer = tokio::spawn(async move {
        while let Ok(update) = updates.recv().await {
            println!(
                "  {} You {:+} -> {} ({})  {}",
                reaction_for(update.change),
                update.change,
                update.score,
                update.tier,
                update.explanation
            );
        }
    });

    // 对局计时与提前退出
    let round = tokio::time::sleep(Duration::from_secs(config.ranked.duration_mins * 60));
    let forfeited = tokio::select! {
        _ = round => false,
        result = signal::ctrl_c() => {
            if let Err(e) = result {
                error!("无法监听 Ctrl+C 信号: {}", e);
            }
            warn!("对局中途退出，按认负处理");
            true
        }
    };

    scheduler.stop();
    printer.abort();

    let player_score = session.current_score().await;
    let opponent = opponent.lock().await;
    let outcome = if forfeited {
        MatchOutcome::Defeat
    } else {
        MatchOutcome::decide(player_score, opponent.score())
    };

    print_result(player_score, opponent.name(), opponent.score(), outcome);

    info!("排位模式已退出");
    Ok(())
}

/// 排位模式要求两个来源都可用
fn start_source(source: &mut dyn capture::FrameSource, label: &str) -> Result<()> {
    match source.start() {
        Ok(()) => {
            info!("{}采集已就绪: {}", label, source.name());
            Ok(())
        }
        Err(CaptureError::PermissionDenied(msg)) => {
            error!("{}权限被拒绝，排位模式需要完整采集: {}", label, msg);
            Err(anyhow::anyhow!("{}权限被拒绝: {}", label, msg))
        }
        Err(e) => Err(anyhow::anyhow!("{}启动失败: {}", label, e)),
    }
}

/// 模拟匹配过程: 在线人数抖动 + 随机等待
async fn run_matchmaking(config: &Config) -> SimulatedOpponent {
    let (delay_secs, mut online) = {
        let mut rng = rand::thread_rng();
        (
            opponent::matchmaking_delay_secs(&mut rng),
            rng.gen_range(30..=60),
        )
    };

    println!("  正在匹配对手...");
    for _ in 0..delay_secs {
        {
            let mut rng = rand::thread_rng();
            online = opponent::jitter_online_count(&mut rng, online);
        }
        println!("  当前在线开发者: {}", online);
        tokio::time::sleep(Duration::from_secs(1)).await;
    }

    let mut rng = rand::thread_rng();
    SimulatedOpponent::matched(&mut rng, config.capture.initial_score, config.capture.history_cap)
}

fn print_banner(duration_mins: u64) {
    println!();
    println!("========================================");
    println!("  DMPN Ranked Match");
    println!("========================================");
    println!();
    println!("  对局时长:  {} 分钟", duration_mins);
    println!();
}

fn print_result(player_score: i64, opponent_name: &str, opponent_score: i64, outcome: MatchOutcome) {
    println!();
    println!("========================================");
    println!("  对局结束");
    println!("========================================");
    println!();
    println!("  You:       {}", player_score);
    println!("  {}:  {}", opponent_name, opponent_score);
    println!();
    println!("  {}", outcome.verdict());
    println!();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcome_from_scores() {
        assert_eq!(MatchOutcome::decide(80, 60), MatchOutcome::Victory);
        assert_eq!(MatchOutcome::decide(40, 60), MatchOutcome::Defeat);
        assert_eq!(MatchOutcome::decide(55, 55), MatchOutcome::Draw);
    }

    #[test]
    fn test_verdict_strings() {
        assert!(MatchOutcome::Victory.verdict().contains("VICTORY"));
        assert!(MatchOutcome::Defeat.verdict().contains("DEFEAT"));
        assert!(MatchOutcome::Draw.verdict().contains("DRAW"));
    }
}
