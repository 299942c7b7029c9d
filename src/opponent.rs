//! 模拟对手
//!
//! 排位模式的对手完全在本地模拟: 随机昵称、与回退评分同分布的
//! 周期性分数波动，以及匹配过程中的在线人数抖动。

use crate::scoring::{clamp_score, ScoreDelta, ScoreHistory};
use crate::session::{FALLBACK_DELTA_MAX, FALLBACK_DELTA_MIN, FALLBACK_REASONS};
use rand::Rng;

/// 候选对手昵称池
pub const OPPONENT_NAMES: &[&str] =
    &["CodeNinja", "ByteMaster", "PixelPirate", "LogicLegend", "SyntaxSage"];

/// 匹配等待区间 (秒)
pub const MATCHMAKING_MIN_SECS: u64 = 6;
pub const MATCHMAKING_MAX_SECS: u64 = 10;

/// 在线人数下限
pub const ONLINE_FLOOR: i64 = 30;

/// 本地模拟的排位对手
pub struct SimulatedOpponent {
    name: String,
    score: i64,
    history: ScoreHistory,
}

impl SimulatedOpponent {
    /// 随机抽取一个对手，初始分与玩家一致
    pub fn matched<R: Rng>(rng: &mut R, initial_score: i64, history_cap: usize) -> Self {
        let name = OPPONENT_NAMES[rng.gen_range(0..OPPONENT_NAMES.len())];
        SimulatedOpponent {
            name: name.to_string(),
            score: initial_score,
            history: ScoreHistory::new(history_cap),
        }
    }

    /// 对手的一次分数波动，与本地回退评分同分布
    pub fn tick<R: Rng>(&mut self, rng: &mut R) -> i64 {
        let mut change: i64 = 0;
        while change == 0 {
            change = rng.gen_range(FALLBACK_DELTA_MIN..=FALLBACK_DELTA_MAX);
        }
        let reason = FALLBACK_REASONS[rng.gen_range(0..FALLBACK_REASONS.len())];
        self.score = clamp_score(self.score + change);
        self.history.push(ScoreDelta::now(change, reason));
        change
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn score(&self) -> i64 {
        self.score
    }

    pub fn history(&self) -> &ScoreHistory {
        &self.history
    }
}

/// 匹配期间的在线人数抖动，下限 30
pub fn jitter_online_count<R: Rng>(rng: &mut R, current: i64) -> i64 {
    (current + rng.gen_range(-3..=5)).max(ONLINE_FLOOR)
}

/// 随机的匹配等待时长 (秒)
pub fn matchmaking_delay_secs<R: Rng>(rng: &mut R) -> u64 {
    rng.gen_range(MATCHMAKING_MIN_SECS..=MATCHMAKING_MAX_SECS)
}
