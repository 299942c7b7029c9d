//! 气场分数模块
//!
//! 分数变动记录、有界历史以及分数到等级/配色的纯映射

use chrono::Local;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fmt;

/// 本地分数下限
pub const SCORE_MIN: i64 = 0;
/// 本地分数上限
pub const SCORE_MAX: i64 = 100;

/// 将本地产生的分数钳制到合法范围
///
/// 仅用于本地变动 (降级兜底、模拟对手)；后端返回的分数视为权威值，
/// 原样保存
pub fn clamp_score(score: i64) -> i64 {
    score.clamp(SCORE_MIN, SCORE_MAX)
}

/// 一次分数变动记录
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreDelta {
    /// 变动量 (正负均可)
    pub change: i64,
    /// 变动原因 (后端解释或本地兜底文案)
    pub reason: String,
    /// 展示用时间戳 (HH:MM:SS)
    pub timestamp: String,
}

impl ScoreDelta {
    /// 以当前时间创建变动记录
    pub fn now(change: i64, reason: impl Into<String>) -> Self {
        ScoreDelta {
            change,
            reason: reason.into(),
            timestamp: Local::now().format("%H:%M:%S").to_string(),
        }
    }
}

/// 有界的分数历史，最新在前
#[derive(Debug, Clone)]
pub struct ScoreHistory {
    entries: VecDeque<ScoreDelta>,
    cap: usize,
}

impl ScoreHistory {
    pub fn new(cap: usize) -> Self {
        ScoreHistory {
            entries: VecDeque::with_capacity(cap),
            cap: cap.max(1),
        }
    }

    /// 追加一条变动记录
    ///
    /// 零变动不记录 (与展示层约定一致)；返回是否实际写入
    pub fn push(&mut self, delta: ScoreDelta) -> bool {
        if delta.change == 0 {
            return false;
        }
        self.entries.push_front(delta);
        self.entries.truncate(self.cap);
        true
    }

    /// 最新一条记录
    pub fn latest(&self) -> Option<&ScoreDelta> {
        self.entries.front()
    }

    /// 按最新在前的顺序遍历
    pub fn iter(&self) -> impl Iterator<Item = &ScoreDelta> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// 气场等级
///
/// 分数到等级的映射是全函数: 任何整数都落在且只落在一个等级内
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AuraTier {
    DebuggingDisaster,
    CodeCadet,
    FunctionFanatic,
    AlgorithmAce,
    ProgrammingProdigy,
}

impl AuraTier {
    /// 根据分数求等级
    pub fn for_score(score: i64) -> Self {
        if score < 0 {
            AuraTier::DebuggingDisaster
        } else if score < 50 {
            AuraTier::CodeCadet
        } else if score < 100 {
            AuraTier::FunctionFanatic
        } else if score < 200 {
            AuraTier::AlgorithmAce
        } else {
            AuraTier::ProgrammingProdigy
        }
    }

    /// 等级展示文案
    pub fn label(self) -> &'static str {
        match self {
            AuraTier::DebuggingDisaster => "Debugging Disaster",
            AuraTier::CodeCadet => "Code Cadet",
            AuraTier::FunctionFanatic => "Function Fanatic",
            AuraTier::AlgorithmAce => "Algorithm Ace",
            AuraTier::ProgrammingProdigy => "Programming Prodigy",
        }
    }

    /// 等级配色 (渐变色带)
    pub fn color_band(self) -> &'static str {
        match self {
            AuraTier::DebuggingDisaster => "from-red-500 to-orange-500",
            AuraTier::CodeCadet => "from-orange-400 to-yellow-400",
            AuraTier::FunctionFanatic => "from-yellow-300 to-green-400",
            AuraTier::AlgorithmAce => "from-green-400 to-blue-500",
            AuraTier::ProgrammingProdigy => "from-blue-400 to-purple-600",
        }
    }
}

impl fmt::Display for AuraTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// 分数变动对应的示意表情
pub fn reaction_for(change: i64) -> &'static str {
    if change > 0 {
        "🚀"
    } else if change < 0 {
        "💀"
    } else {
        "😐"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tier_mapping_is_total() {
        // 任何整数都必须得到五个等级之一
        let samples: [i64; 11] = [
            i64::MIN,
            -1000,
            -1,
            0,
            49,
            50,
            99,
            100,
            199,
            200,
            i64::MAX,
        ];
        for score in samples {
            let tier = AuraTier::for_score(score);
            assert!(!tier.label().is_empty());
            assert!(!tier.color_band().is_empty());
        }
    }

    #[test]
    fn test_tier_boundaries() {
        assert_eq!(AuraTier::for_score(-1), AuraTier::DebuggingDisaster);
        assert_eq!(AuraTier::for_score(0), AuraTier::CodeCadet);
        assert_eq!(AuraTier::for_score(49), AuraTier::CodeCadet);
        assert_eq!(AuraTier::for_score(50), AuraTier::FunctionFanatic);
        assert_eq!(AuraTier::for_score(99), AuraTier::FunctionFanatic);
        assert_eq!(AuraTier::for_score(100), AuraTier::AlgorithmAce);
        assert_eq!(AuraTier::for_score(199), AuraTier::AlgorithmAce);
        assert_eq!(AuraTier::for_score(200), AuraTier::ProgrammingProdigy);
    }

    #[test]
    fn test_history_cap_and_order() {
        let mut history = ScoreHistory::new(5);
        for i in 1..=8 {
            history.push(ScoreDelta::now(i, format!("delta {}", i)));
        }

        assert_eq!(history.len(), 5, "历史条数不应超过上限");
        // 最新在前
        let changes: Vec<i64> = history.iter().map(|d| d.change).collect();
        assert_eq!(changes, vec![8, 7, 6, 5, 4]);
        assert_eq!(history.latest().unwrap().change, 8);
    }

    #[test]
    fn test_history_skips_zero_change() {
        let mut history = ScoreHistory::new(5);
        assert!(!history.push(ScoreDelta::now(0, "no-op")));
        assert!(history.is_empty());
    }

    #[test]
    fn test_clamp_score() {
        assert_eq!(clamp_score(-10), 0);
        assert_eq!(clamp_score(50), 50);
        assert_eq!(clamp_score(250), 100);
    }

    #[test]
    fn test_reaction_mapping() {
        assert_eq!(reaction_for(13), "🚀");
        assert_eq!(reaction_for(-5), "💀");
        assert_eq!(reaction_for(0), "😐");
    }
}
