use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::LottoError;
use crate::types::{NumberSet, WinningTarget};

/// Prize tier of one set. Ordered best first, so the minimum is the best.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Rank {
    #[serde(rename = "1st")]
    First,
    #[serde(rename = "2nd")]
    Second,
    #[serde(rename = "3rd")]
    Third,
    #[serde(rename = "4th")]
    Fourth,
    #[serde(rename = "5th")]
    Fifth,
    #[serde(rename = "miss")]
    Miss,
}

impl Rank {
    pub fn label(&self) -> &'static str {
        match self {
            Rank::First => "1st",
            Rank::Second => "2nd",
            Rank::Third => "3rd",
            Rank::Fourth => "4th",
            Rank::Fifth => "5th",
            Rank::Miss => "miss",
        }
    }

    /// Prize tier number, `None` for a miss.
    pub fn tier(&self) -> Option<u8> {
        match self {
            Rank::First => Some(1),
            Rank::Second => Some(2),
            Rank::Third => Some(3),
            Rank::Fourth => Some(4),
            Rank::Fifth => Some(5),
            Rank::Miss => None,
        }
    }

    pub fn is_win(&self) -> bool {
        *self != Rank::Miss
    }
}

impl fmt::Display for Rank {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Rank {
    type Err = LottoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "1st" => Ok(Rank::First),
            "2nd" => Ok(Rank::Second),
            "3rd" => Ok(Rank::Third),
            "4th" => Ok(Rank::Fourth),
            "5th" => Ok(Rank::Fifth),
            "miss" => Ok(Rank::Miss),
            other => Err(LottoError::InvalidDrawData(format!("unknown rank label {:?}", other))),
        }
    }
}

/// Numbers of `set` that are among the winning numbers (bonus excluded).
pub fn matched_numbers(set: &NumberSet, target: &WinningTarget) -> Vec<u8> {
    set.iter()
        .filter(|n| target.winning_numbers.contains(*n))
        .collect()
}

pub fn evaluate_rank(set: &NumberSet, target: &WinningTarget) -> Rank {
    let matches = matched_numbers(set, target).len();
    let has_bonus = set.contains(target.bonus_number);

    match (matches, has_bonus) {
        (6, _) => Rank::First,
        (5, true) => Rank::Second,
        (5, false) => Rank::Third,
        (4, _) => Rank::Fourth,
        (3, _) => Rank::Fifth,
        _ => Rank::Miss,
    }
}

pub fn rank_all(sets: &[NumberSet], target: &WinningTarget) -> Vec<Rank> {
    sets.iter().map(|set| evaluate_rank(set, target)).collect()
}

/// Best rank over a run, `Miss` when nothing placed.
pub fn best_rank(sets: &[NumberSet], target: &WinningTarget) -> Rank {
    sets.iter()
        .map(|set| evaluate_rank(set, target))
        .min()
        .unwrap_or(Rank::Miss)
}
