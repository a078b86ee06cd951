use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::str::FromStr;
use uuid::Uuid;

use crate::error::{LottoError, Result};
use crate::rank::{Rank, best_rank};
use crate::types::{
    DrawInfo, DrawResult, GameState, Gender, GenerationResult, HistoryEntry, UserInfo,
    WinningTarget,
};
use crate::utils::format_korean_time;

pub const HISTORY_LIMIT: usize = 100;
/// Draw number recorded for game-mode runs, which belong to no real draw.
pub const GAME_MODE_DRAW_NO: u32 = 9999;

/// What a run was generated for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    Normal(DrawInfo),
    Game(WinningTarget),
}

/// Assembles the record of one run. No I/O.
pub fn build_history_entry(
    user: &UserInfo,
    result: &GenerationResult,
    estimated_chance: f64,
    mode: RunMode,
    created_at: DateTime<Utc>,
) -> HistoryEntry {
    let (is_game_mode, draw_no, draw_date, rank_result, game_target) = match mode {
        RunMode::Normal(draw) => (false, draw.draw_no, draw.draw_date, None, None),
        RunMode::Game(target) => (
            true,
            GAME_MODE_DRAW_NO,
            created_at.date_naive(),
            Some(best_rank(&result.sets, &target)),
            Some(target),
        ),
    };

    HistoryEntry {
        id: Uuid::new_v4().to_string(),
        birth_date: user.birth_date.clone(),
        gender: user.gender,
        numbers: result.sets.clone(),
        seed: result.seed,
        created_at,
        created_at_local: format_korean_time(created_at),
        estimated_chance,
        is_game_mode,
        draw_no,
        draw_date,
        rank_result,
        game_target,
    }
}

impl HistoryEntry {
    /// Re-ranks a game-mode entry against the target stored with it.
    pub fn re_evaluate(&self) -> Option<Rank> {
        self.game_target
            .as_ref()
            .map(|target| best_rank(&self.numbers, target))
    }

    /// Ranks the entry's sets against an official draw.
    pub fn rank_against(&self, draw: &DrawResult) -> Result<Rank> {
        Ok(best_rank(&self.numbers, &draw.target()?))
    }

    pub fn mode_label(&self) -> &'static str {
        if self.is_game_mode { "game" } else { "normal" }
    }
}

/// Persistence port for the run history and the game-mode UI fields.
///
/// `all` returns entries newest first. `append` evicts the oldest entries
/// beyond `cap`.
pub trait HistoryStore {
    fn append(&mut self, entry: HistoryEntry, cap: usize) -> Result<()>;
    fn remove(&mut self, id: &str) -> Result<bool>;
    fn clear(&mut self) -> Result<()>;
    fn all(&self) -> Result<Vec<HistoryEntry>>;
    fn load_game_state(&self) -> Result<GameState>;
    fn save_game_state(&mut self, state: &GameState) -> Result<()>;
}

#[derive(Debug, Default)]
pub struct MemoryHistoryStore {
    entries: VecDeque<HistoryEntry>,
    game_state: GameState,
}

impl MemoryHistoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl HistoryStore for MemoryHistoryStore {
    fn append(&mut self, entry: HistoryEntry, cap: usize) -> Result<()> {
        self.entries.push_front(entry);
        self.entries.truncate(cap);
        Ok(())
    }

    fn remove(&mut self, id: &str) -> Result<bool> {
        let before = self.entries.len();
        self.entries.retain(|e| e.id != id);
        Ok(self.entries.len() != before)
    }

    fn clear(&mut self) -> Result<()> {
        self.entries.clear();
        Ok(())
    }

    fn all(&self) -> Result<Vec<HistoryEntry>> {
        Ok(self.entries.iter().cloned().collect())
    }

    fn load_game_state(&self) -> Result<GameState> {
        Ok(self.game_state.clone())
    }

    fn save_game_state(&mut self, state: &GameState) -> Result<()> {
        self.game_state = state.clone();
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModeFilter {
    #[default]
    All,
    Normal,
    Game,
}

impl FromStr for ModeFilter {
    type Err = LottoError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "all" | "" => Ok(ModeFilter::All),
            "normal" => Ok(ModeFilter::Normal),
            "game" | "test" => Ok(ModeFilter::Game),
            other => Err(LottoError::InvalidConstraints(format!(
                "unknown history mode {:?}",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HistoryFilter {
    pub birth_date: Option<String>,
    pub gender: Option<Gender>,
    pub mode: ModeFilter,
}

impl HistoryFilter {
    pub fn for_user(user: &UserInfo) -> Self {
        Self {
            birth_date: Some(user.birth_date.clone()),
            gender: Some(user.gender),
            mode: ModeFilter::All,
        }
    }

    pub fn with_mode(mut self, mode: ModeFilter) -> Self {
        self.mode = mode;
        self
    }

    pub fn matches(&self, entry: &HistoryEntry) -> bool {
        let user_ok = self.birth_date.as_deref().is_none_or(|b| b == entry.birth_date)
            && self.gender.is_none_or(|g| g == entry.gender);
        let mode_ok = match self.mode {
            ModeFilter::All => true,
            ModeFilter::Normal => !entry.is_game_mode,
            ModeFilter::Game => entry.is_game_mode,
        };
        user_ok && mode_ok
    }

    pub fn apply(&self, entries: Vec<HistoryEntry>) -> Vec<HistoryEntry> {
        entries.into_iter().filter(|e| self.matches(e)).collect()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct HistorySummary {
    pub total: usize,
    pub normal_runs: usize,
    pub game_runs: usize,
    pub wins: usize,
}

pub fn summarize(entries: &[HistoryEntry]) -> HistorySummary {
    entries.iter().fold(HistorySummary::default(), |mut acc, e| {
        acc.total += 1;
        if e.is_game_mode {
            acc.game_runs += 1;
        } else {
            acc.normal_runs += 1;
        }
        if e.rank_result.is_some_and(|r| r.is_win()) {
            acc.wins += 1;
        }
        acc
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generator::generate_from_seed;
    use crate::types::{Constraints, NumberSet};
    use chrono::{NaiveDate, TimeZone};

    fn user(birth: &str, gender: Gender) -> UserInfo {
        UserInfo::new_in_year(birth, gender, 2026).unwrap()
    }

    fn at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 18, 3, 0, 0).unwrap()
    }

    fn normal_entry(seed: u64) -> HistoryEntry {
        let result = generate_from_seed(seed, &Constraints::default()).unwrap();
        let draw = DrawInfo {
            draw_no: 1195,
            draw_date: NaiveDate::from_ymd_opt(2026, 10, 24).unwrap(),
        };
        build_history_entry(
            &user("19900101", Gender::Male),
            &result,
            6.5,
            RunMode::Normal(draw),
            at(),
        )
    }

    #[test]
    fn normal_entry_records_draw() {
        let entry = normal_entry(11);
        assert!(!entry.is_game_mode);
        assert_eq!(entry.draw_no, 1195);
        assert_eq!(entry.numbers.len(), 5);
        assert_eq!(entry.seed, 11);
        assert_eq!(entry.rank_result, None);
        assert_eq!(entry.game_target, None);
        assert_eq!(entry.created_at_local, "2026-10-18 12:00:00 KST");
        assert_eq!(entry.re_evaluate(), None);
        assert!(Uuid::parse_str(&entry.id).is_ok());
    }

    #[test]
    fn game_entry_reproduces_rank_on_re_evaluation() {
        let result = generate_from_seed(77, &Constraints::default()).unwrap();
        let first = result.sets[0];
        let nums = first.numbers();
        // Five of the first set plus one outsider, bonus = the sixth number.
        let outsider = (1..=45).find(|n| !first.contains(*n)).unwrap();
        let target = WinningTarget::new(
            &[nums[0], nums[1], nums[2], nums[3], nums[4], outsider],
            nums[5],
        )
        .unwrap();

        let entry = build_history_entry(
            &user("19900101", Gender::Female),
            &result,
            0.0,
            RunMode::Game(target),
            at(),
        );
        assert!(entry.is_game_mode);
        assert_eq!(entry.draw_no, GAME_MODE_DRAW_NO);
        assert_eq!(entry.draw_date, NaiveDate::from_ymd_opt(2026, 10, 18).unwrap());
        assert_eq!(entry.rank_result, Some(Rank::Second));
        assert_eq!(entry.re_evaluate(), entry.rank_result);

        let json = serde_json::to_string(&entry).unwrap();
        let back: HistoryEntry = serde_json::from_str(&json).unwrap();
        assert_eq!(back.re_evaluate(), Some(Rank::Second));
    }

    #[test]
    fn rank_against_official_draw() {
        let entry = normal_entry(5);
        let set = entry.numbers[2];
        let draw = DrawResult {
            draw_no: 1195,
            draw_date: NaiveDate::from_ymd_opt(2026, 10, 24).unwrap(),
            numbers: set,
            bonus_number: (1..=45).find(|n| !set.contains(*n)).unwrap(),
            total_sales_amount: 0,
            first_prize_amount: 0,
            first_winner_count: 0,
        };
        assert_eq!(entry.rank_against(&draw).unwrap(), Rank::First);
    }

    #[test]
    fn cap_keeps_most_recent_hundred() {
        let mut store = MemoryHistoryStore::new();
        let mut ids = Vec::new();
        for seed in 0..105 {
            let entry = normal_entry(seed);
            ids.push(entry.id.clone());
            store.append(entry, HISTORY_LIMIT).unwrap();
        }

        let all = store.all().unwrap();
        assert_eq!(all.len(), 100);
        assert_eq!(all[0].id, ids[104]);
        assert_eq!(all[99].id, ids[5]);
        for evicted in &ids[..5] {
            assert!(all.iter().all(|e| &e.id != evicted));
        }
    }

    #[test]
    fn remove_and_clear() {
        let mut store = MemoryHistoryStore::new();
        let a = normal_entry(1);
        let b = normal_entry(2);
        let a_id = a.id.clone();
        store.append(a, HISTORY_LIMIT).unwrap();
        store.append(b, HISTORY_LIMIT).unwrap();

        assert!(store.remove(&a_id).unwrap());
        assert!(!store.remove(&a_id).unwrap());
        assert_eq!(store.all().unwrap().len(), 1);

        store.clear().unwrap();
        assert!(store.all().unwrap().is_empty());
    }

    #[test]
    fn game_state_round_trips_through_store() {
        let mut store = MemoryHistoryStore::new();
        assert_eq!(store.load_game_state().unwrap(), GameState::default());

        let state = GameState {
            target: Some(WinningTarget::new(&[3, 8, 19, 27, 33, 41], 12).unwrap()),
            last_sets: vec![NumberSet::new(&[1, 2, 3, 4, 5, 6]).unwrap()],
            show_target_form: false,
        };
        store.save_game_state(&state).unwrap();
        assert_eq!(store.load_game_state().unwrap(), state);
    }

    #[test]
    fn filters_by_user_and_mode() {
        let result = generate_from_seed(3, &Constraints::default()).unwrap();
        let target = WinningTarget::new(&[1, 2, 3, 4, 5, 6], 7).unwrap();
        let draw = DrawInfo {
            draw_no: 1195,
            draw_date: NaiveDate::from_ymd_opt(2026, 10, 24).unwrap(),
        };
        let me = user("19900101", Gender::Male);
        let other = user("19851120", Gender::Female);
        let entries = vec![
            build_history_entry(&me, &result, 5.0, RunMode::Normal(draw), at()),
            build_history_entry(&me, &result, 0.0, RunMode::Game(target), at()),
            build_history_entry(&other, &result, 5.0, RunMode::Normal(draw), at()),
        ];

        let mine = HistoryFilter::for_user(&me);
        assert_eq!(mine.apply(entries.clone()).len(), 2);
        assert_eq!(mine.clone().with_mode(ModeFilter::Game).apply(entries.clone()).len(), 1);
        assert_eq!(
            HistoryFilter::default()
                .with_mode(ModeFilter::Normal)
                .apply(entries.clone())
                .len(),
            2
        );
        assert_eq!(HistoryFilter::default().apply(entries).len(), 3);
        assert_eq!("game".parse::<ModeFilter>().unwrap(), ModeFilter::Game);
        assert!("weekly".parse::<ModeFilter>().is_err());
    }

    #[test]
    fn summary_counts_wins() {
        let result = generate_from_seed(9, &Constraints::default()).unwrap();
        let nums = result.sets[0].numbers();
        let outsiders: Vec<u8> = (1..=45).filter(|n| !result.sets[0].contains(*n)).collect();
        let winning = WinningTarget::new(
            &[nums[0], nums[1], nums[2], nums[3], outsiders[0], outsiders[1]],
            outsiders[2],
        )
        .unwrap();
        let me = user("19900101", Gender::Male);

        let entries = vec![
            build_history_entry(&me, &result, 0.0, RunMode::Game(winning), at()),
            normal_entry(4),
        ];
        let summary = summarize(&entries);
        assert_eq!(
            summary,
            HistorySummary {
                total: 2,
                normal_runs: 1,
                game_runs: 1,
                wins: 1,
            }
        );
    }
}
