//! Orchestration of one generation run: validate, generate, estimate,
//! record, persist.

use chrono::{NaiveDate, Utc};
use serde::Serialize;
use tracing::{info, warn};

use crate::chance::estimate_chance;
use crate::config::Config;
use crate::draws::{DrawSource, next_draw_info};
use crate::error::Result;
use crate::generator::{derive_seed, generate_with};
use crate::history::{
    HistoryFilter, HistoryStore, HistorySummary, RunMode, build_history_entry, summarize,
};
use crate::rank::{Rank, rank_all};
use crate::types::{
    Constraints, DrawInfo, GameState, HistoryEntry, NumberSet, UserInfo, WinningTarget,
};
use crate::utils::epoch_millis;

/// Outcome of a game-mode run: the stored entry plus the rank of every set.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GameOutcome {
    pub entry: HistoryEntry,
    pub ranks: Vec<Rank>,
}

/// Where an entry stands against the draw it was generated for.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EntryCheck {
    pub entry: HistoryEntry,
    /// `None` while the draw has not been imported yet.
    pub rank: Option<Rank>,
}

pub struct LottoService<S: HistoryStore> {
    store: S,
    config: Config,
}

impl<S: HistoryStore> LottoService<S> {
    pub fn new(store: S, config: Config) -> Self {
        Self { store, config }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Normal-mode run for `draw`. Stores and returns the history entry.
    pub fn generate(
        &mut self,
        user: &UserInfo,
        constraints: &Constraints,
        draw: DrawInfo,
    ) -> Result<HistoryEntry> {
        self.generate_with(user, constraints, draw, |_, _| {})
    }

    /// Like [`generate`](Self::generate), handing each set to `on_set` as it
    /// is drawn.
    pub fn generate_with<F>(
        &mut self,
        user: &UserInfo,
        constraints: &Constraints,
        draw: DrawInfo,
        on_set: F,
    ) -> Result<HistoryEntry>
    where
        F: FnMut(usize, &NumberSet),
    {
        constraints.validate()?;
        let now = Utc::now();
        let seed = derive_seed(user.birth_digits()?, epoch_millis(now));
        let result = generate_with(seed, constraints, on_set)?;
        let chance = estimate_chance(&user.birth_date, user.gender);

        let entry = build_history_entry(user, &result, chance, RunMode::Normal(draw), now);
        self.store.append(entry.clone(), self.config.history_limit)?;
        info!(id = %entry.id, draw_no = draw.draw_no, chance, "normal run recorded");
        Ok(entry)
    }

    /// Game-mode run against a caller-chosen target. No chance is estimated.
    pub fn play_game(
        &mut self,
        user: &UserInfo,
        constraints: &Constraints,
        target: WinningTarget,
    ) -> Result<GameOutcome> {
        constraints.validate()?;
        let now = Utc::now();
        let seed = derive_seed(user.birth_digits()?, epoch_millis(now));
        let result = generate_with(seed, constraints, |_, _| {})?;
        let ranks = rank_all(&result.sets, &target);

        let entry = build_history_entry(user, &result, 0.0, RunMode::Game(target), now);
        self.store.append(entry.clone(), self.config.history_limit)?;

        let state = GameState {
            target: Some(target),
            last_sets: result.sets,
            show_target_form: false,
        };
        self.store.save_game_state(&state)?;

        info!(id = %entry.id, rank = ?entry.rank_result, "game run recorded");
        Ok(GameOutcome { entry, ranks })
    }

    /// Next draw from `source`. A failing source is not fatal: the
    /// configured fallback draw number is used instead.
    pub fn next_draw<D: DrawSource>(&self, source: &D, today: NaiveDate) -> DrawInfo {
        let latest = match source.latest_draw() {
            Ok(latest) => latest,
            Err(e) => {
                warn!(error = %e, "latest draw unavailable, using fallback");
                None
            }
        };
        next_draw_info(latest.as_ref(), today, self.config.fallback_draw_no)
    }

    pub fn history(&self, filter: &HistoryFilter) -> Result<Vec<HistoryEntry>> {
        Ok(filter.apply(self.store.all()?))
    }

    pub fn summary(&self, filter: &HistoryFilter) -> Result<HistorySummary> {
        Ok(summarize(&self.history(filter)?))
    }

    pub fn find_entry(&self, id: &str) -> Result<Option<HistoryEntry>> {
        Ok(self.store.all()?.into_iter().find(|e| e.id == id))
    }

    pub fn remove(&mut self, id: &str) -> Result<bool> {
        self.store.remove(id)
    }

    pub fn clear(&mut self) -> Result<()> {
        info!("clearing history");
        self.store.clear()
    }

    pub fn game_state(&self) -> Result<GameState> {
        self.store.load_game_state()
    }

    /// Remembers the target without generating, keeping the last sets.
    pub fn save_game_target(&mut self, target: WinningTarget) -> Result<GameState> {
        let mut state = self.store.load_game_state()?;
        state.target = Some(target);
        state.show_target_form = false;
        self.store.save_game_state(&state)?;
        Ok(state)
    }

    /// Forgets the target and the last game sets. The target form stays
    /// hidden until the caller asks for it again.
    pub fn reset_game_mode(&mut self) -> Result<GameState> {
        let state = GameState {
            show_target_form: false,
            ..GameState::default()
        };
        self.store.save_game_state(&state)?;
        Ok(state)
    }

    /// Ranks a stored entry. Game entries use their own target; normal
    /// entries are ranked against their draw once it is known to `source`.
    pub fn check_entry<D: DrawSource>(&self, id: &str, source: &D) -> Result<Option<EntryCheck>> {
        let entry = match self.find_entry(id)? {
            Some(entry) => entry,
            None => return Ok(None),
        };

        let rank = if entry.is_game_mode {
            entry.re_evaluate()
        } else {
            match source.draw_by_no(entry.draw_no)? {
                Some(draw) => Some(entry.rank_against(&draw)?),
                None => None,
            }
        };
        Ok(Some(EntryCheck { entry, rank }))
    }
}

impl<S: HistoryStore + DrawSource> LottoService<S> {
    /// Next draw using the store's own draw cache.
    pub fn upcoming_draw(&self, today: NaiveDate) -> DrawInfo {
        self.next_draw(&self.store, today)
    }

    pub fn check_stored_entry(&self, id: &str) -> Result<Option<EntryCheck>> {
        self.check_entry(id, &self.store)
    }
}
