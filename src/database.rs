use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, params};
use std::fs;
use std::path::Path;
use tracing::info;

use crate::draws::{DrawSource, draw_from_parts, parse_draw_json};
use crate::error::{LottoError, Result};
use crate::history::HistoryStore;
use crate::rank::Rank;
use crate::types::{DrawResult, GameState, HistoryEntry, NumberSet, WinningTarget};
use crate::utils::{parse_draw_date, parse_number_list};

const GAME_STATE_KEY: &str = "game_state";

const HISTORY_COLUMNS: &str = "id, birth_date, gender, numbers, seed, created_at, created_at_local,
     estimated_chance, is_game_mode, draw_no, draw_date, rank_result, game_target";

const DRAW_COLUMNS: &str = "draw_no, draw_date, numbers, bonus_number,
     total_sales_amount, first_prize_amount, first_winner_count";

/// SQLite-backed history log, game-mode state and local draw-result cache.
pub struct SqliteStore {
    conn: Connection,
}

pub fn ensure_parent_dir(path: &str) -> std::io::Result<()> {
    if let Some(parent) = Path::new(path).parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}

pub fn create_tables(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS history_entries (
            seq INTEGER PRIMARY KEY AUTOINCREMENT,
            id TEXT NOT NULL UNIQUE,
            birth_date TEXT NOT NULL,
            gender TEXT NOT NULL,
            numbers TEXT NOT NULL,
            seed TEXT NOT NULL,
            created_at TEXT NOT NULL,
            created_at_local TEXT NOT NULL,
            estimated_chance REAL NOT NULL,
            is_game_mode INTEGER NOT NULL,
            draw_no INTEGER NOT NULL,
            draw_date TEXT NOT NULL,
            rank_result TEXT,
            game_target TEXT
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS app_state (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL,
            updated_at DATETIME DEFAULT CURRENT_TIMESTAMP
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS draw_results (
            draw_no INTEGER PRIMARY KEY,
            draw_date TEXT NOT NULL,
            numbers TEXT NOT NULL,
            bonus_number INTEGER NOT NULL,
            total_sales_amount INTEGER NOT NULL,
            first_prize_amount INTEGER NOT NULL,
            first_winner_count INTEGER NOT NULL,
            created_at DATETIME DEFAULT CURRENT_TIMESTAMP
        )",
        [],
    )?;

    Ok(())
}

impl SqliteStore {
    pub fn open(path: &str) -> Result<Self> {
        ensure_parent_dir(path).map_err(|e| {
            rusqlite::Error::SqliteFailure(
                rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_CANTOPEN),
                Some(format!("Failed to create directories: {}", e)),
            )
        })?;
        let conn = Connection::open(path)?;
        info!(path, "opened lotto database");
        Self::with_connection(conn)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    pub fn with_connection(conn: Connection) -> Result<Self> {
        create_tables(&conn)?;
        Ok(Self { conn })
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    pub fn save_draw_result(&self, draw: &DrawResult) -> Result<()> {
        let numbers = draw
            .numbers
            .iter()
            .map(|n| n.to_string())
            .collect::<Vec<_>>()
            .join(",");

        self.conn.execute(
            "INSERT OR REPLACE INTO draw_results (
                draw_no, draw_date, numbers, bonus_number,
                total_sales_amount, first_prize_amount, first_winner_count
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                draw.draw_no,
                draw.draw_date.format("%Y-%m-%d").to_string(),
                numbers,
                draw.bonus_number,
                to_sql_amount(draw.total_sales_amount),
                to_sql_amount(draw.first_prize_amount),
                draw.first_winner_count,
            ],
        )?;
        Ok(())
    }

    /// Parses one drawing-result JSON document and stores it. Returns the
    /// draw number.
    pub fn parse_and_insert_draw_json(&self, raw_json: &str) -> Result<u32> {
        let draw = parse_draw_json(raw_json)?;
        self.save_draw_result(&draw)?;
        Ok(draw.draw_no)
    }

    pub fn draw_exists(&self, draw_no: u32) -> Result<bool> {
        let mut stmt = self
            .conn
            .prepare("SELECT COUNT(*) FROM draw_results WHERE draw_no = ?1")?;
        let count: i64 = stmt.query_row([draw_no], |row| row.get(0))?;
        Ok(count > 0)
    }

    pub fn draw_count(&self) -> Result<usize> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM draw_results", [], |row| row.get(0))?;
        Ok(usize::try_from(count).unwrap_or(0))
    }

    pub fn history_count(&self) -> Result<usize> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM history_entries", [], |row| row.get(0))?;
        Ok(usize::try_from(count).unwrap_or(0))
    }
}

fn to_sql_amount(amount: u64) -> i64 {
    i64::try_from(amount).unwrap_or(i64::MAX)
}

fn from_sql_amount(amount: i64) -> u64 {
    u64::try_from(amount).unwrap_or(0)
}

/// A history row as stored, before the text columns are decoded.
#[derive(Debug)]
struct HistoryRow {
    id: String,
    birth_date: String,
    gender: String,
    numbers: String,
    seed: String,
    created_at: String,
    created_at_local: String,
    estimated_chance: f64,
    is_game_mode: bool,
    draw_no: u32,
    draw_date: String,
    rank_result: Option<String>,
    game_target: Option<String>,
}

impl TryFrom<HistoryRow> for HistoryEntry {
    type Error = LottoError;

    fn try_from(row: HistoryRow) -> Result<Self> {
        let numbers: Vec<NumberSet> = serde_json::from_str(&row.numbers)?;
        let game_target: Option<WinningTarget> = match row.game_target {
            Some(raw) => Some(serde_json::from_str(&raw)?),
            None => None,
        };
        let created_at = DateTime::parse_from_rfc3339(&row.created_at)
            .map_err(|e| LottoError::InvalidDrawData(format!("bad created_at: {}", e)))?
            .with_timezone(&Utc);

        Ok(HistoryEntry {
            id: row.id,
            birth_date: row.birth_date,
            gender: row.gender.parse()?,
            numbers,
            seed: row
                .seed
                .parse()
                .map_err(|_| LottoError::InvalidDrawData(format!("bad seed: {:?}", row.seed)))?,
            created_at,
            created_at_local: row.created_at_local,
            estimated_chance: row.estimated_chance,
            is_game_mode: row.is_game_mode,
            draw_no: row.draw_no,
            draw_date: parse_draw_date(&row.draw_date)?,
            rank_result: row.rank_result.map(|r| r.parse::<Rank>()).transpose()?,
            game_target,
        })
    }
}

impl HistoryStore for SqliteStore {
    fn append(&mut self, entry: HistoryEntry, cap: usize) -> Result<()> {
        let numbers = serde_json::to_string(&entry.numbers)?;
        let game_target = entry
            .game_target
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;

        let tx = self.conn.transaction()?;
        tx.execute(
            "INSERT INTO history_entries (
                id, birth_date, gender, numbers, seed, created_at, created_at_local,
                estimated_chance, is_game_mode, draw_no, draw_date, rank_result, game_target
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
            params![
                entry.id,
                entry.birth_date,
                entry.gender.as_str(),
                numbers,
                entry.seed.to_string(),
                entry.created_at.to_rfc3339(),
                entry.created_at_local,
                entry.estimated_chance,
                entry.is_game_mode,
                entry.draw_no,
                entry.draw_date.format("%Y-%m-%d").to_string(),
                entry.rank_result.map(|r| r.label()),
                game_target,
            ],
        )?;
        let evicted = tx.execute(
            "DELETE FROM history_entries WHERE seq NOT IN (
                SELECT seq FROM history_entries ORDER BY seq DESC LIMIT ?1
            )",
            [i64::try_from(cap).unwrap_or(i64::MAX)],
        )?;
        tx.commit()?;

        info!(id = %entry.id, evicted, "history entry stored");
        Ok(())
    }

    fn remove(&mut self, id: &str) -> Result<bool> {
        let removed = self
            .conn
            .execute("DELETE FROM history_entries WHERE id = ?1", [id])?;
        Ok(removed > 0)
    }

    fn clear(&mut self) -> Result<()> {
        self.conn.execute("DELETE FROM history_entries", [])?;
        Ok(())
    }

    fn all(&self) -> Result<Vec<HistoryEntry>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM history_entries ORDER BY seq DESC",
            HISTORY_COLUMNS
        ))?;
        let row_iter = stmt.query_map([], |row| {
            Ok(HistoryRow {
                id: row.get(0)?,
                birth_date: row.get(1)?,
                gender: row.get(2)?,
                numbers: row.get(3)?,
                seed: row.get(4)?,
                created_at: row.get(5)?,
                created_at_local: row.get(6)?,
                estimated_chance: row.get(7)?,
                is_game_mode: row.get(8)?,
                draw_no: row.get(9)?,
                draw_date: row.get(10)?,
                rank_result: row.get(11)?,
                game_target: row.get(12)?,
            })
        })?;

        let mut entries = Vec::new();
        for row in row_iter {
            entries.push(HistoryEntry::try_from(row?)?);
        }
        Ok(entries)
    }

    fn load_game_state(&self) -> Result<GameState> {
        let raw: Option<String> = self
            .conn
            .query_row(
                "SELECT value FROM app_state WHERE key = ?1",
                [GAME_STATE_KEY],
                |row| row.get(0),
            )
            .optional()?;

        match raw {
            Some(json) => Ok(serde_json::from_str(&json)?),
            None => Ok(GameState::default()),
        }
    }

    fn save_game_state(&mut self, state: &GameState) -> Result<()> {
        let json = serde_json::to_string(state)?;
        self.conn.execute(
            "INSERT INTO app_state (key, value) VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = CURRENT_TIMESTAMP",
            params![GAME_STATE_KEY, json],
        )?;
        Ok(())
    }
}

#[derive(Debug)]
struct DrawRow {
    draw_no: u32,
    draw_date: String,
    numbers: String,
    bonus_number: u8,
    total_sales_amount: i64,
    first_prize_amount: i64,
    first_winner_count: u32,
}

impl TryFrom<DrawRow> for DrawResult {
    type Error = LottoError;

    fn try_from(row: DrawRow) -> Result<Self> {
        draw_from_parts(
            row.draw_no,
            &row.draw_date,
            &parse_number_list(&row.numbers)?,
            row.bonus_number,
            from_sql_amount(row.total_sales_amount),
            from_sql_amount(row.first_prize_amount),
            row.first_winner_count,
        )
    }
}

fn draw_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<DrawRow> {
    Ok(DrawRow {
        draw_no: row.get(0)?,
        draw_date: row.get(1)?,
        numbers: row.get(2)?,
        bonus_number: row.get(3)?,
        total_sales_amount: row.get(4)?,
        first_prize_amount: row.get(5)?,
        first_winner_count: row.get(6)?,
    })
}

impl DrawSource for SqliteStore {
    fn latest_draw(&self) -> Result<Option<DrawResult>> {
        Ok(self.recent_draws(1)?.into_iter().next())
    }

    fn draw_by_no(&self, draw_no: u32) -> Result<Option<DrawResult>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM draw_results WHERE draw_no = ?1",
            DRAW_COLUMNS
        ))?;
        let row = stmt.query_row([draw_no], draw_row).optional()?;
        row.map(DrawResult::try_from).transpose()
    }

    fn recent_draws(&self, count: usize) -> Result<Vec<DrawResult>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM draw_results ORDER BY draw_no DESC LIMIT ?1",
            DRAW_COLUMNS
        ))?;
        let row_iter = stmt.query_map([i64::try_from(count).unwrap_or(i64::MAX)], draw_row)?;

        let mut draws = Vec::new();
        for row in row_iter {
            draws.push(DrawResult::try_from(row?)?);
        }
        Ok(draws)
    }
}
