use anyhow::{Context, Result};
use std::env;
use std::str::FromStr;

use crate::draws::DEFAULT_FALLBACK_DRAW_NO;
use crate::history::HISTORY_LIMIT;

pub const DEFAULT_DB_PATH: &str = "data/lotto.db";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub database_url: String,
    pub history_limit: usize,
    pub fallback_draw_no: u32,
    /// Pause between progressively revealed sets in the CLI.
    pub reveal_delay_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_url: DEFAULT_DB_PATH.to_string(),
            history_limit: HISTORY_LIMIT,
            fallback_draw_no: DEFAULT_FALLBACK_DRAW_NO,
            reveal_delay_ms: 0,
        }
    }
}

impl Config {
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Config::default();

        let database_url = lookup("LOTTO_DB_PATH").unwrap_or(defaults.database_url);
        let history_limit = parse_var(&lookup, "LOTTO_HISTORY_LIMIT", defaults.history_limit)?;
        let fallback_draw_no =
            parse_var(&lookup, "LOTTO_FALLBACK_DRAW_NO", defaults.fallback_draw_no)?;
        let reveal_delay_ms = parse_var(&lookup, "LOTTO_REVEAL_DELAY_MS", defaults.reveal_delay_ms)?;

        if history_limit == 0 {
            anyhow::bail!("LOTTO_HISTORY_LIMIT must be at least 1");
        }

        Ok(Config {
            database_url,
            history_limit,
            fallback_draw_no,
            reveal_delay_ms,
        })
    }
}

fn parse_var<F, T>(lookup: &F, key: &str, default: T) -> Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("invalid value for {}: {:?}", key, raw)),
        None => Ok(default),
    }
}

pub fn load() -> Result<Config> {
    Config::from_lookup(|key| env::var(key).ok())
}
