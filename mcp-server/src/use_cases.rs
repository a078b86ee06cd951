use anyhow::Result;
use chrono::Local;
use serde_json::{Value, json};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

use lotto645::chance::estimate_chance;
use lotto645::database::SqliteStore;
use lotto645::draws::{DrawSource, hot_numbers, number_frequency};
use lotto645::history::{HistoryFilter, ModeFilter};
use lotto645::rank::{evaluate_rank, matched_numbers};
use lotto645::service::LottoService;
use lotto645::types::{Constraints, Gender, NumberSet, UserInfo, WinningTarget};
use lotto645::utils::parse_number_list;

pub type SharedService = Arc<Mutex<LottoService<SqliteStore>>>;

const DEFAULT_DRAW_COUNT: usize = 10;
const DEFAULT_FREQUENCY_WINDOW: usize = 50;
const HOT_NUMBER_COUNT: usize = 10;

fn str_arg<'a>(arguments: &'a HashMap<String, Value>, key: &str) -> Result<&'a str> {
    arguments
        .get(key)
        .and_then(|v| v.as_str())
        .ok_or_else(|| anyhow::anyhow!("Missing {} parameter", key))
}

fn count_arg(arguments: &HashMap<String, Value>, key: &str, default: usize) -> usize {
    arguments
        .get(key)
        .and_then(|v| v.as_u64())
        .and_then(|n| usize::try_from(n).ok())
        .unwrap_or(default)
}

/// Numbers given either as a JSON array or a comma separated string.
fn numbers_arg(arguments: &HashMap<String, Value>, key: &str) -> Result<Option<Vec<u8>>> {
    match arguments.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(raw)) => Ok(Some(parse_number_list(raw)?)),
        Some(Value::Array(items)) => items
            .iter()
            .map(|v| {
                v.as_u64()
                    .and_then(|n| u8::try_from(n).ok())
                    .ok_or_else(|| anyhow::anyhow!("{} must contain numbers 1-45, got {}", key, v))
            })
            .collect::<Result<Vec<u8>>>()
            .map(Some),
        Some(other) => Err(anyhow::anyhow!("{} must be an array or a string, got {}", key, other)),
    }
}

fn required_numbers(arguments: &HashMap<String, Value>, key: &str) -> Result<Vec<u8>> {
    numbers_arg(arguments, key)?.ok_or_else(|| anyhow::anyhow!("Missing {} parameter", key))
}

fn user_arg(arguments: &HashMap<String, Value>) -> Result<UserInfo> {
    let birth_date = str_arg(arguments, "birth_date")?;
    let gender: Gender = str_arg(arguments, "gender")?.parse()?;
    Ok(UserInfo::new(birth_date, gender)?)
}

fn constraints_arg(arguments: &HashMap<String, Value>) -> Result<Constraints> {
    let constraints = Constraints::new()
        .with_excluded(numbers_arg(arguments, "exclude")?.unwrap_or_default())
        .with_included(numbers_arg(arguments, "include")?.unwrap_or_default())
        .with_prevent_consecutive(
            arguments
                .get("prevent_consecutive")
                .and_then(|v| v.as_bool())
                .unwrap_or(false),
        );
    constraints.validate()?;
    Ok(constraints)
}

fn target_arg(arguments: &HashMap<String, Value>) -> Result<WinningTarget> {
    let winning = required_numbers(arguments, "winning_numbers")?;
    let bonus = arguments
        .get("bonus_number")
        .and_then(|v| v.as_u64())
        .and_then(|n| u8::try_from(n).ok())
        .ok_or_else(|| anyhow::anyhow!("Missing bonus_number parameter"))?;
    Ok(WinningTarget::new(&winning, bonus)?)
}

fn filter_arg(arguments: &HashMap<String, Value>) -> Result<HistoryFilter> {
    let mut filter = HistoryFilter::default();
    if let Some(birth_date) = arguments.get("birth_date").and_then(|v| v.as_str()) {
        filter.birth_date = Some(birth_date.to_string());
    }
    if let Some(gender) = arguments.get("gender").and_then(|v| v.as_str()) {
        filter.gender = Some(gender.parse()?);
    }
    if let Some(mode) = arguments.get("mode").and_then(|v| v.as_str()) {
        filter = filter.with_mode(mode.parse::<ModeFilter>()?);
    }
    Ok(filter)
}

pub struct GeneratorUseCase {
    service: SharedService,
}

impl GeneratorUseCase {
    pub fn new(service: SharedService) -> Self {
        Self { service }
    }

    pub async fn generate_numbers(&self, arguments: &HashMap<String, Value>) -> Result<String> {
        let user = user_arg(arguments)?;
        let constraints = constraints_arg(arguments)?;

        let mut service = self.service.lock().await;
        let draw = service.upcoming_draw(Local::now().date_naive());
        let entry = service.generate(&user, &constraints, draw)?;

        Ok(json!({
            "success": true,
            "draw": draw,
            "entry": entry
        })
        .to_string())
    }

    pub async fn estimate_chance(&self, arguments: &HashMap<String, Value>) -> Result<String> {
        let user = user_arg(arguments)?;
        let chance = estimate_chance(&user.birth_date, user.gender);

        Ok(json!({
            "success": true,
            "birth_date": user.birth_date,
            "gender": user.gender,
            "estimated_chance": chance
        })
        .to_string())
    }

    pub async fn evaluate_rank(&self, arguments: &HashMap<String, Value>) -> Result<String> {
        let set = NumberSet::new(&required_numbers(arguments, "numbers")?)?;
        let target = target_arg(arguments)?;
        let rank = evaluate_rank(&set, &target);

        Ok(json!({
            "success": true,
            "numbers": set,
            "rank": rank,
            "matched": matched_numbers(&set, &target),
            "bonus_matched": set.contains(target.bonus_number)
        })
        .to_string())
    }

    pub async fn play_game(&self, arguments: &HashMap<String, Value>) -> Result<String> {
        let user = user_arg(arguments)?;
        let constraints = constraints_arg(arguments)?;
        let target = target_arg(arguments)?;

        let outcome = self.service.lock().await.play_game(&user, &constraints, target)?;

        Ok(json!({
            "success": true,
            "entry": outcome.entry,
            "ranks": outcome.ranks
        })
        .to_string())
    }
}

pub struct HistoryUseCase {
    service: SharedService,
}

impl HistoryUseCase {
    pub fn new(service: SharedService) -> Self {
        Self { service }
    }

    pub async fn get_history(&self, arguments: &HashMap<String, Value>) -> Result<String> {
        let filter = filter_arg(arguments)?;
        let mut entries = self.service.lock().await.history(&filter)?;
        if let Some(limit) = arguments.get("limit").and_then(|v| v.as_u64()) {
            entries.truncate(usize::try_from(limit).unwrap_or(usize::MAX));
        }

        Ok(json!({
            "success": true,
            "count": entries.len(),
            "entries": entries
        })
        .to_string())
    }

    pub async fn get_history_summary(&self, arguments: &HashMap<String, Value>) -> Result<String> {
        let filter = filter_arg(arguments)?;
        let summary = self.service.lock().await.summary(&filter)?;

        Ok(json!({
            "success": true,
            "summary": summary
        })
        .to_string())
    }

    pub async fn delete_history_entry(&self, arguments: &HashMap<String, Value>) -> Result<String> {
        let id = str_arg(arguments, "id")?;
        let removed = self.service.lock().await.remove(id)?;
        let message = if removed {
            format!("Removed history entry {}", id)
        } else {
            format!("No history entry with id {}", id)
        };

        Ok(json!({
            "success": removed,
            "message": message
        })
        .to_string())
    }

    pub async fn clear_history(&self, _arguments: &HashMap<String, Value>) -> Result<String> {
        self.service.lock().await.clear()?;

        Ok(json!({
            "success": true,
            "message": "History cleared"
        })
        .to_string())
    }

    pub async fn check_history_entry(&self, arguments: &HashMap<String, Value>) -> Result<String> {
        let id = str_arg(arguments, "id")?;
        let check = self
            .service
            .lock()
            .await
            .check_stored_entry(id)?
            .ok_or_else(|| anyhow::anyhow!("No history entry with id {}", id))?;

        Ok(json!({
            "success": true,
            "draw_known": check.entry.is_game_mode || check.rank.is_some(),
            "rank": check.rank,
            "entry": check.entry
        })
        .to_string())
    }

    pub async fn get_game_state(&self, _arguments: &HashMap<String, Value>) -> Result<String> {
        let state = self.service.lock().await.game_state()?;

        Ok(json!({
            "success": true,
            "state": state
        })
        .to_string())
    }

    pub async fn save_game_target(&self, arguments: &HashMap<String, Value>) -> Result<String> {
        let target = target_arg(arguments)?;
        let state = self.service.lock().await.save_game_target(target)?;

        Ok(json!({
            "success": true,
            "state": state
        })
        .to_string())
    }

    pub async fn reset_game_mode(&self, _arguments: &HashMap<String, Value>) -> Result<String> {
        let state = self.service.lock().await.reset_game_mode()?;

        Ok(json!({
            "success": true,
            "state": state
        })
        .to_string())
    }
}

pub struct DrawUseCase {
    service: SharedService,
}

impl DrawUseCase {
    pub fn new(service: SharedService) -> Self {
        Self { service }
    }

    pub async fn import_draw_json(&self, arguments: &HashMap<String, Value>) -> Result<String> {
        let raw_json = str_arg(arguments, "raw_json")?;
        let draw_no = self
            .service
            .lock()
            .await
            .store()
            .parse_and_insert_draw_json(raw_json)?;

        Ok(json!({
            "success": true,
            "draw_no": draw_no,
            "message": format!("Successfully stored draw #{}", draw_no)
        })
        .to_string())
    }

    pub async fn get_latest_draw(&self, _arguments: &HashMap<String, Value>) -> Result<String> {
        let latest = self.service.lock().await.store().latest_draw()?;

        Ok(json!({
            "success": latest.is_some(),
            "draw": latest
        })
        .to_string())
    }

    pub async fn get_recent_draws(&self, arguments: &HashMap<String, Value>) -> Result<String> {
        let count = count_arg(arguments, "count", DEFAULT_DRAW_COUNT);
        let draws = self.service.lock().await.store().recent_draws(count)?;

        Ok(json!({
            "success": true,
            "count": draws.len(),
            "draws": draws
        })
        .to_string())
    }

    pub async fn get_next_draw(&self, _arguments: &HashMap<String, Value>) -> Result<String> {
        let next = self
            .service
            .lock()
            .await
            .upcoming_draw(Local::now().date_naive());

        Ok(json!({
            "success": true,
            "draw": next
        })
        .to_string())
    }

    pub async fn get_number_frequency(&self, arguments: &HashMap<String, Value>) -> Result<String> {
        let count = count_arg(arguments, "count", DEFAULT_FREQUENCY_WINDOW);
        let draws = self.service.lock().await.store().recent_draws(count)?;
        let frequency = number_frequency(&draws);
        let hot: Vec<Value> = hot_numbers(&frequency, HOT_NUMBER_COUNT)
            .into_iter()
            .map(|(number, count)| json!({ "number": number, "count": count }))
            .collect();

        Ok(json!({
            "success": true,
            "draws_analyzed": draws.len(),
            "frequency": frequency,
            "hot_numbers": hot
        })
        .to_string())
    }
}
