use chrono::NaiveDate;
use std::collections::BTreeMap;
use tracing::warn;

use crate::error::{LottoError, Result};
use crate::types::{
    DrawInfo, DrawPayload, DrawResult, MAX_NUMBER, MIN_NUMBER, MirrorDrawResponse, NumberSet,
    OfficialDrawResponse, WinningTarget,
};
use crate::utils::{next_saturday, parse_draw_date};

pub const DEFAULT_FALLBACK_DRAW_NO: u32 = 1175;

/// Source of official drawing results.
pub trait DrawSource {
    fn latest_draw(&self) -> Result<Option<DrawResult>>;
    fn draw_by_no(&self, draw_no: u32) -> Result<Option<DrawResult>>;
    /// Up to `count` most recent draws, newest first.
    fn recent_draws(&self, count: usize) -> Result<Vec<DrawResult>>;
}

/// Parses one drawing result in either the official operator shape or the
/// community mirror shape.
pub fn parse_draw_json(raw_json: &str) -> Result<DrawResult> {
    let payload: DrawPayload = serde_json::from_str(raw_json)
        .map_err(|e| LottoError::InvalidDrawData(format!("unrecognised draw JSON: {}", e)))?;

    match payload {
        DrawPayload::Official(official) => from_official(official),
        DrawPayload::Mirror(mirror) => from_mirror(mirror),
    }
}

fn from_official(raw: OfficialDrawResponse) -> Result<DrawResult> {
    if raw.return_value != "success" {
        return Err(LottoError::InvalidDrawData(format!(
            "returnValue is {:?}",
            raw.return_value
        )));
    }
    let numbers = [raw.no1, raw.no2, raw.no3, raw.no4, raw.no5, raw.no6];
    let target = checked_target(&numbers, raw.bonus_no)?;

    Ok(DrawResult {
        draw_no: checked_draw_no(raw.draw_no)?,
        draw_date: parse_draw_date(&raw.draw_date)?,
        numbers: target.winning_numbers,
        bonus_number: target.bonus_number,
        total_sales_amount: raw.total_sales_amount,
        first_prize_amount: raw.first_prize_amount,
        first_winner_count: raw.first_winner_count,
    })
}

fn from_mirror(raw: MirrorDrawResponse) -> Result<DrawResult> {
    let target = checked_target(&raw.numbers, raw.bonus_no)?;
    let first = raw.divisions.first();

    Ok(DrawResult {
        draw_no: checked_draw_no(raw.draw_no)?,
        draw_date: parse_draw_date(&raw.date)?,
        numbers: target.winning_numbers,
        bonus_number: target.bonus_number,
        total_sales_amount: raw.total_sales_amount,
        first_prize_amount: first.map(|d| d.prize).unwrap_or(0),
        first_winner_count: first.map(|d| d.winners).unwrap_or(0),
    })
}

/// Draw numbers start at 1; a missing `drwNo` deserializes to 0.
fn checked_draw_no(draw_no: u32) -> Result<u32> {
    if draw_no == 0 {
        return Err(LottoError::InvalidDrawData("draw number is missing or 0".to_string()));
    }
    Ok(draw_no)
}

fn checked_target(numbers: &[u8], bonus: u8) -> Result<WinningTarget> {
    WinningTarget::new(numbers, bonus).map_err(|e| LottoError::InvalidDrawData(e.to_string()))
}

/// The draw a normal-mode run is generated for: one after the latest known
/// draw, held on the next Saturday. Without a latest draw the fallback
/// number is used, as it is when the latest number has no successor.
pub fn next_draw_info(latest: Option<&DrawResult>, today: NaiveDate, fallback_no: u32) -> DrawInfo {
    let draw_no = match latest {
        Some(d) => d.draw_no.checked_add(1).unwrap_or_else(|| {
            warn!(latest = d.draw_no, fallback_no, "latest draw number has no successor");
            fallback_no
        }),
        None => fallback_no,
    };
    DrawInfo {
        draw_no,
        draw_date: next_saturday(today),
    }
}

/// How often each number 1..=45 came up, bonus numbers included.
pub fn number_frequency(draws: &[DrawResult]) -> BTreeMap<u8, u32> {
    let mut frequency: BTreeMap<u8, u32> = (MIN_NUMBER..=MAX_NUMBER).map(|n| (n, 0)).collect();
    for draw in draws {
        for n in draw.numbers.iter().chain(std::iter::once(draw.bonus_number)) {
            if let Some(count) = frequency.get_mut(&n) {
                *count += 1;
            }
        }
    }
    frequency
}

/// Numbers ordered by frequency, most frequent first, ties by number.
pub fn hot_numbers(frequency: &BTreeMap<u8, u32>, count: usize) -> Vec<(u8, u32)> {
    let mut ranked: Vec<(u8, u32)> = frequency.iter().map(|(n, c)| (*n, *c)).collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
    ranked.truncate(count);
    ranked
}

/// Rebuilds a draw from stored columns.
pub(crate) fn draw_from_parts(
    draw_no: u32,
    draw_date: &str,
    numbers: &[u8],
    bonus_number: u8,
    total_sales_amount: u64,
    first_prize_amount: u64,
    first_winner_count: u32,
) -> Result<DrawResult> {
    Ok(DrawResult {
        draw_no,
        draw_date: parse_draw_date(draw_date)?,
        numbers: NumberSet::new(numbers)?,
        bonus_number,
        total_sales_amount,
        first_prize_amount,
        first_winner_count,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const OFFICIAL: &str = r#"{
        "totSellamnt": 118628811000,
        "returnValue": "success",
        "drwNoDate": "2025-06-07",
        "firstWinamnt": 2087342459,
        "drwtNo6": 42,
        "drwtNo4": 26,
        "firstPrzwnerCo": 13,
        "drwtNo5": 32,
        "bnusNo": 5,
        "firstAccumamnt": 27135451967,
        "drwNo": 1175,
        "drwtNo2": 10,
        "drwtNo3": 19,
        "drwtNo1": 3
    }"#;

    const MIRROR: &str = r#"{
        "draw_no": 1176,
        "numbers": [44, 2, 15, 26, 38, 7],
        "bonus_no": 33,
        "date": "2025-06-14T00:00:00Z",
        "total_sales_amount": 119000000000,
        "divisions": [
            {"prize": 1931312045, "winners": 14},
            {"prize": 61012345, "winners": 77}
        ]
    }"#;

    #[test]
    fn parses_official_shape() {
        let draw = parse_draw_json(OFFICIAL).unwrap();
        assert_eq!(draw.draw_no, 1175);
        assert_eq!(draw.draw_date, NaiveDate::from_ymd_opt(2025, 6, 7).unwrap());
        assert_eq!(draw.numbers.numbers(), &[3, 10, 19, 26, 32, 42]);
        assert_eq!(draw.bonus_number, 5);
        assert_eq!(draw.total_sales_amount, 118_628_811_000);
        assert_eq!(draw.first_prize_amount, 2_087_342_459);
        assert_eq!(draw.first_winner_count, 13);
    }

    #[test]
    fn parses_mirror_shape() {
        let draw = parse_draw_json(MIRROR).unwrap();
        assert_eq!(draw.draw_no, 1176);
        assert_eq!(draw.draw_date, NaiveDate::from_ymd_opt(2025, 6, 14).unwrap());
        assert_eq!(draw.numbers.numbers(), &[2, 7, 15, 26, 38, 44]);
        assert_eq!(draw.first_prize_amount, 1_931_312_045);
        assert_eq!(draw.first_winner_count, 14);
    }

    #[test]
    fn rejects_failed_or_broken_payloads() {
        assert!(matches!(
            parse_draw_json(r#"{"returnValue":"fail"}"#),
            Err(LottoError::InvalidDrawData(_))
        ));
        assert!(parse_draw_json("not json").is_err());
        let dup_bonus = OFFICIAL.replace("\"bnusNo\": 5", "\"bnusNo\": 42");
        assert!(parse_draw_json(&dup_bonus).is_err());
    }

    #[test]
    fn next_draw_follows_latest_or_falls_back() {
        let latest = parse_draw_json(OFFICIAL).unwrap();
        let today = NaiveDate::from_ymd_opt(2025, 6, 9).unwrap();

        let next = next_draw_info(Some(&latest), today, DEFAULT_FALLBACK_DRAW_NO);
        assert_eq!(next.draw_no, 1176);
        assert_eq!(next.draw_date, NaiveDate::from_ymd_opt(2025, 6, 14).unwrap());

        let fallback = next_draw_info(None, today, DEFAULT_FALLBACK_DRAW_NO);
        assert_eq!(fallback.draw_no, DEFAULT_FALLBACK_DRAW_NO);
    }

    #[test]
    fn highest_draw_number_falls_back_instead_of_overflowing() {
        let raw = MIRROR.replace("\"draw_no\": 1176", "\"draw_no\": 4294967295");
        let latest = parse_draw_json(&raw).unwrap();
        assert_eq!(latest.draw_no, u32::MAX);

        let today = NaiveDate::from_ymd_opt(2025, 6, 9).unwrap();
        let next = next_draw_info(Some(&latest), today, DEFAULT_FALLBACK_DRAW_NO);
        assert_eq!(next.draw_no, DEFAULT_FALLBACK_DRAW_NO);
        assert_eq!(next.draw_date, NaiveDate::from_ymd_opt(2025, 6, 14).unwrap());
    }

    #[test]
    fn missing_or_zero_draw_number_is_rejected() {
        let missing = OFFICIAL.replace("\"drwNo\": 1175,", "");
        assert!(matches!(
            parse_draw_json(&missing),
            Err(LottoError::InvalidDrawData(_))
        ));
        let zero = MIRROR.replace("\"draw_no\": 1176", "\"draw_no\": 0");
        assert!(matches!(
            parse_draw_json(&zero),
            Err(LottoError::InvalidDrawData(_))
        ));
    }

    #[test]
    fn frequency_counts_bonus_too() {
        let draws = vec![parse_draw_json(OFFICIAL).unwrap(), parse_draw_json(MIRROR).unwrap()];
        let freq = number_frequency(&draws);
        assert_eq!(freq.len(), 45);
        assert_eq!(freq[&26], 2);
        assert_eq!(freq[&5], 1);
        assert_eq!(freq[&33], 1);
        assert_eq!(freq[&1], 0);
        assert_eq!(freq.values().sum::<u32>(), 14);

        let hot = hot_numbers(&freq, 3);
        assert_eq!(hot[0], (26, 2));
        assert_eq!(hot[1], (2, 1));
    }
}
