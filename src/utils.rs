use chrono::{DateTime, Datelike, Duration, FixedOffset, NaiveDate, Utc, Weekday};

use crate::error::{LottoError, Result};

const KST_OFFSET_SECS: i32 = 9 * 3600;
const MIN_BIRTH_YEAR: i32 = 1900;

/// Parses an 8-digit `YYYYMMDD` birth date, rejecting impossible dates and
/// years outside `1900..=current_year`.
pub fn parse_birth_date(birth_date: &str, current_year: i32) -> Result<NaiveDate> {
    if birth_date.len() != 8 || !birth_date.bytes().all(|b| b.is_ascii_digit()) {
        return Err(LottoError::InvalidBirthDate(format!(
            "expected 8 digits (YYYYMMDD), got {:?}",
            birth_date
        )));
    }

    let year: i32 = birth_date[0..4].parse().unwrap_or(0);
    let month: u32 = birth_date[4..6].parse().unwrap_or(0);
    let day: u32 = birth_date[6..8].parse().unwrap_or(0);

    if year < MIN_BIRTH_YEAR || year > current_year {
        return Err(LottoError::InvalidBirthDate(format!(
            "year {} is outside {}..={}",
            year, MIN_BIRTH_YEAR, current_year
        )));
    }

    NaiveDate::from_ymd_opt(year, month, day).ok_or_else(|| {
        LottoError::InvalidBirthDate(format!("{} is not a calendar date", birth_date))
    })
}

/// The first Saturday strictly after `today`. Draws are held on Saturdays.
pub fn next_saturday(today: NaiveDate) -> NaiveDate {
    let sat = Weekday::Sat.num_days_from_monday();
    let ahead = (sat + 7 - today.weekday().num_days_from_monday()) % 7;
    let ahead = if ahead == 0 { 7 } else { ahead };
    today + Duration::days(i64::from(ahead))
}

/// Formats a timestamp in Korea Standard Time for display.
pub fn format_korean_time(at: DateTime<Utc>) -> String {
    match FixedOffset::east_opt(KST_OFFSET_SECS) {
        Some(kst) => at.with_timezone(&kst).format("%Y-%m-%d %H:%M:%S KST").to_string(),
        None => at.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
    }
}

pub fn epoch_millis(at: DateTime<Utc>) -> u64 {
    u64::try_from(at.timestamp_millis()).unwrap_or(0)
}

/// Accepts `YYYY-MM-DD` with an optional time suffix (`2024-01-06T00:00:00Z`).
pub fn parse_draw_date(raw: &str) -> Result<NaiveDate> {
    let day_part = raw.split('T').next().unwrap_or(raw).trim();
    NaiveDate::parse_from_str(day_part, "%Y-%m-%d")
        .map_err(|e| LottoError::InvalidDrawData(format!("bad draw date {:?}: {}", raw, e)))
}

/// Parses a comma separated list such as `3,11,27`.
pub fn parse_number_list(raw: &str) -> Result<Vec<u8>> {
    raw.split(',')
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse::<u8>()
                .map_err(|_| LottoError::InvalidNumberSet(format!("{:?} is not a number", s)))
        })
        .collect()
}
