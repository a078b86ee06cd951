//! Decorative "personal winning chance" percentage.
//!
//! Not a probability. It is derived from the birth date and gender plus a
//! fresh random swing, and always lands in `[1.0, 20.0]`.

use chrono::{Datelike, Local};
use rand::Rng;

use crate::types::Gender;
use crate::utils::parse_birth_date;

pub const MIN_CHANCE: f64 = 1.0;
pub const MAX_CHANCE: f64 = 20.0;
pub const DEFAULT_CHANCE: f64 = 5.0;
const TIME_SWING: f64 = 3.0;

pub fn estimate_chance(birth_date: &str, gender: Gender) -> f64 {
    let time_bonus = rand::rng().random_range(-TIME_SWING..TIME_SWING);
    estimate_chance_with(birth_date, gender, Local::now().year(), time_bonus)
}

/// Deterministic core of [`estimate_chance`] with the random term supplied.
pub fn estimate_chance_with(
    birth_date: &str,
    gender: Gender,
    current_year: i32,
    time_bonus: f64,
) -> f64 {
    let born = match parse_birth_date(birth_date, current_year) {
        Ok(date) => date,
        Err(_) => return DEFAULT_CHANCE,
    };

    let month_day = f64::from(born.month() * 100 + born.day());
    let normalized = (month_day - 101.0).abs() / 100.0;
    let gender_bonus = match gender {
        Gender::Male => 0.2,
        Gender::Female => 0.3,
    };
    let age = current_year - born.year() + 1;
    let age_bonus = f64::from(50 - age) * 0.1;

    let raw = 5.0 + normalized + gender_bonus + age_bonus / 10.0 + time_bonus;
    raw.clamp(MIN_CHANCE, MAX_CHANCE)
}
