use chrono::{DateTime, Datelike, Local, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use crate::error::{LottoError, Result};
use crate::rank::Rank;

pub const MIN_NUMBER: u8 = 1;
pub const MAX_NUMBER: u8 = 45;
pub const SET_SIZE: usize = 6;
pub const SETS_PER_RUN: usize = 5;
pub const MAX_INCLUDED: usize = 6;

/// Six distinct numbers in 1..=45, kept sorted ascending.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "Vec<u8>", into = "Vec<u8>")]
pub struct NumberSet([u8; SET_SIZE]);

impl NumberSet {
    pub fn new(values: &[u8]) -> Result<Self> {
        if values.len() != SET_SIZE {
            return Err(LottoError::InvalidNumberSet(format!(
                "expected {} numbers, got {}",
                SET_SIZE,
                values.len()
            )));
        }
        if let Some(n) = values.iter().find(|n| !is_valid_number(**n)) {
            return Err(LottoError::InvalidNumberSet(format!(
                "{} is outside {}..={}",
                n, MIN_NUMBER, MAX_NUMBER
            )));
        }

        let mut sorted = [0u8; SET_SIZE];
        sorted.copy_from_slice(values);
        sorted.sort_unstable();
        if sorted.windows(2).any(|w| w[0] == w[1]) {
            return Err(LottoError::InvalidNumberSet(format!(
                "duplicate numbers in {:?}",
                values
            )));
        }
        Ok(Self(sorted))
    }

    pub fn numbers(&self) -> &[u8; SET_SIZE] {
        &self.0
    }

    pub fn contains(&self, number: u8) -> bool {
        self.0.contains(&number)
    }

    pub fn iter(&self) -> impl Iterator<Item = u8> + '_ {
        self.0.iter().copied()
    }

    /// True when two numbers of the set differ by exactly one.
    pub fn has_consecutive(&self) -> bool {
        self.0.windows(2).any(|w| w[1] - w[0] == 1)
    }
}

impl TryFrom<Vec<u8>> for NumberSet {
    type Error = LottoError;

    fn try_from(values: Vec<u8>) -> Result<Self> {
        NumberSet::new(&values)
    }
}

impl From<NumberSet> for Vec<u8> {
    fn from(set: NumberSet) -> Self {
        set.0.to_vec()
    }
}

impl fmt::Display for NumberSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let joined = self
            .0
            .iter()
            .map(|n| format!("{:02}", n))
            .collect::<Vec<_>>()
            .join(" ");
        f.write_str(&joined)
    }
}

pub fn is_valid_number(n: u8) -> bool {
    (MIN_NUMBER..=MAX_NUMBER).contains(&n)
}

/// Constraint fields of a generation request.
///
/// `exclude` and `include` are kept disjoint by the toggle helpers; the
/// sampler re-checks this through [`Constraints::validate`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Constraints {
    #[serde(default)]
    pub exclude: BTreeSet<u8>,
    #[serde(default)]
    pub include: BTreeSet<u8>,
    #[serde(default)]
    pub prevent_consecutive: bool,
}

impl Constraints {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_excluded(mut self, numbers: impl IntoIterator<Item = u8>) -> Self {
        for n in numbers {
            self.include.remove(&n);
            self.exclude.insert(n);
        }
        self
    }

    pub fn with_included(mut self, numbers: impl IntoIterator<Item = u8>) -> Self {
        for n in numbers {
            self.exclude.remove(&n);
            self.include.insert(n);
        }
        self
    }

    pub fn with_prevent_consecutive(mut self, on: bool) -> Self {
        self.prevent_consecutive = on;
        self
    }

    /// Flip `n` in the exclude set. Excluding a number drops it from `include`.
    pub fn toggle_exclude(&mut self, n: u8) {
        if !self.exclude.remove(&n) {
            self.include.remove(&n);
            self.exclude.insert(n);
        }
    }

    /// Flip `n` in the include set. Returns false when the include set is
    /// already full and `n` was not added.
    pub fn toggle_include(&mut self, n: u8) -> bool {
        if self.include.remove(&n) {
            return true;
        }
        if self.include.len() >= MAX_INCLUDED {
            return false;
        }
        self.exclude.remove(&n);
        self.include.insert(n);
        true
    }

    /// Count of numbers in 1..=45 the sampler may still draw.
    pub fn available(&self) -> usize {
        let excluded = self.exclude.iter().filter(|n| is_valid_number(**n)).count();
        usize::from(MAX_NUMBER) - excluded
    }

    pub fn validate(&self) -> Result<()> {
        if let Some(n) = self
            .exclude
            .iter()
            .chain(self.include.iter())
            .find(|n| !is_valid_number(**n))
        {
            return Err(LottoError::InvalidConstraints(format!(
                "{} is outside {}..={}",
                n, MIN_NUMBER, MAX_NUMBER
            )));
        }
        if self.include.len() > MAX_INCLUDED {
            return Err(LottoError::InvalidConstraints(format!(
                "at most {} numbers can be included, got {}",
                MAX_INCLUDED,
                self.include.len()
            )));
        }
        let overlap: Vec<u8> = self.exclude.intersection(&self.include).copied().collect();
        if !overlap.is_empty() {
            return Err(LottoError::InvalidConstraints(format!(
                "numbers {:?} are both excluded and included",
                overlap
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    Male,
    Female,
}

impl Gender {
    pub fn as_str(&self) -> &'static str {
        match self {
            Gender::Male => "male",
            Gender::Female => "female",
        }
    }
}

impl FromStr for Gender {
    type Err = LottoError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "m" | "male" | "남" | "남성" => Ok(Gender::Male),
            "f" | "female" | "여" | "여성" => Ok(Gender::Female),
            other => Err(LottoError::InvalidGender(other.to_string())),
        }
    }
}

impl fmt::Display for Gender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Validated caller identity used for seeding and the chance estimate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserInfo {
    pub birth_date: String,
    pub gender: Gender,
}

impl UserInfo {
    pub fn new(birth_date: &str, gender: Gender) -> Result<Self> {
        Self::new_in_year(birth_date, gender, Local::now().year())
    }

    pub fn new_in_year(birth_date: &str, gender: Gender, current_year: i32) -> Result<Self> {
        crate::utils::parse_birth_date(birth_date, current_year)?;
        Ok(Self {
            birth_date: birth_date.to_string(),
            gender,
        })
    }

    /// The birth date digits read as one integer, e.g. `19900101`.
    pub fn birth_digits(&self) -> Result<u64> {
        self.birth_date
            .parse()
            .map_err(|_| LottoError::InvalidBirthDate(self.birth_date.clone()))
    }
}

/// Six winning numbers plus a bonus number, all seven pairwise distinct.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "WinningTargetRaw")]
pub struct WinningTarget {
    pub winning_numbers: NumberSet,
    pub bonus_number: u8,
}

#[derive(Deserialize)]
struct WinningTargetRaw {
    winning_numbers: Vec<u8>,
    bonus_number: u8,
}

impl TryFrom<WinningTargetRaw> for WinningTarget {
    type Error = LottoError;

    fn try_from(raw: WinningTargetRaw) -> Result<Self> {
        WinningTarget::new(&raw.winning_numbers, raw.bonus_number)
    }
}

impl WinningTarget {
    pub fn new(winning_numbers: &[u8], bonus_number: u8) -> Result<Self> {
        let winning_numbers =
            NumberSet::new(winning_numbers).map_err(|e| LottoError::InvalidTarget(e.to_string()))?;
        if !is_valid_number(bonus_number) {
            return Err(LottoError::InvalidTarget(format!(
                "bonus number {} is outside {}..={}",
                bonus_number, MIN_NUMBER, MAX_NUMBER
            )));
        }
        if winning_numbers.contains(bonus_number) {
            return Err(LottoError::InvalidTarget(format!(
                "bonus number {} repeats a winning number",
                bonus_number
            )));
        }
        Ok(Self {
            winning_numbers,
            bonus_number,
        })
    }
}

impl fmt::Display for WinningTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} + {:02}", self.winning_numbers, self.bonus_number)
    }
}

/// Five sets drawn from one seeded stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationResult {
    pub seed: u64,
    pub sets: Vec<NumberSet>,
}

/// One stored generation run. Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub id: String,
    pub birth_date: String,
    pub gender: Gender,
    pub numbers: Vec<NumberSet>,
    pub seed: u64,
    pub created_at: DateTime<Utc>,
    pub created_at_local: String,
    pub estimated_chance: f64,
    pub is_game_mode: bool,
    pub draw_no: u32,
    pub draw_date: NaiveDate,
    pub rank_result: Option<Rank>,
    pub game_target: Option<WinningTarget>,
}

/// UI continuity fields kept alongside the history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameState {
    #[serde(default)]
    pub target: Option<WinningTarget>,
    #[serde(default)]
    pub last_sets: Vec<NumberSet>,
    #[serde(default = "default_show_target_form")]
    pub show_target_form: bool,
}

fn default_show_target_form() -> bool {
    true
}

impl Default for GameState {
    fn default() -> Self {
        Self {
            target: None,
            last_sets: Vec::new(),
            show_target_form: true,
        }
    }
}

/// An official drawing as consumed by the core.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DrawResult {
    pub draw_no: u32,
    pub draw_date: NaiveDate,
    pub numbers: NumberSet,
    pub bonus_number: u8,
    pub total_sales_amount: u64,
    pub first_prize_amount: u64,
    pub first_winner_count: u32,
}

impl DrawResult {
    pub fn target(&self) -> Result<WinningTarget> {
        WinningTarget::new(self.numbers.numbers(), self.bonus_number)
    }
}

/// Draw a normal-mode run is generated for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DrawInfo {
    pub draw_no: u32,
    pub draw_date: NaiveDate,
}

// Raw JSON shapes of the drawing-results sources.

#[derive(Deserialize, Debug)]
pub struct OfficialDrawResponse {
    #[serde(rename = "returnValue")]
    pub return_value: String,
    #[serde(rename = "drwNo", default)]
    pub draw_no: u32,
    #[serde(rename = "drwNoDate", default)]
    pub draw_date: String,
    #[serde(rename = "drwtNo1", default)]
    pub no1: u8,
    #[serde(rename = "drwtNo2", default)]
    pub no2: u8,
    #[serde(rename = "drwtNo3", default)]
    pub no3: u8,
    #[serde(rename = "drwtNo4", default)]
    pub no4: u8,
    #[serde(rename = "drwtNo5", default)]
    pub no5: u8,
    #[serde(rename = "drwtNo6", default)]
    pub no6: u8,
    #[serde(rename = "bnusNo", default)]
    pub bonus_no: u8,
    #[serde(rename = "totSellamnt", default)]
    pub total_sales_amount: u64,
    #[serde(rename = "firstWinamnt", default)]
    pub first_prize_amount: u64,
    #[serde(rename = "firstPrzwnerCo", default)]
    pub first_winner_count: u32,
}

#[derive(Deserialize, Debug)]
pub struct MirrorDrawResponse {
    pub draw_no: u32,
    pub date: String,
    pub numbers: Vec<u8>,
    pub bonus_no: u8,
    #[serde(default)]
    pub total_sales_amount: u64,
    #[serde(default)]
    pub divisions: Vec<MirrorDivision>,
}

#[derive(Deserialize, Debug)]
pub struct MirrorDivision {
    #[serde(default)]
    pub prize: u64,
    #[serde(default)]
    pub winners: u32,
}

#[derive(Deserialize, Debug)]
#[serde(untagged)]
pub enum DrawPayload {
    Official(OfficialDrawResponse),
    Mirror(MirrorDrawResponse),
}
