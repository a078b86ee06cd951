use chrono::Utc;
use tracing::debug;

use crate::error::Result;
use crate::rng::SeededRng;
use crate::sampler::draw_set;
use crate::types::{Constraints, GenerationResult, NumberSet, SETS_PER_RUN, UserInfo};
use crate::utils::epoch_millis;

/// Seed for a run: the birth date digits plus the current epoch millis, so
/// two runs for the same person never repeat.
pub fn derive_seed(birth_digits: u64, epoch_millis: u64) -> u64 {
    birth_digits.wrapping_add(epoch_millis)
}

pub fn generate(user: &UserInfo, constraints: &Constraints) -> Result<GenerationResult> {
    let seed = derive_seed(user.birth_digits()?, epoch_millis(Utc::now()));
    generate_from_seed(seed, constraints)
}

pub fn generate_from_seed(seed: u64, constraints: &Constraints) -> Result<GenerationResult> {
    generate_with(seed, constraints, |_, _| {})
}

/// Generates the five sets of a run from one shared stream, handing each set
/// to `on_set` as soon as it is drawn.
pub fn generate_with<F>(seed: u64, constraints: &Constraints, mut on_set: F) -> Result<GenerationResult>
where
    F: FnMut(usize, &NumberSet),
{
    debug!(seed, ?constraints, "generating sets");
    let mut rng = SeededRng::new(seed);
    let mut sets = Vec::with_capacity(SETS_PER_RUN);

    for index in 0..SETS_PER_RUN {
        let set = draw_set(&mut rng, constraints)?;
        debug!(index, %set, "set drawn");
        on_set(index, &set);
        sets.push(set);
    }

    Ok(GenerationResult { seed, sets })
}
