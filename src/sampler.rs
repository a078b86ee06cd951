use tracing::{debug, warn};

use crate::error::{LottoError, Result};
use crate::rng::SeededRng;
use crate::types::{Constraints, MAX_NUMBER, NumberSet, SET_SIZE};

/// Draws allowed for the constrained pass before inclusion repair.
pub const MAX_ATTEMPTS: usize = 1000;
/// Hard bound on the unconstrained fill pass.
pub const MAX_FILL_DRAWS: usize = 100_000;

/// Draws one set of six numbers from `rng` honoring `constraints`.
///
/// 1. Up to [`MAX_ATTEMPTS`] draws, rejecting duplicates, excluded numbers
///    and (optionally) neighbours of numbers already picked.
/// 2. Every include number not yet present replaces the latest
///    non-included pick when the set is full, otherwise it is appended.
/// 3. Remaining slots are filled ignoring the consecutive rule, bounded by
///    [`MAX_FILL_DRAWS`].
pub fn draw_set(rng: &mut SeededRng, constraints: &Constraints) -> Result<NumberSet> {
    constraints.validate()?;

    let available = constraints.available();
    if available < SET_SIZE {
        return Err(LottoError::ConstraintExhausted {
            attempts: 0,
            available,
        });
    }

    let mut picked: Vec<u8> = Vec::with_capacity(SET_SIZE);
    let mut attempts = 0;

    while picked.len() < SET_SIZE && attempts < MAX_ATTEMPTS {
        attempts += 1;
        let n = rng.next_number(MAX_NUMBER);

        if picked.contains(&n) || constraints.exclude.contains(&n) {
            continue;
        }
        if constraints.prevent_consecutive && picked.iter().any(|p| p.abs_diff(n) == 1) {
            continue;
        }
        picked.push(n);
    }

    if picked.len() < SET_SIZE {
        debug!(
            attempts,
            picked = picked.len(),
            "constrained pass ended short, repairing"
        );
    }

    for &n in &constraints.include {
        if picked.contains(&n) {
            continue;
        }
        if picked.len() >= SET_SIZE {
            if let Some(pos) = picked.iter().rposition(|p| !constraints.include.contains(p)) {
                picked.remove(pos);
            }
        }
        picked.push(n);
    }

    let mut fill_draws = 0;
    while picked.len() < SET_SIZE {
        if fill_draws >= MAX_FILL_DRAWS {
            warn!(fill_draws, available, "fill pass exhausted its draw budget");
            return Err(LottoError::ConstraintExhausted {
                attempts: attempts + fill_draws,
                available,
            });
        }
        fill_draws += 1;
        let n = rng.next_number(MAX_NUMBER);
        if !picked.contains(&n) && !constraints.exclude.contains(&n) {
            picked.push(n);
        }
    }

    NumberSet::new(&picked)
}
