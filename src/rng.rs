//! Seeded sequence generator.
//!
//! A small linear congruential generator: `state = (state * 9301 + 49297) mod 233280`.
//! Same seed, same sequence; a stored seed is enough to replay a whole run.
//! Not suitable for anything security related.

const MULTIPLIER: u64 = 9301;
const INCREMENT: u64 = 49297;
const MODULUS: u64 = 233_280;

#[derive(Debug, Clone)]
pub struct SeededRng {
    state: u64,
}

impl SeededRng {
    pub fn new(seed: u64) -> Self {
        Self { state: seed }
    }

    fn step(&mut self) -> u64 {
        // Reducing first keeps the product far below u64::MAX for any seed.
        self.state = ((self.state % MODULUS) * MULTIPLIER + INCREMENT) % MODULUS;
        self.state
    }

    /// Next value in `[0, 1)`.
    pub fn next_f64(&mut self) -> f64 {
        self.step() as f64 / MODULUS as f64
    }

    /// Next integer in `1..=max`, `floor(next * max) + 1` in floating point.
    ///
    /// The float product rounds down for a few states (67392, 134784 with
    /// `max = 45`) where exact integer division would not; replays depend on
    /// keeping the float behaviour.
    pub fn next_number(&mut self, max: u8) -> u8 {
        (self.next_f64() * f64::from(max)).floor() as u8 + 1
    }
}
