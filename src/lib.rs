//! Seeded 6-from-45 lottery number generation with constraints, a decorative
//! chance estimate, prize ranking and a capped run history.

pub mod chance;
pub mod config;
pub mod database;
pub mod draws;
pub mod error;
pub mod generator;
pub mod history;
pub mod rank;
pub mod rng;
pub mod sampler;
pub mod service;
pub mod types;
pub mod utils;

pub use error::{LottoError, Result};
pub use history::{HistoryFilter, HistoryStore, MemoryHistoryStore, ModeFilter};
pub use rank::Rank;
pub use service::LottoService;
pub use types::*;
