// Valuation engine: population-relative z-scores.

pub mod zscore;

pub use zscore::{score_pool, PoolStats, ScoringContext};
