// Z-score valuation over an explicit comparison population.

use crate::league::Category;
use crate::player::Player;

// ---------------------------------------------------------------------------
// Pool statistics
// ---------------------------------------------------------------------------

/// Mean and standard deviation for a single category across a player pool.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PoolStats {
    pub mean: f64,
    pub stdev: f64,
}

/// Lower bound applied to the standard deviation before dividing.
pub const STDEV_FLOOR: f64 = 1e-9;

/// Decimal places kept on a player's composite value.
pub const VALUE_PRECISION: i32 = 4;

/// Compute mean and standard deviation for a slice of values.
///
/// Returns `PoolStats { mean: 0.0, stdev: 0.0 }` for an empty slice.
/// Uses the population standard deviation (N denominator), since the pool
/// is the full comparison universe rather than a sample.
pub fn compute_pool_stats(values: &[f64]) -> PoolStats {
    if values.is_empty() {
        return PoolStats {
            mean: 0.0,
            stdev: 0.0,
        };
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    PoolStats {
        mean,
        stdev: variance.sqrt(),
    }
}

/// Compute a z-score, flooring the standard deviation at [`STDEV_FLOOR`].
pub fn compute_zscore(value: f64, stats: &PoolStats) -> f64 {
    (value - stats.mean) / stats.stdev.max(STDEV_FLOOR)
}

/// Round to a fixed number of decimal places.
pub fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}

// ---------------------------------------------------------------------------
// Scoring context
// ---------------------------------------------------------------------------

/// Per-category population statistics for one comparison pool.
///
/// Values are relative to the population the context was built from, so a
/// context must never be reused once pool membership changes. Each trade
/// evaluation builds its own.
#[derive(Debug, Clone)]
pub struct ScoringContext {
    categories: Vec<Category>,
    stats: Vec<PoolStats>,
    population: usize,
}

impl ScoringContext {
    /// Build from a pool whose `per_game` maps are already populated.
    pub fn from_pool(categories: &[Category], pool: &[Player]) -> Self {
        let stats = categories
            .iter()
            .map(|cat| {
                let values: Vec<f64> = pool.iter().map(|p| p.per_game_stat(cat.id)).collect();
                compute_pool_stats(&values)
            })
            .collect();

        ScoringContext {
            categories: categories.to_vec(),
            stats,
            population: pool.len(),
        }
    }

    /// Number of players the statistics were computed over.
    pub fn population(&self) -> usize {
        self.population
    }

    /// Pool statistics for a category id, if it is scored.
    pub fn category_stats(&self, category_id: u32) -> Option<&PoolStats> {
        self.categories
            .iter()
            .position(|c| c.id == category_id)
            .map(|i| &self.stats[i])
    }

    /// Equal-weight sum of category z-scores, rounded to [`VALUE_PRECISION`].
    /// With no categories every player scores 0.
    pub fn score(&self, player: &Player) -> f64 {
        let total: f64 = self
            .categories
            .iter()
            .zip(&self.stats)
            .map(|(cat, stats)| compute_zscore(player.per_game_stat(cat.id), stats))
            .sum();
        round_to(total, VALUE_PRECISION)
    }

    /// Write `value` for every player in `pool`.
    pub fn apply(&self, pool: &mut [Player]) {
        for player in pool.iter_mut() {
            player.value = self.score(player);
        }
    }
}

/// Score the full comparison population in place and return the context used.
///
/// The pool must contain every player that will be compared (both rosters
/// and the free-agent pool) since each value is relative to this population.
pub fn score_pool(pool: &mut [Player], categories: &[Category]) -> ScoringContext {
    let ctx = ScoringContext::from_pool(categories, pool);
    ctx.apply(pool);
    ctx
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
