// Player records: provider normalization and per-game rates.
//
// All tolerance for malformed upstream values lives here. Once a `Player`
// exists its stats are plain finite numbers and the scoring code never has
// to second-guess them.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

/// Position label that marks a goalie.
pub const GOALIE_POSITION: &str = "G";

/// Canonical spelling of the utility label.
pub const UTILITY_POSITION: &str = "Util";

/// Canonical form of a position or slot label: trimmed and upper-cased,
/// except the utility label which is always spelled `Util`.
pub fn canonical_position(label: &str) -> String {
    let upper = label.trim().to_uppercase();
    if upper == "UTIL" {
        UTILITY_POSITION.to_string()
    } else {
        upper
    }
}

// ---------------------------------------------------------------------------
// Typed player
// ---------------------------------------------------------------------------

/// A player in a comparison pool.
///
/// `per_game` and `value` are derived: `per_game` by [`normalize_per_game`],
/// `value` by the z-score scorer run over the whole comparison population.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Player {
    pub player_key: String,
    pub name: String,
    pub positions: BTreeSet<String>,
    pub is_goalie: bool,
    pub raw_stats: BTreeMap<u32, f64>,
    pub games_played: f64,
    #[serde(default)]
    pub per_game: BTreeMap<u32, f64>,
    #[serde(default)]
    pub value: f64,
}

impl Player {
    /// Build a player from already-clean data. Positions are canonicalized
    /// with [`canonical_position`] and `is_goalie` is derived from them;
    /// non-finite or negative games played becomes 0.
    pub fn new<I, S>(
        player_key: &str,
        name: &str,
        positions: I,
        raw_stats: BTreeMap<u32, f64>,
        games_played: f64,
    ) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let positions: BTreeSet<String> = positions
            .into_iter()
            .map(|p| canonical_position(p.as_ref()))
            .filter(|p| !p.is_empty())
            .collect();
        let is_goalie = positions.contains(GOALIE_POSITION);
        let raw_stats = raw_stats
            .into_iter()
            .map(|(id, v)| (id, if v.is_finite() { v } else { 0.0 }))
            .collect();

        Player {
            player_key: player_key.to_string(),
            name: name.to_string(),
            positions,
            is_goalie,
            raw_stats,
            games_played: sanitize_games_played(games_played),
            per_game: BTreeMap::new(),
            value: 0.0,
        }
    }

    /// Per-game rate for a category, 0 when absent.
    pub fn per_game_stat(&self, category_id: u32) -> f64 {
        self.per_game.get(&category_id).copied().unwrap_or(0.0)
    }

    /// Recompute `per_game` from `raw_stats` and `games_played`.
    ///
    /// A player with no games played gets an empty map, which every
    /// consumer reads as all-zero rates.
    pub fn compute_per_game(&mut self) {
        self.per_game.clear();
        if self.games_played <= 0.0 {
            return;
        }
        for (&id, &raw) in &self.raw_stats {
            self.per_game.insert(id, raw / self.games_played);
        }
    }
}

fn sanitize_games_played(gp: f64) -> f64 {
    if gp.is_finite() && gp > 0.0 {
        gp
    } else {
        0.0
    }
}

/// Populate `per_game` for every player in the pool.
pub fn normalize_per_game(pool: &mut [Player]) {
    for player in pool.iter_mut() {
        player.compute_per_game();
    }
}

// ---------------------------------------------------------------------------
// Numeric coercion
// ---------------------------------------------------------------------------

/// Coerce an untyped provider value to a finite number.
///
/// Numbers pass through; numeric strings are parsed; placeholders such as
/// `"-"`, empty strings, booleans, nulls and anything non-finite become 0.
pub fn coerce_number(value: &Value) -> f64 {
    let n = match value {
        Value::Number(n) => n.as_f64().unwrap_or(0.0),
        Value::String(s) => coerce_str(s),
        _ => 0.0,
    };
    if n.is_finite() {
        n
    } else {
        0.0
    }
}

/// String form of [`coerce_number`].
pub fn coerce_str(s: &str) -> f64 {
    s.trim()
        .parse::<f64>()
        .ok()
        .filter(|n| n.is_finite())
        .unwrap_or(0.0)
}

/// Coerce a stat id (number or numeric string). Non-numeric ids yield `None`.
pub fn coerce_stat_id(value: &Value) -> Option<u32> {
    match value {
        Value::Number(n) => n.as_u64().and_then(|id| u32::try_from(id).ok()),
        Value::String(s) => s.trim().parse::<u32>().ok(),
        _ => None,
    }
}

// ---------------------------------------------------------------------------
// Provider records
// ---------------------------------------------------------------------------

/// A player record in the provider's loosely-typed shape.
///
/// Every field is optional and untyped; [`RawPlayer::normalize`] resolves
/// the known shapes into a [`Player`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawPlayer {
    #[serde(default, alias = "key")]
    pub player_key: Option<Value>,
    #[serde(default)]
    pub name: Option<Value>,
    #[serde(default, alias = "eligible_positions")]
    pub positions: Option<Value>,
    #[serde(default, alias = "player_stats")]
    pub stats: Option<Value>,
    #[serde(default)]
    pub games_played: Option<Value>,
}

impl RawPlayer {
    /// Normalize into a typed player.
    ///
    /// `games_played_ids` are the stat ids the league labels as games
    /// played; they are consulted when no explicit `games_played` field is
    /// present. Returns `None` only when the record has no usable key.
    pub fn normalize(&self, games_played_ids: &[u32]) -> Option<Player> {
        let key = match self.player_key.as_ref() {
            Some(Value::String(s)) if !s.trim().is_empty() => s.trim().to_string(),
            Some(Value::Number(n)) => n.to_string(),
            _ => {
                warn!("skipping player record without a usable player_key");
                return None;
            }
        };

        let name = self.name.as_ref().map(resolve_name).unwrap_or_default();
        let positions = self
            .positions
            .as_ref()
            .map(resolve_positions)
            .unwrap_or_default();
        let raw_stats = self.stats.as_ref().map(resolve_stats).unwrap_or_default();

        let games_played = match self.games_played.as_ref() {
            Some(v) if !v.is_null() => coerce_number(v),
            _ => games_played_ids
                .iter()
                .find_map(|id| raw_stats.get(id).copied())
                .unwrap_or(0.0),
        };

        Some(Player::new(&key, &name, positions, raw_stats, games_played))
    }
}

/// Normalize a batch of provider records, dropping records without a key.
pub fn normalize_records(records: &[RawPlayer], games_played_ids: &[u32]) -> Vec<Player> {
    records
        .iter()
        .filter_map(|r| r.normalize(games_played_ids))
        .collect()
}

fn resolve_name(value: &Value) -> String {
    match value {
        Value::String(s) => s.trim().to_string(),
        Value::Object(map) => map
            .get("full")
            .or_else(|| map.get("name"))
            .and_then(Value::as_str)
            .unwrap_or_default()
            .trim()
            .to_string(),
        _ => String::new(),
    }
}

fn resolve_positions(value: &Value) -> Vec<String> {
    match value {
        Value::String(s) => s
            .split(['/', ','])
            .map(|p| p.trim().to_string())
            .filter(|p| !p.is_empty())
            .collect(),
        Value::Array(items) => items
            .iter()
            .flat_map(|item| match item {
                Value::String(s) => vec![s.trim().to_string()],
                Value::Object(map) => map
                    .get("position")
                    .map(resolve_positions)
                    .unwrap_or_default(),
                _ => Vec::new(),
            })
            .collect(),
        Value::Object(map) => map
            .get("position")
            .map(resolve_positions)
            .unwrap_or_default(),
        _ => Vec::new(),
    }
}

fn resolve_stats(value: &Value) -> BTreeMap<u32, f64> {
    let mut stats = BTreeMap::new();

    match value {
        Value::Object(map) => {
            if let Some(inner) = map.get("stats") {
                return resolve_stats(inner);
            }
            for (key, raw) in map {
                match key.trim().parse::<u32>() {
                    Ok(id) => {
                        stats.insert(id, coerce_number(raw));
                    }
                    Err(_) => warn!("ignoring non-numeric stat key '{}'", key),
                }
            }
        }
        Value::Array(entries) => {
            for entry in entries {
                let entry = match entry.get("stat") {
                    Some(inner) if inner.is_object() => inner,
                    _ => entry,
                };
                let Some(id) = entry.get("stat_id").and_then(coerce_stat_id) else {
                    continue;
                };
                let v = entry.get("value").map(coerce_number).unwrap_or(0.0);
                stats.insert(id, v);
            }
        }
        _ => {}
    }

    stats
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
