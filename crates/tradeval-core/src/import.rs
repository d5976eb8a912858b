// Player pool import from provider CSV exports.
//
// Expected columns: `player_key`, `name`, `positions` (slash- or
// comma-separated), `games_played`, then one column per numeric stat id
// (`1`, `2`, `31`, ...). Non-numeric extra headers are ignored.

use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};
use std::io::Read;
use std::path::Path;
use tracing::warn;

use crate::player::{coerce_number, coerce_str, Player};

#[derive(Debug, thiserror::Error)]
pub enum ImportError {
    #[error("failed to read file {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("CSV error in {path}: {source}")]
    Csv { path: String, source: csv::Error },
}

/// One export row. Stat columns land in `extra`, keyed by header.
#[derive(Debug, Deserialize)]
struct PoolRow {
    #[serde(alias = "key")]
    player_key: String,
    #[serde(default)]
    name: String,
    #[serde(default, alias = "eligible_positions")]
    positions: String,
    #[serde(default, alias = "gp")]
    games_played: String,
    #[serde(flatten)]
    extra: HashMap<String, serde_json::Value>,
}

impl PoolRow {
    fn into_player(self) -> Option<Player> {
        let key = self.player_key.trim();
        if key.is_empty() {
            warn!("skipping pool row without a player_key");
            return None;
        }

        let positions = self
            .positions
            .split(['/', ','])
            .map(str::trim)
            .filter(|p| !p.is_empty());

        let raw_stats: BTreeMap<u32, f64> = self
            .extra
            .iter()
            .filter_map(|(header, value)| {
                let id = header.trim().parse::<u32>().ok()?;
                Some((id, coerce_number(value)))
            })
            .collect();

        Some(Player::new(
            key,
            self.name.trim(),
            positions,
            raw_stats,
            coerce_str(&self.games_played),
        ))
    }
}

/// Read a pool from any CSV source. Malformed rows are skipped with a
/// warning; only an unreadable header fails the whole import.
pub fn load_pool_from_reader<R: Read>(rdr: R) -> Result<Vec<Player>, csv::Error> {
    let mut reader = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(rdr);
    reader.headers()?;

    let mut players = Vec::new();
    for (index, result) in reader.deserialize::<PoolRow>().enumerate() {
        match result {
            Ok(row) => players.extend(row.into_player()),
            Err(e) => warn!("skipping malformed pool row {}: {}", index + 1, e),
        }
    }
    Ok(players)
}

/// Read a pool from a CSV file on disk.
pub fn load_pool(path: &Path) -> Result<Vec<Player>, ImportError> {
    let file = std::fs::File::open(path).map_err(|e| ImportError::Io {
        path: path.display().to_string(),
        source: e,
    })?;
    load_pool_from_reader(file).map_err(|e| ImportError::Csv {
        path: path.display().to_string(),
        source: e,
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn reads_stat_columns_by_id() {
        let csv_data = "\
player_key,name,positions,games_played,1,2,team
nhl.p.1,Jane Center,C/LW,40,12,20,BOS
nhl.p.2,Gail Goalie,G,30,-,1,NYR
";
        let pool = load_pool_from_reader(csv_data.as_bytes()).unwrap();
        assert_eq!(pool.len(), 2);

        let c = &pool[0];
        assert_eq!(c.player_key, "nhl.p.1");
        assert_eq!(c.name, "Jane Center");
        assert!(c.positions.contains("C") && c.positions.contains("LW"));
        assert!(!c.is_goalie);
        assert_eq!(c.games_played, 40.0);
        assert_eq!(c.raw_stats.get(&1), Some(&12.0));
        assert_eq!(c.raw_stats.get(&2), Some(&20.0));
        assert_eq!(c.raw_stats.len(), 2);

        let g = &pool[1];
        assert!(g.is_goalie);
        assert_eq!(g.raw_stats.get(&1), Some(&0.0));
    }

    #[test]
    fn comma_separated_positions_and_missing_games_played() {
        let csv_data = "\
player_key,name,positions,games_played,1
k1,Flex,\"C, RW\",,5
";
        let pool = load_pool_from_reader(csv_data.as_bytes()).unwrap();
        assert_eq!(pool.len(), 1);
        assert!(pool[0].positions.contains("RW"));
        assert_eq!(pool[0].games_played, 0.0);
    }

    #[test]
    fn malformed_and_keyless_rows_skipped() {
        let csv_data = "\
player_key,name,positions,games_played,1
good,Good,D,10,3
,No Key,D,10,3
short_row
also_good,Also,D,12,4
";
        let pool = load_pool_from_reader(csv_data.as_bytes()).unwrap();
        let keys: Vec<&str> = pool.iter().map(|p| p.player_key.as_str()).collect();
        assert_eq!(keys, vec!["good", "also_good"]);
    }

    #[test]
    fn load_pool_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "player_key,name,positions,games_played,1").unwrap();
        writeln!(file, "fa1,Free Agent,LW,20,4").unwrap();
        let pool = load_pool(file.path()).unwrap();
        assert_eq!(pool.len(), 1);
        assert_eq!(pool[0].raw_stats.get(&1), Some(&4.0));
    }

    #[test]
    fn missing_file_is_io_error() {
        let tmp = tempfile::tempdir().unwrap();
        let err = load_pool(&tmp.path().join("absent.csv")).unwrap_err();
        assert!(matches!(err, ImportError::Io { .. }));
    }
}
