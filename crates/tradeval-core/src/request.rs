// Trade request wire format: what the upstream fetcher hands us as JSON.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

use crate::evaluate::TradeInputs;
use crate::league::{games_played_stat_ids, SlotRequirements};
use crate::player::{normalize_records, Player, RawPlayer};

#[derive(Debug, Error)]
pub enum RequestError {
    #[error("failed to read trade request {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse trade request {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
}

#[derive(Debug, Default, Deserialize)]
pub struct TradeRequest {
    #[serde(default)]
    pub league_settings: Option<Value>,
    #[serde(default)]
    pub team_a: Option<Vec<RawPlayer>>,
    #[serde(default)]
    pub team_b: Option<Vec<RawPlayer>>,
    #[serde(default)]
    pub free_agents: Vec<RawPlayer>,
    #[serde(default)]
    pub send_a: BTreeSet<String>,
    #[serde(default)]
    pub send_b: BTreeSet<String>,
}

/// A request whose player records have been normalized into typed players.
#[derive(Debug, Clone)]
pub struct PreparedRequest {
    pub league_settings: Option<Value>,
    pub team_a: Option<Vec<Player>>,
    pub team_b: Option<Vec<Player>>,
    pub free_agents: Vec<Player>,
    pub send_a: BTreeSet<String>,
    pub send_b: BTreeSet<String>,
}

impl TradeRequest {
    pub fn from_path(path: &Path) -> Result<Self, RequestError> {
        let text = std::fs::read_to_string(path).map_err(|e| RequestError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
        serde_json::from_str(&text).map_err(|e| RequestError::Parse {
            path: path.to_path_buf(),
            source: e,
        })
    }

    /// Normalize every player record. Games-played stat ids come from the
    /// league settings, so records without an explicit count still get one.
    pub fn prepare(self) -> PreparedRequest {
        let gp_ids = self
            .league_settings
            .as_ref()
            .map(games_played_stat_ids)
            .unwrap_or_default();

        PreparedRequest {
            team_a: self.team_a.as_deref().map(|r| normalize_records(r, &gp_ids)),
            team_b: self.team_b.as_deref().map(|r| normalize_records(r, &gp_ids)),
            free_agents: normalize_records(&self.free_agents, &gp_ids),
            league_settings: self.league_settings,
            send_a: self.send_a,
            send_b: self.send_b,
        }
    }
}

impl PreparedRequest {
    /// Read and normalize a request file in one step.
    pub fn load(path: &Path) -> Result<Self, RequestError> {
        Ok(TradeRequest::from_path(path)?.prepare())
    }

    pub fn inputs<'a>(&'a self, fallback_slots: Option<&'a SlotRequirements>) -> TradeInputs<'a> {
        TradeInputs {
            league_settings: self.league_settings.as_ref(),
            team_a: self.team_a.as_deref(),
            team_b: self.team_b.as_deref(),
            free_agents: &self.free_agents,
            send_a: &self.send_a,
            send_b: &self.send_b,
            fallback_slots,
        }
    }
}
