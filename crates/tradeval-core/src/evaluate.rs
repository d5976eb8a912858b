// Top-level trade evaluation.
//
// Pipeline: league settings -> categories and slots; both rosters plus the
// free-agent pool form one comparison population which is normalized and
// scored together; each team is split into starters/bench; each side of the
// trade is simulated; the two impacts are classified.

use std::collections::{BTreeSet, HashSet};
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::league::{extract_categories, Category, SlotRequirements};
use crate::player::{normalize_per_game, Player};
use crate::roster::{split_roster, RosterSplit};
use crate::trade::impact::{compute_trade_impact, TeamImpact};
use crate::trade::verdict::{classify, ReviewReason, Thresholds, Verdict, VerdictStatus};
use crate::valuation::zscore::round_to;
use crate::valuation::{score_pool, ScoringContext};

/// Decimal places on reported impacts.
pub const IMPACT_PRECISION: i32 = 3;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Side {
    A,
    B,
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::A => f.write_str("A"),
            Side::B => f.write_str("B"),
        }
    }
}

/// Preconditions the engine will not degrade around.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum EvaluationError {
    #[error("league settings are required to evaluate a trade")]
    MissingLeagueSettings,

    #[error("roster for team {side} is required to evaluate a trade")]
    MissingRoster { side: Side },
}

// ---------------------------------------------------------------------------
// Inputs and outputs
// ---------------------------------------------------------------------------

/// Everything one evaluation needs, already normalized by the caller.
#[derive(Debug, Clone, Copy)]
pub struct TradeInputs<'a> {
    pub league_settings: Option<&'a Value>,
    pub team_a: Option<&'a [Player]>,
    pub team_b: Option<&'a [Player]>,
    pub free_agents: &'a [Player],
    /// Keys team A sends to team B.
    pub send_a: &'a BTreeSet<String>,
    /// Keys team B sends to team A.
    pub send_b: &'a BTreeSet<String>,
    /// Slot counts to use when the league settings carry none.
    pub fallback_slots: Option<&'a SlotRequirements>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VerdictSummary {
    pub status: VerdictStatus,
    pub color: String,
}

/// Per-team breakdown of a simulated trade.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TeamReport {
    pub baseline: f64,
    pub strength: f64,
    /// Post-trade starters, in placement order.
    pub starters: Vec<String>,
    pub free_agents_used: Vec<String>,
    /// Keys this team was asked to send but does not roster.
    pub unresolved_keys: Vec<String>,
}

impl TeamReport {
    fn new(impact: &TeamImpact, unresolved_keys: Vec<String>) -> Self {
        TeamReport {
            baseline: round_to(impact.baseline, IMPACT_PRECISION),
            strength: round_to(impact.strength, IMPACT_PRECISION),
            starters: impact
                .lineup
                .iter()
                .map(|a| a.player.player_key.clone())
                .collect(),
            free_agents_used: impact.free_agents_used.clone(),
            unresolved_keys,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TradeEvaluation {
    pub impact_a: f64,
    pub impact_b: f64,
    pub verdict: VerdictSummary,
    /// Empty when the trade is approved.
    pub reasons: Vec<ReviewReason>,
    pub team_a: TeamReport,
    pub team_b: TeamReport,
}

// ---------------------------------------------------------------------------
// Population scoring
// ---------------------------------------------------------------------------

/// Both rosters and the free-agent pool, valued against each other.
#[derive(Debug, Clone)]
pub struct ValuedPopulation {
    pub team_a: Vec<Player>,
    pub team_b: Vec<Player>,
    pub free_agents: Vec<Player>,
    pub context: ScoringContext,
}

/// Normalize and score both rosters plus the free agents as one population.
///
/// Free agents whose key already appears on either roster, or earlier in
/// the free-agent list, are dropped so no player is counted twice.
pub fn score_population(
    categories: &[Category],
    team_a: &[Player],
    team_b: &[Player],
    free_agents: &[Player],
) -> ValuedPopulation {
    let mut seen: HashSet<&str> = team_a
        .iter()
        .chain(team_b)
        .map(|p| p.player_key.as_str())
        .collect();
    let free_agents: Vec<Player> = free_agents
        .iter()
        .filter(|p| seen.insert(p.player_key.as_str()))
        .cloned()
        .collect();

    let a_len = team_a.len();
    let b_len = team_b.len();
    let mut population: Vec<Player> = team_a
        .iter()
        .chain(team_b)
        .cloned()
        .chain(free_agents)
        .collect();

    normalize_per_game(&mut population);
    let context = score_pool(&mut population, categories);
    debug!(
        population = population.len(),
        categories = categories.len(),
        "scored comparison population"
    );

    let free_agents = population.split_off(a_len + b_len);
    let team_b = population.split_off(a_len);
    ValuedPopulation {
        team_a: population,
        team_b,
        free_agents,
        context,
    }
}

/// Slot counts from the league settings, else the fallback, else none.
pub fn resolve_slots(settings: &Value, fallback: Option<&SlotRequirements>) -> SlotRequirements {
    if let Some(slots) = SlotRequirements::from_league_settings(settings) {
        return slots;
    }
    match fallback {
        Some(slots) if !slots.is_empty() => {
            debug!(slots = %slots, "league settings carry no roster positions, using fallback");
            slots.clone()
        }
        _ => {
            warn!("no roster slot configuration available; every lineup will be empty");
            SlotRequirements::new()
        }
    }
}

// ---------------------------------------------------------------------------
// Evaluation
// ---------------------------------------------------------------------------

/// Split `requested` into keys present on `roster` and keys that are not.
fn resolve_outgoing(
    side: Side,
    requested: &BTreeSet<String>,
    roster: &[Player],
) -> (BTreeSet<String>, Vec<String>) {
    let rostered: HashSet<&str> = roster.iter().map(|p| p.player_key.as_str()).collect();
    let (found, missing): (Vec<&String>, Vec<&String>) = requested
        .iter()
        .partition(|k| rostered.contains(k.as_str()));

    if !missing.is_empty() {
        warn!(team = %side, keys = ?missing, "dropping trade keys not on the roster");
    }
    (
        found.into_iter().cloned().collect(),
        missing.into_iter().cloned().collect(),
    )
}

fn players_with_keys(pool: &[Player], keys: &BTreeSet<String>) -> Vec<Player> {
    pool.iter()
        .filter(|p| keys.contains(&p.player_key))
        .cloned()
        .collect()
}

/// Classify the impacts as they will be reported, rounded to
/// [`IMPACT_PRECISION`], so a reported value never contradicts its verdict.
pub fn classify_reported(impact_a: f64, impact_b: f64, thresholds: &Thresholds) -> Verdict {
    classify(
        round_to(impact_a, IMPACT_PRECISION),
        round_to(impact_b, IMPACT_PRECISION),
        thresholds,
    )
}

/// Evaluate one trade proposal.
///
/// Fails only when the league settings or either roster is missing; every
/// other input problem degrades as documented on the individual stages.
pub fn evaluate_trade(
    inputs: &TradeInputs<'_>,
    thresholds: &Thresholds,
) -> Result<TradeEvaluation, EvaluationError> {
    let settings = inputs
        .league_settings
        .filter(|s| !s.is_null())
        .ok_or(EvaluationError::MissingLeagueSettings)?;
    let team_a = inputs
        .team_a
        .ok_or(EvaluationError::MissingRoster { side: Side::A })?;
    let team_b = inputs
        .team_b
        .ok_or(EvaluationError::MissingRoster { side: Side::B })?;

    let categories = extract_categories(settings);
    if categories.is_empty() {
        warn!("league settings define no scoring categories; all values will be 0");
    }
    let slots = resolve_slots(settings, inputs.fallback_slots);

    let valued = score_population(&categories, team_a, team_b, inputs.free_agents);

    let (out_a, unresolved_a) = resolve_outgoing(Side::A, inputs.send_a, &valued.team_a);
    let (out_b, unresolved_b) = resolve_outgoing(Side::B, inputs.send_b, &valued.team_b);

    let split_a: RosterSplit = split_roster(&valued.team_a, &slots);
    let split_b: RosterSplit = split_roster(&valued.team_b, &slots);

    let to_a = players_with_keys(&valued.team_b, &out_b);
    let to_b = players_with_keys(&valued.team_a, &out_a);

    let impact_a = compute_trade_impact(&split_a, &out_a, &to_a, &valued.free_agents, &slots);
    let impact_b = compute_trade_impact(&split_b, &out_b, &to_b, &valued.free_agents, &slots);

    let verdict = classify_reported(impact_a.impact, impact_b.impact, thresholds);
    info!(
        status = %verdict.status,
        impact_a = impact_a.impact,
        impact_b = impact_b.impact,
        "trade evaluated"
    );

    Ok(TradeEvaluation {
        impact_a: verdict.impact_a,
        impact_b: verdict.impact_b,
        verdict: VerdictSummary {
            status: verdict.status,
            color: verdict.status.color().to_string(),
        },
        reasons: verdict.reasons,
        team_a: TeamReport::new(&impact_a, unresolved_a),
        team_b: TeamReport::new(&impact_b, unresolved_b),
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
