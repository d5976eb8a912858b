// Post-trade lineup simulation for one team.

use std::collections::{BTreeSet, HashSet};

use serde::Serialize;
use tracing::debug;

use crate::league::SlotRequirements;
use crate::player::Player;
use crate::roster::{fill_slots, sort_by_value_desc, RosterSplit, SlotAssignment};

/// One team's side of a simulated trade.
#[derive(Debug, Clone, Serialize)]
pub struct TeamImpact {
    /// Starting value before the trade.
    pub baseline: f64,
    /// Best post-trade starting value, free-agent backfill included.
    pub strength: f64,
    /// `strength - baseline`.
    pub impact: f64,
    /// Post-trade lineup in placement order; backfilled free agents last.
    pub lineup: Vec<SlotAssignment>,
    /// Keys of free agents used to fill slots left open.
    pub free_agents_used: Vec<String>,
    /// Slots still open after backfill ran out of eligible free agents.
    pub open_slots: SlotRequirements,
}

/// Simulate one team's roster after a trade and measure the change in its
/// best starting lineup.
///
/// `original` is the team's pre-trade split. Players whose key is in
/// `outgoing` leave; `incoming` join. The merged pool is re-slotted with the
/// same greedy rule as [`crate::roster::split_roster`] and any slot left open
/// is backfilled from `free_agents` in descending value order.
pub fn compute_trade_impact(
    original: &RosterSplit,
    outgoing: &BTreeSet<String>,
    incoming: &[Player],
    free_agents: &[Player],
    requirements: &SlotRequirements,
) -> TeamImpact {
    let baseline = original.starting_value();

    let kept = original.without(|p| outgoing.contains(&p.player_key));
    let mut candidates: Vec<Player> = kept
        .starters
        .into_iter()
        .map(|a| a.player)
        .chain(kept.bench)
        .chain(incoming.iter().cloned())
        .collect();
    sort_by_value_desc(&mut candidates);

    let taken: HashSet<String> = candidates.iter().map(|p| p.player_key.clone()).collect();
    let fill = fill_slots(candidates, requirements);
    let mut lineup = fill.chosen;
    let mut open_slots = fill.remaining;
    let mut free_agents_used = Vec::new();

    if !open_slots.is_empty() {
        let mut pool: Vec<Player> = free_agents
            .iter()
            .filter(|p| !taken.contains(&p.player_key) && !outgoing.contains(&p.player_key))
            .cloned()
            .collect();
        sort_by_value_desc(&mut pool);

        let backfill = fill_slots(pool, &open_slots);
        free_agents_used = backfill
            .chosen
            .iter()
            .map(|a| a.player.player_key.clone())
            .collect();
        lineup.extend(backfill.chosen);
        open_slots = backfill.remaining;
    }

    let strength: f64 = lineup.iter().map(|a| a.player.value).sum();
    let impact = strength - baseline;

    debug!(
        baseline,
        strength,
        impact,
        backfilled = free_agents_used.len(),
        still_open = open_slots.total(),
        "trade impact computed"
    );

    TeamImpact {
        baseline,
        strength,
        impact,
        lineup,
        free_agents_used,
        open_slots,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
