// Lineup construction: greedy slot assignment.
//
// One pass over a value-ordered candidate list. Each player takes the first
// open slot (in the requirements' declaration order) they are eligible for, or is
// left unplaced. Not globally optimal: a flexible player can consume a slot
// that a less flexible, lower-valued player needed.

use serde::Serialize;

use crate::league::{SlotLabel, SlotRequirements};
use crate::player::Player;

/// A player placed into a lineup slot.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SlotAssignment {
    pub slot: SlotLabel,
    pub player: Player,
}

/// Outcome of one greedy fill.
#[derive(Debug, Clone)]
pub struct SlotFill {
    /// Players placed, in placement order.
    pub chosen: Vec<SlotAssignment>,
    /// Slot counts still open after the pass.
    pub remaining: SlotRequirements,
    /// Candidates that matched no open eligible slot, in input order.
    pub unplaced: Vec<Player>,
}

/// Sort descending by `value`. Stable, so equal values keep input order.
pub fn sort_by_value_desc(players: &mut [Player]) {
    players.sort_by(|a, b| {
        b.value
            .partial_cmp(&a.value)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
}

/// Greedily fill `requirements` from `candidates`, which must already be in
/// the order players should be considered (normally descending value).
pub fn fill_slots<I>(candidates: I, requirements: &SlotRequirements) -> SlotFill
where
    I: IntoIterator<Item = Player>,
{
    let mut remaining = requirements.clone();
    let mut chosen = Vec::new();
    let mut unplaced = Vec::new();

    for player in candidates {
        match remaining.first_open_for(&player).cloned() {
            Some(slot) => {
                remaining.take(&slot);
                chosen.push(SlotAssignment { slot, player });
            }
            None => unplaced.push(player),
        }
    }

    SlotFill {
        chosen,
        remaining,
        unplaced,
    }
}

// ---------------------------------------------------------------------------
// Roster split
// ---------------------------------------------------------------------------

/// One team's pool partitioned into starters and bench.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RosterSplit {
    pub starters: Vec<SlotAssignment>,
    pub bench: Vec<Player>,
}

impl RosterSplit {
    /// Total value of the starting lineup.
    pub fn starting_value(&self) -> f64 {
        self.starters.iter().map(|a| a.player.value).sum()
    }

    pub fn starter_players(&self) -> impl Iterator<Item = &Player> {
        self.starters.iter().map(|a| &a.player)
    }

    /// Number of players across starters and bench.
    pub fn len(&self) -> usize {
        self.starters.len() + self.bench.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Copy of this split with the given players removed from both sides.
    pub fn without<F>(&self, mut is_outgoing: F) -> RosterSplit
    where
        F: FnMut(&Player) -> bool,
    {
        RosterSplit {
            starters: self
                .starters
                .iter()
                .filter(|a| !is_outgoing(&a.player))
                .cloned()
                .collect(),
            bench: self
                .bench
                .iter()
                .filter(|p| !is_outgoing(p))
                .cloned()
                .collect(),
        }
    }
}

/// Split a valued player pool into starters and bench.
///
/// Starters are the greedy fill over the pool sorted by descending value;
/// every other player, goalies without an open G slot included, lands on
/// the bench in value order.
pub fn split_roster(pool: &[Player], requirements: &SlotRequirements) -> RosterSplit {
    let mut sorted = pool.to_vec();
    sort_by_value_desc(&mut sorted);

    let fill = fill_slots(sorted, requirements);
    RosterSplit {
        starters: fill.chosen,
        bench: fill.unplaced,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
