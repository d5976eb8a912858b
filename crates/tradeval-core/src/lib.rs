// Library root: trade valuation engine for head-to-head category leagues.
//
// Data flows strictly forward: league settings and provider player records
// are normalized, scored against the full comparison population, slotted
// into lineups, and finally compared before/after the proposed trade.

pub mod config;
pub mod evaluate;
pub mod import;
pub mod league;
pub mod player;
pub mod request;
pub mod roster;
pub mod trade;
pub mod valuation;

pub use evaluate::{evaluate_trade, EvaluationError, Side, TradeEvaluation, TradeInputs};
pub use league::{Category, SlotLabel, SlotRequirements};
pub use player::{Player, RawPlayer};
pub use request::{PreparedRequest, RequestError, TradeRequest};
pub use roster::{RosterSplit, SlotAssignment};
pub use trade::verdict::{Thresholds, Verdict, VerdictStatus};
