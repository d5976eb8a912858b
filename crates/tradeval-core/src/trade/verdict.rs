// Two-state trade verdict: APPROVE or REVIEW.

use std::fmt;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Thresholds
// ---------------------------------------------------------------------------

pub const DEFAULT_LOSS_TOL: f64 = -0.35;
pub const DEFAULT_GAIN_MIN: f64 = 0.25;
pub const DEFAULT_IMBALANCE_MAX: f64 = 1.0;

fn default_loss_tol() -> f64 {
    DEFAULT_LOSS_TOL
}

fn default_gain_min() -> f64 {
    DEFAULT_GAIN_MIN
}

fn default_imbalance_max() -> f64 {
    DEFAULT_IMBALANCE_MAX
}

/// Decision thresholds. Each field is independently overridable; a missing
/// key in a config file falls back to its default.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Thresholds {
    /// Minimum impact each side may tolerate.
    #[serde(default = "default_loss_tol")]
    pub loss_tol: f64,
    /// Impact at least one side must reach.
    #[serde(default = "default_gain_min")]
    pub gain_min: f64,
    /// Largest allowed `|impact_a - impact_b|`.
    #[serde(default = "default_imbalance_max")]
    pub imbalance_max: f64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Thresholds {
            loss_tol: DEFAULT_LOSS_TOL,
            gain_min: DEFAULT_GAIN_MIN,
            imbalance_max: DEFAULT_IMBALANCE_MAX,
        }
    }
}

impl Thresholds {
    /// Replace any field for which an override is given.
    pub fn with_overrides(
        self,
        loss_tol: Option<f64>,
        gain_min: Option<f64>,
        imbalance_max: Option<f64>,
    ) -> Self {
        Thresholds {
            loss_tol: loss_tol.unwrap_or(self.loss_tol),
            gain_min: gain_min.unwrap_or(self.gain_min),
            imbalance_max: imbalance_max.unwrap_or(self.imbalance_max),
        }
    }
}

// ---------------------------------------------------------------------------
// Verdict
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum VerdictStatus {
    Approve,
    Review,
}

impl VerdictStatus {
    /// Presentation hint only.
    pub fn color(&self) -> &'static str {
        match self {
            VerdictStatus::Approve => "green",
            VerdictStatus::Review => "yellow",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            VerdictStatus::Approve => "APPROVE",
            VerdictStatus::Review => "REVIEW",
        }
    }
}

impl fmt::Display for VerdictStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Why a trade was sent to review. A verdict may carry several.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewReason {
    /// Team A's impact is below `loss_tol`.
    TeamALoss,
    /// Team B's impact is below `loss_tol`.
    TeamBLoss,
    /// Neither impact reaches `gain_min`.
    NoMeaningfulGain,
    /// `|impact_a - impact_b|` exceeds `imbalance_max`.
    Imbalanced,
}

impl fmt::Display for ReviewReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            ReviewReason::TeamALoss => "team A loses more than the tolerated amount",
            ReviewReason::TeamBLoss => "team B loses more than the tolerated amount",
            ReviewReason::NoMeaningfulGain => "neither team gains enough",
            ReviewReason::Imbalanced => "impacts are too far apart",
        };
        f.write_str(text)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Verdict {
    pub status: VerdictStatus,
    pub impact_a: f64,
    pub impact_b: f64,
    /// Empty for APPROVE.
    pub reasons: Vec<ReviewReason>,
}

/// Classify a pair of impacts.
///
/// APPROVE iff both impacts are at least `loss_tol`, at least one reaches
/// `gain_min`, and the two differ by no more than `imbalance_max`.
pub fn classify(impact_a: f64, impact_b: f64, thresholds: &Thresholds) -> Verdict {
    let mut reasons = Vec::new();

    if impact_a < thresholds.loss_tol {
        reasons.push(ReviewReason::TeamALoss);
    }
    if impact_b < thresholds.loss_tol {
        reasons.push(ReviewReason::TeamBLoss);
    }
    if impact_a < thresholds.gain_min && impact_b < thresholds.gain_min {
        reasons.push(ReviewReason::NoMeaningfulGain);
    }
    if (impact_a - impact_b).abs() > thresholds.imbalance_max {
        reasons.push(ReviewReason::Imbalanced);
    }

    let status = if reasons.is_empty() {
        VerdictStatus::Approve
    } else {
        VerdictStatus::Review
    };

    Verdict {
        status,
        impact_a,
        impact_b,
        reasons,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
