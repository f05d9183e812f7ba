//! Derived score types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Per-factor breakdown of a score, kept for explainability.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    /// CPU benchmark score used (0 when the listing has no CPU component)
    pub cpu_score: f64,

    /// GPU benchmark score used (0 when the listing has no GPU component)
    pub gpu_score: f64,

    /// Score for everything else (RAM, storage, commodity parts)
    pub other_score: f64,

    /// Platform / upgrade-path liquidity factor
    pub pls: f64,

    /// Market liquidity factor
    pub mli: f64,

    /// Condition/warranty multiplier
    pub cwm: f64,
}

/// Resale-value score, 1:1 with a listing.
///
/// A score is a pure function of the listing and a
/// [`ScoringConfig`](crate::types::config::ScoringConfig); it has no
/// identity of its own and is recomputed wholesale on every upsert, never
/// patched incrementally.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Score {
    /// Resale Value Index: weighted component score times the
    /// multiplicative market factors
    pub rvi: f64,

    /// Price-to-Value Ratio, `rvi / price`; `None` when the price is zero
    pub pvr: Option<f64>,

    /// `pvr * 1000`, the headline ranking number; `None` when unrankable
    pub final_score: Option<f64>,

    /// Whether the low-VRAM discount was applied
    pub vram_penalty_applied: bool,

    /// True when a benchmark lookup missed and the configured default
    /// mid-range score stood in
    pub low_confidence: bool,

    /// Factor breakdown behind `rvi`
    pub breakdown: ScoreBreakdown,

    /// When this score was computed
    pub computed_at: DateTime<Utc>,
}

impl Score {
    /// Whether this score may participate in ranking. False exactly when
    /// the listing's price was zero at scoring time.
    pub fn is_rankable(&self) -> bool {
        self.final_score.is_some()
    }
}
