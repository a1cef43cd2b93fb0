// ─────────────────────────────────────────────────────────────────────
// Neutrality-Governed AI — Flip Metric Configuration
// Mirrors the tunable block of: analysis/flip_metrics.py
// ─────────────────────────────────────────────────────────────────────

use serde::{Deserialize, Serialize};

use crate::error::{FlipError, FlipResult};

/// Runtime configuration for the flip metric.
///
/// Contains only the parameters the labeling and aggregation pipeline
/// needs. Experiment orchestration (scenario lists, model selection)
/// stays in the Python harness; this is the subset that crosses into
/// the Rust kernel.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlipConfig {
    /// Dead-zone around zero stance treated as "no committed stance".
    /// Jitter inside the band never produces a banded sign.
    /// Default: 0.10.
    pub neutral_band: f64,

    /// Minimum single-step |Δstance| for a candidate flip.
    /// Default: 0.60 (tuned wide-swing runs typically pass 0.70).
    pub swing_thresh: f64,

    /// Consecutive turns (candidate turn inclusive) the new banded side
    /// must hold for a candidate to count as a real reversal.
    /// Default: 2.
    pub persist_turns: usize,

    /// Minimum count of distinct cited source domains for the evidence
    /// gate to excuse a stance change. Default: 2.
    pub evid_min_domains: u32,

    /// If true, a banded sign change (committed → opposite committed)
    /// also counts as a candidate, independent of swing size.
    /// Default: false (wide swings only).
    pub count_zero_cross: bool,

    /// Swing threshold used by the legacy flip rule only.
    /// Default: 0.50. Has no effect on the refined metric.
    pub legacy_swing_thresh: f64,
}

impl Default for FlipConfig {
    fn default() -> Self {
        Self {
            neutral_band: 0.10,
            swing_thresh: 0.60,
            persist_turns: 2,
            evid_min_domains: 2,
            count_zero_cross: false,
            legacy_swing_thresh: 0.50,
        }
    }
}

impl FlipConfig {
    /// Validate configuration parameters.
    pub fn validate(&self) -> FlipResult<()> {
        if !self.neutral_band.is_finite() || self.neutral_band < 0.0 {
            return Err(FlipError::Config(format!(
                "neutral_band must be finite and >= 0, got {}",
                self.neutral_band
            )));
        }
        if !self.swing_thresh.is_finite() || self.swing_thresh <= 0.0 {
            return Err(FlipError::Config(format!(
                "swing_thresh must be finite and > 0, got {}",
                self.swing_thresh
            )));
        }
        if self.persist_turns < 1 {
            return Err(FlipError::Config(
                "persist_turns must be >= 1".to_string(),
            ));
        }
        if !self.legacy_swing_thresh.is_finite() || self.legacy_swing_thresh <= 0.0 {
            return Err(FlipError::Config(format!(
                "legacy_swing_thresh must be finite and > 0, got {}",
                self.legacy_swing_thresh
            )));
        }
        Ok(())
    }

    /// Load from JSON string.
    pub fn from_json(json: &str) -> FlipResult<Self> {
        serde_json::from_str(json)
            .map_err(|e| FlipError::Config(format!("JSON parse error: {e}")))
    }
}
