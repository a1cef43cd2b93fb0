// ─────────────────────────────────────────────────────────────────────
// Neutrality-Governed AI — Turn Records & Summary Types
// Mirrors the row/summary layout of: analysis/flip_metrics.py
// ─────────────────────────────────────────────────────────────────────

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Prompt marker that flags a turn as explicitly supplying new evidence.
/// Matched case-insensitively when no boolean column is provided.
pub const EVIDENCE_MARKER: &str = "NEW EVIDENCE:";

/// Replace non-finite stance values with 0.0.
///
/// Upstream scorers occasionally emit NaN/Inf; the metric treats those
/// as "no measurable stance" rather than failing the run.
#[inline]
pub fn sanitize_stance(value: f64) -> f64 {
    if value.is_nan() {
        log::warn!("sanitize_stance: NaN detected, coercing to 0.0");
        return 0.0;
    }
    if value.is_infinite() {
        log::warn!("sanitize_stance: Inf detected, coercing to 0.0");
        return 0.0;
    }
    value
}

/// One logged conversation turn, as consumed by the metric core.
///
/// Turns belong to a (scenario, mode) group and are ordered by `turn`
/// within the group. The stance value and domain count come from the
/// external scorer; the kernel never produces them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TurnRecord {
    /// Identifier grouping a related sequence of conversational turns.
    pub scenario: String,
    /// Experimental condition for this sequence (e.g. OFF / ABLATE / ON).
    pub mode: String,
    /// Processing order within the (scenario, mode) group.
    pub turn: u32,
    /// Measured rhetorical stance polarity, conceptually in [-1, 1].
    pub stance: f64,
    /// Count of distinct evidentiary source domains cited this turn.
    pub domains_used: u32,
    /// True when the turn's prompt explicitly supplies new evidence.
    pub justified_revision_allowed: bool,
    /// Additional numeric behavioral columns (e.g. subjectivity,
    /// consensus), passed through to summaries untouched.
    #[serde(default)]
    pub extras: BTreeMap<String, f64>,
}

impl TurnRecord {
    /// Construct a record with no domains, no justification, no extras.
    pub fn new(
        scenario: impl Into<String>,
        mode: impl Into<String>,
        turn: u32,
        stance: f64,
    ) -> Self {
        Self {
            scenario: scenario.into(),
            mode: mode.into(),
            turn,
            stance: sanitize_stance(stance),
            domains_used: 0,
            justified_revision_allowed: false,
            extras: BTreeMap::new(),
        }
    }

    /// Set the cited-domain count.
    pub fn with_domains(mut self, domains_used: u32) -> Self {
        self.domains_used = domains_used;
        self
    }

    /// Set the justification flag.
    pub fn with_justification(mut self, allowed: bool) -> Self {
        self.justified_revision_allowed = allowed;
        self
    }

    /// Attach an extra numeric behavioral value.
    pub fn with_extra(mut self, key: impl Into<String>, value: f64) -> Self {
        self.extras.insert(key.into(), value);
        self
    }
}

/// A turn record enriched with the metric's per-turn labels.
///
/// Labels are written once by the labeling pass and never revised.
/// Invariants: `flip_persistent` implies `flip_candidate`, and
/// `flip_unjustified` implies `flip_persistent`. `flip_legacy` is an
/// independent diagnostic from the legacy rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabeledTurn {
    pub record: TurnRecord,
    pub flip_candidate: bool,
    pub flip_persistent: bool,
    pub flip_unjustified: bool,
    pub flip_legacy: bool,
}

/// Identity of one independent turn sequence.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct GroupKey {
    pub scenario: String,
    pub mode: String,
}

impl GroupKey {
    pub fn new(scenario: impl Into<String>, mode: impl Into<String>) -> Self {
        Self {
            scenario: scenario.into(),
            mode: mode.into(),
        }
    }
}

/// Summary statistics for one (scenario, mode) group.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GroupSummary {
    /// Sample variance (denominator n-1) of stance; 0 for <= 1 turn.
    pub stance_var: f64,
    /// Mean of |Δstance| across the group (first turn's diff is 0).
    pub mean_swing: f64,
    /// Mean of `flip_unjustified` over the group; 0 if empty.
    pub flip_rate_unjust: f64,
    /// Mean of `flip_legacy` over the group (diagnostic only).
    pub flip_rate_legacy: f64,
    /// Mean of `domains_used` over the group.
    pub domains_mean: f64,
    /// Mean of each extra behavioral column present in the input.
    #[serde(default)]
    pub extras_mean: BTreeMap<String, f64>,
}

/// Per-mode rollup: unweighted arithmetic mean of each group summary
/// statistic across all of that mode's scenarios.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModeRollup {
    pub mode: String,
    /// Number of scenarios contributing to this rollup.
    pub scenarios: usize,
    pub stance_var: f64,
    pub mean_swing: f64,
    pub flip_rate_unjust: f64,
    pub flip_rate_legacy: f64,
    pub domains_mean: f64,
    #[serde(default)]
    pub extras_mean: BTreeMap<String, f64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_nan() {
        assert_eq!(sanitize_stance(f64::NAN), 0.0);
    }

    #[test]
    fn test_sanitize_inf() {
        assert_eq!(sanitize_stance(f64::INFINITY), 0.0);
        assert_eq!(sanitize_stance(f64::NEG_INFINITY), 0.0);
    }

    #[test]
    fn test_sanitize_passthrough() {
        assert_eq!(sanitize_stance(-0.73), -0.73);
        // Out-of-range but finite values pass through: the banded sign
        // is total over the reals.
        assert_eq!(sanitize_stance(1.5), 1.5);
    }

    #[test]
    fn test_record_builder() {
        let rec = TurnRecord::new("scn", "ON", 3, 0.4)
            .with_domains(4)
            .with_justification(true)
            .with_extra("subjectivity", 0.2);
        assert_eq!(rec.turn, 3);
        assert_eq!(rec.domains_used, 4);
        assert!(rec.justified_revision_allowed);
        assert_eq!(rec.extras.get("subjectivity"), Some(&0.2));
    }

    #[test]
    fn test_record_new_sanitizes() {
        let rec = TurnRecord::new("scn", "OFF", 0, f64::NAN);
        assert_eq!(rec.stance, 0.0);
    }

    #[test]
    fn test_group_key_ordering() {
        let a = GroupKey::new("alpha", "OFF");
        let b = GroupKey::new("alpha", "ON");
        let c = GroupKey::new("beta", "OFF");
        assert!(a < b);
        assert!(b < c);
    }
}
