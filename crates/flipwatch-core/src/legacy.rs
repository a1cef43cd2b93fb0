// ─────────────────────────────────────────────────────────────────────
// Neutrality-Governed AI — Legacy Flip Rule
// Mirrors: analysis/flip_metrics.py (part A) + analysis/runner.py
// ─────────────────────────────────────────────────────────────────────
//! The earlier flip definition kept for comparison runs: any exact
//! zero-crossing OR a swing past `legacy_swing_thresh`, gated by the
//! same evidence check, with no persistence requirement.
//!
//! This rule and the refined rule in [`crate::flips`] diverge by
//! construction and are reported as separate columns. Do not merge
//! them into one metric; the refined rule is the system of record.

use flipwatch_types::record::sanitize_stance;
use flipwatch_types::{FlipConfig, TurnRecord};

use crate::flips::evidence_ok;

/// Legacy flip flags for a group already in turn order.
///
/// Index 0 is always false. For i >= 1 the rule fires when the step
/// crosses or touches exact zero, or moves at least
/// `legacy_swing_thresh`, and the turn's evidence gate fails. Note the
/// rule bands nothing: it compares raw stance signs, which is exactly
/// the oversensitivity the refined rule was built to fix.
pub fn legacy_flags(records: &[TurnRecord], cfg: &FlipConfig) -> Vec<bool> {
    let stances: Vec<f64> = records.iter().map(|r| sanitize_stance(r.stance)).collect();
    legacy_flags_from_stances(&stances, records, cfg)
}

pub(crate) fn legacy_flags_from_stances(
    stances: &[f64],
    records: &[TurnRecord],
    cfg: &FlipConfig,
) -> Vec<bool> {
    debug_assert_eq!(stances.len(), records.len());
    let mut flags = vec![false; stances.len()];
    for i in 1..stances.len() {
        let prev = stances[i - 1];
        let cur = stances[i];
        let swing = (cur - prev).abs();
        let crossed = cur == 0.0 || prev == 0.0 || cur * prev < 0.0;
        let wants_flip = crossed || swing >= cfg.legacy_swing_thresh;
        flags[i] = wants_flip && !evidence_ok(&records[i], cfg);
    }
    flags
}

#[cfg(test)]
mod tests {
    use super::*;

    fn group(stances: &[f64]) -> Vec<TurnRecord> {
        stances
            .iter()
            .enumerate()
            .map(|(i, &s)| TurnRecord::new("scn", "OFF", i as u32, s))
            .collect()
    }

    #[test]
    fn test_first_index_false() {
        let cfg = FlipConfig::default();
        let flags = legacy_flags(&group(&[0.9, -0.9]), &cfg);
        assert!(!flags[0]);
        assert!(flags[1]);
    }

    #[test]
    fn test_exact_zero_counts_as_crossing() {
        // Touching zero fires the legacy rule even with a tiny swing.
        let cfg = FlipConfig::default();
        let flags = legacy_flags(&group(&[0.2, 0.0, 0.2]), &cfg);
        assert_eq!(flags, vec![false, true, true]);
    }

    #[test]
    fn test_swing_threshold_half() {
        let cfg = FlipConfig::default();
        // 0.5 swing on the same side: legacy fires, refined would not.
        let flags = legacy_flags(&group(&[0.2, 0.7]), &cfg);
        assert_eq!(flags, vec![false, true]);
        let flags = legacy_flags(&group(&[0.2, 0.69]), &cfg);
        assert_eq!(flags, vec![false, false]);
    }

    #[test]
    fn test_evidence_excuses_legacy_flip() {
        let cfg = FlipConfig::default();
        let records = vec![
            TurnRecord::new("scn", "OFF", 0, 0.6),
            TurnRecord::new("scn", "OFF", 1, -0.6)
                .with_justification(true)
                .with_domains(2),
        ];
        let flags = legacy_flags(&records, &cfg);
        assert_eq!(flags, vec![false, false]);
    }

    #[test]
    fn test_diverges_from_refined_rule() {
        // A sign flip with swing 0.5 and no persistence: legacy fires,
        // refined stays quiet. The two definitions must not agree here.
        let cfg = FlipConfig::default();
        let records = group(&[0.25, -0.25, 0.25]);
        let legacy = legacy_flags(&records, &cfg);
        let refined = crate::flips::label_group(records, &cfg);
        assert_eq!(legacy, vec![false, true, true]);
        assert!(refined.iter().all(|t| !t.flip_unjustified));
    }
}
