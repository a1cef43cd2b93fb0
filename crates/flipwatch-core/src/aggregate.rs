// ─────────────────────────────────────────────────────────────────────
// Neutrality-Governed AI — Group Summaries & Mode Rollups
// Mirrors: analysis/flip_metrics.py (summarize + mode rollup)
// ─────────────────────────────────────────────────────────────────────
//! Reduction of labeled turns into per-(scenario, mode) summaries and
//! per-mode rollups. All statistics are plain arithmetic over the
//! group's own turns; a group with zero or one turn yields trivial
//! values, never an error.

use std::collections::{BTreeMap, BTreeSet};

use flipwatch_types::{GroupKey, GroupSummary, LabeledTurn, ModeRollup};

/// Arithmetic mean; 0.0 for an empty slice.
fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Sample variance with denominator n-1; 0.0 for n <= 1.
fn sample_variance(values: &[f64]) -> f64 {
    let n = values.len();
    if n <= 1 {
        return 0.0;
    }
    let m = mean(values);
    values.iter().map(|&v| (v - m).powi(2)).sum::<f64>() / (n - 1) as f64
}

/// Mean of a boolean label over the group; 0.0 if empty.
fn rate(turns: &[LabeledTurn], get: impl Fn(&LabeledTurn) -> bool) -> f64 {
    if turns.is_empty() {
        return 0.0;
    }
    turns.iter().filter(|t| get(t)).count() as f64 / turns.len() as f64
}

/// Summarize one labeled (scenario, mode) group.
///
/// `mean_swing` averages |Δstance| over all turns with the first
/// turn's diff treated as zero, so the divisor is the group size.
pub fn summarize_group(turns: &[LabeledTurn]) -> GroupSummary {
    let stances: Vec<f64> = turns.iter().map(|t| t.record.stance).collect();

    let mean_swing = if stances.is_empty() {
        0.0
    } else {
        let total: f64 = stances.windows(2).map(|w| (w[1] - w[0]).abs()).sum();
        total / stances.len() as f64
    };

    let domains: Vec<f64> = turns.iter().map(|t| t.record.domains_used as f64).collect();

    let mut extras_mean = BTreeMap::new();
    let keys: BTreeSet<&String> = turns.iter().flat_map(|t| t.record.extras.keys()).collect();
    for key in keys {
        let values: Vec<f64> = turns
            .iter()
            .map(|t| t.record.extras.get(key).copied().unwrap_or(0.0))
            .collect();
        extras_mean.insert(key.clone(), mean(&values));
    }

    GroupSummary {
        stance_var: sample_variance(&stances),
        mean_swing,
        flip_rate_unjust: rate(turns, |t| t.flip_unjustified),
        flip_rate_legacy: rate(turns, |t| t.flip_legacy),
        domains_mean: mean(&domains),
        extras_mean,
    }
}

/// Roll per-group summaries up into per-mode means.
///
/// Each mode's rollup is the unweighted arithmetic mean of its
/// scenarios' summary statistics; a ten-turn scenario counts exactly
/// as much as a three-turn one. Output is sorted by mode.
pub fn rollup_modes(summaries: &[(GroupKey, GroupSummary)]) -> Vec<ModeRollup> {
    let mut by_mode: BTreeMap<&str, Vec<&GroupSummary>> = BTreeMap::new();
    for (key, summary) in summaries {
        by_mode.entry(key.mode.as_str()).or_default().push(summary);
    }

    by_mode
        .into_iter()
        .map(|(mode, group)| {
            let pick = |get: &dyn Fn(&GroupSummary) -> f64| {
                let values: Vec<f64> = group.iter().map(|s| get(s)).collect();
                mean(&values)
            };

            let mut extras_mean = BTreeMap::new();
            let keys: BTreeSet<&String> =
                group.iter().flat_map(|s| s.extras_mean.keys()).collect();
            for key in keys {
                let values: Vec<f64> = group
                    .iter()
                    .map(|s| s.extras_mean.get(key).copied().unwrap_or(0.0))
                    .collect();
                extras_mean.insert(key.clone(), mean(&values));
            }

            ModeRollup {
                mode: mode.to_string(),
                scenarios: group.len(),
                stance_var: pick(&|s| s.stance_var),
                mean_swing: pick(&|s| s.mean_swing),
                flip_rate_unjust: pick(&|s| s.flip_rate_unjust),
                flip_rate_legacy: pick(&|s| s.flip_rate_legacy),
                domains_mean: pick(&|s| s.domains_mean),
                extras_mean,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use flipwatch_types::{FlipConfig, TurnRecord};

    fn labeled(stances: &[f64]) -> Vec<LabeledTurn> {
        let records = stances
            .iter()
            .enumerate()
            .map(|(i, &s)| TurnRecord::new("scn", "ON", i as u32, s))
            .collect();
        crate::flips::label_group(records, &FlipConfig::default())
    }

    #[test]
    fn test_constant_group_is_trivial() {
        let summary = summarize_group(&labeled(&[0.2, 0.2, 0.2]));
        assert_eq!(summary.stance_var, 0.0);
        assert_eq!(summary.mean_swing, 0.0);
        assert_eq!(summary.flip_rate_unjust, 0.0);
    }

    #[test]
    fn test_sample_variance_two_points() {
        // Var([0, 1]) with ddof=1 is 0.5.
        let summary = summarize_group(&labeled(&[0.0, 1.0]));
        assert!((summary.stance_var - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_mean_swing_divides_by_group_size() {
        // Diffs |0.4|, |0.4| over 3 turns (first diff is 0): 0.8 / 3.
        let summary = summarize_group(&labeled(&[0.0, 0.4, 0.8]));
        assert!((summary.mean_swing - 0.8 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_empty_and_singleton_groups() {
        let empty = summarize_group(&[]);
        assert_eq!(empty, GroupSummary::default());

        let single = summarize_group(&labeled(&[0.7]));
        assert_eq!(single.stance_var, 0.0);
        assert_eq!(single.mean_swing, 0.0);
        assert_eq!(single.flip_rate_unjust, 0.0);
    }

    #[test]
    fn test_flip_rate_counts_unjustified() {
        // One unjustified flip (turn 1) over four turns.
        let summary = summarize_group(&labeled(&[0.0, 0.8, 0.85, 0.9]));
        assert!((summary.flip_rate_unjust - 0.25).abs() < 1e-12);
    }

    #[test]
    fn test_domains_and_extras_means() {
        let cfg = FlipConfig::default();
        let records = vec![
            TurnRecord::new("scn", "ON", 0, 0.1)
                .with_domains(2)
                .with_extra("subjectivity", 0.2),
            TurnRecord::new("scn", "ON", 1, 0.2)
                .with_domains(4)
                .with_extra("subjectivity", 0.6),
        ];
        let summary = summarize_group(&crate::flips::label_group(records, &cfg));
        assert!((summary.domains_mean - 3.0).abs() < 1e-12);
        assert!((summary.extras_mean["subjectivity"] - 0.4).abs() < 1e-12);
    }

    #[test]
    fn test_rollup_is_unweighted() {
        // Two scenarios of different sizes: the rollup averages their
        // summaries, not their pooled turns.
        let a = summarize_group(&labeled(&[0.0, 1.0]));
        let b = summarize_group(&labeled(&[0.5, 0.5, 0.5, 0.5, 0.5, 0.5]));
        let summaries = vec![
            (GroupKey::new("a", "ON"), a.clone()),
            (GroupKey::new("b", "ON"), b.clone()),
        ];
        let rollups = rollup_modes(&summaries);
        assert_eq!(rollups.len(), 1);
        assert_eq!(rollups[0].scenarios, 2);
        let expected = (a.stance_var + b.stance_var) / 2.0;
        assert!((rollups[0].stance_var - expected).abs() < 1e-12);
    }

    #[test]
    fn test_rollup_sorted_by_mode() {
        let s = summarize_group(&labeled(&[0.1, 0.2]));
        let summaries = vec![
            (GroupKey::new("a", "ON"), s.clone()),
            (GroupKey::new("a", "ABLATE"), s.clone()),
            (GroupKey::new("a", "OFF"), s),
        ];
        let modes: Vec<String> = rollup_modes(&summaries)
            .into_iter()
            .map(|r| r.mode)
            .collect();
        assert_eq!(modes, vec!["ABLATE", "OFF", "ON"]);
    }
}
