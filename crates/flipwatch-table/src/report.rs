// ─────────────────────────────────────────────────────────────────────
// Neutrality-Governed AI — Pipeline Driver & Run Manifest
// Mirrors the apply/summarize/rollup tail of: analysis/flip_metrics.py
// ─────────────────────────────────────────────────────────────────────
//! Drives the full metric run: group the turn records, label each
//! group with the core pipeline, aggregate, and render the three
//! output tables plus a reproducibility manifest.
//!
//! Ordering is deterministic end to end: enriched turns keep the
//! groups' first-appearance order (rows sorted by turn within each
//! group), summaries are sorted by (scenario, mode), rollups by mode.
//! Re-running on identical input with identical configuration yields
//! byte-identical output.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use flipwatch_core::{label_group, rollup_modes, summarize_group};
use flipwatch_types::{
    FlipConfig, FlipError, FlipResult, GroupKey, GroupSummary, LabeledTurn, ModeRollup, TurnRecord,
};

use crate::table::TurnTable;

/// Name and row count of one rendered output table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableShape {
    pub name: String,
    pub rows: usize,
}

/// Record of one metric run: the configuration used and the shape of
/// every produced table. Serialized alongside the outputs so a run can
/// be reproduced exactly.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunManifest {
    pub config: FlipConfig,
    pub total_turns: usize,
    pub group_count: usize,
    pub mode_count: usize,
    pub extra_columns: Vec<String>,
    pub outputs: Vec<TableShape>,
}

/// The complete result of one metric run.
#[derive(Debug, Clone)]
pub struct FlipReport {
    /// Input turns enriched with the per-turn flip labels.
    pub turns: Vec<LabeledTurn>,
    /// Per-(scenario, mode) summaries, sorted by key.
    pub summaries: Vec<(GroupKey, GroupSummary)>,
    /// Per-mode rollups, sorted by mode.
    pub rollups: Vec<ModeRollup>,
    pub manifest: RunManifest,
}

/// Split records into (scenario, mode) groups, preserving the order in
/// which groups first appear in the input.
fn group_records(records: Vec<TurnRecord>) -> Vec<(GroupKey, Vec<TurnRecord>)> {
    let mut groups: Vec<(GroupKey, Vec<TurnRecord>)> = Vec::new();
    for record in records {
        let key = GroupKey::new(record.scenario.as_str(), record.mode.as_str());
        match groups.iter_mut().find(|(k, _)| *k == key) {
            Some((_, rows)) => rows.push(record),
            None => groups.push((key, vec![record])),
        }
    }
    groups
}

/// Run the metric over already-materialized records.
pub fn run_records(records: Vec<TurnRecord>, cfg: &FlipConfig) -> FlipResult<FlipReport> {
    cfg.validate()?;

    let extra_columns: Vec<String> = records
        .iter()
        .flat_map(|r| r.extras.keys().cloned())
        .collect::<BTreeSet<String>>()
        .into_iter()
        .collect();
    let total_turns = records.len();

    let mut turns = Vec::with_capacity(total_turns);
    let mut summaries: Vec<(GroupKey, GroupSummary)> = Vec::new();
    for (key, rows) in group_records(records) {
        let labeled = label_group(rows, cfg);
        summaries.push((key, summarize_group(&labeled)));
        turns.extend(labeled);
    }
    summaries.sort_by(|a, b| a.0.cmp(&b.0));

    let rollups = rollup_modes(&summaries);

    let manifest = RunManifest {
        config: cfg.clone(),
        total_turns,
        group_count: summaries.len(),
        mode_count: rollups.len(),
        extra_columns,
        outputs: vec![
            TableShape {
                name: "turns_enriched".to_string(),
                rows: turns.len(),
            },
            TableShape {
                name: "group_summary".to_string(),
                rows: summaries.len(),
            },
            TableShape {
                name: "mode_rollup".to_string(),
                rows: rollups.len(),
            },
        ],
    };

    Ok(FlipReport {
        turns,
        summaries,
        rollups,
        manifest,
    })
}

/// Parse delimited text and run the metric. Schema errors surface
/// before any labeling; no partial output is produced.
pub fn run_delimited(text: &str, cfg: &FlipConfig) -> FlipResult<FlipReport> {
    let records = TurnTable::parse(text).to_records()?;
    run_records(records, cfg)
}

impl FlipReport {
    /// Enriched turns as comma-delimited text.
    pub fn enriched_csv(&self) -> String {
        let extras = &self.manifest.extra_columns;
        let mut header: Vec<String> = [
            "scenario",
            "mode",
            "turn",
            "stance",
            "domains_used",
            "justified_revision_allowed",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect();
        header.extend(extras.iter().cloned());
        header.extend(
            ["flip_candidate", "flip_persistent", "flip_unjustified", "flip_legacy"]
                .iter()
                .map(|s| s.to_string()),
        );

        let mut out = String::new();
        push_row(&mut out, &header);
        for t in &self.turns {
            let mut row: Vec<String> = vec![
                t.record.scenario.clone(),
                t.record.mode.clone(),
                t.record.turn.to_string(),
                fmt_f64(t.record.stance),
                t.record.domains_used.to_string(),
                t.record.justified_revision_allowed.to_string(),
            ];
            for name in extras {
                row.push(fmt_f64(t.record.extras.get(name).copied().unwrap_or(0.0)));
            }
            row.push(t.flip_candidate.to_string());
            row.push(t.flip_persistent.to_string());
            row.push(t.flip_unjustified.to_string());
            row.push(t.flip_legacy.to_string());
            push_row(&mut out, &row);
        }
        out
    }

    /// Per-(scenario, mode) summaries as comma-delimited text.
    pub fn summary_csv(&self) -> String {
        let extras = &self.manifest.extra_columns;
        let mut header: Vec<String> = [
            "scenario",
            "mode",
            "stance_var",
            "mean_swing",
            "flip_rate_unjust",
            "flip_rate_legacy",
            "domains_mean",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect();
        header.extend(extras.iter().map(|e| format!("{e}_mean")));

        let mut out = String::new();
        push_row(&mut out, &header);
        for (key, s) in &self.summaries {
            let mut row = vec![
                key.scenario.clone(),
                key.mode.clone(),
                fmt_f64(s.stance_var),
                fmt_f64(s.mean_swing),
                fmt_f64(s.flip_rate_unjust),
                fmt_f64(s.flip_rate_legacy),
                fmt_f64(s.domains_mean),
            ];
            for name in extras {
                row.push(fmt_f64(s.extras_mean.get(name).copied().unwrap_or(0.0)));
            }
            push_row(&mut out, &row);
        }
        out
    }

    /// Per-mode rollup as comma-delimited text.
    pub fn rollup_csv(&self) -> String {
        let extras = &self.manifest.extra_columns;
        let mut header: Vec<String> = [
            "mode",
            "scenarios",
            "stance_var",
            "mean_swing",
            "flip_rate_unjust",
            "flip_rate_legacy",
            "domains_mean",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect();
        header.extend(extras.iter().map(|e| format!("{e}_mean")));

        let mut out = String::new();
        push_row(&mut out, &header);
        for r in &self.rollups {
            let mut row = vec![
                r.mode.clone(),
                r.scenarios.to_string(),
                fmt_f64(r.stance_var),
                fmt_f64(r.mean_swing),
                fmt_f64(r.flip_rate_unjust),
                fmt_f64(r.flip_rate_legacy),
                fmt_f64(r.domains_mean),
            ];
            for name in extras {
                row.push(fmt_f64(r.extras_mean.get(name).copied().unwrap_or(0.0)));
            }
            push_row(&mut out, &row);
        }
        out
    }

    /// Manifest as pretty-printed JSON.
    pub fn manifest_json(&self) -> FlipResult<String> {
        serde_json::to_string_pretty(&self.manifest)
            .map_err(|e| FlipError::Config(format!("manifest serialization failed: {e}")))
    }
}

fn fmt_f64(value: f64) -> String {
    format!("{value}")
}

fn push_row(out: &mut String, fields: &[String]) {
    for (i, field) in fields.iter().enumerate() {
        if i > 0 {
            out.push(',');
        }
        out.push_str(&quote_field(field));
    }
    out.push('\n');
}

/// Quote a field when it contains the delimiter, a quote, or a line
/// break; embedded quotes are doubled.
fn quote_field(field: &str) -> String {
    if field.contains(',') || field.contains('"') || field.contains('\n') {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RUN_CSV: &str = "scenario,mode,turn,stance,domains_used,justified_revision_allowed\n\
        evs,OFF,0,0.0,0,false\n\
        evs,OFF,1,0.8,0,false\n\
        evs,OFF,2,0.85,0,false\n\
        evs,OFF,3,0.9,0,false\n\
        evs,ON,0,0.0,0,false\n\
        evs,ON,1,0.1,0,false\n\
        evs,ON,2,0.15,0,false\n\
        evs,ON,3,0.1,0,false\n";

    #[test]
    fn test_end_to_end_labels() {
        let report = run_delimited(RUN_CSV, &FlipConfig::default()).unwrap();
        assert_eq!(report.turns.len(), 8);

        // OFF group: the 0.8 jump at turn 1 is an unjustified flip.
        let off: Vec<&LabeledTurn> = report
            .turns
            .iter()
            .filter(|t| t.record.mode == "OFF")
            .collect();
        assert!(off[1].flip_unjustified);
        assert!(!off[2].flip_unjustified);

        // ON group: controller held stance near neutral; nothing fires.
        assert!(report
            .turns
            .iter()
            .filter(|t| t.record.mode == "ON")
            .all(|t| !t.flip_candidate));
    }

    #[test]
    fn test_summary_values() {
        let report = run_delimited(RUN_CSV, &FlipConfig::default()).unwrap();
        assert_eq!(report.summaries.len(), 2);
        // Sorted by key: (evs, OFF) then (evs, ON).
        let (key, off) = &report.summaries[0];
        assert_eq!(key.mode, "OFF");
        assert!((off.flip_rate_unjust - 0.25).abs() < 1e-12);
        let (_, on) = &report.summaries[1];
        assert_eq!(on.flip_rate_unjust, 0.0);
    }

    #[test]
    fn test_rollup_per_mode() {
        let report = run_delimited(RUN_CSV, &FlipConfig::default()).unwrap();
        let modes: Vec<&str> = report.rollups.iter().map(|r| r.mode.as_str()).collect();
        assert_eq!(modes, vec!["OFF", "ON"]);
        assert_eq!(report.rollups[0].scenarios, 1);
    }

    #[test]
    fn test_groups_are_sealed() {
        // The same scenario under two modes: labels must not leak
        // across the mode boundary. ON ends where OFF begins; if state
        // leaked, ON's first turn would see OFF's last stance.
        let csv = "scenario,mode,turn,stance\n\
                   s,OFF,0,0.0\n\
                   s,OFF,1,0.9\n\
                   s,OFF,2,0.9\n\
                   s,ON,0,0.9\n\
                   s,ON,1,0.9\n";
        let report = run_delimited(csv, &FlipConfig::default()).unwrap();
        let on_first = report
            .turns
            .iter()
            .find(|t| t.record.mode == "ON" && t.record.turn == 0)
            .unwrap();
        assert!(!on_first.flip_candidate);
    }

    #[test]
    fn test_enriched_keeps_first_appearance_order() {
        let csv = "scenario,mode,turn,stance\n\
                   zeta,ON,0,0.1\n\
                   alpha,OFF,0,0.1\n\
                   zeta,ON,1,0.2\n";
        let report = run_delimited(csv, &FlipConfig::default()).unwrap();
        let order: Vec<(&str, u32)> = report
            .turns
            .iter()
            .map(|t| (t.record.scenario.as_str(), t.record.turn))
            .collect();
        assert_eq!(order, vec![("zeta", 0), ("zeta", 1), ("alpha", 0)]);
        // Summaries are sorted, independent of input order.
        assert_eq!(report.summaries[0].0.scenario, "alpha");
    }

    #[test]
    fn test_schema_error_before_any_output() {
        let err = run_delimited("turn,stance\n1,0.5\n", &FlipConfig::default()).unwrap_err();
        match err {
            FlipError::Schema { missing } => {
                assert_eq!(missing, vec!["scenario".to_string(), "mode".to_string()]);
            }
            other => panic!("expected schema error, got {other:?}"),
        }
    }

    #[test]
    fn test_invalid_config_rejected() {
        let cfg = FlipConfig {
            persist_turns: 0,
            ..FlipConfig::default()
        };
        assert!(run_delimited(RUN_CSV, &cfg).is_err());
    }

    #[test]
    fn test_deterministic_rendering() {
        let cfg = FlipConfig::default();
        let a = run_delimited(RUN_CSV, &cfg).unwrap();
        let b = run_delimited(RUN_CSV, &cfg).unwrap();
        assert_eq!(a.enriched_csv(), b.enriched_csv());
        assert_eq!(a.summary_csv(), b.summary_csv());
        assert_eq!(a.rollup_csv(), b.rollup_csv());
        assert_eq!(a.manifest_json().unwrap(), b.manifest_json().unwrap());
    }

    #[test]
    fn test_enriched_csv_shape() {
        let report = run_delimited(RUN_CSV, &FlipConfig::default()).unwrap();
        let csv = report.enriched_csv();
        let mut lines = csv.lines();
        let header = lines.next().unwrap();
        assert!(header.starts_with("scenario,mode,turn,stance"));
        assert!(header.ends_with("flip_candidate,flip_persistent,flip_unjustified,flip_legacy"));
        assert_eq!(lines.count(), 8);
        // The OFF turn-1 row carries the unjustified label.
        assert!(csv.contains("evs,OFF,1,0.8,0,false,true,true,true,true"));
    }

    #[test]
    fn test_extras_flow_into_all_tables() {
        let csv = "scenario,mode,turn,stance,subjectivity\n\
                   s,ON,0,0.1,0.2\n\
                   s,ON,1,0.2,0.4\n";
        let report = run_delimited(csv, &FlipConfig::default()).unwrap();
        assert_eq!(report.manifest.extra_columns, vec!["subjectivity"]);
        assert!(report.enriched_csv().lines().next().unwrap().contains("subjectivity"));
        assert!(report.summary_csv().contains("subjectivity_mean"));
        let (_, summary) = &report.summaries[0];
        assert!((summary.extras_mean["subjectivity"] - 0.3).abs() < 1e-12);
        assert!((report.rollups[0].extras_mean["subjectivity"] - 0.3).abs() < 1e-12);
    }

    #[test]
    fn test_manifest_contents() {
        let report = run_delimited(RUN_CSV, &FlipConfig::default()).unwrap();
        let m = &report.manifest;
        assert_eq!(m.total_turns, 8);
        assert_eq!(m.group_count, 2);
        assert_eq!(m.mode_count, 2);
        assert_eq!(m.outputs.len(), 3);
        assert_eq!(m.outputs[0].name, "turns_enriched");
        assert_eq!(m.outputs[0].rows, 8);
        let json = report.manifest_json().unwrap();
        assert!(json.contains("\"swing_thresh\": 0.6"));
    }

    #[test]
    fn test_empty_table_runs_clean() {
        let report = run_delimited("scenario,mode,turn,stance\n", &FlipConfig::default()).unwrap();
        assert!(report.turns.is_empty());
        assert!(report.summaries.is_empty());
        assert!(report.rollups.is_empty());
        assert_eq!(report.manifest.total_turns, 0);
    }

    #[test]
    fn test_prompt_fields_roundtrip_quoting() {
        let csv = "scenario,mode,turn,stance,prompt\n\
                   s,ON,0,0.1,\"Admit it, everyone knows.\"\n";
        let report = run_delimited(csv, &FlipConfig::default()).unwrap();
        // Prompts are consumed for the justification flag, not echoed.
        assert!(!report.turns[0].record.justified_revision_allowed);
        // A scenario name containing the delimiter is quoted on output.
        let csv2 = "scenario,mode,turn,stance\n\"a,b\",ON,0,0.1\n";
        let report2 = run_delimited(csv2, &FlipConfig::default()).unwrap();
        assert!(report2.enriched_csv().contains("\"a,b\",ON,0,0.1"));
    }
}
