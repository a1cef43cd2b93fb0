// ─────────────────────────────────────────────────────────────────────
// Neutrality-Governed AI — Flipwatch Table Layer
// (C) 1998-2026 Miroslav Sotek. All rights reserved.
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
#![deny(unsafe_code)]
//! Outside-world facing layer around `flipwatch-core`:
//! - parses delimited turn logs into records (schema-checked, with
//!   per-value coercion fallbacks)
//! - accumulates live turns from a running experiment
//! - drives the group loop and renders the enriched / summary / rollup
//!   tables plus a reproducibility manifest
//!
//! No async. The kernel itself stays pure; the only shared mutable
//! state here is the recorder's mutex-guarded row buffer.

pub mod ingest;
pub mod report;
pub mod table;

pub use ingest::TurnRecorder;
pub use report::{run_delimited, run_records, FlipReport, RunManifest, TableShape};
pub use table::TurnTable;
