// ─────────────────────────────────────────────────────────────────────
// Neutrality-Governed AI — Flipwatch Kernel Core
// (C) 1998-2026 Miroslav Sotek. All rights reserved.
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
#![deny(unsafe_code)]
//! Flip detection, evidence gating, and aggregation over stance
//! sequences: the deterministic metric core behind the neutrality
//! controller experiments.
//!
//! # Metric Invariants
//!
//! 1. **The first turn of a group is never a candidate**: there is no
//!    prior turn to compare against, so index 0 is always false.
//!
//! 2. **Label implication chain**: `flip_persistent` implies
//!    `flip_candidate`, and `flip_unjustified` implies
//!    `flip_persistent`. Non-candidates are never evaluated for
//!    persistence.
//!
//! 3. **Groups are sealed**: no value computed for one
//!    (scenario, mode) group reads another group's turns. The group
//!    loop may therefore run in any order, or in parallel.
//!
//! 4. **Labels are write-once**: a turn's labels depend only on the
//!    group's stance sequence and that turn's own evidence columns;
//!    nothing is revised after the labeling pass.
//!
//! 5. **Two flip definitions, never merged**: the refined persistent
//!    rule (`flips`) is the system of record; the legacy rule
//!    (`legacy`) is a diagnostic side channel. Neither reads the
//!    other's output.

pub mod aggregate;
pub mod flips;
pub mod legacy;
pub mod polarity;

pub use aggregate::{rollup_modes, summarize_group};
pub use flips::{candidate_flags, evidence_ok, label_group, persistence_flags};
pub use legacy::legacy_flags;
pub use polarity::Polarity;
