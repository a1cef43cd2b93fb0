// ─────────────────────────────────────────────────────────────────────
// Neutrality-Governed AI — Flipwatch Kernel Types
// (C) 1998-2026 Miroslav Sotek. All rights reserved.
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
#![deny(unsafe_code)]
//! Type definitions, configuration, and error hierarchy for the
//! Flipwatch Kernel, the stance-stability metric core for
//! neutrality-governed conversation experiments.

pub mod config;
pub mod error;
pub mod record;

pub use config::FlipConfig;
pub use error::{FlipError, FlipResult};
pub use record::{
    sanitize_stance, GroupKey, GroupSummary, LabeledTurn, ModeRollup, TurnRecord, EVIDENCE_MARKER,
};
