// ─────────────────────────────────────────────────────────────────────
// Neutrality-Governed AI — Flipwatch Kernel Error Hierarchy
// ─────────────────────────────────────────────────────────────────────

use thiserror::Error;

/// Root error type for all Flipwatch Kernel failures.
///
/// Per-value parsing problems are not errors: they coerce to zero/false
/// (a noisy upstream generator must not abort a whole run). Only schema
/// and configuration problems are fatal.
#[derive(Error, Debug)]
pub enum FlipError {
    /// Required input columns are absent. Raised before any labeling;
    /// no partial output is produced.
    #[error("schema error: missing required column(s): {}", .missing.join(", "))]
    Schema { missing: Vec<String> },

    /// Configuration error (invalid threshold, malformed JSON).
    #[error("config error: {0}")]
    Config(String),
}

pub type FlipResult<T> = Result<T, FlipError>;
