// ─────────────────────────────────────────────────────────────────────
// Neutrality-Governed AI — Flipwatch Kernel PyO3 FFI Bindings
// (C) 1998-2026 Miroslav Sotek. All rights reserved.
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
// Note: #[deny(unsafe_code)] not applied — PyO3 proc macros generate
// unsafe blocks internally. All hand-written code in this crate is safe.
//! Python-callable wrappers around the Rust flip metric.
//!
//! Exposes `FlipConfig`, `FlipReport`, `RustFlipPipeline`, and
//! `RustTurnRecorder` so the Python experiment harness can score its
//! logged runs with the Rust kernel instead of the pandas pass.
//!
//! # FFI Safety
//!
//! - All config validated before storage (`FlipConfig::validate()`).
//! - Schema/config failures become `ValueError`; per-value coercion
//!   stays silent, exactly as in the native API.
//! - The recorder is `Sync`; Python threads may record concurrently.
//!
//! Install: `cd flipwatch && pip install -e crates/flipwatch-ffi`
//! (requires maturin).
//!
//! Usage from Python:
//! ```python
//! from flipwatch_kernel import FlipConfig, RustFlipPipeline
//!
//! pipeline = RustFlipPipeline(FlipConfig(swing_thresh=0.7))
//! report = pipeline.run_csv(open("turns.csv").read())
//! print(report.rollup_csv())
//! ```

use pyo3::exceptions::PyValueError;
use pyo3::prelude::*;

use flipwatch_core::{candidate_flags, persistence_flags};
use flipwatch_table::{run_delimited, run_records, FlipReport, TurnRecorder};
use flipwatch_types::{FlipConfig, TurnRecord};

// ─── PyFlipConfig ───────────────────────────────────────────────────

/// Python-visible configuration for the flip metric.
#[pyclass(name = "FlipConfig")]
#[derive(Clone)]
struct PyFlipConfig {
    inner: FlipConfig,
}

#[pymethods]
impl PyFlipConfig {
    #[new]
    #[pyo3(signature = (
        neutral_band = 0.10,
        swing_thresh = 0.60,
        persist_turns = 2,
        evid_min_domains = 2,
        count_zero_cross = false,
        legacy_swing_thresh = 0.50,
    ))]
    fn new(
        neutral_band: f64,
        swing_thresh: f64,
        persist_turns: usize,
        evid_min_domains: u32,
        count_zero_cross: bool,
        legacy_swing_thresh: f64,
    ) -> PyResult<Self> {
        let config = FlipConfig {
            neutral_band,
            swing_thresh,
            persist_turns,
            evid_min_domains,
            count_zero_cross,
            legacy_swing_thresh,
        };
        config
            .validate()
            .map_err(|e| PyValueError::new_err(e.to_string()))?;
        Ok(Self { inner: config })
    }

    /// Construct from JSON string.
    #[staticmethod]
    fn from_json(json: &str) -> PyResult<Self> {
        let config =
            FlipConfig::from_json(json).map_err(|e| PyValueError::new_err(e.to_string()))?;
        config
            .validate()
            .map_err(|e| PyValueError::new_err(e.to_string()))?;
        Ok(Self { inner: config })
    }

    fn __repr__(&self) -> String {
        format!(
            "FlipConfig(neutral_band={}, swing_thresh={}, persist_turns={}, evid_min_domains={})",
            self.inner.neutral_band,
            self.inner.swing_thresh,
            self.inner.persist_turns,
            self.inner.evid_min_domains
        )
    }
}

// ─── PyFlipReport ───────────────────────────────────────────────────

/// Python-visible result of one metric run.
#[pyclass(name = "FlipReport")]
struct PyFlipReport {
    inner: FlipReport,
}

#[pymethods]
impl PyFlipReport {
    /// Enriched turns as comma-delimited text.
    fn enriched_csv(&self) -> String {
        self.inner.enriched_csv()
    }

    /// Per-(scenario, mode) summaries as comma-delimited text.
    fn summary_csv(&self) -> String {
        self.inner.summary_csv()
    }

    /// Per-mode rollup as comma-delimited text.
    fn rollup_csv(&self) -> String {
        self.inner.rollup_csv()
    }

    /// Run manifest (config + table shapes) as pretty JSON.
    fn manifest_json(&self) -> PyResult<String> {
        self.inner
            .manifest_json()
            .map_err(|e| PyValueError::new_err(e.to_string()))
    }

    #[getter]
    fn turn_count(&self) -> usize {
        self.inner.turns.len()
    }

    #[getter]
    fn group_count(&self) -> usize {
        self.inner.summaries.len()
    }

    #[getter]
    fn mode_count(&self) -> usize {
        self.inner.rollups.len()
    }

    /// Unjustified flip rate for one mode, or None if the mode is
    /// absent from the run.
    fn flip_rate(&self, mode: &str) -> Option<f64> {
        self.inner
            .rollups
            .iter()
            .find(|r| r.mode == mode)
            .map(|r| r.flip_rate_unjust)
    }

    fn __repr__(&self) -> String {
        format!(
            "FlipReport(turns={}, groups={}, modes={})",
            self.inner.turns.len(),
            self.inner.summaries.len(),
            self.inner.rollups.len()
        )
    }
}

// ─── RustFlipPipeline ───────────────────────────────────────────────

/// One-shot pipeline over a delimited turn log.
///
/// Drop-in replacement for the refined-metric pass in
/// `analysis/flip_metrics.py`.
#[pyclass(name = "RustFlipPipeline")]
struct PyFlipPipeline {
    config: FlipConfig,
}

#[pymethods]
impl PyFlipPipeline {
    #[new]
    #[pyo3(signature = (config = None))]
    fn new(config: Option<PyFlipConfig>) -> Self {
        Self {
            config: config.map(|c| c.inner).unwrap_or_default(),
        }
    }

    /// Run the metric over comma-delimited text with a header row.
    ///
    /// Raises `ValueError` when required columns are missing; malformed
    /// values coerce to zero/false without failing the run.
    fn run_csv(&self, text: &str) -> PyResult<PyFlipReport> {
        run_delimited(text, &self.config)
            .map(|inner| PyFlipReport { inner })
            .map_err(|e| PyValueError::new_err(e.to_string()))
    }

    fn __repr__(&self) -> String {
        format!(
            "RustFlipPipeline(swing_thresh={}, persist_turns={})",
            self.config.swing_thresh, self.config.persist_turns
        )
    }
}

// ─── RustTurnRecorder ───────────────────────────────────────────────

/// Incremental turn recorder for live experiment runs.
///
/// The harness records one row per scored turn as the scenario loops
/// execute (threads welcome), then calls `finish` to run the metric
/// over everything recorded.
#[pyclass(name = "RustTurnRecorder")]
struct PyTurnRecorder {
    inner: TurnRecorder,
}

#[pymethods]
impl PyTurnRecorder {
    #[new]
    fn new() -> Self {
        Self {
            inner: TurnRecorder::new(),
        }
    }

    #[pyo3(signature = (
        scenario,
        mode,
        turn,
        stance,
        domains_used = 0,
        justified_revision_allowed = false,
    ))]
    fn record_turn(
        &self,
        scenario: &str,
        mode: &str,
        turn: u32,
        stance: f64,
        domains_used: u32,
        justified_revision_allowed: bool,
    ) {
        self.inner.record(
            TurnRecord::new(scenario, mode, turn, stance)
                .with_domains(domains_used)
                .with_justification(justified_revision_allowed),
        );
    }

    fn __len__(&self) -> usize {
        self.inner.len()
    }

    /// Run the metric over all recorded turns.
    #[pyo3(signature = (config = None))]
    fn finish(&self, config: Option<PyFlipConfig>) -> PyResult<PyFlipReport> {
        let cfg = config.map(|c| c.inner).unwrap_or_default();
        run_records(self.inner.snapshot(), &cfg)
            .map(|inner| PyFlipReport { inner })
            .map_err(|e| PyValueError::new_err(e.to_string()))
    }

    fn __repr__(&self) -> String {
        format!("RustTurnRecorder(turns={})", self.inner.len())
    }
}

// ─── label_stances ──────────────────────────────────────────────────

/// Candidate and persistence flags for a bare stance sequence.
///
/// Low-level hook for notebooks poking at a single group without
/// building a full table. Returns `(candidates, persistent)`.
#[pyfunction]
#[pyo3(signature = (stances, config = None))]
fn label_stances(
    stances: Vec<f64>,
    config: Option<PyFlipConfig>,
) -> (Vec<bool>, Vec<bool>) {
    let cfg = config.map(|c| c.inner).unwrap_or_default();
    let candidates = candidate_flags(&stances, &cfg);
    let persistent = persistence_flags(&stances, &candidates, &cfg);
    (candidates, persistent)
}

// ─── Module registration ────────────────────────────────────────────

#[pymodule]
fn flipwatch_kernel(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_class::<PyFlipConfig>()?;
    m.add_class::<PyFlipReport>()?;
    m.add_class::<PyFlipPipeline>()?;
    m.add_class::<PyTurnRecorder>()?;
    m.add_function(wrap_pyfunction!(label_stances, m)?)?;
    Ok(())
}
