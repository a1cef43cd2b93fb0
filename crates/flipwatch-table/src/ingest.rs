// ─────────────────────────────────────────────────────────────────────
// Neutrality-Governed AI — Live Turn Recorder
// ─────────────────────────────────────────────────────────────────────
//! Accumulates turn records while an experiment is still running.
//!
//! Scenario loops may run on separate threads; the buffer is guarded
//! by a `parking_lot::Mutex` and snapshots are cheap owned copies, so
//! the pipeline never observes a half-written row.

use parking_lot::Mutex;

use flipwatch_types::TurnRecord;

/// Thread-safe, append-only turn buffer.
///
/// Rows keep their insertion order; the pipeline re-sorts within each
/// (scenario, mode) group anyway, so interleaved recording across
/// groups is harmless.
#[derive(Debug, Default)]
pub struct TurnRecorder {
    rows: Mutex<Vec<TurnRecord>>,
}

impl TurnRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one turn.
    pub fn record(&self, record: TurnRecord) {
        self.rows.lock().push(record);
    }

    /// Number of recorded turns.
    pub fn len(&self) -> usize {
        self.rows.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.lock().is_empty()
    }

    /// Owned copy of everything recorded so far, in insertion order.
    pub fn snapshot(&self) -> Vec<TurnRecord> {
        self.rows.lock().clone()
    }

    /// Consume the recorder, returning the buffer without cloning.
    pub fn into_records(self) -> Vec<TurnRecord> {
        self.rows.into_inner()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;

    #[test]
    fn test_insertion_order_preserved() {
        let recorder = TurnRecorder::new();
        for i in 0..5 {
            recorder.record(TurnRecord::new("scn", "ON", i, 0.1 * i as f64));
        }
        let rows = recorder.snapshot();
        let turns: Vec<u32> = rows.iter().map(|r| r.turn).collect();
        assert_eq!(turns, vec![0, 1, 2, 3, 4]);
        assert_eq!(recorder.len(), 5);
    }

    #[test]
    fn test_snapshot_is_a_copy() {
        let recorder = TurnRecorder::new();
        recorder.record(TurnRecord::new("scn", "ON", 0, 0.5));
        let snap = recorder.snapshot();
        recorder.record(TurnRecord::new("scn", "ON", 1, 0.6));
        assert_eq!(snap.len(), 1);
        assert_eq!(recorder.len(), 2);
    }

    #[test]
    fn test_concurrent_recording() {
        let recorder = Arc::new(TurnRecorder::new());
        let handles: Vec<_> = (0..4)
            .map(|mode_idx| {
                let recorder = Arc::clone(&recorder);
                std::thread::spawn(move || {
                    for turn in 0..25 {
                        recorder.record(TurnRecord::new(
                            "scn",
                            format!("mode{mode_idx}"),
                            turn,
                            0.0,
                        ));
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(recorder.len(), 100);
    }

    #[test]
    fn test_into_records() {
        let recorder = TurnRecorder::new();
        recorder.record(TurnRecord::new("scn", "ON", 0, 0.5));
        let rows = recorder.into_records();
        assert_eq!(rows.len(), 1);
    }
}
