// ─────────────────────────────────────────────────────────────────────
// Neutrality-Governed AI — Delimited Turn Table
// Mirrors the load/hygiene block of: analysis/flip_metrics.py
// ─────────────────────────────────────────────────────────────────────
//! Minimal delimited-text table for turn logs.
//!
//! Schema problems are fatal and reported before any row is touched;
//! per-value problems never are: a malformed stance or count coerces
//! to zero so a noisy upstream run still yields a (degraded) metric.

use std::collections::BTreeMap;

use flipwatch_types::record::sanitize_stance;
use flipwatch_types::{FlipError, FlipResult, TurnRecord, EVIDENCE_MARKER};

/// Columns the pipeline cannot run without.
pub const REQUIRED_COLUMNS: [&str; 4] = ["scenario", "mode", "turn", "stance"];

/// Columns with dedicated handling; anything else that looks numeric is
/// treated as an extra behavioral column and passed through.
const KNOWN_COLUMNS: [&str; 7] = [
    "scenario",
    "mode",
    "turn",
    "stance",
    "domains_used",
    "justified_revision_allowed",
    "prompt",
];

/// A parsed delimited table: one header row plus data rows.
#[derive(Debug, Clone)]
pub struct TurnTable {
    delimiter: char,
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl TurnTable {
    /// Parse comma-delimited text. Blank lines are skipped; the first
    /// non-blank line is the header.
    pub fn parse(text: &str) -> Self {
        Self::parse_with_delimiter(text, ',')
    }

    /// Parse with an explicit delimiter.
    pub fn parse_with_delimiter(text: &str, delimiter: char) -> Self {
        let mut lines = text
            .lines()
            .map(|l| l.trim_end_matches('\r'))
            .filter(|l| !l.trim().is_empty());

        let headers = match lines.next() {
            Some(header) => split_record(header, delimiter)
                .into_iter()
                .map(|h| h.trim().to_string())
                .collect(),
            None => Vec::new(),
        };

        let rows = lines.map(|line| split_record(line, delimiter)).collect();

        Self {
            delimiter,
            headers,
            rows,
        }
    }

    /// Capability check: does the loaded table carry this column?
    pub fn has_column(&self, name: &str) -> bool {
        self.headers.iter().any(|h| h == name)
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    /// Number of data rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn delimiter(&self) -> char {
        self.delimiter
    }

    fn column(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    fn field<'a>(&'a self, row: &'a [String], name: &str) -> &'a str {
        self.column(name)
            .and_then(|idx| row.get(idx))
            .map(String::as_str)
            .unwrap_or("")
    }

    /// Columns beyond the known set whose first data value parses as a
    /// number. These ride along into the summaries.
    pub fn extra_numeric_columns(&self) -> Vec<String> {
        let first = match self.rows.first() {
            Some(row) => row,
            None => return Vec::new(),
        };
        self.headers
            .iter()
            .enumerate()
            .filter(|(idx, name)| {
                !KNOWN_COLUMNS.contains(&name.as_str())
                    && first
                        .get(*idx)
                        .map(|v| v.trim().parse::<f64>().is_ok())
                        .unwrap_or(false)
            })
            .map(|(_, name)| name.clone())
            .collect()
    }

    /// Validate the required schema and coerce all rows into records.
    ///
    /// Fails with [`FlipError::Schema`], listing every missing
    /// required column, before reading a single data value. Row-level
    /// problems coerce: bad numerics to 0, bad booleans to false.
    pub fn to_records(&self) -> FlipResult<Vec<TurnRecord>> {
        let mut missing = Vec::new();
        for column in REQUIRED_COLUMNS {
            if !self.has_column(column) {
                missing.push(column.to_string());
            }
        }
        if !missing.is_empty() {
            return Err(FlipError::Schema { missing });
        }

        let has_justified = self.has_column("justified_revision_allowed");
        let has_prompt = self.has_column("prompt");
        let has_domains = self.has_column("domains_used");
        let extra_columns = self.extra_numeric_columns();

        let records = self
            .rows
            .iter()
            .map(|row| {
                let justified = if has_justified {
                    parse_bool(self.field(row, "justified_revision_allowed"))
                } else if has_prompt {
                    self.field(row, "prompt")
                        .to_uppercase()
                        .contains(EVIDENCE_MARKER)
                } else {
                    false
                };

                let mut extras = BTreeMap::new();
                for name in &extra_columns {
                    extras.insert(name.clone(), parse_f64(self.field(row, name), name));
                }

                TurnRecord {
                    scenario: self.field(row, "scenario").to_string(),
                    mode: self.field(row, "mode").to_string(),
                    turn: parse_u32(self.field(row, "turn"), "turn"),
                    stance: sanitize_stance(parse_f64(self.field(row, "stance"), "stance")),
                    domains_used: if has_domains {
                        parse_u32(self.field(row, "domains_used"), "domains_used")
                    } else {
                        0
                    },
                    justified_revision_allowed: justified,
                    extras,
                }
            })
            .collect();

        Ok(records)
    }
}

/// Split one delimited line, honoring double-quoted fields with `""`
/// escapes.
fn split_record(line: &str, delimiter: char) -> Vec<String> {
    let mut fields = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;
    let mut chars = line.chars().peekable();

    while let Some(c) = chars.next() {
        if in_quotes {
            if c == '"' {
                if chars.peek() == Some(&'"') {
                    chars.next();
                    field.push('"');
                } else {
                    in_quotes = false;
                }
            } else {
                field.push(c);
            }
        } else if c == '"' && field.is_empty() {
            in_quotes = true;
        } else if c == delimiter {
            fields.push(std::mem::take(&mut field));
        } else {
            field.push(c);
        }
    }
    fields.push(field);
    fields
}

fn parse_f64(raw: &str, column: &str) -> f64 {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return 0.0;
    }
    match trimmed.parse::<f64>() {
        Ok(v) => v,
        Err(_) => {
            log::warn!("column {column}: non-numeric value {trimmed:?} coerced to 0");
            0.0
        }
    }
}

fn parse_u32(raw: &str, column: &str) -> u32 {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return 0;
    }
    match trimmed.parse::<u32>() {
        Ok(v) => v,
        // Accept float-shaped counts ("3.0") by truncation.
        Err(_) => match trimmed.parse::<f64>() {
            Ok(v) if v.is_finite() && v >= 0.0 => v as u32,
            _ => {
                log::warn!("column {column}: non-numeric value {trimmed:?} coerced to 0");
                0
            }
        },
    }
}

fn parse_bool(raw: &str) -> bool {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" => true,
        "" | "false" | "0" | "no" => false,
        other => {
            log::warn!("boolean column: value {other:?} coerced to false");
            false
        }
    }
}
