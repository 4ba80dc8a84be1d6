use std::collections::HashMap;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::NaiveDate;

use super::gate::GateLabel;
use crate::error::AppError;
use crate::model::element::{Element, ElementVector};

/// Manually supplied features for one exact date.
#[derive(Debug, Clone, PartialEq)]
pub struct OverrideRecord {
    /// Verbatim, trimmed; `None` for an empty cell.
    pub gate: Option<GateLabel>,
    pub elements: ElementVector,
}

/// Read-only table of per-date overrides, loaded from a CSV file with the
/// header `date_kst,gate,wood,fire,earth,metal,water` (any column order).
#[derive(Debug, Clone, Default)]
pub struct OverrideTable {
    rows: HashMap<NaiveDate, OverrideRecord>,
}

impl OverrideTable {
    pub fn empty() -> Self {
        Self::default()
    }

    /// A missing file is an empty table, not an error.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::debug!(path = %path.display(), "No override table found");
            return Ok(Self::empty());
        }
        let payload = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        let table = Self::parse_csv(&payload)
            .with_context(|| format!("failed to parse {}", path.display()))?;
        tracing::info!(path = %path.display(), rows = table.len(), "Loaded override table");
        Ok(table)
    }

    pub fn parse_csv(payload: &str) -> Result<Self, AppError> {
        let mut lines = payload
            .lines()
            .enumerate()
            .map(|(i, l)| (i + 1, l.trim()))
            .filter(|(_, l)| !l.is_empty());

        let Some((header_line, header)) = lines.next() else {
            return Ok(Self::empty());
        };
        let columns: Vec<&str> = header.split(',').map(str::trim).collect();
        let column = |name: &str| -> Result<usize, AppError> {
            columns
                .iter()
                .position(|c| *c == name)
                .ok_or_else(|| AppError::Override {
                    line: header_line,
                    msg: format!("missing column '{}'", name),
                })
        };
        let date_col = column("date_kst")?;
        let gate_col = column("gate")?;
        let element_cols = Element::ALL
            .iter()
            .map(|e| column(e.as_str()).map(|idx| (*e, idx)))
            .collect::<Result<Vec<_>, _>>()?;

        let mut rows = HashMap::new();
        for (line, raw) in lines {
            let fields: Vec<&str> = raw.split(',').map(str::trim).collect();
            let field = |idx: usize| field_at(&fields, idx, line, columns.len());

            let date_str = field(date_col)?;
            let date = parse_override_date(date_str).ok_or_else(|| AppError::Override {
                line,
                msg: format!("invalid date '{}'", date_str),
            })?;

            let gate = GateLabel::parse(field(gate_col)?);

            let mut elements = ElementVector::default();
            for (element, idx) in &element_cols {
                let raw_value = field(*idx)?;
                *elements.get_mut(*element) =
                    raw_value.parse::<f64>().map_err(|_| AppError::Override {
                        line,
                        msg: format!("invalid {} value '{}'", element, raw_value),
                    })?;
            }

            // First row for a date wins.
            rows.entry(date).or_insert(OverrideRecord { gate, elements });
        }
        Ok(Self { rows })
    }

    pub fn get(&self, date: NaiveDate) -> Option<&OverrideRecord> {
        self.rows.get(&date)
    }

    pub fn insert(&mut self, date: NaiveDate, record: OverrideRecord) {
        self.rows.insert(date, record);
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

fn field_at<'a>(
    fields: &[&'a str],
    idx: usize,
    line: usize,
    expected: usize,
) -> Result<&'a str, AppError> {
    fields.get(idx).copied().ok_or_else(|| AppError::Override {
        line,
        msg: format!("expected {} fields, found {}", expected, fields.len()),
    })
}

/// Accepts `YYYY-MM-DD`, optionally followed by a time part.
fn parse_override_date(s: &str) -> Option<NaiveDate> {
    let date_part = s.split(|c| c == ' ' || c == 'T').next()?;
    NaiveDate::parse_from_str(date_part, "%Y-%m-%d").ok()
}
