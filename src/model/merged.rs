use chrono::NaiveDate;

use crate::calendar::{CalendarFeatures, GateLabel};
use crate::model::daily::DailyAggregate;
use crate::model::element::ElementVector;

/// Calendar features joined with the market fields of the same day.
///
/// Also used for the forecast row, which has no return yet and carries
/// forward-filled indicator values.
#[derive(Debug, Clone, PartialEq)]
pub struct MergedRow {
    pub features: CalendarFeatures,
    pub return_pct: Option<f64>,
    pub rsi14: Option<f64>,
    pub rsi_signal: i8,
}

impl MergedRow {
    pub fn join(features: CalendarFeatures, market: &DailyAggregate) -> Self {
        Self {
            features,
            return_pct: market.return_pct,
            rsi14: market.rsi14,
            rsi_signal: market.rsi_signal,
        }
    }

    pub fn date(&self) -> NaiveDate {
        self.features.date
    }

    pub fn elements(&self) -> &ElementVector {
        &self.features.elements
    }

    pub fn gate(&self) -> Option<&GateLabel> {
        self.features.gate.as_ref()
    }

    /// +1 if the day closed up, otherwise -1 (an undefined return counts as down).
    pub fn direction_label(&self) -> i8 {
        match self.return_pct {
            Some(r) if r > 0.0 => 1,
            _ => -1,
        }
    }
}
