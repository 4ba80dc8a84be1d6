//! Calendar-derived features: a date's stem/branch pair, its five-element
//! mix and its gate.
//!
//! `compute_features` is a pure function of the date. `CalendarFeatureGenerator`
//! layers the optional override table on top of it: an override for the exact
//! date replaces the computed values wholesale.

pub mod cycle;
pub mod gate;
pub mod overrides;

use chrono::NaiveDate;

use crate::model::element::ElementVector;

pub use cycle::CyclicPair;
pub use gate::{Gate, GateLabel};
pub use overrides::{OverrideRecord, OverrideTable};

const BASE_WEIGHT: f64 = 0.18;
const STEM_BONUS: f64 = 0.12;
const BRANCH_BONUS: f64 = 0.04;

pub const OVERRIDDEN_CODE: &str = "(override)";

/// Where a day's features came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeatureSource {
    Computed(CyclicPair),
    Overridden,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CalendarFeatures {
    pub date: NaiveDate,
    pub source: FeatureSource,
    pub gate: Option<GateLabel>,
    pub elements: ElementVector,
}

impl CalendarFeatures {
    pub fn cyclic_pair_code(&self) -> String {
        match self.source {
            FeatureSource::Computed(pair) => pair.code(),
            FeatureSource::Overridden => OVERRIDDEN_CODE.to_string(),
        }
    }

    pub fn is_overridden(&self) -> bool {
        matches!(self.source, FeatureSource::Overridden)
    }
}

/// Five-element mix for a pair: uniform base, stem and branch bonuses, then
/// normalized and rounded to 4 decimals. The rounded sum is left as is.
pub fn elements_for_pair(pair: &CyclicPair) -> ElementVector {
    let mut v = ElementVector::splat(BASE_WEIGHT);
    *v.get_mut(pair.stem_element()) += STEM_BONUS;
    *v.get_mut(pair.branch_element()) += BRANCH_BONUS;
    let total = v.sum();
    let raw = v;
    for (element, value) in raw.iter() {
        *v.get_mut(element) = round4(value / total);
    }
    v
}

pub fn compute_features(date: NaiveDate) -> CalendarFeatures {
    let pair = CyclicPair::for_date(date);
    CalendarFeatures {
        date,
        source: FeatureSource::Computed(pair),
        gate: Some(GateLabel::Known(Gate::for_pair(&pair))),
        elements: elements_for_pair(&pair),
    }
}

fn round4(x: f64) -> f64 {
    (x * 10_000.0).round() / 10_000.0
}

/// Resolves features per date, preferring an exact-date override.
#[derive(Debug, Clone, Default)]
pub struct CalendarFeatureGenerator {
    overrides: OverrideTable,
}

impl CalendarFeatureGenerator {
    pub fn new(overrides: OverrideTable) -> Self {
        Self { overrides }
    }

    pub fn features(&self, date: NaiveDate) -> CalendarFeatures {
        match self.overrides.get(date) {
            Some(record) => CalendarFeatures {
                date,
                source: FeatureSource::Overridden,
                gate: record.gate.clone(),
                elements: record.elements,
            },
            None => compute_features(date),
        }
    }
}
