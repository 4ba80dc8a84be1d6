use std::collections::BTreeMap;

use chrono::NaiveDate;

use crate::calendar::{CalendarFeatureGenerator, CalendarFeatures};
use crate::error::AppError;
use crate::model::daily::DailyAggregate;
use crate::model::merged::MergedRow;

/// Inner join on date, ascending. Dates present on only one side are dropped;
/// if a side repeats a date, its first row is used.
pub fn inner_join(features: &[CalendarFeatures], daily: &[DailyAggregate]) -> Vec<MergedRow> {
    let mut market: BTreeMap<NaiveDate, &DailyAggregate> = BTreeMap::new();
    for row in daily {
        market.entry(row.date).or_insert(row);
    }
    let mut by_date: BTreeMap<NaiveDate, &CalendarFeatures> = BTreeMap::new();
    for f in features {
        by_date.entry(f.date).or_insert(f);
    }

    by_date
        .into_iter()
        .filter_map(|(date, f)| market.get(&date).map(|m| MergedRow::join(f.clone(), m)))
        .collect()
}

/// Features for every market date, joined with the market rows.
pub fn merge_market_days(
    generator: &CalendarFeatureGenerator,
    daily: &[DailyAggregate],
) -> Vec<MergedRow> {
    let features: Vec<CalendarFeatures> =
        daily.iter().map(|d| generator.features(d.date)).collect();
    inner_join(&features, daily)
}

pub fn require_rows(merged: &[MergedRow], required: usize) -> Result<(), AppError> {
    if merged.len() < required {
        return Err(AppError::InsufficientData {
            rows: merged.len(),
            required,
        });
    }
    Ok(())
}
