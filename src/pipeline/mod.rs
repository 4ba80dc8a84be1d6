//! One forecast run: merge → train → predict → verify.
//!
//! `today` is supplied by the caller and never re-read from the clock.
//! Rendering and persistence live with the caller (`report`, `scorer::state`).

pub mod merge;

use chrono::NaiveDate;
use serde::Deserialize;

use crate::calendar::CalendarFeatureGenerator;
use crate::error::AppError;
use crate::model::daily::DailyAggregate;
use crate::model::merged::MergedRow;
use crate::scorer::{ModelState, DECISION_THRESHOLD};

pub const DEFAULT_TRAINING_WINDOW: usize = 30;
pub const DEFAULT_MIN_MERGED_ROWS: usize = 2;

/// What to do when the verification day has no market row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerificationPolicy {
    /// Treat the missing day as a down day.
    #[default]
    AssumeDown,
    /// Report the day as unverified.
    Skip,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verification {
    Observed { label: i8 },
    AssumedDown,
    Skipped,
}

impl Verification {
    pub fn actual_label(&self) -> Option<i8> {
        match self {
            Verification::Observed { label } => Some(*label),
            Verification::AssumedDown => Some(-1),
            Verification::Skipped => None,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct PipelineConfig {
    pub training_window: usize,
    pub min_merged_rows: usize,
    pub verification: VerificationPolicy,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            training_window: DEFAULT_TRAINING_WINDOW,
            min_merged_rows: DEFAULT_MIN_MERGED_ROWS,
            verification: VerificationPolicy::default(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Forecast {
    pub today: NaiveDate,
    pub verify_target: NaiveDate,
    pub today_row: MergedRow,
    pub score: f64,
    pub probability: f64,
    pub verification: Verification,
    pub merged_rows: usize,
    pub trained_rows: usize,
}

impl Forecast {
    pub fn predicts_up(&self) -> bool {
        self.probability >= DECISION_THRESHOLD
    }

    /// Today's predicted direction against the prior day's actual label.
    pub fn verdict(&self) -> Option<bool> {
        let actual = self.verification.actual_label()?;
        Some((self.predicts_up() && actual > 0) || (!self.predicts_up() && actual < 0))
    }
}

/// Rows strictly before `today`, last `window` of them, ascending.
pub fn training_window(merged: &[MergedRow], today: NaiveDate, window: usize) -> &[MergedRow] {
    let end = merged.partition_point(|r| r.date() < today);
    let start = end.saturating_sub(window);
    &merged[start..end]
}

/// Sequential online updates over `rows`, each step seeing the previous
/// step's state.
pub fn train(state: &mut ModelState, rows: &[MergedRow]) {
    for row in rows {
        let label = row.direction_label();
        let (p, outcome) = state.train_step(row, label);
        tracing::debug!(
            date = %row.date(),
            label,
            probability = p,
            grad = outcome.grad,
            hit = outcome.hit,
            ema_acc = state.ema_accuracy,
            "Training step"
        );
    }
}

/// Today's scoring row: today's features (merged if present, else freshly
/// generated), with indicator values forward-filled from the latest merged
/// rows up to today.
pub fn forecast_row(
    generator: &CalendarFeatureGenerator,
    merged: &[MergedRow],
    today: NaiveDate,
) -> MergedRow {
    let features = merged
        .iter()
        .find(|r| r.date() == today)
        .map(|r| r.features.clone())
        .unwrap_or_else(|| {
            tracing::info!(%today, "No market row for today, generating features from the date");
            generator.features(today)
        });

    let history = &merged[..merged.partition_point(|r| r.date() <= today)];
    let rsi14 = history.iter().rev().find_map(|r| r.rsi14);
    let rsi_signal = history.last().map(|r| r.rsi_signal).unwrap_or(0);

    MergedRow {
        features,
        return_pct: None,
        rsi14,
        rsi_signal,
    }
}

pub fn verify(
    merged: &[MergedRow],
    target: NaiveDate,
    policy: VerificationPolicy,
) -> Verification {
    match merged.iter().find(|r| r.date() == target) {
        Some(row) => Verification::Observed {
            label: row.direction_label(),
        },
        None => {
            tracing::warn!(%target, ?policy, "No market row for verification day");
            match policy {
                VerificationPolicy::AssumeDown => Verification::AssumedDown,
                VerificationPolicy::Skip => Verification::Skipped,
            }
        }
    }
}

/// Run one forecast. Fails with `InsufficientData` before touching `state`
/// when the merge yields too few rows.
pub fn run_forecast(
    cfg: &PipelineConfig,
    generator: &CalendarFeatureGenerator,
    daily: &[DailyAggregate],
    state: &mut ModelState,
    today: NaiveDate,
) -> Result<Forecast, AppError> {
    let merged = merge::merge_market_days(generator, daily);
    merge::require_rows(&merged, cfg.min_merged_rows)?;
    tracing::info!(
        market_days = daily.len(),
        merged = merged.len(),
        "Merged calendar features with market rows"
    );

    let window = training_window(&merged, today, cfg.training_window);
    train(state, window);
    tracing::info!(
        trained = window.len(),
        days_seen = state.days_seen,
        ema_acc = state.ema_accuracy,
        "Trained over trailing window"
    );

    let today_row = forecast_row(generator, &merged, today);
    let score = state.score(&today_row);
    let probability = crate::scorer::probability(score);

    let verify_target = today.pred_opt().unwrap_or(today);
    let verification = verify(&merged, verify_target, cfg.verification);

    tracing::info!(
        %today,
        score,
        probability,
        gate = ?today_row.gate(),
        rsi_signal = today_row.rsi_signal,
        "Forecast computed"
    );

    Ok(Forecast {
        today,
        verify_target,
        today_row,
        score,
        probability,
        verification,
        merged_rows: merged.len(),
        trained_rows: window.len(),
    })
}
