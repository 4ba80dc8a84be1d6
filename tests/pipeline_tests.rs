use chrono::{Duration, FixedOffset, NaiveDate};

use elemental_forecast::calendar::{
    compute_features, CalendarFeatureGenerator, GateLabel, OverrideTable,
};
use elemental_forecast::error::AppError;
use elemental_forecast::model::daily::DailyAggregate;
use elemental_forecast::model::merged::MergedRow;
use elemental_forecast::pipeline::merge::{inner_join, merge_market_days};
use elemental_forecast::pipeline::{
    forecast_row, run_forecast, training_window, PipelineConfig, Verification,
    VerificationPolicy,
};
use elemental_forecast::report::render_report;
use elemental_forecast::scorer::{gate_adjustment, ModelState};

fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

/// `days` consecutive market rows ending the day before `end_exclusive`,
/// alternating up and down, with RSI defined from the 15th row.
fn market_days(end_exclusive: NaiveDate, days: i64) -> Vec<DailyAggregate> {
    (0..days)
        .map(|i| {
            let date = end_exclusive - Duration::days(days - i);
            let up = i % 2 == 0;
            let rsi14 = if i >= 14 { Some(40.0 + i as f64) } else { None };
            DailyAggregate {
                date,
                close: 100.0 + i as f64,
                return_pct: if i == 0 {
                    None
                } else if up {
                    Some(0.01)
                } else {
                    Some(-0.01)
                },
                rsi14,
                rsi_signal: match rsi14 {
                    Some(v) if v > 55.0 => 1,
                    Some(v) if v < 45.0 => -1,
                    _ => 0,
                },
            }
        })
        .collect()
}

#[test]
/// Only dates present on both sides survive the merge.
fn merge_is_an_inner_join_on_date() {
    let features: Vec<_> = [ymd(2025, 1, 1), ymd(2025, 1, 2), ymd(2025, 1, 3)]
        .into_iter()
        .map(compute_features)
        .collect();
    let mut daily = market_days(ymd(2025, 1, 5), 3); // Jan 2, 3, 4
    daily.reverse();

    let merged = inner_join(&features, &daily);
    let dates: Vec<NaiveDate> = merged.iter().map(|r| r.date()).collect();
    assert_eq!(dates, vec![ymd(2025, 1, 2), ymd(2025, 1, 3)]);
}

#[test]
fn merge_uses_override_features_for_market_days() {
    let csv = "date_kst,gate,wood,fire,earth,metal,water\n2025-01-03,,1,0,0,0,0\n";
    let generator = CalendarFeatureGenerator::new(OverrideTable::parse_csv(csv).unwrap());
    let daily = market_days(ymd(2025, 1, 5), 3);
    let merged = merge_market_days(&generator, &daily);
    assert_eq!(merged.len(), 3);
    let jan3 = merged.iter().find(|r| r.date() == ymd(2025, 1, 3)).unwrap();
    assert!(jan3.features.is_overridden());
    assert_eq!(jan3.elements().wood, 1.0);
}

#[test]
/// Fewer than two merged rows aborts before the state is touched.
fn insufficient_merge_is_fatal_and_leaves_state_alone() {
    let today = ymd(2025, 10, 20);
    let daily = market_days(today, 1);
    let mut state = ModelState::default();
    let before = state.clone();

    let err = run_forecast(
        &PipelineConfig::default(),
        &CalendarFeatureGenerator::default(),
        &daily,
        &mut state,
        today,
    )
    .expect_err("one merged row must fail");

    match err {
        AppError::InsufficientData { rows, required } => {
            assert_eq!(rows, 1);
            assert_eq!(required, 2);
        }
        other => panic!("unexpected error: {}", other),
    }
    assert_eq!(state, before);

    let mut state = ModelState::default();
    assert!(run_forecast(
        &PipelineConfig::default(),
        &CalendarFeatureGenerator::default(),
        &[],
        &mut state,
        today,
    )
    .is_err());
}

#[test]
fn training_window_keeps_latest_rows_before_today() {
    let today = ymd(2025, 10, 20);
    let mut daily = market_days(today, 40);
    // Today's partial row exists too and must not be trained on.
    daily.push(DailyAggregate {
        date: today,
        close: 1.0,
        return_pct: Some(0.5),
        rsi14: Some(70.0),
        rsi_signal: 1,
    });
    let merged = merge_market_days(&CalendarFeatureGenerator::default(), &daily);

    let window = training_window(&merged, today, 30);
    assert_eq!(window.len(), 30);
    assert_eq!(window.first().unwrap().date(), today - Duration::days(30));
    assert_eq!(window.last().unwrap().date(), today - Duration::days(1));
    assert!(window.windows(2).all(|w| w[0].date() < w[1].date()));

    let short = training_window(&merged, today, 100);
    assert_eq!(short.len(), 40);
}

#[test]
/// A run trains sequentially over the window, exactly like calling the
/// scorer by hand in date order.
fn run_matches_manual_sequential_training() {
    let today = ymd(2025, 10, 20);
    let daily = market_days(today, 45);
    let generator = CalendarFeatureGenerator::default();

    let mut state = ModelState::default();
    let forecast = run_forecast(
        &PipelineConfig::default(),
        &generator,
        &daily,
        &mut state,
        today,
    )
    .unwrap();
    assert_eq!(forecast.merged_rows, 45);
    assert_eq!(forecast.trained_rows, 30);
    assert_eq!(state.days_seen, 30);

    let merged = merge_market_days(&generator, &daily);
    let mut manual = ModelState::default();
    for row in &merged[15..] {
        let p = manual.probability(row);
        manual.update(row, p, row.direction_label());
    }
    assert_eq!(state, manual);

    let expected = manual.probability(&forecast.today_row);
    assert_eq!(forecast.probability, expected);
    assert!(forecast.probability > 0.0 && forecast.probability < 1.0);
}

#[test]
/// Without a market row for today, features come straight from the date and
/// the indicator values are carried forward from history.
fn forecast_row_recomputes_features_and_forward_fills_rsi() {
    let today = ymd(2025, 10, 20);
    let mut daily = market_days(today, 20);
    // Latest row lost its RSI; the one before still has it.
    let last = daily.last_mut().unwrap();
    last.rsi14 = None;
    last.rsi_signal = 0;
    let generator = CalendarFeatureGenerator::default();
    let merged = merge_market_days(&generator, &daily);

    let row = forecast_row(&generator, &merged, today);
    assert_eq!(row.features, compute_features(today));
    assert_eq!(row.return_pct, None);
    // i = 18 is the last row with a defined RSI
    assert_eq!(row.rsi14, Some(58.0));
    assert_eq!(row.rsi_signal, 0);
}

#[test]
fn forecast_row_prefers_merged_features_for_today() {
    let today = ymd(2025, 10, 20);
    let csv = "date_kst,gate,wood,fire,earth,metal,water\n2025-10-20,休,0,0,0,0,1\n";
    let generator = CalendarFeatureGenerator::new(OverrideTable::parse_csv(csv).unwrap());
    let daily = market_days(today + Duration::days(1), 5);
    let merged = merge_market_days(&generator, &daily);

    let row: MergedRow = forecast_row(&generator, &merged, today);
    assert!(row.features.is_overridden());
    assert_eq!(row.elements().water, 1.0);
}

#[test]
fn verification_uses_the_previous_day() {
    let today = ymd(2025, 10, 20);
    // Yesterday is i = 9 in a 10-row history: odd index, a down day.
    let daily = market_days(today, 10);
    let mut state = ModelState::default();
    let forecast = run_forecast(
        &PipelineConfig::default(),
        &CalendarFeatureGenerator::default(),
        &daily,
        &mut state,
        today,
    )
    .unwrap();
    assert_eq!(forecast.verify_target, ymd(2025, 10, 19));
    assert_eq!(forecast.verification, Verification::Observed { label: -1 });
    assert_eq!(
        forecast.verdict(),
        Some(!forecast.predicts_up()),
        "down day is a hit only for a down call"
    );
}

#[test]
/// Missing verification data follows the configured policy.
fn missing_verification_day_follows_policy() {
    let today = ymd(2025, 10, 20);
    // History stops two days before today.
    let daily = market_days(today - Duration::days(1), 10);

    let mut state = ModelState::default();
    let assumed = run_forecast(
        &PipelineConfig::default(),
        &CalendarFeatureGenerator::default(),
        &daily,
        &mut state,
        today,
    )
    .unwrap();
    assert_eq!(assumed.verification, Verification::AssumedDown);
    assert_eq!(assumed.verification.actual_label(), Some(-1));

    let cfg = PipelineConfig {
        verification: VerificationPolicy::Skip,
        ..PipelineConfig::default()
    };
    let mut state = ModelState::default();
    let skipped = run_forecast(
        &cfg,
        &CalendarFeatureGenerator::default(),
        &daily,
        &mut state,
        today,
    )
    .unwrap();
    assert_eq!(skipped.verification, Verification::Skipped);
    assert_eq!(skipped.verdict(), None);
}

#[test]
/// An override gate outside the eight symbols loads, scores as zero and is
/// printed as written.
fn unlisted_override_gate_flows_through_to_the_report() {
    let today = ymd(2025, 10, 20);
    let csv = "date_kst,gate,wood,fire,earth,metal,water\n2025-10-20,門,0.2,0.2,0.2,0.2,0.2\n";
    let generator = CalendarFeatureGenerator::new(OverrideTable::parse_csv(csv).unwrap());
    let daily = market_days(today, 20);

    let mut state = ModelState::default();
    let forecast = run_forecast(
        &PipelineConfig::default(),
        &generator,
        &daily,
        &mut state,
        today,
    )
    .unwrap();

    let row = &forecast.today_row;
    assert_eq!(row.gate(), Some(&GateLabel::Unlisted("門".to_string())));
    assert_eq!(gate_adjustment(row.gate()), 0.0);

    let mut no_gate = row.clone();
    no_gate.features.gate = None;
    assert_eq!(forecast.score, state.score(&no_gate));

    let kst = FixedOffset::east_opt(9 * 3600).unwrap();
    let text = render_report(&forecast, &state, "BTCUSDT", kst);
    assert!(text.contains("water 0.20 · gate: 門"));
    assert!(text.contains("Day cycle: (override)"));
}
