use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{FixedOffset, NaiveDate};

use crate::model::element::Element;
use crate::pipeline::{Forecast, Verification};
use crate::scorer::ModelState;

/// Fixed-format daily report. Every numeric field has a fixed number of
/// decimals so consecutive reports diff cleanly.
pub fn render_report(
    forecast: &Forecast,
    state: &ModelState,
    symbol: &str,
    offset: FixedOffset,
) -> String {
    let zone = format!("UTC{}", offset);
    let row = &forecast.today_row;
    let e = row.elements();

    let gate = row.gate().map(|g| g.to_string()).unwrap_or_default();
    let rsi = row
        .rsi14
        .map(|v| format!("{:.1}", v))
        .unwrap_or_else(|| "nan".to_string());

    let predicted = direction_word(forecast.predicts_up());
    let previous = match forecast.verification {
        Verification::Observed { label } => format!(
            "{} -> {}",
            direction_word(label > 0),
            verdict_word(forecast.verdict())
        ),
        Verification::AssumedDown => format!(
            "{} (assumed, no data) -> {}",
            direction_word(false),
            verdict_word(forecast.verdict())
        ),
        Verification::Skipped => format!("no data -> {}", verdict_word(None)),
    };

    let weights = Element::ALL
        .iter()
        .map(|el| format!("{}{:+.2}", el, state.weights.get(*el)))
        .collect::<Vec<_>>()
        .join(" ");

    let lines = [
        format!("[{} elemental daily report] {} ({})", symbol, forecast.today, zone),
        format!("Forecast target: {}", forecast.today),
        format!("Verification target: {}", forecast.verify_target),
        format!("Day cycle: {}", row.features.cyclic_pair_code()),
        format!(
            "Elements: wood {:.2} fire {:.2} earth {:.2} metal {:.2} water {:.2} · gate: {}",
            e.wood, e.fire, e.earth, e.metal, e.water, gate
        ),
        format!("RSI14: {} · signal: {}", rsi, row.rsi_signal),
        format!(
            "Forecast: {} (probability {:.1}%)",
            predicted,
            forecast.probability * 100.0
        ),
        format!("Previous day: {}", previous),
        format!("EMA accuracy: {:.1}%", state.ema_accuracy * 100.0),
        format!(
            "Weights: {} · bias:{:+.2} · lr:{}",
            weights, state.bias, state.learning_rate
        ),
        format!("Day boundary: local 00:00-24:00 ({})", zone),
    ];
    lines.join("\n")
}

fn direction_word(up: bool) -> &'static str {
    if up {
        "UP"
    } else {
        "DOWN"
    }
}

fn verdict_word(verdict: Option<bool>) -> &'static str {
    match verdict {
        Some(true) => "HIT",
        Some(false) => "MISS",
        None => "SKIPPED",
    }
}

pub fn report_path(dir: &Path, date: NaiveDate) -> PathBuf {
    dir.join(format!("report_{}.txt", date))
}

pub fn write_report(dir: &Path, date: NaiveDate, text: &str) -> Result<PathBuf> {
    std::fs::create_dir_all(dir).with_context(|| format!("failed to create {}", dir.display()))?;
    let path = report_path(dir, date);
    std::fs::write(&path, text).with_context(|| format!("failed to write {}", path.display()))?;
    tracing::info!(path = %path.display(), "Wrote report");
    Ok(path)
}
