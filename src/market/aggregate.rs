use std::collections::BTreeMap;

use chrono::{DateTime, FixedOffset, NaiveDate, Utc};

use crate::indicator::rsi::{rsi_signal, RollingRsi};
use crate::model::candle::Candle;
use crate::model::daily::DailyAggregate;

#[derive(Debug, Clone, Copy)]
pub struct AggregateConfig {
    pub offset: FixedOffset,
    pub rsi_period: usize,
    pub rsi_lower: f64,
    pub rsi_upper: f64,
}

/// Local calendar date of a UTC millisecond timestamp.
pub fn local_date(timestamp_ms: i64, offset: FixedOffset) -> Option<NaiveDate> {
    DateTime::<Utc>::from_timestamp_millis(timestamp_ms)
        .map(|utc| utc.with_timezone(&offset).date_naive())
}

/// Re-aggregate hourly candles into local-calendar daily rows.
///
/// A day's close is the close of its last candle by open time. Days without
/// any candle do not appear; the return and RSI run over the rows that do.
pub fn aggregate_daily(candles: &[Candle], cfg: &AggregateConfig) -> Vec<DailyAggregate> {
    let mut sorted: Vec<&Candle> = candles.iter().collect();
    sorted.sort_by_key(|c| c.open_time);

    let mut closes: BTreeMap<NaiveDate, f64> = BTreeMap::new();
    for candle in sorted {
        match local_date(candle.open_time, cfg.offset) {
            Some(date) => {
                closes.insert(date, candle.close);
            }
            None => {
                tracing::warn!(
                    open_time = candle.open_time,
                    "Skipping candle with out-of-range timestamp"
                );
            }
        }
    }

    let mut rsi = RollingRsi::new(cfg.rsi_period);
    let mut prev_close: Option<f64> = None;
    let mut out = Vec::with_capacity(closes.len());
    for (date, close) in closes {
        let return_pct = prev_close.map(|prev| close / prev - 1.0);
        prev_close = Some(close);
        let rsi14 = rsi.push(close);
        out.push(DailyAggregate {
            date,
            close,
            return_pct,
            rsi14,
            rsi_signal: rsi_signal(rsi14, cfg.rsi_lower, cfg.rsi_upper),
        });
    }
    out
}
