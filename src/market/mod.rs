pub mod aggregate;
pub mod binance;

use anyhow::Result;
use chrono::{DateTime, Duration, FixedOffset, NaiveDate, Utc};

use crate::model::daily::DailyAggregate;

use aggregate::{aggregate_daily, AggregateConfig};
use binance::BinanceRestClient;

/// Extra days fetched beyond the requested history so the first local day
/// is complete after the UTC→local shift.
pub const HISTORY_PADDING_DAYS: i64 = 2;

/// Anything that can hand the pipeline daily aggregate rows in date order,
/// using only market data up to `until`.
pub trait MarketAggregateSource {
    fn daily_aggregates(&self, until: DateTime<Utc>) -> Result<Vec<DailyAggregate>>;
}

/// Last millisecond of the local day `today`, never later than `now`. A
/// run pinned to a past date only sees data up to that day.
pub fn fetch_end(today: NaiveDate, offset: FixedOffset, now: DateTime<Utc>) -> DateTime<Utc> {
    let next_midnight = today
        .succ_opt()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .and_then(|local| local.and_local_timezone(offset).single());
    match next_midnight {
        Some(t) => (t.with_timezone(&Utc) - Duration::milliseconds(1)).min(now),
        None => now,
    }
}

/// Hourly Binance klines re-aggregated to local calendar days.
pub struct BinanceDailySource {
    client: BinanceRestClient,
    symbol: String,
    interval: String,
    history_days: i64,
    aggregate: AggregateConfig,
}

impl BinanceDailySource {
    pub fn new(
        client: BinanceRestClient,
        symbol: &str,
        interval: &str,
        history_days: i64,
        aggregate: AggregateConfig,
    ) -> Self {
        Self {
            client,
            symbol: symbol.to_string(),
            interval: interval.to_string(),
            history_days,
            aggregate,
        }
    }
}

impl BinanceDailySource {
    /// Candle window ending at `until`, padded for the local-day shift.
    pub fn window(&self, until: DateTime<Utc>) -> (DateTime<Utc>, DateTime<Utc>) {
        let days = self.history_days + HISTORY_PADDING_DAYS;
        (until - Duration::days(days), until)
    }
}

impl MarketAggregateSource for BinanceDailySource {
    fn daily_aggregates(&self, until: DateTime<Utc>) -> Result<Vec<DailyAggregate>> {
        let (start, end) = self.window(until);
        let candles = self
            .client
            .fetch_klines_range(&self.symbol, &self.interval, start, end)?;
        let daily = aggregate_daily(&candles, &self.aggregate);
        tracing::info!(
            symbol = %self.symbol,
            candles = candles.len(),
            days = daily.len(),
            "Aggregated daily market rows"
        );
        Ok(daily)
    }
}
