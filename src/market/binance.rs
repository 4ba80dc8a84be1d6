use std::time::Duration;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::Value;

use crate::error::AppError;
use crate::model::candle::Candle;

pub const KLINES_PAGE_LIMIT: usize = 1000;
const PAGE_PAUSE: Duration = Duration::from_millis(50);
const HTTP_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Deserialize)]
pub struct BinanceApiErrorResponse {
    pub code: i64,
    pub msg: String,
}

/// Public market-data client. No keys, no signing.
pub struct BinanceRestClient {
    http: reqwest::blocking::Client,
    base_url: String,
}

impl BinanceRestClient {
    pub fn new(base_url: &str) -> Result<Self> {
        let http = reqwest::blocking::Client::builder()
            .timeout(HTTP_TIMEOUT)
            .build()
            .context("failed to build HTTP client")?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn get_klines_page(
        &self,
        symbol: &str,
        interval: &str,
        start_ms: Option<i64>,
        end_ms: Option<i64>,
        limit: usize,
    ) -> Result<Vec<Candle>> {
        let url = format!("{}/api/v3/klines", self.base_url);
        let limit_s = limit.clamp(1, KLINES_PAGE_LIMIT).to_string();
        let mut request = self.http.get(&url).query(&[
            ("symbol", symbol),
            ("interval", interval),
            ("limit", limit_s.as_str()),
        ]);
        if let Some(start) = start_ms {
            request = request.query(&[("startTime", start)]);
        }
        if let Some(end) = end_ms {
            request = request.query(&[("endTime", end)]);
        }

        let resp = request.send().context("get_klines HTTP failed")?;
        if !resp.status().is_success() {
            let body = resp.text().unwrap_or_default();
            if let Ok(err) = serde_json::from_str::<BinanceApiErrorResponse>(&body) {
                return Err(AppError::BinanceApi {
                    code: err.code,
                    msg: err.msg,
                }
                .into());
            }
            return Err(anyhow::anyhow!("Klines request failed: {}", body));
        }

        let rows: Vec<Value> = resp.json().context("get_klines JSON parse failed")?;
        rows.iter().map(Candle::from_kline_row).collect()
    }

    /// Fetch every candle opening in `[start, end]`. An empty result is fatal.
    pub fn fetch_klines_range(
        &self,
        symbol: &str,
        interval: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Candle>> {
        let end_ms = end.timestamp_millis();
        let mut candles = page_klines(
            start.timestamp_millis(),
            end_ms,
            KLINES_PAGE_LIMIT,
            PAGE_PAUSE,
            |cursor| {
                let page = self.get_klines_page(
                    symbol,
                    interval,
                    Some(cursor),
                    Some(end_ms),
                    KLINES_PAGE_LIMIT,
                )?;
                tracing::debug!(symbol, page_len = page.len(), cursor, "Fetched klines page");
                Ok(page)
            },
        )?;

        if candles.is_empty() {
            return Err(AppError::EmptyMarketData {
                symbol: symbol.to_string(),
            }
            .into());
        }
        candles.sort_by_key(|c| c.open_time);
        tracing::info!(symbol, count = candles.len(), "Fetched historical klines");
        Ok(candles)
    }
}

/// Page forward from `start_ms`. Stops on an empty or short page, or once the
/// last candle closes at or after `end_ms`; the next page starts one
/// millisecond after the previous page's last close.
pub fn page_klines<F>(
    start_ms: i64,
    end_ms: i64,
    page_limit: usize,
    pause: Duration,
    mut fetch_page: F,
) -> Result<Vec<Candle>>
where
    F: FnMut(i64) -> Result<Vec<Candle>>,
{
    let mut cursor = start_ms;
    let mut candles: Vec<Candle> = Vec::new();

    loop {
        let page = fetch_page(cursor)?;
        let Some(last) = page.last() else {
            break;
        };
        let last_close = last.close_time;
        let page_len = page.len();
        candles.extend(page);

        if last_close >= end_ms || page_len < page_limit {
            break;
        }
        cursor = last_close + 1;
        if !pause.is_zero() {
            std::thread::sleep(pause);
        }
    }
    Ok(candles)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trims_trailing_slash_from_base_url() {
        let client = BinanceRestClient::new("https://api.binance.com/").unwrap();
        assert_eq!(client.base_url, "https://api.binance.com");
    }

    const HOUR_MS: i64 = 3_600_000;

    fn hourly(open_times: impl IntoIterator<Item = i64>) -> Vec<Candle> {
        open_times
            .into_iter()
            .map(|t| Candle {
                open: 1.0,
                high: 1.0,
                low: 1.0,
                close: 1.0,
                volume: 1.0,
                open_time: t,
                close_time: t + HOUR_MS - 1,
            })
            .collect()
    }

    #[test]
    fn paging_advances_past_last_close_and_stops_on_short_page() {
        let mut cursors = Vec::new();
        let candles = page_klines(0, 100 * HOUR_MS, 3, Duration::ZERO, |cursor| {
            cursors.push(cursor);
            let first = cursor / HOUR_MS;
            let len = if cursors.len() < 3 { 3 } else { 2 };
            Ok(hourly((first..first + len).map(|h| h * HOUR_MS)))
        })
        .unwrap();

        assert_eq!(cursors, vec![0, 3 * HOUR_MS, 6 * HOUR_MS]);
        assert_eq!(candles.len(), 8);
        assert_eq!(candles.last().unwrap().open_time, 7 * HOUR_MS);
    }

    #[test]
    fn paging_stops_once_window_end_is_reached() {
        let mut calls = 0;
        let candles = page_klines(0, 2 * HOUR_MS, 3, Duration::ZERO, |cursor| {
            calls += 1;
            let first = cursor / HOUR_MS;
            Ok(hourly((first..first + 3).map(|h| h * HOUR_MS)))
        })
        .unwrap();
        // Full page, but its last candle closes after the window end.
        assert_eq!(calls, 1);
        assert_eq!(candles.len(), 3);
    }

    #[test]
    fn paging_stops_on_empty_page_and_propagates_errors() {
        let candles = page_klines(0, HOUR_MS, 3, Duration::ZERO, |_| Ok(Vec::new())).unwrap();
        assert!(candles.is_empty());

        let err = page_klines(0, HOUR_MS, 3, Duration::ZERO, |_| {
            Err(anyhow::anyhow!("boom"))
        });
        assert!(err.is_err());
    }

    #[test]
    fn parses_api_error_body() {
        let body = r#"{"code":-1121,"msg":"Invalid symbol."}"#;
        let err: BinanceApiErrorResponse = serde_json::from_str(body).unwrap();
        assert_eq!(err.code, -1121);
        assert_eq!(err.msg, "Invalid symbol.");
    }
}
