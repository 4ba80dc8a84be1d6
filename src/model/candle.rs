use anyhow::{anyhow, Context, Result};
use serde_json::Value;

/// One hourly kline as returned by the exchange, times in UTC milliseconds.
#[derive(Debug, Clone, PartialEq)]
pub struct Candle {
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
    pub open_time: i64,
    pub close_time: i64,
}

impl Candle {
    /// Parse a Binance kline row:
    /// `[openTime, "open", "high", "low", "close", "volume", closeTime, ...]`.
    pub fn from_kline_row(row: &Value) -> Result<Self> {
        let fields = row
            .as_array()
            .ok_or_else(|| anyhow!("kline row is not an array"))?;
        if fields.len() < 7 {
            return Err(anyhow!("kline row has {} fields, expected >= 7", fields.len()));
        }
        Ok(Self {
            open_time: int_field(&fields[0]).context("kline open time")?,
            open: num_field(&fields[1]).context("kline open")?,
            high: num_field(&fields[2]).context("kline high")?,
            low: num_field(&fields[3]).context("kline low")?,
            close: num_field(&fields[4]).context("kline close")?,
            volume: num_field(&fields[5]).context("kline volume")?,
            close_time: int_field(&fields[6]).context("kline close time")?,
        })
    }
}

fn int_field(v: &Value) -> Result<i64> {
    v.as_i64()
        .ok_or_else(|| anyhow!("expected integer, found {}", v))
}

/// Binance encodes prices as strings; accept plain numbers too.
fn num_field(v: &Value) -> Result<f64> {
    match v {
        Value::String(s) => s
            .parse::<f64>()
            .with_context(|| format!("invalid numeric string '{}'", s)),
        Value::Number(n) => n.as_f64().ok_or_else(|| anyhow!("invalid number")),
        _ => Err(anyhow!("invalid numeric value {}", v)),
    }
}
