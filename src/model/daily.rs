use chrono::NaiveDate;

/// Market aggregate for one local calendar day.
#[derive(Debug, Clone, PartialEq)]
pub struct DailyAggregate {
    pub date: NaiveDate,
    pub close: f64,
    /// Fractional change against the previous day's close; undefined on the
    /// first day of the series.
    pub return_pct: Option<f64>,
    pub rsi14: Option<f64>,
    /// One of -1, 0, 1.
    pub rsi_signal: i8,
}
