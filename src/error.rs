use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("binance API error (code {code}): {msg}")]
    BinanceApi { code: i64, msg: String },

    #[error("market source returned no candles for {symbol}")]
    EmptyMarketData { symbol: String },

    #[error("insufficient merged data: {rows} row(s), need at least {required}")]
    InsufficientData { rows: usize, required: usize },

    #[error("override table line {line}: {msg}")]
    Override { line: usize, msg: String },
}
