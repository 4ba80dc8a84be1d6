use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use chrono::FixedOffset;
use serde::Deserialize;

use crate::indicator::rsi::{RSI_LOWER, RSI_PERIOD, RSI_UPPER};
use crate::market::aggregate::AggregateConfig;
use crate::pipeline::{
    PipelineConfig, VerificationPolicy, DEFAULT_MIN_MERGED_ROWS, DEFAULT_TRAINING_WINDOW,
};
use crate::scorer::state::{DEFAULT_EMA_ALPHA, DEFAULT_LEARNING_RATE};

pub const DEFAULT_CONFIG_PATH: &str = "config/default.toml";

const HOUR_MS: u64 = 3_600_000;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub binance: BinanceConfig,
    #[serde(default)]
    pub calendar: CalendarConfig,
    #[serde(default)]
    pub model: ModelConfig,
    #[serde(default)]
    pub pipeline: PipelineSection,
    #[serde(default)]
    pub report: ReportConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BinanceConfig {
    pub rest_base_url: String,
    pub symbol: String,
    pub kline_interval: String,
    pub history_days: i64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CalendarConfig {
    /// Offset from UTC, in hours, that defines the local trading day.
    pub utc_offset_hours: i32,
    pub overrides_path: PathBuf,
    pub rsi_period: usize,
    pub rsi_lower: f64,
    pub rsi_upper: f64,
}

impl Default for CalendarConfig {
    fn default() -> Self {
        Self {
            utc_offset_hours: 9,
            overrides_path: PathBuf::from("pillars_overrides.csv"),
            rsi_period: RSI_PERIOD,
            rsi_lower: RSI_LOWER,
            rsi_upper: RSI_UPPER,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    pub state_path: PathBuf,
    /// Only used when no snapshot exists yet.
    pub learning_rate: f64,
    /// Only used when no snapshot exists yet.
    pub ema_alpha: f64,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            state_path: PathBuf::from("data/state.json"),
            learning_rate: DEFAULT_LEARNING_RATE,
            ema_alpha: DEFAULT_EMA_ALPHA,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PipelineSection {
    pub training_window: usize,
    pub min_merged_rows: usize,
    pub verification_policy: VerificationPolicy,
}

impl Default for PipelineSection {
    fn default() -> Self {
        Self {
            training_window: DEFAULT_TRAINING_WINDOW,
            min_merged_rows: DEFAULT_MIN_MERGED_ROWS,
            verification_policy: VerificationPolicy::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    pub out_dir: PathBuf,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            out_dir: PathBuf::from("reports"),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub file: PathBuf,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: PathBuf::from("elemental-forecast.log"),
        }
    }
}

/// Parse a Binance kline interval string (e.g. "1s", "1m", "1h", "1d", "1w", "1M") into milliseconds.
pub fn parse_interval_ms(s: &str) -> Result<u64> {
    if s.len() < 2 {
        bail!("invalid interval '{}': expected format like '1h'", s);
    }

    let (num_str, suffix) = s.split_at(s.len() - 1);
    let n: u64 = num_str.parse().with_context(|| {
        format!(
            "invalid interval '{}': quantity must be a positive integer",
            s
        )
    })?;
    if n == 0 {
        bail!("invalid interval '{}': quantity must be > 0", s);
    }

    let unit_ms = match suffix {
        "s" => 1_000,
        "m" => 60_000,
        "h" => 3_600_000,
        "d" => 86_400_000,
        "w" => 7 * 86_400_000,
        "M" => 30 * 86_400_000,
        _ => bail!(
            "invalid interval '{}': unsupported suffix '{}', expected one of s/m/h/d/w/M",
            s,
            suffix
        ),
    };

    n.checked_mul(unit_ms)
        .with_context(|| format!("invalid interval '{}': value is too large", s))
}

impl CalendarConfig {
    pub fn offset(&self) -> Result<FixedOffset> {
        FixedOffset::east_opt(self.utc_offset_hours * 3600).with_context(|| {
            format!(
                "calendar.utc_offset_hours {} is out of range",
                self.utc_offset_hours
            )
        })
    }

    pub fn aggregate_config(&self) -> Result<AggregateConfig> {
        Ok(AggregateConfig {
            offset: self.offset()?,
            rsi_period: self.rsi_period,
            rsi_lower: self.rsi_lower,
            rsi_upper: self.rsi_upper,
        })
    }
}

impl PipelineSection {
    pub fn pipeline_config(&self) -> PipelineConfig {
        PipelineConfig {
            training_window: self.training_window,
            min_merged_rows: self.min_merged_rows,
            verification: self.verification_policy,
        }
    }
}

impl Config {
    pub fn load_from(config_path: &Path) -> Result<Self> {
        dotenvy::dotenv().ok();

        let config_str = std::fs::read_to_string(config_path)
            .with_context(|| format!("failed to read {}", config_path.display()))?;
        let mut config = Self::from_toml_str(&config_str)
            .with_context(|| format!("failed to parse {}", config_path.display()))?;

        if let Ok(path) = std::env::var("FORECAST_STATE_PATH") {
            config.model.state_path = PathBuf::from(path);
        }
        if let Ok(path) = std::env::var("FORECAST_OVERRIDES_PATH") {
            config.calendar.overrides_path = PathBuf::from(path);
        }

        Ok(config)
    }

    /// Parse and validate without touching the environment.
    pub fn from_toml_str(config_str: &str) -> Result<Self> {
        let config: Config = toml::from_str(config_str).context("invalid config toml")?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        let interval_ms = parse_interval_ms(&self.binance.kline_interval)
            .context("binance.kline_interval is invalid")?;
        // Candles must not straddle a local midnight.
        if HOUR_MS % interval_ms != 0 {
            bail!(
                "binance.kline_interval '{}' must evenly divide one hour",
                self.binance.kline_interval
            );
        }
        if self.binance.history_days <= 0 {
            bail!("binance.history_days must be > 0");
        }
        self.calendar.offset()?;
        if self.calendar.rsi_period == 0 {
            bail!("calendar.rsi_period must be > 0");
        }
        if self.calendar.rsi_lower > self.calendar.rsi_upper {
            bail!("calendar.rsi_lower must not exceed calendar.rsi_upper");
        }
        if !(self.model.ema_alpha > 0.0 && self.model.ema_alpha < 1.0) {
            bail!("model.ema_alpha must be in (0, 1)");
        }
        if self.pipeline.min_merged_rows < DEFAULT_MIN_MERGED_ROWS {
            bail!(
                "pipeline.min_merged_rows must be >= {}",
                DEFAULT_MIN_MERGED_ROWS
            );
        }
        if self.pipeline.training_window == 0 {
            bail!("pipeline.training_window must be > 0");
        }
        Ok(())
    }
}
