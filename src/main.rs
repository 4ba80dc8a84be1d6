use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::{NaiveDate, Utc};
use clap::Parser;

use elemental_forecast::calendar::{CalendarFeatureGenerator, OverrideTable};
use elemental_forecast::config::{Config, DEFAULT_CONFIG_PATH};
use elemental_forecast::market::binance::BinanceRestClient;
use elemental_forecast::market::{fetch_end, BinanceDailySource, MarketAggregateSource};
use elemental_forecast::pipeline::run_forecast;
use elemental_forecast::report::{render_report, write_report};
use elemental_forecast::scorer::state::{load_or_default, persist_model_state_to_path};

#[derive(Parser)]
#[command(name = "elemental-forecast")]
#[command(about = "Daily direction forecast from calendar elements and an online scorer")]
struct Cli {
    /// Config file path
    #[arg(short, long, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Forecast date (YYYY-MM-DD) in the local calendar; defaults to today
    #[arg(long)]
    date: Option<NaiveDate>,

    /// Print the report without writing it or the model state
    #[arg(long)]
    no_persist: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = match Config::load_from(&cli.config) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load config: {:#}", e);
            std::process::exit(1);
        }
    };

    // Log to file so stdout carries only the report
    let log_file = std::fs::File::create(&config.logging.file)
        .with_context(|| format!("failed to create {}", config.logging.file.display()))?;
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                tracing_subscriber::EnvFilter::new(config.logging.level.as_str())
            }),
        )
        .with_writer(log_file)
        .with_ansi(false)
        .json()
        .init();

    // The only clock read of the run.
    let now = Utc::now();
    let offset = config.calendar.offset()?;
    let today = cli
        .date
        .unwrap_or_else(|| now.with_timezone(&offset).date_naive());

    tracing::info!(
        symbol = %config.binance.symbol,
        rest_url = %config.binance.rest_base_url,
        %today,
        %offset,
        "Starting elemental-forecast"
    );

    let overrides = OverrideTable::load(&config.calendar.overrides_path)?;
    let generator = CalendarFeatureGenerator::new(overrides);

    let client = BinanceRestClient::new(&config.binance.rest_base_url)?;
    let source = BinanceDailySource::new(
        client,
        &config.binance.symbol,
        &config.binance.kline_interval,
        config.binance.history_days,
        config.calendar.aggregate_config()?,
    );
    let until = fetch_end(today, offset, now);
    tracing::info!(%until, "Market data window end");
    let daily = source
        .daily_aggregates(until)
        .context("failed to load daily market aggregates")?;

    let mut state = load_or_default(
        &config.model.state_path,
        config.model.learning_rate,
        config.model.ema_alpha,
    )?;

    let forecast = run_forecast(
        &config.pipeline.pipeline_config(),
        &generator,
        &daily,
        &mut state,
        today,
    )?;

    let text = render_report(&forecast, &state, &config.binance.symbol, offset);
    if cli.no_persist {
        tracing::info!("Persistence disabled, skipping report and state writes");
    } else {
        write_report(&config.report.out_dir, today, &text)?;
        persist_model_state_to_path(&config.model.state_path, &state)?;
    }
    println!("{}", text);

    tracing::info!(
        probability = forecast.probability,
        trained = forecast.trained_rows,
        "Run complete"
    );
    Ok(())
}
