//! PairLab CLI: backtest, optimize and data preparation commands.
//!
//! Commands:
//! - `run`: execute a backtest from a TOML config file
//! - `optimize`: backtest every pair on its own and rank by Sharpe
//! - `screen`: full-window cointegration test of every pair
//! - `generate`: write synthetic series into the CSV cache
//! - `convert`: normalize a foreign CSV into the cache format
//! - `validate`: parse and check a config file without running it

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use pairlab_core::data::{
    cointegrated_pair, convert_csv, CsvStore, SyntheticProvider, DEFAULT_TIMEFRAME,
};
use pairlab_core::data::synthetic::DEFAULT_DAYS;
use pairlab_core::engine::{NullObserver, TracingObserver};
use pairlab_runner::{
    export_optimizer_csv, load_series, optimize_pairs, render_optimizer_table, render_report,
    run_from_config, save_artifacts, screen_pairs, BacktestConfig, BacktestResult,
    DataSourceKind, LoadOptions,
};
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser)]
#[command(name = "pairlab", about = "PairLab CLI: cointegration pairs-trading backtester")]
struct Cli {
    /// Log level filter. `RUST_LOG` takes precedence when set.
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    /// Emit logs as JSON lines.
    #[arg(long, global = true, default_value_t = false)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Execute a backtest from a TOML config file.
    Run {
        /// Path to a TOML config file.
        #[arg(long)]
        config: PathBuf,

        /// Generate synthetic data instead of reading the cache.
        #[arg(long, default_value_t = false)]
        synthetic: bool,

        /// Write manifest.json, trades.csv, equity.csv and report.txt here.
        #[arg(long)]
        output_dir: Option<PathBuf>,

        /// Log every engine event (skips at debug, trades at info).
        #[arg(long, default_value_t = false)]
        trace_events: bool,
    },
    /// Backtest every pair of the configured assets and rank by Sharpe.
    Optimize {
        #[arg(long)]
        config: PathBuf,

        #[arg(long, default_value_t = false)]
        synthetic: bool,

        /// Rows to print.
        #[arg(long, default_value_t = 10)]
        top: usize,

        /// Write the full ranking as CSV.
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Test every pair for cointegration over the whole date range.
    Screen {
        #[arg(long)]
        config: PathBuf,

        #[arg(long, default_value_t = false)]
        synthetic: bool,
    },
    /// Write synthetic series into the CSV cache.
    Generate {
        /// Symbols to generate (e.g., BTC/USDT ETH/USDT).
        #[arg(required = true)]
        symbols: Vec<String>,

        /// First date (YYYY-MM-DD).
        #[arg(long, default_value = "2023-01-01")]
        start: String,

        /// Number of calendar days.
        #[arg(long, default_value_t = DEFAULT_DAYS)]
        days: usize,

        /// Link the two symbols: first ≈ hedge_ratio × second + c.
        #[arg(long)]
        hedge_ratio: Option<f64>,

        /// Standard deviation of the stationary link noise.
        #[arg(long, default_value_t = 1.0)]
        noise_sd: f64,

        #[arg(long, default_value = "data/historical")]
        cache_dir: PathBuf,

        #[arg(long, default_value = DEFAULT_TIMEFRAME)]
        timeframe: String,
    },
    /// Normalize a CSV (any date header, epoch or ISO dates) into cache format.
    Convert {
        input: PathBuf,
        output: PathBuf,
    },
    /// Parse and validate a config file.
    Validate {
        #[arg(long)]
        config: PathBuf,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(&cli.log_level, cli.log_json);

    match cli.command {
        Commands::Run {
            config,
            synthetic,
            output_dir,
            trace_events,
        } => run_cmd(&config, synthetic, output_dir.as_deref(), trace_events),
        Commands::Optimize {
            config,
            synthetic,
            top,
            output,
        } => optimize_cmd(&config, synthetic, top, output.as_deref()),
        Commands::Screen { config, synthetic } => screen_cmd(&config, synthetic),
        Commands::Generate {
            symbols,
            start,
            days,
            hedge_ratio,
            noise_sd,
            cache_dir,
            timeframe,
        } => generate_cmd(&symbols, &start, days, hedge_ratio, noise_sd, cache_dir, timeframe),
        Commands::Convert { input, output } => convert_cmd(&input, &output),
        Commands::Validate { config } => validate_cmd(&config),
    }
}

fn init_tracing(level: &str, json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

fn load_config(path: &Path, synthetic: bool) -> Result<BacktestConfig> {
    let mut config = BacktestConfig::from_file(path)
        .with_context(|| format!("loading config {}", path.display()))?;
    if synthetic {
        config.data.source = DataSourceKind::Synthetic;
    }
    Ok(config)
}

fn run_cmd(
    config_path: &Path,
    synthetic: bool,
    output_dir: Option<&Path>,
    trace_events: bool,
) -> Result<()> {
    let config = load_config(config_path, synthetic)?;
    let result = if trace_events {
        run_from_config(&config, &mut TracingObserver)?
    } else {
        run_from_config(&config, &mut NullObserver)?
    };

    print_summary(&result);
    print!("{}", render_report(&result.metrics));

    if let Some(dir) = output_dir {
        let dir = save_artifacts(&result, dir)?;
        println!("Artifacts saved to: {}", dir.display());
    }
    Ok(())
}

fn print_summary(result: &BacktestResult) {
    let period = match (result.start_date, result.end_date) {
        (Some(s), Some(e)) => format!("{s} to {e}"),
        _ => "(no dates)".to_string(),
    };
    println!("Pairs:          {}", result.pairs.len());
    println!("Period:         {period} ({} dates)", result.dates_simulated());
    println!("Config hash:    {}", &result.config_hash[..12]);
    println!("Dataset hash:   {}", result.dataset_hash);
    if result.has_synthetic {
        println!("Data:           SYNTHETIC");
    }
    if !result.excluded_assets.is_empty() {
        println!("Excluded:       {}", result.excluded_assets.join(", "));
    }
    println!(
        "Evaluations:    {} ({} not cointegrated, {} untestable)",
        result.stats.evaluations,
        result.stats.skipped_not_cointegrated,
        result.stats.skipped_untestable
    );
    if !result.open_positions.is_empty() {
        println!("Still open:     {}", result.open_positions.len());
    }

    let risk = &result.risk;
    if let Some(b) = &risk.drawdown_breach {
        println!(
            "Drawdown limit: {:.2}% exceeded on {} ({:.2}%)",
            risk.max_drawdown_limit_pct, b.date, b.drawdown_pct
        );
    }
    if !risk.stop_loss_breaches.is_empty() {
        println!(
            "Stop loss:      {} trades lost more than {:.2}%",
            risk.stop_loss_breaches.len(),
            risk.stop_loss_limit_pct
        );
    }
}

fn optimize_cmd(config_path: &Path, synthetic: bool, top: usize, output: Option<&Path>) -> Result<()> {
    let config = load_config(config_path, synthetic)?;
    let loaded = load_series(&config.backtest.assets, &LoadOptions::from_config(&config))?;

    let mut report = optimize_pairs(&config, &loaded, None);
    if let Some(path) = output {
        std::fs::write(path, export_optimizer_csv(&report)?)
            .with_context(|| format!("failed to write {}", path.display()))?;
        info!(path = %path.display(), "optimizer results saved");
    }

    report.rankings.truncate(top);
    print!("{}", render_optimizer_table(&report));
    Ok(())
}

fn screen_cmd(config_path: &Path, synthetic: bool) -> Result<()> {
    let config = load_config(config_path, synthetic)?;
    let loaded = load_series(&config.backtest.assets, &LoadOptions::from_config(&config))?;
    let screens = screen_pairs(
        &loaded,
        config.cointegration.significance,
        config.cointegration.max_lag,
    );

    println!(
        "{:<24} {:>10} {:>12} {:>10} {:>13}",
        "Pair", "Hedge", "p-value", "Half-life", "Cointegrated"
    );
    println!("{}", "-".repeat(73));
    for s in &screens {
        let p = s
            .p_value
            .map(|p| format!("{p:.6}"))
            .unwrap_or_else(|| "n/a".to_string());
        let hl = s
            .half_life
            .map(|h| format!("{h:.1}"))
            .unwrap_or_else(|| "n/a".to_string());
        println!(
            "{:<24} {:>10.4} {:>12} {:>10} {:>13}",
            s.pair.to_string(),
            s.hedge_ratio,
            p,
            hl,
            if s.cointegrated { "yes" } else { "no" }
        );
    }
    Ok(())
}

fn generate_cmd(
    symbols: &[String],
    start: &str,
    days: usize,
    hedge_ratio: Option<f64>,
    noise_sd: f64,
    cache_dir: PathBuf,
    timeframe: String,
) -> Result<()> {
    let start = NaiveDate::parse_from_str(start, "%Y-%m-%d")
        .with_context(|| format!("invalid start date '{start}'"))?;
    let store = CsvStore::with_timeframe(cache_dir, timeframe);

    let series = match hedge_ratio {
        Some(hedge) => {
            let [a, b] = symbols else {
                bail!("--hedge-ratio links exactly two symbols, got {}", symbols.len());
            };
            let (s1, s2) = cointegrated_pair(a, b, start, days, hedge, noise_sd)?;
            vec![s1, s2]
        }
        None => {
            let provider = SyntheticProvider::default();
            symbols
                .iter()
                .map(|s| provider.generate(s, start, days))
                .collect::<Result<Vec<_>, _>>()?
        }
    };

    for s in &series {
        let path = store.write(s)?;
        println!("{:<12} {} rows -> {}", s.symbol(), s.len(), path.display());
    }
    Ok(())
}

fn convert_cmd(input: &Path, output: &Path) -> Result<()> {
    let summary = convert_csv(input, output)?;
    println!(
        "Converted {} rows to {} ({} duplicate dates dropped)",
        summary.rows_read,
        output.display(),
        summary.duplicates_dropped
    );
    Ok(())
}

fn validate_cmd(config_path: &Path) -> Result<()> {
    let config = load_config(config_path, false)?;
    println!("Config OK: {}", config_path.display());
    println!("  assets:       {}", config.backtest.assets.join(", "));
    println!(
        "  period:       {} to {}",
        config.backtest.start_date, config.backtest.end_date
    );
    println!("  lookback:     {}", config.cointegration.lookback);
    println!(
        "  thresholds:   entry {} / exit {}",
        config.signals.entry_threshold, config.signals.exit_threshold
    );
    println!("  hash:         {}", config.config_hash());
    Ok(())
}
