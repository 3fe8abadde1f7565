//! Moonshot CLI: earnings coverage, micro-cap screen and CSV report commands.
//!
//! Commands:
//! - `earnings`: fetch earnings events per ticker and report quarter coverage
//! - `screen`: screen Polygon grouped daily bars for liquid, volatile small caps
//! - `grid-summary`: summarize a parameter-sweep CSV into Markdown tables
//! - `calibration`: compare StockTwits and Reddit sentiment per ticker-day
//!
//! Exit codes: 0 on success, 1 for configuration or validation errors, 2 when
//! a fetch fails past its retry budget.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::Result;
use chrono::{Duration, Local, NaiveDate};
use clap::{Parser, Subcommand, ValueEnum};
use moonshot_analysis::calibration::{summarize_file, DEFAULT_CALIBRATION_PATH};
use moonshot_analysis::coverage::{
    render_coverage_table, render_sample_events, summarize_events, CoverageSummary,
    SAMPLE_EVENTS,
};
use moonshot_analysis::grid::{load_grid, summarize_grid, PromotedSet};
use moonshot_analysis::reporting::{write_csv_rows, write_text};
use moonshot_analysis::screen::{
    render_screen_table, run_screen, ScreenParams, SCREEN_CSV_HEADER,
};
use moonshot_analysis::MoonshotConfig;
use moonshot_core::data::{
    fetch_batch, EarningsSource, FetchError, FinnhubClient, PagedFetcher, PolygonClient,
    ReqwestTransport, RetryPolicy, StderrProgress,
};
use moonshot_core::domain::DateRange;
use moonshot_core::validate::{credential_from_env, parse_date, parse_tickers};
use moonshot_core::ConfigError;
use tracing::{debug, warn};

/// Default earnings lookback (about 18 months).
const DEFAULT_LOOKBACK_DAYS: i64 = 540;

const POLYGON_KEY_VARS: &[&str] = &["POLYGON_API_KEY"];
const FINNHUB_KEY_VARS: &[&str] = &["FINNHUB_API_KEY", "FINNHUB_TOKEN"];

#[derive(Parser)]
#[command(
    name = "moonshot",
    about = "Moonshot CLI: earnings coverage, micro-cap screening and research reports"
)]
struct Cli {
    /// TOML config file with [fetch], [polygon] and [finnhub] sections.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log filter used when RUST_LOG is unset (e.g. info, moonshot_core=debug).
    #[arg(long, global = true, default_value = "warn")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum ProviderArg {
    Polygon,
    Finnhub,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch earnings events and report coverage stats for a ticker set.
    Earnings {
        /// Comma-separated symbols.
        #[arg(long, default_value = "AAPL,MSFT,NVDA,TSLA")]
        tickers: String,

        /// Start date (YYYY-MM-DD), inclusive. Defaults to 540 days ago.
        #[arg(long)]
        start: Option<String>,

        /// End date (YYYY-MM-DD), inclusive. Defaults to today.
        #[arg(long)]
        end: Option<String>,

        /// Delay between paginated requests in seconds. Defaults to 0.25.
        #[arg(long)]
        sleep: Option<f64>,

        /// Data provider to query.
        #[arg(long, value_enum, default_value_t = ProviderArg::Polygon)]
        provider: ProviderArg,

        /// Print progress and the first few raw events per symbol.
        #[arg(long, default_value_t = false)]
        verbose: bool,
    },
    /// Screen micro/meme-cap stocks using Polygon grouped daily bars.
    Screen {
        /// Trading days with data to average.
        #[arg(long, default_value_t = 20)]
        days: usize,

        /// Minimum average dollar volume.
        #[arg(long, default_value_t = 5e6)]
        adv_min: f64,

        /// Maximum average dollar volume.
        #[arg(long, default_value_t = 1.5e8)]
        adv_max: f64,

        /// Minimum last close.
        #[arg(long, default_value_t = 1.0)]
        price_min: f64,

        /// Maximum last close.
        #[arg(long, default_value_t = 20.0)]
        price_max: f64,

        /// Rows to display.
        #[arg(long, default_value_t = 25)]
        limit: usize,

        /// Minimum observations per symbol.
        #[arg(long, default_value_t = 10)]
        min_days: usize,

        /// Delay between API calls in seconds. Defaults to 0.25.
        #[arg(long)]
        sleep: Option<f64>,

        /// Optional CSV path to write results.
        #[arg(long)]
        output: Option<PathBuf>,

        /// Print per-day fetch progress.
        #[arg(long, default_value_t = false)]
        verbose: bool,
    },
    /// Summarize a backtest grid CSV into Markdown tables.
    GridSummary {
        /// Grid CSV exported from the sweep.
        #[arg(long)]
        input: PathBuf,

        /// Also write the Markdown report here.
        #[arg(long)]
        output: Option<PathBuf>,

        /// Directory for chart-ready CSV series.
        #[arg(long)]
        plots: Option<PathBuf>,

        /// CSV of promoted pockets (symbol,horizon,side,min_mentions,pos_thresh).
        #[arg(long)]
        promoted: Option<PathBuf>,
    },
    /// Summarize StockTwits vs Reddit sentiment calibration.
    Calibration {
        /// Calibration CSV export.
        #[arg(default_value = DEFAULT_CALIBRATION_PATH)]
        path: PathBuf,
    },
}

fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_logging(&cli.log_level);

    match run(cli) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("Error: {err:#}");
            ExitCode::from(exit_code(&err))
        }
    }
}

fn init_logging(level: &str) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .or_else(|_| tracing_subscriber::EnvFilter::try_new(level))
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Fetch failures are 2; configuration and everything else is 1.
fn exit_code(err: &anyhow::Error) -> u8 {
    if err.downcast_ref::<FetchError>().is_some() {
        2
    } else {
        1
    }
}

fn run(cli: Cli) -> Result<ExitCode> {
    let config = load_config(cli.config.as_deref())?;
    debug!(?config, "configuration loaded");

    match cli.command {
        Commands::Earnings {
            tickers,
            start,
            end,
            sleep,
            provider,
            verbose,
        } => run_earnings(&config, &tickers, start, end, sleep, provider, verbose),
        Commands::Screen {
            days,
            adv_min,
            adv_max,
            price_min,
            price_max,
            limit,
            min_days,
            sleep,
            output,
            verbose,
        } => {
            let params = ScreenParams {
                days,
                adv_min,
                adv_max,
                price_min,
                price_max,
                limit,
                min_days,
            };
            run_screen_cmd(&config, &params, sleep, output.as_deref(), verbose)
        }
        Commands::GridSummary {
            input,
            output,
            plots,
            promoted,
        } => run_grid_summary(&input, output.as_deref(), plots.as_deref(), promoted.as_deref()),
        Commands::Calibration { path } => run_calibration(&path),
    }
}

fn load_config(path: Option<&Path>) -> Result<MoonshotConfig, ConfigError> {
    match path {
        Some(path) => MoonshotConfig::from_file(path),
        None => Ok(MoonshotConfig::default()),
    }
}

fn resolve_range(
    start: Option<&str>,
    end: Option<&str>,
    today: NaiveDate,
) -> Result<DateRange, ConfigError> {
    let start = match start {
        Some(s) => parse_date(s)?,
        None => today - Duration::days(DEFAULT_LOOKBACK_DAYS),
    };
    let end = match end {
        Some(s) => parse_date(s)?,
        None => today,
    };
    DateRange::new(start, end)
}

fn polygon_client(config: &MoonshotConfig, policy: RetryPolicy, api_key: String) -> Result<PolygonClient> {
    let transport = ReqwestTransport::new(&config.http_settings()?)?;
    let client = PolygonClient::new(PagedFetcher::new(transport, policy), api_key, config.polygon.auth);
    Ok(match &config.polygon.base_url {
        Some(base) => client.with_base_url(base.as_str()),
        None => client,
    })
}

fn finnhub_client(config: &MoonshotConfig, policy: RetryPolicy, api_key: String) -> Result<FinnhubClient> {
    let transport = ReqwestTransport::new(&config.http_settings()?)?;
    let client = FinnhubClient::new(PagedFetcher::new(transport, policy), api_key, config.finnhub.auth);
    Ok(match &config.finnhub.base_url {
        Some(base) => client.with_base_url(base.as_str()),
        None => client,
    })
}

fn run_earnings(
    config: &MoonshotConfig,
    tickers: &str,
    start: Option<String>,
    end: Option<String>,
    sleep: Option<f64>,
    provider: ProviderArg,
    verbose: bool,
) -> Result<ExitCode> {
    let range = resolve_range(start.as_deref(), end.as_deref(), Local::now().date_naive())?;
    let key_vars = match provider {
        ProviderArg::Polygon => POLYGON_KEY_VARS,
        ProviderArg::Finnhub => FINNHUB_KEY_VARS,
    };
    let api_key = credential_from_env(key_vars)?;
    let tickers = parse_tickers(tickers)?;
    let policy = config.earnings_policy(sleep)?;

    let source: Box<dyn EarningsSource> = match provider {
        ProviderArg::Polygon => Box::new(polygon_client(config, policy, api_key)?),
        ProviderArg::Finnhub => Box::new(finnhub_client(config, policy, api_key)?),
    };

    let progress = StderrProgress { verbose };
    let batch = fetch_batch(source.as_ref(), &tickers, range, &progress);

    if !batch.any_succeeded() {
        eprintln!("No summaries generated");
        return Ok(ExitCode::from(1));
    }

    if verbose {
        for fetched in &batch.fetched {
            print!("{}", render_sample_events(&fetched.ticker, &fetched.events, SAMPLE_EVENTS));
        }
    }

    let summaries: Vec<CoverageSummary> = batch
        .fetched
        .iter()
        .map(|f| summarize_events(&f.ticker, &f.events, range))
        .collect();
    print!("{}", render_coverage_table(&summaries));

    Ok(ExitCode::SUCCESS)
}

fn run_screen_cmd(
    config: &MoonshotConfig,
    params: &ScreenParams,
    sleep: Option<f64>,
    output: Option<&Path>,
    verbose: bool,
) -> Result<ExitCode> {
    let api_key = credential_from_env(POLYGON_KEY_VARS)?;
    let client = polygon_client(config, config.screen_policy(sleep)?, api_key)?;

    let rows = run_screen(&client, params, Local::now().date_naive(), verbose)?;
    print!("{}", render_screen_table(&rows));

    if let Some(path) = output.filter(|_| !rows.is_empty()) {
        write_csv_rows(path, &SCREEN_CSV_HEADER, &rows)?;
        println!("\nWrote {} rows to {}", rows.len(), path.display());
    }

    Ok(ExitCode::SUCCESS)
}

fn run_grid_summary(
    input: &Path,
    output: Option<&Path>,
    plots: Option<&Path>,
    promoted: Option<&Path>,
) -> Result<ExitCode> {
    let rows = load_grid(input)?;
    let promoted = match promoted {
        Some(path) => PromotedSet::from_path(path)?,
        None => PromotedSet::builtin(),
    };
    if promoted.is_empty() {
        warn!("promoted set is empty; every row groups as not promoted");
    }
    debug!(rows = rows.len(), promoted = promoted.len(), "summarizing grid");

    let summary = summarize_grid(&rows, &promoted);
    let report = summary.render_report();
    println!("{report}");

    if let Some(path) = output {
        write_text(path, &report)?;
        println!("\nWrote summary to {}", path.display());
    }

    if let Some(dir) = plots {
        let written = summary.write_plot_series(dir)?;
        println!("Generated plot series:");
        for path in &written {
            println!("  - {}", path.display());
        }
    }

    Ok(ExitCode::SUCCESS)
}

fn run_calibration(path: &Path) -> Result<ExitCode> {
    let summary = summarize_file(path)?;
    print!("{}", summary.render());
    Ok(ExitCode::SUCCESS)
}
