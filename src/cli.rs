//! CLI definition and dispatch.

use chrono::{Duration, NaiveDate, NaiveDateTime, Utc};
use clap::{Parser, Subcommand};
use std::fs::File;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{info, warn};

use crate::adapters::console_report_adapter::ConsoleReportAdapter;
use crate::adapters::csv_adapter::CsvAdapter;
use crate::adapters::csv_trade_report_adapter::CsvTradeReportAdapter;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::domain::auction::{find_price_gaps, GapThresholds, PriceGapReport};
use crate::domain::backtest::{
    evaluate_item, BacktestConfig, ItemEvaluation, MatchingMode, SaleFee, DEFAULT_FEE_FACTOR,
    DEFAULT_FIXED_SPREAD, DEFAULT_LOT_SIZE,
};
use crate::domain::batch::{parse_item_tags, run_batch, BatchReport};
use crate::domain::config_validation::{
    read_date, read_f64, read_history_days, read_optional, read_settle_hours, validate_all,
    validate_backtest_config, validate_data_config, validate_investments_config, validate_strategy_config,
    validate_threshold_config,
};
use crate::domain::error::SkytraderError;
use crate::domain::flip::{assess_flip, FlipAssessment};
use crate::domain::investment::{
    check_auction_holding, check_bazaar_holding, parse_holdings, AuctionCheck, Holding, SellCheck,
    SellThresholds, DEFAULT_AUCTION_MIN_PCT, DEFAULT_BAZAAR_MIN_PCT, DEFAULT_MIN_PROFIT,
};
use crate::domain::normalizer::{clean, settle_filter, DEFAULT_SETTLE_HOURS, MAX_SETTLE_HOURS};
use crate::domain::observation::PriceField;
use crate::domain::policy::PositionPolicy;
use crate::domain::screening::{screen_snapshot, ScreenedItem, ScreeningCriteria};
use crate::domain::strategy::{
    Strategy, StrategyMode, DEFAULT_ALPHA, DEFAULT_BETA, DEFAULT_GAMMA,
};
use crate::ports::config_port::ConfigPort;
use crate::ports::market_data_port::{AuctionDataPort, MarketDataPort, SeriesRange};
use crate::ports::report_port::ReportPort;

pub const DEFAULT_BASE_URL: &str = "https://sky.coflnet.com/api";
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_HISTORY_DAYS: i64 = 30;

#[derive(Parser, Debug)]
#[command(
    name = "skytrader",
    about = "Market signal evaluator for the SkyBlock bazaar and auction house"
)]
pub struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Backtest the configured strategy over a list of items
    Backtest {
        #[arg(short, long)]
        config: PathBuf,
        /// Comma-separated item tags, overriding [backtest] items
        #[arg(long)]
        items: Option<String>,
        /// Write every trade as CSV to this path
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Current target price and position for one item
    Check {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(long)]
        item: String,
    },
    /// Check whether held items are worth selling
    Investments {
        #[arg(short, long)]
        config: PathBuf,
    },
    /// Assess bazaar flips against the past month
    Flips {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(long)]
        items: Option<String>,
    },
    /// Find underpriced auction listings
    Gaps {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(long)]
        items: Option<String>,
    },
    /// Screen every bazaar product by order depth, price and spread
    Screen {
        #[arg(short, long)]
        config: PathBuf,
    },
    /// Validate a configuration file
    Validate {
        #[arg(short, long)]
        config: PathBuf,
    },
}

pub fn run(cli: Cli) -> ExitCode {
    let now = Utc::now().naive_utc();
    let result = match cli.command {
        Command::Backtest {
            config,
            items,
            output,
        } => run_backtest(&config, items.as_deref(), output.as_deref(), now),
        Command::Check { config, item } => run_check(&config, &item, now),
        Command::Investments { config } => run_investments(&config),
        Command::Flips { config, items } => run_flips(&config, items.as_deref(), now),
        Command::Gaps { config, items } => run_gaps(&config, items.as_deref(), now),
        Command::Screen { config } => run_screen(&config),
        Command::Validate { config } => run_validate(&config),
    };

    match result {
        Ok(code) => code,
        Err(e) => {
            eprintln!("error: {e}");
            (&e).into()
        }
    }
}

pub fn load_config(path: &Path) -> Result<FileConfigAdapter, SkytraderError> {
    info!("Loading config from {}", path.display());
    FileConfigAdapter::from_file(path).map_err(|e| SkytraderError::ConfigParse {
        file: path.display().to_string(),
        reason: e.to_string(),
    })
}

// ---------------------------------------------------------------------------
// Config builders
// ---------------------------------------------------------------------------

pub fn build_strategy(config: &dyn ConfigPort) -> Result<Strategy, SkytraderError> {
    let mode = read_optional::<StrategyMode>(config, "strategy", "mode")?
        .unwrap_or(StrategyMode::Weekly);
    let mut strategy = Strategy::from_mode(mode);

    let alpha = read_f64(config, "strategy", "alpha", DEFAULT_ALPHA)?;
    let beta = read_f64(config, "strategy", "beta", DEFAULT_BETA)?;
    let gamma = read_f64(config, "strategy", "gamma", DEFAULT_GAMMA)?;

    let policy = config
        .get_trimmed("strategy", "policy")
        .unwrap_or_else(|| strategy.policy.name().to_string());
    strategy.policy = match policy.as_str() {
        "binary" => PositionPolicy::Binary { alpha, beta },
        "three_state" => PositionPolicy::ThreeState { alpha, gamma },
        other => {
            return Err(SkytraderError::invalid(
                "strategy",
                "policy",
                format!("unknown policy '{other}', expected binary or three_state"),
            ));
        }
    };

    if let Some(window) = read_optional::<usize>(config, "strategy", "window")? {
        if window == 0 {
            return Err(SkytraderError::invalid(
                "strategy",
                "window",
                "window must be at least 1",
            ));
        }
        strategy.window = window;
    }
    if let Some(field) = read_optional::<PriceField>(config, "strategy", "price_field")? {
        strategy.price_field = field;
    }
    strategy.settle_hours = read_settle_hours(config)?;

    Ok(strategy)
}

pub fn build_backtest_config(config: &dyn ConfigPort) -> Result<BacktestConfig, SkytraderError> {
    let fee_factor = read_f64(config, "backtest", "fee_factor", DEFAULT_FEE_FACTOR)?;
    let sale_fee = match config.get_trimmed("backtest", "sale_fee").as_deref() {
        None | Some("factor") => SaleFee::Factor(fee_factor),
        Some("auction_tax") => SaleFee::AuctionTax,
        Some(other) => {
            return Err(SkytraderError::invalid(
                "backtest",
                "sale_fee",
                format!("unknown sale fee '{other}', expected factor or auction_tax"),
            ));
        }
    };

    Ok(BacktestConfig {
        fixed_spread: read_f64(config, "backtest", "fixed_spread", DEFAULT_FIXED_SPREAD)?,
        lot_size: read_f64(config, "backtest", "lot_size", DEFAULT_LOT_SIZE)?,
        sale_fee,
        matching: read_optional::<MatchingMode>(config, "backtest", "matching")?
            .unwrap_or_default(),
    })
}

pub fn build_sell_thresholds(config: &dyn ConfigPort) -> Result<SellThresholds, SkytraderError> {
    Ok(SellThresholds {
        min_profit: read_f64(config, "thresholds", "min_profit", DEFAULT_MIN_PROFIT)?,
        bazaar_min_pct: read_f64(config, "thresholds", "bazaar_min_pct", DEFAULT_BAZAAR_MIN_PCT)?,
        auction_min_pct: read_f64(
            config,
            "thresholds",
            "auction_min_pct",
            DEFAULT_AUCTION_MIN_PCT,
        )?,
    })
}

pub fn build_gap_thresholds(config: &dyn ConfigPort) -> Result<GapThresholds, SkytraderError> {
    let defaults = GapThresholds::default();
    Ok(GapThresholds {
        discount: read_f64(config, "thresholds", "gap_discount", defaults.discount)?,
        min_margin: read_f64(config, "thresholds", "gap_min_margin", defaults.min_margin)?,
        ..defaults
    })
}

/// Item tags from the command line, or from `[<section>] items`.
pub fn resolve_items(
    items_override: Option<&str>,
    config: &dyn ConfigPort,
    section: &str,
) -> Result<Vec<String>, SkytraderError> {
    let list = match items_override {
        Some(list) => list.to_string(),
        None => config
            .get_trimmed(section, "items")
            .ok_or_else(|| SkytraderError::ConfigMissing {
                section: section.to_string(),
                key: "items".to_string(),
            })?,
    };
    Ok(parse_item_tags(&list)?)
}

/// `[data] history_start` (default 2021-01-01) up to `now`.
pub fn backtest_range(
    config: &dyn ConfigPort,
    now: NaiveDateTime,
) -> Result<SeriesRange, SkytraderError> {
    let start = match read_date(config, "data", "history_start")? {
        Some(date) => date,
        None => NaiveDate::from_ymd_opt(2021, 1, 1).unwrap_or(NaiveDate::MIN),
    };
    Ok(SeriesRange::Between {
        from: start.and_time(chrono::NaiveTime::MIN),
        to: now,
    })
}

/// The last `[data] history_days` (default 30) up to `now`.
pub fn recent_range(
    config: &dyn ConfigPort,
    now: NaiveDateTime,
) -> Result<SeriesRange, SkytraderError> {
    let days = read_history_days(config)?.unwrap_or(DEFAULT_HISTORY_DAYS);
    let from = now.checked_sub_signed(Duration::days(days)).ok_or_else(|| {
        SkytraderError::invalid("data", "history_days", "history_days reaches before year 1")
    })?;
    Ok(SeriesRange::Between { from, to: now })
}

/// Settle period for the live evaluators: `[strategy] settle_hours`, 24 by default.
fn live_settle(strategy: &Strategy) -> Duration {
    Duration::hours(
        strategy
            .settle_hours
            .unwrap_or(DEFAULT_SETTLE_HOURS)
            .clamp(0, MAX_SETTLE_HOURS),
    )
}

fn fee_factor(config: &BacktestConfig) -> f64 {
    match config.sale_fee {
        SaleFee::Factor(factor) => factor,
        SaleFee::AuctionTax => DEFAULT_FEE_FACTOR,
    }
}

// ---------------------------------------------------------------------------
// Data sources
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub enum DataSource {
    Coflnet {
        base_url: String,
        timeout: std::time::Duration,
    },
    Csv {
        dir: PathBuf,
    },
}

pub fn build_data_source(config: &dyn ConfigPort) -> Result<DataSource, SkytraderError> {
    match config.get_trimmed("data", "source").as_deref() {
        None | Some("coflnet") => {
            let timeout = read_optional::<u64>(config, "data", "timeout_secs")?
                .unwrap_or(DEFAULT_TIMEOUT_SECS);
            Ok(DataSource::Coflnet {
                base_url: config
                    .get_trimmed("data", "base_url")
                    .unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
                timeout: std::time::Duration::from_secs(timeout),
            })
        }
        Some("csv") => {
            let dir = config.get_trimmed("data", "csv_dir").ok_or_else(|| {
                SkytraderError::ConfigMissing {
                    section: "data".to_string(),
                    key: "csv_dir".to_string(),
                }
            })?;
            Ok(DataSource::Csv {
                dir: PathBuf::from(dir),
            })
        }
        Some(other) => Err(SkytraderError::invalid(
            "data",
            "source",
            format!("unknown source '{other}', expected coflnet or csv"),
        )),
    }
}

pub struct DataPorts {
    pub market: Box<dyn MarketDataPort>,
    /// Auction listings are only available from the HTTP API.
    pub auction: Option<Box<dyn AuctionDataPort>>,
}

pub fn open_data_ports(source: &DataSource) -> Result<DataPorts, SkytraderError> {
    match source {
        DataSource::Csv { dir } => {
            info!("Reading price history from {}", dir.display());
            Ok(DataPorts {
                market: Box::new(CsvAdapter::new(dir.clone())),
                auction: None,
            })
        }
        DataSource::Coflnet { base_url, timeout } => open_coflnet(base_url, *timeout),
    }
}

#[cfg(feature = "http")]
fn open_coflnet(base_url: &str, timeout: std::time::Duration) -> Result<DataPorts, SkytraderError> {
    use crate::adapters::coflnet_adapter::CoflnetAdapter;

    info!("Using market API at {base_url}");
    let adapter = CoflnetAdapter::new(base_url, timeout)?;
    Ok(DataPorts {
        market: Box::new(adapter.clone()),
        auction: Some(Box::new(adapter)),
    })
}

#[cfg(not(feature = "http"))]
fn open_coflnet(
    _base_url: &str,
    _timeout: std::time::Duration,
) -> Result<DataPorts, SkytraderError> {
    Err(SkytraderError::invalid(
        "data",
        "source",
        "the http feature is required for the coflnet source",
    ))
}

fn require_auction_port(ports: &DataPorts) -> Result<&dyn AuctionDataPort, SkytraderError> {
    ports.auction.as_deref().ok_or_else(|| {
        SkytraderError::invalid(
            "data",
            "source",
            "auction data is only available from the coflnet source",
        )
    })
}

// ---------------------------------------------------------------------------
// Pipelines
// ---------------------------------------------------------------------------

/// Per-item result of the live evaluators; failures skip the item.
#[derive(Debug, Clone, PartialEq)]
pub enum Checked<T> {
    Done(T),
    Skipped { item_tag: String, reason: String },
}

impl<T> Checked<T> {
    fn from_result(item_tag: &str, result: Result<T, SkytraderError>) -> Self {
        match result {
            Ok(value) => Checked::Done(value),
            Err(e) => {
                warn!(item = item_tag, error = %e, "skipping item");
                Checked::Skipped {
                    item_tag: item_tag.to_string(),
                    reason: e.to_string(),
                }
            }
        }
    }
}

/// Backtests every item and hands the batch to each report sink in turn.
pub fn run_backtest_pipeline(
    data_port: &dyn MarketDataPort,
    items: &[String],
    range: &SeriesRange,
    strategy: &Strategy,
    bt_config: &BacktestConfig,
    reports: &[&dyn ReportPort],
    now: NaiveDateTime,
) -> Result<BatchReport, SkytraderError> {
    info!(
        "Running {} backtest over {} items (window {}, {} policy)",
        strategy.name,
        items.len(),
        strategy.window,
        strategy.policy.name()
    );

    let report = run_batch(data_port, items, range, strategy, bt_config, now);
    for sink in reports {
        sink.write_batch(&report)?;
    }
    Ok(report)
}

pub fn run_check_pipeline(
    data_port: &dyn MarketDataPort,
    item_tag: &str,
    range: &SeriesRange,
    strategy: &Strategy,
    bt_config: &BacktestConfig,
    now: NaiveDateTime,
) -> Result<ItemEvaluation, SkytraderError> {
    let raw = data_port.fetch_series(item_tag, range)?;
    evaluate_item(item_tag, &raw, strategy, bt_config, now)
}

#[derive(Debug, Clone, PartialEq)]
pub struct InvestmentReport {
    pub bazaar: Vec<Checked<SellCheck>>,
    pub auction: Vec<Checked<AuctionCheck>>,
}

pub fn run_investments_pipeline(
    data_port: &dyn MarketDataPort,
    auction_port: Option<&dyn AuctionDataPort>,
    bazaar: &[Holding],
    auction: &[Holding],
    bt_config: &BacktestConfig,
    thresholds: &SellThresholds,
) -> InvestmentReport {
    let bazaar = bazaar
        .iter()
        .map(|holding| {
            let result = data_port.fetch_snapshot(&holding.item_tag).map(|snapshot| {
                check_bazaar_holding(
                    holding,
                    &snapshot,
                    bt_config.fixed_spread,
                    fee_factor(bt_config),
                    thresholds,
                )
            });
            Checked::from_result(&holding.item_tag, result)
        })
        .collect();

    let auction = auction
        .iter()
        .map(|holding| {
            let result = match auction_port {
                Some(port) => port.fetch_active_bins(&holding.item_tag).map(|listings| {
                    let prices: Vec<f64> = listings.iter().map(|l| l.starting_bid).collect();
                    check_auction_holding(holding, &prices, thresholds)
                }),
                None => Err(SkytraderError::fetch(
                    &holding.item_tag,
                    "auction data is only available from the coflnet source",
                )),
            };
            Checked::from_result(&holding.item_tag, result)
        })
        .collect();

    InvestmentReport { bazaar, auction }
}

pub fn run_flips_pipeline(
    data_port: &dyn MarketDataPort,
    items: &[String],
    range: &SeriesRange,
    settle: Duration,
    fixed_spread: f64,
    now: NaiveDateTime,
) -> Vec<Checked<FlipAssessment>> {
    items
        .iter()
        .map(|item_tag| {
            let result = data_port.fetch_series(item_tag, range).and_then(|raw| {
                let history = settle_filter(clean(&raw), now, settle);
                let snapshot = data_port.fetch_snapshot(item_tag)?;
                assess_flip(item_tag, &history, &snapshot, fixed_spread)
            });
            Checked::from_result(item_tag, result)
        })
        .collect()
}

pub fn run_gaps_pipeline(
    auction_port: &dyn AuctionDataPort,
    items: &[String],
    thresholds: &GapThresholds,
    settle: Duration,
    now: NaiveDateTime,
) -> Vec<Checked<PriceGapReport>> {
    items
        .iter()
        .map(|item_tag| {
            let result = auction_port.fetch_sold(item_tag).and_then(|sold| {
                let active = auction_port.fetch_active_bins(item_tag)?;
                find_price_gaps(item_tag, &sold, &active, thresholds, now, settle)
            });
            Checked::from_result(item_tag, result)
        })
        .collect()
}

/// Snapshots every listed product; fetch failures are skipped.
pub fn run_screen_pipeline(
    data_port: &dyn MarketDataPort,
    criteria: &ScreeningCriteria,
) -> Result<Vec<ScreenedItem>, SkytraderError> {
    let tags = data_port.list_item_tags()?;
    info!("Screening {} products", tags.len());

    Ok(tags
        .iter()
        .filter_map(|tag| match data_port.fetch_snapshot(tag) {
            Ok(snapshot) => screen_snapshot(&snapshot, criteria),
            Err(e) => {
                warn!(item = tag.as_str(), error = %e, "skipping item");
                None
            }
        })
        .collect())
}

// ---------------------------------------------------------------------------
// Commands
// ---------------------------------------------------------------------------

fn run_backtest(
    config_path: &Path,
    items_override: Option<&str>,
    output_path: Option<&Path>,
    now: NaiveDateTime,
) -> Result<ExitCode, SkytraderError> {
    let config = load_config(config_path)?;
    validate_data_config(&config)?;
    validate_strategy_config(&config)?;
    validate_backtest_config(&config, items_override.is_none())?;

    let strategy = build_strategy(&config)?;
    let bt_config = build_backtest_config(&config)?;
    let items = resolve_items(items_override, &config, "backtest")?;
    let range = backtest_range(&config, now)?;
    let ports = open_data_ports(&build_data_source(&config)?)?;

    let output = output_path
        .map(PathBuf::from)
        .or_else(|| config.get_trimmed("backtest", "output").map(PathBuf::from));

    let console = ConsoleReportAdapter::stdout();
    let trade_csv = output
        .as_ref()
        .map(|path| CsvTradeReportAdapter::<File>::create(path))
        .transpose()?;

    let mut reports: Vec<&dyn ReportPort> = vec![&console];
    if let Some(csv) = trade_csv.as_ref() {
        reports.push(csv);
    }

    let report = run_backtest_pipeline(
        ports.market.as_ref(),
        &items,
        &range,
        &strategy,
        &bt_config,
        &reports,
        now,
    )?;

    if let Some(path) = output {
        info!("Trades written to: {}", path.display());
    }

    if report.summary.items == 0 {
        eprintln!("error: no items with enough data to backtest");
        return Ok(ExitCode::from(5));
    }
    Ok(ExitCode::SUCCESS)
}

fn run_check(
    config_path: &Path,
    item: &str,
    now: NaiveDateTime,
) -> Result<ExitCode, SkytraderError> {
    let config = load_config(config_path)?;
    validate_data_config(&config)?;
    validate_strategy_config(&config)?;
    validate_backtest_config(&config, false)?;

    let strategy = build_strategy(&config)?;
    let bt_config = build_backtest_config(&config)?;
    let item_tag = item.trim().to_uppercase();
    let range = recent_range(&config, now)?;
    let ports = open_data_ports(&build_data_source(&config)?)?;

    let evaluation = run_check_pipeline(
        ports.market.as_ref(),
        &item_tag,
        &range,
        &strategy,
        &bt_config,
        now,
    )?;

    ConsoleReportAdapter::stdout().write_item(&evaluation.result)?;
    if let Some(latest) = evaluation.latest() {
        println!("  As of:        {}", latest.observation.timestamp);
        println!("  Buy price:    {:.2}", latest.observation.buy_price);
        println!("  Sell price:   {:.2}", latest.observation.sell_price);
        match latest.target_price {
            Some(target) => println!("  Target price: {target:.2}"),
            None => println!("  Target price: n/a"),
        }
        println!("  Position:     {}", latest.position);
    }
    Ok(ExitCode::SUCCESS)
}

fn print_skipped(item_tag: &str, reason: &str) {
    println!("\n------- {item_tag} -------\n  skipped: {reason}");
}

fn print_sell_check(check: &SellCheck) {
    let verdict = if check.worth_selling {
        "worth selling"
    } else {
        "not worth selling yet"
    };
    println!(
        "\n------- {} -------\n  {} at {:.2} ({} x {:.2})\n  Profit: {:.2} ({:.2}%)",
        check.holding.item_tag,
        verdict,
        check.sell_price,
        check.holding.quantity,
        check.holding.purchase_price,
        check.profit,
        check.profit_pct
    );
}

fn run_investments(config_path: &Path) -> Result<ExitCode, SkytraderError> {
    let config = load_config(config_path)?;
    validate_data_config(&config)?;
    validate_backtest_config(&config, false)?;
    validate_threshold_config(&config)?;
    validate_investments_config(&config)?;

    let bazaar = parse_holdings(&config.get_trimmed("investments", "bazaar").unwrap_or_default())?;
    let auction =
        parse_holdings(&config.get_trimmed("investments", "auction").unwrap_or_default())?;
    if bazaar.is_empty() && auction.is_empty() {
        return Err(SkytraderError::ConfigMissing {
            section: "investments".to_string(),
            key: "bazaar".to_string(),
        });
    }

    let bt_config = build_backtest_config(&config)?;
    let thresholds = build_sell_thresholds(&config)?;
    let ports = open_data_ports(&build_data_source(&config)?)?;

    let report = run_investments_pipeline(
        ports.market.as_ref(),
        ports.auction.as_deref(),
        &bazaar,
        &auction,
        &bt_config,
        &thresholds,
    );

    for outcome in &report.bazaar {
        match outcome {
            Checked::Done(check) => print_sell_check(check),
            Checked::Skipped { item_tag, reason } => print_skipped(item_tag, reason),
        }
    }
    for outcome in &report.auction {
        match outcome {
            Checked::Done(AuctionCheck::Priced(check)) => print_sell_check(check),
            Checked::Done(AuctionCheck::NoListings { item_tag }) => {
                print_skipped(item_tag, "no active listings")
            }
            Checked::Skipped { item_tag, reason } => print_skipped(item_tag, reason),
        }
    }
    Ok(ExitCode::SUCCESS)
}

fn run_flips(
    config_path: &Path,
    items_override: Option<&str>,
    now: NaiveDateTime,
) -> Result<ExitCode, SkytraderError> {
    let config = load_config(config_path)?;
    validate_data_config(&config)?;
    validate_strategy_config(&config)?;
    validate_backtest_config(&config, items_override.is_none())?;

    let strategy = build_strategy(&config)?;
    let bt_config = build_backtest_config(&config)?;
    let items = resolve_items(items_override, &config, "backtest")?;
    let range = recent_range(&config, now)?;
    let ports = open_data_ports(&build_data_source(&config)?)?;

    let results = run_flips_pipeline(
        ports.market.as_ref(),
        &items,
        &range,
        live_settle(&strategy),
        bt_config.fixed_spread,
        now,
    );

    for outcome in &results {
        match outcome {
            Checked::Done(a) => println!(
                "\n------- {} -------\n  {}\n  Buy order:  {:.2} ({:.2}% below the mean)\n  Mean:       {:.2}\n  Low / high: {:.2} / {:.2}\n  Periods above +15%: {}",
                a.item_tag,
                a.verdict,
                a.buy_order,
                a.pct_below_mean,
                a.mean,
                a.benchmark_low,
                a.benchmark_high,
                a.periods_above
            ),
            Checked::Skipped { item_tag, reason } => print_skipped(item_tag, reason),
        }
    }
    Ok(ExitCode::SUCCESS)
}

fn run_gaps(
    config_path: &Path,
    items_override: Option<&str>,
    now: NaiveDateTime,
) -> Result<ExitCode, SkytraderError> {
    let config = load_config(config_path)?;
    validate_data_config(&config)?;
    validate_strategy_config(&config)?;
    validate_threshold_config(&config)?;
    validate_investments_config(&config)?;

    let strategy = build_strategy(&config)?;
    let thresholds = build_gap_thresholds(&config)?;
    let items = resolve_items(items_override, &config, "auction")?;
    let ports = open_data_ports(&build_data_source(&config)?)?;
    let auction_port = require_auction_port(&ports)?;

    let results = run_gaps_pipeline(auction_port, &items, &thresholds, live_settle(&strategy), now);

    for outcome in &results {
        match outcome {
            Checked::Done(report) => {
                println!(
                    "\n------- {} -------\n  Benchmark: {:.0}\n  Buy below: {:.0}",
                    report.item_name.as_deref().unwrap_or(&report.item_tag),
                    report.benchmark,
                    report.buy_threshold
                );
                if report.gaps.is_empty() {
                    println!("  No underpriced listings");
                }
                for gap in &report.gaps {
                    println!(
                        "  {:.0}  margin {:.0} ({:.1}%)",
                        gap.price, gap.margin, gap.discount_pct
                    );
                }
            }
            Checked::Skipped { item_tag, reason } => print_skipped(item_tag, reason),
        }
    }
    Ok(ExitCode::SUCCESS)
}

fn run_screen(config_path: &Path) -> Result<ExitCode, SkytraderError> {
    let config = load_config(config_path)?;
    validate_data_config(&config)?;
    let ports = open_data_ports(&build_data_source(&config)?)?;

    let passed = run_screen_pipeline(ports.market.as_ref(), &ScreeningCriteria::default())?;
    for item in &passed {
        println!(
            "{}  orders {:.0}  mid {:.1}  half-spread {:.1}",
            item.item_tag, item.mean_orders, item.mid_price, item.half_spread
        );
    }
    info!("{} products passed screening", passed.len());
    Ok(ExitCode::SUCCESS)
}

fn run_validate(config_path: &Path) -> Result<ExitCode, SkytraderError> {
    let config = load_config(config_path)?;
    validate_all(&config)?;

    let strategy = build_strategy(&config)?;
    let bt_config = build_backtest_config(&config)?;
    let source = build_data_source(&config)?;

    println!("Strategy:     {} ({} policy)", strategy.name, strategy.policy.name());
    println!("Window:       {}", strategy.window);
    println!("Price field:  {}", strategy.price_field);
    println!("Spread:       {}", bt_config.fixed_spread);
    println!("Lot size:     {}", bt_config.lot_size);
    match source {
        DataSource::Coflnet { base_url, timeout } => {
            println!("Source:       {base_url} (timeout {}s)", timeout.as_secs())
        }
        DataSource::Csv { dir } => println!("Source:       {}", dir.display()),
    }
    if let Some(items) = config.get_trimmed("backtest", "items") {
        println!("Items:        {}", parse_item_tags(&items)?.join(", "));
    }

    println!("\nConfiguration is valid.");
    Ok(ExitCode::SUCCESS)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_config(content: &str) -> FileConfigAdapter {
        FileConfigAdapter::from_string(content).unwrap()
    }

    #[test]
    fn cli_parses_backtest() {
        let cli = Cli::try_parse_from([
            "skytrader",
            "--verbose",
            "backtest",
            "-c",
            "config.ini",
            "--items",
            "A,B",
        ])
        .unwrap();
        assert!(cli.verbose);
        assert!(matches!(
            cli.command,
            Command::Backtest { items: Some(ref i), output: None, .. } if i == "A,B"
        ));
    }

    #[test]
    fn cli_verbose_is_global() {
        let cli = Cli::try_parse_from(["skytrader", "check", "-c", "x.ini", "--item", "A", "-v"])
            .unwrap();
        assert!(cli.verbose);
    }

    #[test]
    fn weekly_strategy_by_default() {
        let strategy = build_strategy(&make_config("")).unwrap();
        assert_eq!(strategy.window, 7);
        assert_eq!(
            strategy.policy,
            PositionPolicy::Binary {
                alpha: 0.9,
                beta: 0.5
            }
        );
        assert_eq!(strategy.price_field, PriceField::Buy);
        assert_eq!(strategy.settle_hours, None);
    }

    #[test]
    fn monthly_strategy_with_overrides() {
        let strategy = build_strategy(&make_config(
            "[strategy]\nmode = monthly\ngamma = 1.5\nwindow = 14\nprice_field = sell\nsettle_hours = 12\n",
        ))
        .unwrap();
        assert_eq!(strategy.window, 14);
        assert_eq!(
            strategy.policy,
            PositionPolicy::ThreeState {
                alpha: 0.9,
                gamma: 1.5
            }
        );
        assert_eq!(strategy.price_field, PriceField::Sell);
        assert_eq!(strategy.settle_hours, Some(12));
    }

    #[test]
    fn policy_override_on_weekly_mode() {
        let strategy =
            build_strategy(&make_config("[strategy]\npolicy = three_state\n")).unwrap();
        assert_eq!(strategy.window, 7);
        assert!(matches!(strategy.policy, PositionPolicy::ThreeState { .. }));
    }

    #[test]
    fn backtest_config_defaults() {
        let config = build_backtest_config(&make_config("")).unwrap();
        assert_eq!(config, BacktestConfig::default());
    }

    #[test]
    fn backtest_config_auction_tax_and_fifo() {
        let config = build_backtest_config(&make_config(
            "[backtest]\nsale_fee = auction_tax\nmatching = fifo\nlot_size = 500\n",
        ))
        .unwrap();
        assert_eq!(config.sale_fee, SaleFee::AuctionTax);
        assert_eq!(config.matching, MatchingMode::Fifo);
        assert_eq!(config.lot_size, 500.0);
        assert_eq!(fee_factor(&config), DEFAULT_FEE_FACTOR);
    }

    #[test]
    fn resolve_items_prefers_override() {
        let config = make_config("[backtest]\nitems = A,B\n");
        assert_eq!(
            resolve_items(Some("c"), &config, "backtest").unwrap(),
            vec!["C"]
        );
        assert_eq!(
            resolve_items(None, &config, "backtest").unwrap(),
            vec!["A", "B"]
        );
    }

    #[test]
    fn resolve_items_missing_is_config_error() {
        let err = resolve_items(None, &make_config(""), "auction").unwrap_err();
        assert!(matches!(err, SkytraderError::ConfigMissing { section, .. } if section == "auction"));
    }

    #[test]
    fn data_source_defaults_to_coflnet() {
        let source = build_data_source(&make_config("")).unwrap();
        assert_eq!(
            source,
            DataSource::Coflnet {
                base_url: DEFAULT_BASE_URL.to_string(),
                timeout: std::time::Duration::from_secs(10),
            }
        );
    }

    #[test]
    fn data_source_csv() {
        let source =
            build_data_source(&make_config("[data]\nsource = csv\ncsv_dir = /data\n")).unwrap();
        assert_eq!(
            source,
            DataSource::Csv {
                dir: PathBuf::from("/data")
            }
        );
    }

    #[test]
    fn ranges_from_config() {
        let now = NaiveDate::from_ymd_opt(2024, 6, 1)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap();

        let range = backtest_range(&make_config(""), now).unwrap();
        assert_eq!(
            range,
            SeriesRange::Between {
                from: NaiveDate::from_ymd_opt(2021, 1, 1)
                    .unwrap()
                    .and_hms_opt(0, 0, 0)
                    .unwrap(),
                to: now,
            }
        );

        let range = recent_range(&make_config("[data]\nhistory_days = 7\n"), now).unwrap();
        assert_eq!(
            range,
            SeriesRange::Between {
                from: now - Duration::days(7),
                to: now,
            }
        );
    }

    #[test]
    fn live_settle_defaults_to_a_day() {
        let mut strategy = Strategy::from_mode(StrategyMode::Weekly);
        assert_eq!(live_settle(&strategy), Duration::hours(24));
        strategy.settle_hours = Some(0);
        assert_eq!(live_settle(&strategy), Duration::zero());
        strategy.settle_hours = Some(i64::MAX);
        assert_eq!(live_settle(&strategy), Duration::hours(MAX_SETTLE_HOURS));
    }

    #[test]
    fn gap_thresholds_from_config() {
        let t = build_gap_thresholds(&make_config("[thresholds]\ngap_discount = 0.2\n")).unwrap();
        assert_eq!(t.discount, 0.2);
        assert_eq!(t.min_margin, 19_999_999.0);
    }
}
