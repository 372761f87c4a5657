//! CLI definition and dispatch.
//!
//! Each command loads and validates the INI config once, materialises
//! [`EngineSettings`], wires the file adapters, and hands them to a
//! `*_pipeline` function. The pipelines take ports, so tests can drive them
//! with in-memory stores and stub predictors.

use chrono::{Local, NaiveDateTime};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{info, warn};

use crate::adapters::csv_feature_adapter::{CsvFeatureAdapter, parse_timestamp};
use crate::adapters::csv_ledger_adapter::CsvLedgerAdapter;
use crate::adapters::csv_metrics_adapter::CsvMetricsAdapter;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::adapters::forest_predictor::ForestPredictor;
use crate::adapters::json_artifact_adapter::JsonArtifactAdapter;
use crate::domain::config_validation::{parse_target, validate_engine_config};
use crate::domain::error::SlopetraderError;
use crate::domain::evaluator::{DirectionalClassifierEvaluator, EvaluationReport, TrainingRecord};
use crate::domain::inference::ModelArtifact;
use crate::domain::ledger::{BookingOutcome, PortfolioLedger, Side, TradeRequest};
use crate::domain::settings::{
    EngineSettings, EvaluationSettings, IntradaySettings, ModelSettings, PathSettings,
    PortfolioSettings, TrailingWindow, TrainingTarget, WalkForwardSettings,
};
use crate::domain::signal::{PredictionCall, Thresholds};
use crate::domain::trade_gate::TradeGate;
use crate::domain::walk_forward::{WalkForwardRecord, WalkForwardReport, WalkForwardSimulator};
use crate::domain::zone::{Advice, PriceZone};
use crate::ports::artifact_port::ArtifactStore;
use crate::ports::config_port::ConfigPort;
use crate::ports::data_port::FeatureSource;
use crate::ports::ledger_port::LedgerStore;
use crate::ports::metrics_port::MetricsSink;
use crate::ports::predictor_port::Predictor;

/// Win-rate confidence used before any walk-forward run has been logged.
pub const DEFAULT_CONFIDENCE: f64 = 0.5;

#[derive(Parser, Debug)]
#[command(
    name = "slopetrader",
    about = "Walk-forward VIX-slope signals with a PDT-aware paper ledger"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Validate a configuration file
    Validate {
        #[arg(short, long)]
        config: PathBuf,
    },
    /// Evaluate and train the daily directional models
    Train {
        #[arg(short, long)]
        config: PathBuf,
    },
    /// Run the walk-forward simulation and log its win rate
    WalkForward {
        #[arg(short, long)]
        config: PathBuf,
    },
    /// Train the intraday forward-return model
    TrainIntraday {
        #[arg(short, long)]
        config: PathBuf,
    },
    /// Print the latest directional call for every daily target
    Predict {
        #[arg(short, long)]
        config: PathBuf,
    },
    /// Print the intraday price zone and book the advised trade
    Advise {
        #[arg(short, long)]
        config: PathBuf,
        /// Print the advice without touching the ledger
        #[arg(long)]
        no_book: bool,
    },
    /// Book a manual trade against the ledger
    Book {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(long)]
        side: Side,
        #[arg(long)]
        price: f64,
        #[arg(long, default_value_t = 1)]
        qty: u64,
        /// Trade time (defaults to now)
        #[arg(long)]
        timestamp: Option<String>,
    },
    /// Show the current ledger state
    Ledger {
        #[arg(short, long)]
        config: PathBuf,
    },
}

pub fn run(cli: Cli) -> ExitCode {
    match cli.command {
        Command::Validate { config } => run_validate(&config),
        Command::Train { config } => with_settings(&config, run_train),
        Command::WalkForward { config } => with_settings(&config, run_walk_forward),
        Command::TrainIntraday { config } => with_settings(&config, run_train_intraday),
        Command::Predict { config } => with_settings(&config, run_predict),
        Command::Advise { config, no_book } => {
            with_settings(&config, |settings| run_advise(settings, !no_book))
        }
        Command::Book {
            config,
            side,
            price,
            qty,
            timestamp,
        } => with_settings(&config, |settings| {
            let at = match timestamp.as_deref() {
                Some(raw) => parse_timestamp(raw).ok_or_else(|| SlopetraderError::ConfigInvalid {
                    section: "book".into(),
                    key: "timestamp".into(),
                    reason: format!("cannot parse {:?}", raw),
                })?,
                None => now(),
            };
            run_book(settings, TradeRequest::new(side, price, at).with_qty(qty))
        }),
        Command::Ledger { config } => with_settings(&config, run_ledger),
    }
}

pub fn load_config(path: &PathBuf) -> Result<FileConfigAdapter, ExitCode> {
    FileConfigAdapter::from_file(path).map_err(|e| {
        let err = SlopetraderError::ConfigParse {
            file: path.display().to_string(),
            reason: e.to_string(),
        };
        eprintln!("error: {err}");
        ExitCode::from(&err)
    })
}

fn load_settings(path: &PathBuf) -> Result<EngineSettings, ExitCode> {
    let adapter = load_config(path)?;
    build_engine_settings(&adapter).map_err(|e| {
        eprintln!("error: {e}");
        ExitCode::from(&e)
    })
}

fn with_settings<F>(config_path: &PathBuf, command: F) -> ExitCode
where
    F: FnOnce(&EngineSettings) -> Result<(), SlopetraderError>,
{
    let settings = match load_settings(config_path) {
        Ok(s) => s,
        Err(code) => return code,
    };
    match command(&settings) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            (&e).into()
        }
    }
}

fn now() -> NaiveDateTime {
    Local::now().naive_local()
}

fn count(config: &dyn ConfigPort, section: &str, key: &str, default: usize) -> usize {
    config.get_int(section, key, default as i64).max(0) as usize
}

fn narrow<T: TryFrom<usize>>(value: usize, section: &str, key: &str) -> Result<T, SlopetraderError> {
    T::try_from(value).map_err(|_| SlopetraderError::ConfigInvalid {
        section: section.into(),
        key: key.into(),
        reason: format!("{} is out of range", value),
    })
}

/// Validate `config` and materialise every section, falling back to the
/// defaults for absent keys.
pub fn build_engine_settings(config: &dyn ConfigPort) -> Result<EngineSettings, SlopetraderError> {
    validate_engine_config(config)?;
    let d = EngineSettings::default();

    let string_or = |section: &str, key: &str, default: String| {
        config.get_string(section, key).unwrap_or(default)
    };

    let paths = PathSettings {
        data_dir: config
            .get_string("paths", "data_dir")
            .map(PathBuf::from)
            .unwrap_or(d.paths.data_dir),
        reports_dir: config
            .get_string("paths", "reports_dir")
            .map(PathBuf::from)
            .unwrap_or(d.paths.reports_dir),
        models_dir: config
            .get_string("paths", "models_dir")
            .map(PathBuf::from)
            .unwrap_or(d.paths.models_dir),
        eod_table: string_or("paths", "eod_table", d.paths.eod_table),
        intraday_table: string_or("paths", "intraday_table", d.paths.intraday_table),
    };

    let thresholds = Thresholds {
        long: config.get_double("signal", "long_threshold", d.thresholds.long),
        short: config.get_double("signal", "short_threshold", d.thresholds.short),
    };

    let targets = match config.get_list("evaluation", "targets") {
        Some(entries) => entries
            .iter()
            .map(|entry| {
                parse_target(entry).map(|(label_column, artifact)| TrainingTarget {
                    label_column,
                    artifact,
                })
            })
            .collect::<Result<Vec<_>, _>>()?,
        None => d.evaluation.targets,
    };
    let evaluation = EvaluationSettings {
        test_window: count(config, "evaluation", "test_window", d.evaluation.test_window),
        max_splits: count(config, "evaluation", "max_splits", d.evaluation.max_splits),
        targets,
        excluded_columns: config
            .get_list("evaluation", "excluded_columns")
            .unwrap_or(d.evaluation.excluded_columns),
    };

    let warmup_rows = count(config, "walkforward", "warmup_rows", d.walk_forward.warmup_rows);
    let walk_forward = WalkForwardSettings {
        warmup_rows,
        horizon: count(config, "walkforward", "horizon", d.walk_forward.horizon),
        min_rows: count(config, "walkforward", "min_rows", warmup_rows),
        label_column: string_or("walkforward", "label_column", d.walk_forward.label_column),
    };

    let window = if config.get_string("portfolio", "pdt_window_rows").is_some() {
        TrailingWindow::Rows(count(config, "portfolio", "pdt_window_rows", 1))
    } else {
        TrailingWindow::Sessions(count(config, "portfolio", "pdt_window_sessions", 5))
    };
    let portfolio = PortfolioSettings {
        start_cash: config.get_double("portfolio", "start_cash", d.portfolio.start_cash),
        max_day_trades: narrow(
            count(
                config,
                "portfolio",
                "max_day_trades",
                d.portfolio.max_day_trades as usize,
            ),
            "portfolio",
            "max_day_trades",
        )?,
        window,
    };

    let model = ModelSettings {
        n_trees: count(config, "model", "n_trees", d.model.n_trees),
        max_depth: narrow(
            count(config, "model", "max_depth", usize::from(d.model.max_depth)),
            "model",
            "max_depth",
        )?,
        min_samples_split: count(config, "model", "min_samples_split", d.model.min_samples_split),
    };

    let intraday = IntradaySettings {
        symbol: string_or("intraday", "symbol", d.intraday.symbol),
        target_column: string_or("intraday", "target_column", d.intraday.target_column),
        lower_quantile: config.get_double("intraday", "lower_quantile", d.intraday.lower_quantile),
        upper_quantile: config.get_double("intraday", "upper_quantile", d.intraday.upper_quantile),
        edge: config.get_double("intraday", "edge", d.intraday.edge),
        horizon_minutes: narrow(
            count(
                config,
                "intraday",
                "horizon_minutes",
                d.intraday.horizon_minutes as usize,
            ),
            "intraday",
            "horizon_minutes",
        )?,
    };

    Ok(EngineSettings {
        paths,
        thresholds,
        evaluation,
        walk_forward,
        portfolio,
        model,
        intraday,
    })
}

fn run_validate(config_path: &PathBuf) -> ExitCode {
    eprintln!("Validating config: {}", config_path.display());
    let settings = match load_settings(config_path) {
        Ok(s) => s,
        Err(code) => return code,
    };
    println!("data:       {}", settings.paths.data_dir.display());
    println!("reports:    {}", settings.paths.reports_dir.display());
    println!("models:     {}", settings.paths.models_dir.display());
    println!(
        "thresholds: long > {} / short < {}",
        settings.thresholds.long, settings.thresholds.short
    );
    for t in &settings.evaluation.targets {
        println!("target:     {} -> {}", t.label_column, t.artifact);
    }
    println!(
        "pdt:        max {} round trips per {:?}",
        settings.portfolio.max_day_trades, settings.portfolio.window
    );
    println!("Configuration is valid.");
    ExitCode::SUCCESS
}

// ---------------------------------------------------------------------------
// Pipelines
// ---------------------------------------------------------------------------

/// Evaluate and train every configured daily target. A target with too
/// little data, a missing label or a failed fit is skipped; the rest still
/// run. Storage failures abort.
pub fn train_pipeline<P, F>(
    settings: &EngineSettings,
    source: &dyn FeatureSource,
    artifacts: &dyn ArtifactStore<P>,
    sink: &dyn MetricsSink,
    factory: &F,
    at: NaiveDateTime,
) -> Result<Vec<EvaluationReport>, SlopetraderError>
where
    P: Predictor,
    F: Fn() -> P,
{
    if !source.has_table(&settings.paths.eod_table) {
        warn!(table = %settings.paths.eod_table, "daily table missing, training skipped");
        return Ok(Vec::new());
    }
    let table = source.load_table(&settings.paths.eod_table)?;
    info!(table = %settings.paths.eod_table, rows = table.len(), "loaded daily features");
    let evaluator = DirectionalClassifierEvaluator::new(&settings.evaluation);

    let mut reports = Vec::new();
    for target in &settings.evaluation.targets {
        let trained = evaluator.train(
            &table,
            target,
            &settings.evaluation.excluded_columns,
            factory,
        );
        match trained {
            Ok((report, artifact)) => {
                artifacts.save(&target.artifact, &artifact)?;
                sink.append_training(&TrainingRecord::new(at, &target.artifact, &report))?;
                info!(model = %target.artifact, rows = report.rows, "model saved");
                reports.push(report);
            }
            Err(e) if e.is_insufficient_data() => {
                warn!(model = %target.artifact, error = %e, "target skipped");
            }
            Err(
                e @ (SlopetraderError::Model { .. } | SlopetraderError::MissingColumn { .. }),
            ) => {
                warn!(model = %target.artifact, error = %e, "target failed, skipped");
            }
            Err(e) => return Err(e),
        }
    }
    Ok(reports)
}

/// Run the walk-forward simulation; a non-empty report is appended to the
/// win-rate log.
pub fn walk_forward_pipeline<P, F>(
    settings: &EngineSettings,
    source: &dyn FeatureSource,
    sink: &dyn MetricsSink,
    factory: &F,
    at: NaiveDateTime,
) -> Result<WalkForwardReport, SlopetraderError>
where
    P: Predictor,
    F: Fn() -> P,
{
    if !source.has_table(&settings.paths.eod_table) {
        warn!(table = %settings.paths.eod_table, "daily table missing, walk-forward skipped");
        return Ok(WalkForwardReport::empty(0));
    }
    let table = source.load_table(&settings.paths.eod_table)?;
    let simulator = WalkForwardSimulator::new(&settings.walk_forward, settings.thresholds);
    let report = simulator.run(
        &table,
        &settings.walk_forward.label_column,
        &settings.evaluation.excluded_columns,
        factory,
    )?;
    if report.is_empty() {
        warn!(rows = report.rows, "walk-forward produced no calls, nothing logged");
    } else {
        sink.append_walk_forward(&WalkForwardRecord::new(at, &report))?;
    }
    Ok(report)
}

/// Fit the intraday forward-return model on the full intraday table. Returns
/// `None` when the table is missing or has no clean rows.
pub fn train_intraday_pipeline<P, F>(
    settings: &EngineSettings,
    source: &dyn FeatureSource,
    artifacts: &dyn ArtifactStore<P>,
    factory: &F,
) -> Result<Option<usize>, SlopetraderError>
where
    P: Predictor,
    F: Fn() -> P,
{
    let name = &settings.paths.intraday_table;
    if !source.has_table(name) {
        warn!(table = %name, "intraday table missing, skipped");
        return Ok(None);
    }
    let table = source.load_table(name)?;
    let intraday = &settings.intraday;
    let dataset =
        table.select_regression(&intraday.target_column, std::slice::from_ref(&intraday.symbol))?;
    if dataset.is_empty() {
        warn!(table = %name, "intraday table has no clean rows, skipped");
        return Ok(None);
    }
    let artifact_name = settings.intraday_artifact();
    let artifact = ModelArtifact::fit(&artifact_name, &dataset, &dataset.labels, factory)?;
    artifacts.save(&artifact_name, &artifact)?;
    info!(model = %artifact_name, rows = artifact.rows, "intraday model saved");
    Ok(Some(artifact.rows))
}

/// Latest-row directional call for every configured target that has a
/// saved artifact.
pub fn predict_pipeline<P>(
    settings: &EngineSettings,
    source: &dyn FeatureSource,
    artifacts: &dyn ArtifactStore<P>,
) -> Result<Vec<(String, PredictionCall)>, SlopetraderError>
where
    P: Predictor,
{
    let table = source.load_table(&settings.paths.eod_table)?;
    let mut calls = Vec::new();
    for target in &settings.evaluation.targets {
        let artifact = artifacts.load(&target.artifact)?;
        let call = artifact.predict_latest(&table, &settings.thresholds)?;
        calls.push((target.label_column.clone(), call));
    }
    Ok(calls)
}

/// Intraday advice for the latest row and, when booked, its ledger outcome.
#[derive(Debug, Clone, PartialEq)]
pub struct Advisory {
    pub timestamp: NaiveDateTime,
    pub zone: PriceZone,
    pub advice: Advice,
    pub confidence: f64,
    pub message: String,
    pub outcome: Option<BookingOutcome>,
}

pub fn advise_pipeline<P>(
    settings: &EngineSettings,
    source: &dyn FeatureSource,
    artifacts: &dyn ArtifactStore<P>,
    sink: &dyn MetricsSink,
    ledger_store: Option<&dyn LedgerStore>,
) -> Result<Advisory, SlopetraderError>
where
    P: Predictor,
{
    let intraday = &settings.intraday;
    let table = source.load_table(&settings.paths.intraday_table)?;
    let artifact = artifacts.load(&settings.intraday_artifact())?;
    let (timestamp, ret_lo, ret_hi) =
        artifact.quantiles_latest(&table, intraday.lower_quantile, intraday.upper_quantile)?;
    let price = table.latest_value(&intraday.symbol)?;

    let zone = PriceZone::new(price, ret_lo, ret_hi);
    let advice = zone.advise(intraday.edge);
    let confidence = sink.latest_win_rate()?.unwrap_or(DEFAULT_CONFIDENCE);
    let message = zone.describe(advice, intraday, confidence);
    info!(
        %timestamp,
        price,
        low = zone.low_target(),
        high = zone.high_target(),
        %advice,
        "intraday zone"
    );

    let outcome = match (advice.side(), ledger_store) {
        (Some(side), Some(store)) => {
            let mut ledger = PortfolioLedger::open(store, &settings.portfolio, timestamp)?;
            Some(ledger.book_persisted(store, &TradeRequest::new(side, price, timestamp))?)
        }
        _ => None,
    };

    Ok(Advisory {
        timestamp,
        zone,
        advice,
        confidence,
        message,
        outcome,
    })
}

pub fn book_pipeline(
    settings: &EngineSettings,
    store: &dyn LedgerStore,
    request: &TradeRequest,
) -> Result<BookingOutcome, SlopetraderError> {
    let mut ledger = PortfolioLedger::open(store, &settings.portfolio, request.timestamp)?;
    ledger.book_persisted(store, request)
}

// ---------------------------------------------------------------------------
// Commands
// ---------------------------------------------------------------------------

fn feature_source(settings: &EngineSettings) -> CsvFeatureAdapter {
    CsvFeatureAdapter::new(settings.paths.data_dir.clone())
}

fn artifact_store(settings: &EngineSettings) -> JsonArtifactAdapter {
    JsonArtifactAdapter::new(settings.paths.models_dir.clone())
}

fn metrics_sink(settings: &EngineSettings) -> CsvMetricsAdapter {
    CsvMetricsAdapter::new(settings.metrics_log_path(), settings.winrate_log_path())
}

fn ledger_store(settings: &EngineSettings) -> CsvLedgerAdapter {
    CsvLedgerAdapter::new(settings.ledger_path())
}

fn run_train(settings: &EngineSettings) -> Result<(), SlopetraderError> {
    let factory = || ForestPredictor::new(&settings.model);
    let reports = train_pipeline::<ForestPredictor, _>(
        settings,
        &feature_source(settings),
        &artifact_store(settings),
        &metrics_sink(settings),
        &factory,
        now(),
    )?;
    if reports.is_empty() {
        println!("No target had enough data to train.");
    }
    for report in &reports {
        let aucs: Vec<String> = report.aucs().iter().map(|a| format!("{:.3}", a)).collect();
        println!(
            "{}: rows={} splits=[{}] auc_mean={:.3}",
            report.label,
            report.rows,
            aucs.join(", "),
            report.auc_mean
        );
    }
    Ok(())
}

fn run_walk_forward(settings: &EngineSettings) -> Result<(), SlopetraderError> {
    let factory = || ForestPredictor::new(&settings.model);
    let report = walk_forward_pipeline(
        settings,
        &feature_source(settings),
        &metrics_sink(settings),
        &factory,
        now(),
    )?;
    if report.is_empty() {
        println!("Walk-forward: not enough rows ({}).", report.rows);
    } else {
        println!(
            "Walk-forward: rows={} evaluated={} trades={} wins={} win_rate={:.1}%",
            report.rows,
            report.evaluated,
            report.trades,
            report.wins,
            report.win_rate * 100.0
        );
    }
    Ok(())
}

fn run_train_intraday(settings: &EngineSettings) -> Result<(), SlopetraderError> {
    let factory = || ForestPredictor::new(&settings.model);
    match train_intraday_pipeline::<ForestPredictor, _>(
        settings,
        &feature_source(settings),
        &artifact_store(settings),
        &factory,
    )? {
        Some(rows) => println!("{}: trained on {} rows", settings.intraday_artifact(), rows),
        None => println!("Intraday training skipped."),
    }
    Ok(())
}

fn run_predict(settings: &EngineSettings) -> Result<(), SlopetraderError> {
    let store = artifact_store(settings);
    let calls = predict_pipeline::<ForestPredictor>(settings, &feature_source(settings), &store)?;
    for (label, call) in &calls {
        println!(
            "{} {}: p_up={:.3} -> {}",
            call.timestamp, label, call.value, call.action
        );
    }
    Ok(())
}

fn run_advise(settings: &EngineSettings, book: bool) -> Result<(), SlopetraderError> {
    let store = ledger_store(settings);
    let ledger: Option<&dyn LedgerStore> = if book {
        Some(&store as &dyn LedgerStore)
    } else {
        None
    };
    let advisory = advise_pipeline::<ForestPredictor>(
        settings,
        &feature_source(settings),
        &artifact_store(settings),
        &metrics_sink(settings),
        ledger,
    )?;
    println!(
        "{}  {}={:.2}  zone {:.2}-{:.2}",
        advisory.timestamp.format("%Y-%m-%d %H:%M"),
        settings.intraday.symbol,
        advisory.zone.price,
        advisory.zone.low_target(),
        advisory.zone.high_target()
    );
    match &advisory.outcome {
        Some(outcome) => println!("{}   [{}]", advisory.message, outcome),
        None => println!("{}   [no-trade]", advisory.message),
    }
    Ok(())
}

fn run_book(settings: &EngineSettings, request: TradeRequest) -> Result<(), SlopetraderError> {
    let outcome = book_pipeline(settings, &ledger_store(settings), &request)?;
    println!("{} {}@{:.2}: {}", request.side, request.qty, request.price, outcome);
    Ok(())
}

fn run_ledger(settings: &EngineSettings) -> Result<(), SlopetraderError> {
    let store = ledger_store(settings);
    let ledger = PortfolioLedger::open(&store, &settings.portfolio, now())?;
    let last = ledger.current();
    let gate_window = ledger_window_round_trips(&ledger, settings);
    println!("snapshots:  {}", ledger.len());
    println!("as of:      {}", last.timestamp);
    println!("cash:       {:.2}", last.cash);
    println!("position:   {}", last.pos);
    println!("nav:        {:.2}", last.nav);
    println!(
        "day trades: {} of {} in window",
        gate_window, settings.portfolio.max_day_trades
    );
    Ok(())
}

fn ledger_window_round_trips(ledger: &PortfolioLedger, settings: &EngineSettings) -> u32 {
    TradeGate::from_settings(&settings.portfolio)
        .round_trips_in_window(ledger.history(), ledger.current().timestamp)
}
