//! CLI definition and dispatch.

use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::info;

use crate::adapters::chart_svg;
use crate::adapters::csv_adapter::CsvAdapter;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::domain::backtest::{ParameterGrid, StrategyRun, run_grid};
use crate::domain::config_validation::{
    parse_deltas, parse_holdings, parse_lookbacks, parse_methods, validate_all,
    validate_backtest_config, validate_data_config, validate_portfolio_config,
    validate_rebalance_config, validate_risk_config,
};
use crate::domain::dates::parse_date;
use crate::domain::error::RiskbalError;
use crate::domain::loader::{LoadResult, load_prices};
use crate::domain::portfolio::Portfolio;
use crate::domain::rebalance::{HistoryRow, MomentumConfig, RebalanceHistory, run_rebalance};
use crate::domain::risk::{Confidence, RiskEstimate, VarMethod, estimate};
use crate::ports::config_port::ConfigPort;
use crate::ports::data_port::DataPort;

#[derive(Parser, Debug)]
#[command(name = "riskbal", about = "Portfolio risk and momentum rebalancing")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Estimate one-day VaR and CVaR
    Risk {
        #[arg(short, long)]
        config: PathBuf,
        /// Confidence level in percent
        #[arg(long)]
        confidence: Option<f64>,
        /// historical, parametric or both
        #[arg(long)]
        method: Option<String>,
    },
    /// Run the momentum rebalancer and print weight and signal history
    Rebalance {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(long)]
        lookback: Option<usize>,
        #[arg(long)]
        delta: Option<f64>,
    },
    /// Backtest the rebalancer over a lookback/delta grid
    Backtest {
        #[arg(short, long)]
        config: PathBuf,
        /// Write a cumulative-return SVG chart here
        #[arg(long)]
        chart: Option<PathBuf>,
    },
    /// Validate a configuration without fetching data
    Validate {
        #[arg(short, long)]
        config: PathBuf,
    },
}

/// Portfolio and date window shared by every command.
#[derive(Debug, Clone)]
pub struct RunSettings {
    pub portfolio: Portfolio,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

#[derive(Debug, Clone)]
pub struct RiskSettings {
    pub confidence: Confidence,
    pub methods: Vec<VarMethod>,
}

pub fn run(cli: Cli) -> ExitCode {
    let result = match cli.command {
        Command::Risk {
            config,
            confidence,
            method,
        } => run_risk(&config, confidence, method.as_deref()),
        Command::Rebalance {
            config,
            lookback,
            delta,
        } => run_rebalance_command(&config, lookback, delta),
        Command::Backtest { config, chart } => run_backtest(&config, chart.as_deref()),
        Command::Validate { config } => run_validate(&config),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            (&e).into()
        }
    }
}

pub fn load_config(path: &Path) -> Result<FileConfigAdapter, RiskbalError> {
    FileConfigAdapter::from_file(path).map_err(|e| RiskbalError::ConfigParse {
        file: path.display().to_string(),
        reason: e.to_string(),
    })
}

pub fn build_run_settings(config: &dyn ConfigPort) -> Result<RunSettings, RiskbalError> {
    validate_portfolio_config(config)?;
    let holdings = config
        .get_string("portfolio", "holdings")
        .unwrap_or_default();
    let start = config
        .get_string("portfolio", "start_date")
        .unwrap_or_default();
    let end = config
        .get_string("portfolio", "end_date")
        .unwrap_or_default();

    Ok(RunSettings {
        portfolio: Portfolio::new(parse_holdings(&holdings)?)?,
        start_date: parse_date(&start)?,
        end_date: parse_date(&end)?,
    })
}

pub fn build_risk_settings(
    config: &dyn ConfigPort,
    confidence_override: Option<f64>,
    method_override: Option<&str>,
) -> Result<RiskSettings, RiskbalError> {
    validate_risk_config(config)?;
    let confidence = match confidence_override {
        Some(value) => value,
        None => config.get_double("risk", "confidence")?.unwrap_or(95.0),
    };
    let confidence = Confidence::new(confidence)?;
    let method = method_override
        .map(str::to_string)
        .or_else(|| config.get_string("risk", "method"));
    let methods = match method {
        Some(m) => parse_methods(&m)?,
        None => vec![VarMethod::Historical, VarMethod::Parametric],
    };
    Ok(RiskSettings {
        confidence,
        methods,
    })
}

pub fn build_momentum_config(
    config: &dyn ConfigPort,
    lookback_override: Option<usize>,
    delta_override: Option<f64>,
) -> Result<MomentumConfig, RiskbalError> {
    validate_rebalance_config(config)?;
    let defaults = MomentumConfig::default();
    let count = |key: &str, default: usize| -> Result<usize, RiskbalError> {
        Ok(config
            .get_int("rebalance", key)?
            .map_or(default, |n| n as usize))
    };
    let lookback_days = match lookback_override {
        Some(n) => n,
        None => count("lookback_days", defaults.lookback_days)?,
    };
    let delta = match delta_override {
        Some(d) => d,
        None => config.get_double("rebalance", "delta")?.unwrap_or(defaults.delta),
    };
    let momentum = MomentumConfig {
        lookback_days,
        delta,
        top_k: count("top_k", defaults.top_k)?,
        bottom_k: count("bottom_k", defaults.bottom_k)?,
    };
    momentum.validate()?;
    Ok(momentum)
}

/// Grid lists fall back to the single rebalance setting when absent.
pub fn build_parameter_grid(
    config: &dyn ConfigPort,
    base: &MomentumConfig,
) -> Result<ParameterGrid, RiskbalError> {
    validate_backtest_config(config)?;
    let lookbacks = match config.get_string("backtest", "lookbacks") {
        Some(s) => parse_lookbacks(&s)?,
        None => vec![base.lookback_days],
    };
    let deltas = match config.get_string("backtest", "deltas") {
        Some(s) => parse_deltas(&s)?,
        None => vec![base.delta],
    };
    Ok(ParameterGrid { lookbacks, deltas })
}

pub fn build_data_port(config: &dyn ConfigPort) -> Result<Box<dyn DataPort>, RiskbalError> {
    validate_data_config(config)?;
    let source = config
        .get_string("data", "source")
        .unwrap_or_else(|| "csv".to_string())
        .trim()
        .to_lowercase();

    if source == "yahoo" {
        #[cfg(feature = "yahoo")]
        {
            let retries = config.get_int("data", "retries")?.unwrap_or(0).max(0) as u32;
            let adapter = crate::adapters::yahoo_adapter::YahooAdapter::new(retries)?;
            return Ok(Box::new(adapter));
        }

        #[cfg(not(feature = "yahoo"))]
        {
            return Err(RiskbalError::ConfigInvalid {
                section: "data".into(),
                key: "source".into(),
                reason: "yahoo feature is required for source = yahoo".into(),
            });
        }
    }

    let dir = config.get_string("data", "csv_dir").unwrap_or_default();
    Ok(Box::new(CsvAdapter::new(PathBuf::from(dir.trim()))))
}

fn load(data_port: &dyn DataPort, settings: &RunSettings) -> Result<LoadResult, RiskbalError> {
    let loaded = load_prices(
        data_port,
        &settings.portfolio,
        settings.start_date,
        settings.end_date,
    )?;
    for skipped in &loaded.skipped {
        eprintln!("warning: skipping {} ({})", skipped.ticker, skipped.reason);
    }
    Ok(loaded)
}

pub fn run_risk_pipeline(
    data_port: &dyn DataPort,
    settings: &RunSettings,
    risk: &RiskSettings,
) -> Result<Vec<RiskEstimate>, RiskbalError> {
    let loaded = load(data_port, settings)?;
    let returns = loaded.prices.returns();
    Ok(risk
        .methods
        .iter()
        .map(|&method| estimate(method, &settings.portfolio, &returns, risk.confidence))
        .collect())
}

/// Runs the rebalancer and applies its final weights to the portfolio's
/// active vector. A final row the portfolio rejects fails the command.
pub fn run_rebalance_pipeline(
    data_port: &dyn DataPort,
    settings: &mut RunSettings,
    momentum: &MomentumConfig,
) -> Result<RebalanceHistory, RiskbalError> {
    let loaded = load(data_port, settings)?;
    let history = run_rebalance(&loaded.prices, momentum)?;
    if let Some(weights) = history.final_weights() {
        settings.portfolio.rebalance(&weights)?;
        info!(date = ?history.weights.last().map(|row| row.date), "active weights replaced");
    }
    Ok(history)
}

pub fn run_backtest_pipeline(
    data_port: &dyn DataPort,
    settings: &RunSettings,
    grid: &ParameterGrid,
    base: &MomentumConfig,
) -> Result<Vec<StrategyRun>, RiskbalError> {
    let loaded = load(data_port, settings)?;
    info!(
        strategies = grid.lookbacks.len() * grid.deltas.len(),
        days = loaded.prices.len(),
        "running backtest grid"
    );
    run_grid(&loaded.prices, grid, base)
}

pub fn format_risk_report(estimates: &[RiskEstimate]) -> String {
    estimates
        .iter()
        .map(|est| {
            let [var, cvar] = est.as_percent_strings();
            format!("1D {} VaR/CVaR: [{}, {}]\n", est.method.label(), var, cvar)
        })
        .collect()
}

pub fn format_history_table(tickers: &[String], rows: &[HistoryRow]) -> String {
    let mut out = format!("{:<12}", "date");
    for t in tickers {
        out.push_str(&format!("{:>10}", t));
    }
    out.push('\n');
    for row in rows {
        out.push_str(&format!("{:<12}", row.date.to_string()));
        for v in &row.values {
            out.push_str(&format!("{:>10.4}", v));
        }
        out.push('\n');
    }
    out
}

pub fn format_active_weights(portfolio: &Portfolio) -> String {
    let mut out = format!("{:<10}{:>10}{:>10}\n", "ticker", "target", "active");
    for holding in portfolio.target_weights() {
        let active = portfolio.active_weight(&holding.ticker).unwrap_or(0.0);
        out.push_str(&format!(
            "{:<10}{:>10.4}{:>10.4}\n",
            holding.ticker, holding.weight, active
        ));
    }
    out
}

pub fn format_sharpe_table(runs: &[StrategyRun]) -> String {
    let mut out = format!("{:<28}{:>10}\n", "strategy", "sharpe");
    for run in runs {
        out.push_str(&format!("{:<28}{:>10.4}\n", run.id, run.sharpe));
    }
    out
}

fn run_risk(
    config_path: &Path,
    confidence: Option<f64>,
    method: Option<&str>,
) -> Result<(), RiskbalError> {
    info!(path = %config_path.display(), "loading config");
    let config = load_config(config_path)?;
    let settings = build_run_settings(&config)?;
    let risk = build_risk_settings(&config, confidence, method)?;
    let data_port = build_data_port(&config)?;

    let estimates = run_risk_pipeline(data_port.as_ref(), &settings, &risk)?;
    print!("{}", format_risk_report(&estimates));
    Ok(())
}

fn run_rebalance_command(
    config_path: &Path,
    lookback: Option<usize>,
    delta: Option<f64>,
) -> Result<(), RiskbalError> {
    info!(path = %config_path.display(), "loading config");
    let config = load_config(config_path)?;
    let mut settings = build_run_settings(&config)?;
    let momentum = build_momentum_config(&config, lookback, delta)?;
    let data_port = build_data_port(&config)?;

    let history = run_rebalance_pipeline(data_port.as_ref(), &mut settings, &momentum)?;

    println!("Weights");
    print!("{}", format_history_table(&history.tickers, &history.weights));
    println!("\nSignals");
    print!("{}", format_history_table(&history.tickers, &history.signals));
    println!();
    print!("{}", format_active_weights(&settings.portfolio));
    Ok(())
}

fn run_backtest(config_path: &Path, chart_override: Option<&Path>) -> Result<(), RiskbalError> {
    info!(path = %config_path.display(), "loading config");
    let config = load_config(config_path)?;
    let settings = build_run_settings(&config)?;
    let base = build_momentum_config(&config, None, None)?;
    let grid = build_parameter_grid(&config, &base)?;
    let data_port = build_data_port(&config)?;

    let runs = run_backtest_pipeline(data_port.as_ref(), &settings, &grid, &base)?;
    print!("{}", format_sharpe_table(&runs));

    let chart_path = chart_override
        .map(Path::to_path_buf)
        .or_else(|| config.get_string("backtest", "chart_path").map(PathBuf::from));
    if let Some(path) = chart_path {
        chart_svg::write_cumulative_chart(&path, &runs)?;
        eprintln!("Chart written to: {}", path.display());
    }
    Ok(())
}

fn run_validate(config_path: &Path) -> Result<(), RiskbalError> {
    eprintln!("Validating config: {}", config_path.display());
    let config = load_config(config_path)?;
    validate_all(&config)?;
    let settings = build_run_settings(&config)?;
    eprintln!(
        "  {} instruments, {} to {}",
        settings.portfolio.len(),
        settings.start_date,
        settings.end_date
    );
    eprintln!("Configuration is valid.");
    Ok(())
}
