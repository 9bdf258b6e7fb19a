//! CLI definition and dispatch.
//!
//! Tables go to stdout; progress and errors go to stderr.

use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use std::fs;
use std::io::{self, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use crate::adapters::csv_adapter::CsvAdapter;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::adapters::json_store_adapter::JsonStoreAdapter;
use crate::domain::analyzer::{Analyzer, BuildRequest};
use crate::domain::config_validation::{validate_data_config, validate_store_config};
use crate::domain::error::AnalyzerError;
use crate::domain::grading::ReportCard;
use crate::domain::metrics::MetricsReport;
use crate::domain::optimizer::EfficientFrontier;
use crate::domain::portfolio::{AllocationMethod, Portfolio};
use crate::domain::risk::MonteCarloConfig;
use crate::ports::config_port::ConfigPort;
use crate::ports::portfolio_store_port::PortfolioStorePort;

#[derive(Parser, Debug)]
#[command(name = "portfolio-analyzer", about = "Portfolio analytics over historical prices")]
pub struct Cli {
    /// INI configuration file
    #[arg(short, long)]
    pub config: PathBuf,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Build a portfolio from prices and save it
    Build {
        #[arg(short, long)]
        name: String,
        /// Comma-separated tickers
        #[arg(short, long, value_delimiter = ',', required = true)]
        tickers: Vec<String>,
        /// equal, custom or optimized
        #[arg(short, long, default_value = "equal")]
        allocation: AllocationMethod,
        /// Comma-separated weights for custom allocation
        #[arg(short, long, value_delimiter = ',')]
        weights: Option<Vec<f64>>,
        #[arg(long)]
        start: NaiveDate,
        #[arg(long)]
        end: NaiveDate,
    },
    /// Performance metrics for a saved portfolio
    Metrics {
        name: String,
        #[arg(short, long)]
        benchmark: Option<String>,
    },
    /// Max-Sharpe weights for a saved portfolio
    Optimize {
        name: String,
        /// Replace the saved portfolio with the optimized one
        #[arg(long)]
        save: bool,
    },
    /// Sample the efficient frontier as CSV
    Frontier {
        name: String,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Trading signal and stance per holding
    Signals { name: String },
    /// Forward risk and Monte Carlo simulation
    Risk {
        name: String,
        #[arg(long, default_value_t = 1000)]
        paths: usize,
        #[arg(long, default_value_t = 252)]
        days: usize,
    },
    /// Market regimes over the portfolio history
    Regimes { name: String },
    /// A-F report card
    Grade {
        name: String,
        #[arg(short, long)]
        benchmark: Option<String>,
    },
    /// Full analysis as JSON
    Analyze {
        name: String,
        #[arg(short, long)]
        benchmark: Option<String>,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// List saved portfolios
    List,
    /// Delete a saved portfolio
    Delete { name: String },
    /// Validate the configuration file
    Validate,
}

pub fn run(cli: Cli) -> ExitCode {
    match execute(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            (&e).into()
        }
    }
}

fn execute(cli: Cli) -> Result<(), AnalyzerError> {
    eprintln!("Loading config from {}", cli.config.display());
    let config = FileConfigAdapter::from_file(&cli.config)?;

    if let Command::Validate = cli.command {
        return run_validate(&config);
    }

    let analytics = config.analytics_config()?;
    let market_data = CsvAdapter::new(PathBuf::from(validate_data_config(&config)?));
    let store = open_store(&config)?;
    let mut analyzer = Analyzer::new(&market_data, store.as_ref(), analytics);

    match cli.command {
        Command::Build {
            name,
            tickers,
            allocation,
            weights,
            start,
            end,
        } => {
            let request = BuildRequest {
                name,
                tickers: tickers.iter().map(|t| t.trim().to_uppercase()).collect(),
                allocation,
                weights,
                start,
                end,
            };
            eprintln!(
                "Building {} from {} tickers, {} to {}",
                request.name,
                request.tickers.len(),
                request.start,
                request.end
            );
            let portfolio = analyzer.build_portfolio(&request)?;
            analyzer.save_portfolio(&portfolio)?;
            print_portfolio(&portfolio);
            Ok(())
        }
        Command::Metrics { name, benchmark } => {
            let portfolio = analyzer.load_portfolio(&name)?;
            let report = analyzer.metrics(&portfolio, benchmark.as_deref())?;
            print_metrics(&report);
            Ok(())
        }
        Command::Optimize { name, save } => {
            let portfolio = analyzer.load_portfolio(&name)?;
            let (optimized, result) = analyzer.reoptimize(&portfolio)?;
            if !result.converged {
                eprintln!("warning: optimizer did not converge; showing best feasible weights");
            }
            println!("{:<10} {:>10} {:>10}", "Ticker", "Current", "Optimized");
            for ((ticker, current), new) in portfolio.holdings().zip(&optimized.weights) {
                println!("{:<10} {:>9.2}% {:>9.2}%", ticker, current * 100.0, new * 100.0);
            }
            println!();
            println!("Expected Return:  {}", pct(result.stats.expected_return));
            println!("Volatility:       {}", pct(result.stats.volatility));
            println!("Sharpe Ratio:     {}", ratio(result.stats.sharpe));
            if save {
                analyzer.save_portfolio(&optimized)?;
                eprintln!("Saved optimized weights to {}", name);
            }
            Ok(())
        }
        Command::Frontier { name, output } => {
            let portfolio = analyzer.load_portfolio(&name)?;
            let frontier = analyzer.frontier(&portfolio)?;
            match output {
                Some(path) => {
                    let file = fs::File::create(&path)?;
                    write_frontier_csv(&frontier, file)?;
                    eprintln!("Frontier written to: {}", path.display());
                }
                None => write_frontier_csv(&frontier, io::stdout().lock())?,
            }
            Ok(())
        }
        Command::Signals { name } => {
            let portfolio = analyzer.load_portfolio(&name)?;
            let holdings = analyzer.holdings(&portfolio)?;
            println!(
                "{:<10} {:<12} {:>6} {:>11} {:<11}",
                "Ticker", "Signal", "Score", "Confidence", "Stance"
            );
            for h in &holdings {
                println!(
                    "{:<10} {:<12} {:>6} {:>10.0}% {:<11}",
                    h.ticker,
                    h.signal.action.to_string(),
                    h.signal.score,
                    h.signal.confidence,
                    h.stance.to_string()
                );
            }
            for h in &holdings {
                println!("\n{}:", h.ticker);
                for vote in &h.signal.votes {
                    println!("  {:+} {:<12} {}", vote.points, vote.source, vote.reason);
                }
            }
            Ok(())
        }
        Command::Risk { name, paths, days } => {
            let portfolio = analyzer.load_portfolio(&name)?;
            let simulation = MonteCarloConfig {
                paths,
                days,
                seed: analyzer.config().seed,
            };
            let report = analyzer.risk(&portfolio, &simulation)?;
            let f = &report.forward;
            println!("Expected Annual Return: {}", pct(f.expected_annual_return));
            println!("Expected Volatility:    {}", pct(f.expected_volatility));
            println!("VaR 95%:                {}", pct(f.var_95));
            println!("VaR 99%:                {}", pct(f.var_99));
            println!("CVaR 95%:               {}", pct(f.cvar_95));
            println!("CVaR 99%:               {}", pct(f.cvar_99));
            println!("Probability of Loss:    {}", pct(f.probability_of_loss));
            println!("Max Drawdown:           {}", pct(f.historical_max_drawdown));
            let mc = &report.monte_carlo;
            println!("\nMonte Carlo ({} paths, {} days):", mc.paths, mc.days);
            println!("  5th percentile:  {:.4}", mc.terminal_p5);
            println!("  Median:          {:.4}", mc.terminal_p50);
            println!("  95th percentile: {:.4}", mc.terminal_p95);
            println!("  P(below start):  {}", pct(mc.probability_below_start));
            Ok(())
        }
        Command::Regimes { name } => {
            let portfolio = analyzer.load_portfolio(&name)?;
            let report = analyzer.regimes(&portfolio)?;
            println!(
                "{:<24} {:>6} {:>10} {:>10} {:>9}",
                "Regime", "Days", "Mean/Day", "Ann. Vol", "Win Rate"
            );
            for s in &report.statistics {
                println!(
                    "{:<24} {:>6} {:>10} {:>10} {:>9}",
                    s.regime.to_string(),
                    s.occurrences,
                    pct(s.mean_daily_return),
                    pct(s.annual_volatility),
                    pct(s.win_rate)
                );
            }
            let c = &report.current;
            println!("\nCurrent: {} (trend {:?})", c.state, c.trend);
            println!("  Volatility:   {}", pct(c.volatility));
            println!("  60d Momentum: {}", c.momentum_60d.map_or_else(|| "N/A".to_string(), pct));
            println!("  20d Return:   {}", c.return_20d.map_or_else(|| "N/A".to_string(), pct));
            Ok(())
        }
        Command::Grade { name, benchmark } => {
            let portfolio = analyzer.load_portfolio(&name)?;
            let card = analyzer.grades(&portfolio, benchmark.as_deref())?;
            print_report_card(&card);
            Ok(())
        }
        Command::Analyze {
            name,
            benchmark,
            output,
        } => {
            let portfolio = analyzer.load_portfolio(&name)?;
            let analysis = analyzer.analyze(&portfolio, benchmark.as_deref())?;
            let json = serde_json::to_string_pretty(&analysis).map_err(|e| AnalyzerError::Store {
                reason: format!("failed to serialize analysis: {}", e),
            })?;
            match output {
                Some(path) => {
                    fs::write(&path, json)?;
                    eprintln!("Analysis written to: {}", path.display());
                }
                None => println!("{}", json),
            }
            Ok(())
        }
        Command::List => {
            for name in analyzer.list_portfolios()? {
                println!("{}", name);
            }
            Ok(())
        }
        Command::Delete { name } => {
            analyzer.delete_portfolio(&name)?;
            eprintln!("Deleted {}", name);
            Ok(())
        }
        Command::Validate => run_validate(&config),
    }
}

fn run_validate(config: &FileConfigAdapter) -> Result<(), AnalyzerError> {
    let analytics = config.analytics_config()?;
    let data_path = validate_data_config(config)?;
    let (backend, store_path) = validate_store_config(config)?;

    eprintln!("Config validated successfully");
    eprintln!("  prices:         {}", data_path);
    eprintln!("  store:          {} ({})", store_path, backend);
    eprintln!("  risk-free rate: {}", pct(analytics.risk_free_rate));
    eprintln!("  alignment:      {}", analytics.align);
    Ok(())
}

pub fn open_store(config: &dyn ConfigPort) -> Result<Box<dyn PortfolioStorePort>, AnalyzerError> {
    let (backend, path) = validate_store_config(config)?;
    match backend.as_str() {
        #[cfg(feature = "sqlite")]
        "sqlite" => {
            use crate::adapters::sqlite_store_adapter::SqliteStoreAdapter;
            Ok(Box::new(SqliteStoreAdapter::from_config(config)?))
        }
        #[cfg(not(feature = "sqlite"))]
        "sqlite" => {
            let _ = path;
            Err(AnalyzerError::ConfigInvalid {
                section: "store".into(),
                key: "backend".into(),
                reason: "sqlite feature is required for the sqlite backend".into(),
            })
        }
        _ => Ok(Box::new(JsonStoreAdapter::new(path))),
    }
}

fn pct(value: f64) -> String {
    if value.is_nan() {
        "N/A".to_string()
    } else {
        format!("{:.2}%", value * 100.0)
    }
}

fn ratio(value: f64) -> String {
    if value.is_nan() {
        "N/A".to_string()
    } else {
        format!("{:.2}", value)
    }
}

/// Metrics shown as plain numbers rather than percentages.
const PLAIN_METRICS: [&str; 7] = [
    "Sharpe Ratio",
    "Sortino Ratio",
    "Calmar Ratio",
    "Omega Ratio",
    "Tail Ratio",
    "Stability",
    "Beta",
];

pub fn format_metric(name: &str, value: f64) -> String {
    if name == "Max Drawdown Duration" {
        format!("{} days", value as usize)
    } else if PLAIN_METRICS.contains(&name) {
        ratio(value)
    } else {
        pct(value)
    }
}

fn print_portfolio(portfolio: &Portfolio) {
    println!(
        "{} ({}), {} to {}, {} observations",
        portfolio.name,
        portfolio.allocation,
        portfolio.start,
        portfolio.end,
        portfolio.returns.len()
    );
    for (ticker, weight) in portfolio.holdings() {
        println!("  {:<10} {:>8.2}%", ticker, weight * 100.0);
    }
}

fn print_metrics(report: &MetricsReport) {
    println!("{:<24} {:>14}", "Metric", "Value");
    for (name, value) in report.entries() {
        println!("{:<24} {:>14}", name, format_metric(name, value));
    }
}

fn print_report_card(card: &ReportCard) {
    println!("{:<20} {:>12} {:>6}  {}", "Metric", "Value", "Grade", "Scale");
    for g in &card.grades {
        println!(
            "{:<20} {:>12} {:>6}  {}",
            g.metric,
            format_metric(g.metric, g.value),
            g.grade.to_string(),
            g.scale
        );
    }
    println!("\nOverall: {} (GPA {:.2})", card.overall, card.gpa);
}

pub fn write_frontier_csv<W: Write>(frontier: &EfficientFrontier, out: W) -> Result<(), AnalyzerError> {
    let csv_error = |e: csv::Error| AnalyzerError::Io(io::Error::other(e));
    let mut wtr = csv::Writer::from_writer(out);

    let mut header = vec![
        "kind".to_string(),
        "return".to_string(),
        "volatility".to_string(),
        "sharpe".to_string(),
    ];
    header.extend(frontier.tickers.iter().cloned());
    wtr.write_record(&header).map_err(csv_error)?;

    let rows = frontier
        .points
        .iter()
        .map(|p| ("sample", p))
        .chain(frontier.max_sharpe.iter().map(|p| ("max_sharpe", p)));
    for (kind, point) in rows {
        let mut record = vec![
            kind.to_string(),
            point.stats.expected_return.to_string(),
            point.stats.volatility.to_string(),
            point.stats.sharpe.to_string(),
        ];
        record.extend(point.weights.iter().map(|w| w.to_string()));
        wtr.write_record(&record).map_err(csv_error)?;
    }
    wtr.flush()?;
    Ok(())
}
