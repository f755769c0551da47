//! Command-line interface for the tail-risk engine.

use tailrisk::backtest::{confidence_sweep, run_backtests};
use tailrisk::config::{Confidence, DataSection, EwmaDecay, RiskFileConfig, RiskSettings};
use tailrisk::data::{load_from_section, write_matrix_csv};
use tailrisk::error::{Result, RiskError};
use tailrisk::ewma::ewma_var_es;
use tailrisk::historical::portfolio_var_es;
use tailrisk::monte_carlo::StudentTSimulator;
use tailrisk::optimizer::{
    efficient_frontier, max_sharpe_weights, min_es_weights, pareto_front, OptimizerSettings,
};
use tailrisk::portfolio::{normalize_weights, project};
use tailrisk::report::{self, BacktestSummary};
use tailrisk::types::ReturnMatrix;

use clap::{Args, Parser, Subcommand, ValueEnum};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde_json::json;
use std::fs::File;
use std::path::PathBuf;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

/// tailrisk - historical VaR/ES estimation and risk-model backtesting.
#[derive(Parser)]
#[command(name = "tailrisk")]
#[command(version)]
#[command(about = "Estimate VaR/ES and backtest tail-risk forecasts")]
#[command(long_about = None)]
pub struct Cli {
    /// Verbosity level
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Output format
    #[arg(short, long, value_enum, default_value = "text")]
    pub output: OutputFormat,

    #[command(subcommand)]
    pub command: Commands,
}

/// Input data and portfolio shared by the analysis commands.
#[derive(Args, Debug, Clone)]
pub struct DataArgs {
    /// Path to a wide CSV (date column, then one column per asset)
    #[arg(short, long)]
    pub data: PathBuf,

    /// The file holds prices; log-returns are derived
    #[arg(long)]
    pub prices: bool,

    /// Portfolio weights in column order (defaults to equal weights)
    #[arg(short, long, value_delimiter = ',')]
    pub weights: Option<Vec<f64>>,

    /// First date to use (YYYY-MM-DD)
    #[arg(long)]
    pub start: Option<String>,

    /// Last date to use (YYYY-MM-DD)
    #[arg(long)]
    pub end: Option<String>,

    /// Date format of the CSV (e.g. %d/%m/%Y)
    #[arg(long)]
    pub date_format: Option<String>,
}

impl DataArgs {
    fn load(&self) -> Result<ReturnMatrix> {
        load_from_section(&DataSection {
            path: Some(self.data.to_string_lossy().into_owned()),
            prices: self.prices,
            date_format: self.date_format.clone(),
            start_date: self.start.clone(),
            end_date: self.end.clone(),
        })
    }

    fn weights_for(&self, returns: &ReturnMatrix) -> Vec<f64> {
        self.weights
            .clone()
            .unwrap_or_else(|| vec![1.0; returns.n_assets()])
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Historical VaR/ES of a portfolio at several confidence levels
    Estimate {
        #[command(flatten)]
        data: DataArgs,

        /// Confidence levels
        #[arg(short, long, value_delimiter = ',', default_value = "0.95,0.99,0.995")]
        levels: Vec<f64>,

        /// Holding period in days
        #[arg(long, default_value = "1")]
        horizon: f64,
    },

    /// EWMA volatility and the normal VaR/ES it implies
    Ewma {
        #[command(flatten)]
        data: DataArgs,

        /// Confidence level
        #[arg(short, long, default_value = "0.99")]
        confidence: f64,

        /// Decay factor
        #[arg(long, default_value = "0.94")]
        lambda: f64,
    },

    /// Rolling VaR/ES forecast plus Kupiec, Christoffersen and Acerbi-Szekely tests
    Backtest {
        #[command(flatten)]
        data: DataArgs,

        /// VaR confidence level
        #[arg(short, long, default_value = "0.99")]
        confidence: f64,

        /// ES confidence level (defaults to the VaR level)
        #[arg(long)]
        es_confidence: Option<f64>,

        /// Rolling window width
        #[arg(long, default_value = "250")]
        window: usize,

        /// Test significance level
        #[arg(long, default_value = "0.05")]
        significance: f64,
    },

    /// Backtest several confidence levels in parallel
    Sweep {
        #[command(flatten)]
        data: DataArgs,

        /// Confidence levels
        #[arg(short, long, value_delimiter = ',', default_value = "0.95,0.99,0.995")]
        levels: Vec<f64>,

        /// Rolling window width
        #[arg(long, default_value = "250")]
        window: usize,

        /// Test significance level
        #[arg(long, default_value = "0.05")]
        significance: f64,
    },

    /// Simulate multivariate Student-t scenarios calibrated to the data
    Simulate {
        #[command(flatten)]
        data: DataArgs,

        /// Degrees of freedom
        #[arg(long, default_value = "5")]
        dof: f64,

        /// Simulated days (defaults to five times the sample length)
        #[arg(long)]
        days: Option<usize>,

        /// Random seed
        #[arg(long, default_value = "42")]
        seed: u64,

        /// Confidence levels reported on the simulated portfolio
        #[arg(short, long, value_delimiter = ',', default_value = "0.95,0.99,0.995")]
        levels: Vec<f64>,

        /// Write simulated returns to this CSV
        #[arg(long)]
        save: Option<PathBuf>,
    },

    /// Search long-only weights minimizing ES or maximizing Sharpe
    Optimize {
        #[command(flatten)]
        data: DataArgs,

        /// Number of random portfolios
        #[arg(short, long, default_value = "2000")]
        n_portfolios: usize,

        /// ES objective confidence
        #[arg(long, default_value = "0.95")]
        es_confidence: f64,

        /// Annual risk-free rate
        #[arg(long, default_value = "0")]
        risk_free_rate: f64,

        /// Random seed
        #[arg(long, default_value = "42")]
        seed: u64,

        /// Print this many points of the ES/Sharpe frontier
        #[arg(long, default_value = "0")]
        frontier: usize,
    },

    /// Create an example configuration file
    Init {
        /// Output path
        #[arg(short, long, default_value = "tailrisk.toml")]
        output: PathBuf,
    },

    /// Run every stage from a configuration file
    RunConfig {
        /// Path to configuration file
        #[arg(short, long)]
        config: PathBuf,
    },
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

impl Cli {
    /// Initialize logging based on verbosity level.
    pub fn init_logging(&self) {
        let level = match self.verbose {
            0 => Level::WARN,
            1 => Level::INFO,
            2 => Level::DEBUG,
            _ => Level::TRACE,
        };

        let subscriber = FmtSubscriber::builder()
            .with_max_level(level)
            .with_target(false)
            .with_writer(std::io::stderr)
            .finish();

        if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
            eprintln!("Failed to set tracing subscriber: {}", e);
        }
    }
}

/// Run the CLI application.
pub fn run() -> Result<()> {
    let cli = Cli::parse();
    cli.init_logging();

    match &cli.command {
        Commands::Estimate {
            data,
            levels,
            horizon,
        } => run_estimate(data, levels, *horizon, cli.output),

        Commands::Ewma {
            data,
            confidence,
            lambda,
        } => run_ewma(data, *confidence, *lambda, cli.output),

        Commands::Backtest {
            data,
            confidence,
            es_confidence,
            window,
            significance,
        } => run_backtest(
            data,
            *confidence,
            es_confidence.unwrap_or(*confidence),
            *window,
            *significance,
            cli.output,
        ),

        Commands::Sweep {
            data,
            levels,
            window,
            significance,
        } => run_sweep(data, levels, *window, *significance, cli.output),

        Commands::Simulate {
            data,
            dof,
            days,
            seed,
            levels,
            save,
        } => run_simulate(data, *dof, *days, *seed, levels, save.as_ref(), cli.output),

        Commands::Optimize {
            data,
            n_portfolios,
            es_confidence,
            risk_free_rate,
            seed,
            frontier,
        } => {
            let settings = OptimizerSettings {
                n_portfolios: *n_portfolios,
                es_confidence: Confidence::new(*es_confidence)?,
                risk_free_rate: *risk_free_rate,
                ..Default::default()
            }
            .validate()?;
            run_optimize(data, &settings, *seed, *frontier, cli.output)
        }

        Commands::Init { output } => init_config(output),

        Commands::RunConfig { config } => run_from_config(config, cli.output),
    }
}

fn parse_levels(levels: &[f64]) -> Result<Vec<Confidence>> {
    levels.iter().map(|&c| Confidence::new(c)).collect()
}

fn run_estimate(data: &DataArgs, levels: &[f64], horizon: f64, output: OutputFormat) -> Result<()> {
    let returns = data.load()?;
    let weights = data.weights_for(&returns);
    let rows = portfolio_var_es(&returns, &weights, &parse_levels(levels)?, horizon)?;

    match output {
        OutputFormat::Text => {
            println!("Historical VaR/ES ({} day horizon, {} observations)", horizon, returns.len());
            println!("{}", report::var_es_table(&rows));
        }
        OutputFormat::Json => println!("{}", report::to_json(&rows)?),
    }
    Ok(())
}

fn run_ewma(data: &DataArgs, confidence: f64, lambda: f64, output: OutputFormat) -> Result<()> {
    let returns = data.load()?;
    let series = project(&returns, &data.weights_for(&returns))?;
    let confidence = Confidence::new(confidence)?;
    let estimate = ewma_var_es(series.values(), confidence, EwmaDecay::new(lambda)?)?;

    match output {
        OutputFormat::Text => println!("{}", report::ewma_summary(&estimate, confidence, lambda)),
        OutputFormat::Json => println!("{}", report::to_json(&estimate)?),
    }
    Ok(())
}

fn run_backtest(
    data: &DataArgs,
    confidence: f64,
    es_confidence: f64,
    window: usize,
    significance: f64,
    output: OutputFormat,
) -> Result<()> {
    let returns = data.load()?;
    let series = project(&returns, &data.weights_for(&returns))?;
    let settings = RiskSettings {
        es_confidence: Confidence::new(es_confidence)?,
        ..RiskSettings::default()
    }
    .with_confidence(confidence)?
    .with_window(window)
    .validate()?;

    let backtest = run_backtests(&series, &settings)?;
    match output {
        OutputFormat::Text => println!("{}", report::backtest_text(&backtest, significance)),
        OutputFormat::Json => println!(
            "{}",
            report::to_json(&BacktestSummary::from_report(&backtest, significance))?
        ),
    }
    Ok(())
}

fn run_sweep(
    data: &DataArgs,
    levels: &[f64],
    window: usize,
    significance: f64,
    output: OutputFormat,
) -> Result<()> {
    let returns = data.load()?;
    let series = project(&returns, &data.weights_for(&returns))?;
    let settings = RiskSettings::default().with_window(window).validate()?;
    let results = confidence_sweep(&series, &parse_levels(levels)?, &settings);

    match output {
        OutputFormat::Text => println!("{}", report::sweep_table(&results, significance)),
        OutputFormat::Json => {
            let summaries: Vec<_> = results
                .iter()
                .map(|(level, r)| match r {
                    Ok(r) => json!(BacktestSummary::from_report(r, significance)),
                    Err(e) => json!({ "confidence": level.level(), "error": e.to_string() }),
                })
                .collect();
            println!("{}", report::to_json(&summaries)?);
        }
    }
    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn run_simulate(
    data: &DataArgs,
    dof: f64,
    days: Option<usize>,
    seed: u64,
    levels: &[f64],
    save: Option<&PathBuf>,
    output: OutputFormat,
) -> Result<()> {
    let returns = data.load()?;
    let simulator = StudentTSimulator::calibrate(&returns, dof)?;
    let n_days = days.unwrap_or(returns.len() * 5);
    let mut rng = StdRng::seed_from_u64(seed);
    let scenarios = simulator.simulate(n_days, &mut rng)?;

    if let Some(path) = save {
        write_matrix_csv(&scenarios, File::create(path)?)?;
        info!("Wrote {} simulated days to {}", n_days, path.display());
    }

    let weights = data.weights_for(&returns);
    let levels = parse_levels(levels)?;
    let historical = portfolio_var_es(&returns, &weights, &levels, 1.0)?;
    let simulated = portfolio_var_es(&scenarios, &weights, &levels, 1.0)?;

    match output {
        OutputFormat::Text => {
            println!("Historical ({} days):", returns.len());
            println!("{}", report::var_es_table(&historical));
            println!("Student-t simulation ({} days, dof {}):", n_days, dof);
            println!("{}", report::var_es_table(&simulated));
        }
        OutputFormat::Json => println!(
            "{}",
            report::to_json(&json!({ "historical": historical, "simulated": simulated }))?
        ),
    }
    Ok(())
}

fn run_optimize(
    data: &DataArgs,
    settings: &OptimizerSettings,
    seed: u64,
    frontier: usize,
    output: OutputFormat,
) -> Result<()> {
    let returns = data.load()?;
    let mut rng = StdRng::seed_from_u64(seed);
    let min_es = min_es_weights(&returns, settings, &mut rng)?;
    let max_sharpe = max_sharpe_weights(&returns, settings, &mut rng)?;
    let front = if frontier > 0 {
        pareto_front(&efficient_frontier(&returns, settings, &mut rng)?)
    } else {
        Vec::new()
    };

    match output {
        OutputFormat::Text => {
            println!(
                "Minimum {} ES portfolio (ES {}, Sharpe {:.3}):",
                settings.es_confidence,
                report::pct(min_es.es),
                min_es.sharpe
            );
            println!("{}", report::weights_table(returns.assets(), &min_es.weights));
            println!(
                "Maximum Sharpe portfolio (Sharpe {:.3}, ES {}):",
                max_sharpe.sharpe,
                report::pct(max_sharpe.es)
            );
            println!("{}", report::weights_table(returns.assets(), &max_sharpe.weights));
            if !front.is_empty() {
                println!("ES/Sharpe frontier:");
                println!("{}", report::frontier_table(&front, returns.assets(), frontier));
            }
        }
        OutputFormat::Json => println!(
            "{}",
            report::to_json(&json!({
                "min_es": min_es,
                "max_sharpe": max_sharpe,
                "frontier": front.iter().take(frontier).collect::<Vec<_>>(),
            }))?
        ),
    }
    Ok(())
}

fn init_config(output: &PathBuf) -> Result<()> {
    RiskFileConfig::example().save(output)?;
    println!("Created example configuration file: {}", output.display());
    println!("\nEdit this file to point at your data, then run:");
    println!("  tailrisk run-config -c {}", output.display());
    Ok(())
}

fn run_from_config(config_path: &PathBuf, output: OutputFormat) -> Result<()> {
    let file_config = RiskFileConfig::load(config_path)?;
    let settings = file_config.to_settings()?;
    let optimizer = file_config.optimizer.to_settings(settings.horizon_days)?;

    let returns = load_from_section(&file_config.data)?;
    let weights = &file_config.portfolio.weights;
    if weights.len() != returns.n_assets() {
        return Err(RiskError::ConfigError(format!(
            "{} weights configured for {} assets ({})",
            weights.len(),
            returns.n_assets(),
            returns.assets().join(", ")
        )));
    }
    let series = project(&returns, weights)?;

    let table = portfolio_var_es(&returns, weights, &settings.levels, settings.horizon_days)?;
    let ewma = ewma_var_es(series.values(), settings.confidence, settings.decay)?;
    let backtest = run_backtests(&series, &settings)?;
    let sweep = confidence_sweep(&series, &settings.levels, &settings);

    let mut rng = StdRng::seed_from_u64(file_config.simulation.seed);
    let simulator = StudentTSimulator::calibrate(&returns, file_config.simulation.degrees_of_freedom)?;
    let n_days = file_config.simulation.n_days.unwrap_or(returns.len() * 5);
    let scenarios = simulator.simulate(n_days, &mut rng)?;
    let simulated = portfolio_var_es(&scenarios, weights, &settings.levels, settings.horizon_days)?;
    let min_es = min_es_weights(&scenarios, &optimizer, &mut rng)?;
    let max_sharpe = max_sharpe_weights(&scenarios, &optimizer, &mut rng)?;

    let significance = 0.05;
    match output {
        OutputFormat::Text => {
            println!("Assets: {}", returns.assets().join(", "));
            println!("{}", report::weights_table(returns.assets(), &normalize_weights(weights)?));
            println!("\nHistorical VaR/ES:");
            println!("{}", report::var_es_table(&table));
            println!("\n{}", report::ewma_summary(&ewma, settings.confidence, settings.decay.lambda()));
            println!("\n{}", report::backtest_text(&backtest, significance));
            println!("\nConfidence sweep:");
            println!("{}", report::sweep_table(&sweep, significance));
            println!("\nStudent-t simulation ({} days, dof {}):", n_days, simulator.dof());
            println!("{}", report::var_es_table(&simulated));
            println!("\nMinimum {} ES weights (simulated):", optimizer.es_confidence);
            println!("{}", report::weights_table(returns.assets(), &min_es.weights));
            println!("Maximum Sharpe weights (simulated, Sharpe {:.3}):", max_sharpe.sharpe);
            println!("{}", report::weights_table(returns.assets(), &max_sharpe.weights));
        }
        OutputFormat::Json => {
            let sweep_json: Vec<_> = sweep
                .iter()
                .filter_map(|(_, r)| r.as_ref().ok())
                .map(|r| BacktestSummary::from_report(r, significance))
                .collect();
            println!(
                "{}",
                report::to_json(&json!({
                    "assets": returns.assets(),
                    "historical": table,
                    "ewma": ewma,
                    "backtest": BacktestSummary::from_report(&backtest, significance),
                    "sweep": sweep_json,
                    "simulated": simulated,
                    "min_es": min_es,
                    "max_sharpe": max_sharpe,
                }))?
            );
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parse() {
        let cli = Cli::try_parse_from([
            "tailrisk",
            "backtest",
            "-d",
            "returns.csv",
            "-w",
            "0.2,0.2,0.6",
            "-c",
            "0.975",
        ]);
        assert!(cli.is_ok());
        if let Ok(Cli {
            command: Commands::Backtest { data, confidence, .. },
            ..
        }) = cli
        {
            assert_eq!(data.weights, Some(vec![0.2, 0.2, 0.6]));
            assert_eq!(confidence, 0.975);
        }
    }

    #[test]
    fn test_sweep_levels_parse() {
        let cli = Cli::try_parse_from(["tailrisk", "sweep", "-d", "r.csv", "-l", "0.9,0.95"]);
        assert!(cli.is_ok());
    }

    #[test]
    fn test_init_command() {
        let cli = Cli::try_parse_from(["tailrisk", "init", "-o", "risk.toml"]);
        assert!(cli.is_ok());
    }

    #[test]
    fn test_parse_levels_rejects_out_of_range() {
        assert!(parse_levels(&[0.95, 1.0]).is_err());
    }
}
