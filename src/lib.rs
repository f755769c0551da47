//! Tailrisk - historical VaR/ES estimation and tail-risk model validation.
//!
//! # Overview
//!
//! Tailrisk estimates Value-at-Risk and Expected Shortfall for a weighted
//! multi-asset portfolio and checks whether those forecasts would have held up
//! on the realized returns:
//!
//! - **Historical simulation**: VaR/ES from the empirical loss distribution
//! - **EWMA volatility**: RiskMetrics conditional volatility and normal VaR/ES
//! - **Rolling forecasts**: one-step-ahead VaR/ES over a trailing window
//! - **Backtests**: Kupiec POF, Christoffersen independence and conditional
//!   coverage, Acerbi-Szekely ES
//! - **Scenario generation**: calibrated multivariate Student-t returns
//! - **Weight search**: minimum-ES and maximum-Sharpe long-only portfolios
//! - **Configuration files**: TOML-based settings for reproducible runs
//!
//! # Quick Start
//!
//! ```no_run
//! use tailrisk::{
//!     backtest::run_backtests,
//!     config::RiskSettings,
//!     data::{load_returns_csv, DataConfig},
//!     portfolio::project,
//! };
//!
//! let returns = load_returns_csv("data/returns.csv", &DataConfig::default()).unwrap();
//! let series = project(&returns, &[0.2, 0.2, 0.6]).unwrap();
//!
//! let report = run_backtests(&series, &RiskSettings::default()).unwrap();
//! println!("Violations: {} of {}", report.violations, report.observations);
//! println!("Verdict: {}", report.verdict(0.05).label());
//! ```
//!
//! # Conventions
//!
//! Returns are daily log-returns; losses are `-return`. VaR and ES are
//! reported as non-negative loss magnitudes. A forecast for date `t` only uses
//! returns strictly before `t`.

pub mod backtest;
pub mod config;
pub mod data;
pub mod error;
pub mod ewma;
pub mod historical;
pub mod monte_carlo;
pub mod optimizer;
pub mod portfolio;
pub mod report;
pub mod rolling;
pub mod stats;
pub mod types;

pub use error::{Result, RiskError};

// Core types
pub use config::{Confidence, EwmaDecay, RiskFileConfig, RiskSettings};
pub use types::{
    AssetMatrix, ForecastPoint, PriceMatrix, ReturnMatrix, ReturnSeries, VarEs, VarEsForecast,
};

// Estimators
pub use ewma::{ewma_var_es, ewma_volatility, EwmaEstimate};
pub use historical::{estimate_var_es, portfolio_var_es, var_es_table, VarEsRow};
pub use portfolio::{normalize_weights, project};
pub use rolling::{aligned_losses, rolling_forecast, rolling_var_es};

// Backtests
pub use backtest::{
    acerbi_szekely_test, christoffersen_test, confidence_sweep, kupiec_test, run_backtests,
    violations, AcerbiSzekelyResult, BacktestReport, ChristoffersenResult, KupiecResult, Verdict,
};

// Data handling
pub use data::{load_prices_csv, load_returns_csv, log_returns, DataConfig};

// Scenarios and weight search
pub use monte_carlo::StudentTSimulator;
pub use optimizer::{
    efficient_frontier, max_sharpe_weights, min_es_weights, FrontierPoint, OptimizerSettings,
};
