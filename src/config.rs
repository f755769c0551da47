//! Validated settings and configuration file support.
//!
//! Range checks (confidence in `(0, 1)`, window >= 2, `0 < lambda < 1`, positive
//! horizon and stabilizer) happen once, when a [`Confidence`], [`EwmaDecay`] or
//! [`RiskSettings`] is built. Everything downstream trusts those values.

use crate::error::{RiskError, Result};
use crate::optimizer::OptimizerSettings;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::Path;
use tracing::info;

/// Additive epsilon used inside logarithms and probability denominators of the
/// backtest statistics.
pub const DEFAULT_STABILIZER: f64 = 1e-12;

/// RiskMetrics daily decay factor.
pub const DEFAULT_EWMA_LAMBDA: f64 = 0.94;

/// Confidence level `c` in the open interval `(0, 1)`.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(try_from = "f64", into = "f64")]
pub struct Confidence(f64);

impl Confidence {
    pub const P95: Confidence = Confidence(0.95);
    pub const P99: Confidence = Confidence(0.99);

    pub fn new(level: f64) -> Result<Self> {
        if level.is_finite() && level > 0.0 && level < 1.0 {
            Ok(Self(level))
        } else {
            Err(RiskError::ConfigError(format!(
                "confidence must be in (0, 1), got {}",
                level
            )))
        }
    }

    /// The confidence level `c`.
    pub fn level(self) -> f64 {
        self.0
    }

    /// Tail probability `alpha = 1 - c`.
    pub fn tail(self) -> f64 {
        1.0 - self.0
    }
}

impl TryFrom<f64> for Confidence {
    type Error = RiskError;

    fn try_from(level: f64) -> Result<Self> {
        Self::new(level)
    }
}

impl From<Confidence> for f64 {
    fn from(c: Confidence) -> f64 {
        c.0
    }
}

impl fmt::Display for Confidence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.1}%", self.0 * 100.0)
    }
}

/// EWMA decay factor `lambda` in `(0, 1)`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "f64", into = "f64")]
pub struct EwmaDecay(f64);

impl EwmaDecay {
    pub fn new(lambda: f64) -> Result<Self> {
        if lambda.is_finite() && lambda > 0.0 && lambda < 1.0 {
            Ok(Self(lambda))
        } else {
            Err(RiskError::ConfigError(format!(
                "EWMA lambda must be in (0, 1), got {}",
                lambda
            )))
        }
    }

    pub fn lambda(self) -> f64 {
        self.0
    }
}

impl Default for EwmaDecay {
    fn default() -> Self {
        Self(DEFAULT_EWMA_LAMBDA)
    }
}

impl TryFrom<f64> for EwmaDecay {
    type Error = RiskError;

    fn try_from(lambda: f64) -> Result<Self> {
        Self::new(lambda)
    }
}

impl From<EwmaDecay> for f64 {
    fn from(d: EwmaDecay) -> f64 {
        d.0
    }
}

/// Validated settings shared by the estimators and backtests.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskSettings {
    /// Confidence of the rolling VaR forecast and the coverage tests.
    pub confidence: Confidence,
    /// Confidence used when the ES forecast is backtested.
    pub es_confidence: Confidence,
    /// Trailing window width of the rolling forecast.
    pub window: usize,
    /// Holding period for square-root-of-time scaling.
    pub horizon_days: f64,
    /// EWMA decay factor.
    pub decay: EwmaDecay,
    /// Confidence levels reported by the point-in-time estimators.
    pub levels: Vec<Confidence>,
    /// Epsilon used to stabilize logarithms and denominators in the backtests.
    pub stabilizer: f64,
}

impl Default for RiskSettings {
    fn default() -> Self {
        Self {
            confidence: Confidence::P99,
            es_confidence: Confidence::P99,
            window: 250,
            horizon_days: 1.0,
            decay: EwmaDecay::default(),
            levels: vec![Confidence(0.95), Confidence(0.99), Confidence(0.995)],
            stabilizer: DEFAULT_STABILIZER,
        }
    }
}

impl RiskSettings {
    /// Set the backtest confidence level.
    pub fn with_confidence(mut self, level: f64) -> Result<Self> {
        self.confidence = Confidence::new(level)?;
        Ok(self)
    }

    /// Set the rolling window width.
    pub fn with_window(mut self, window: usize) -> Self {
        self.window = window;
        self
    }

    /// Set the holding period in days.
    pub fn with_horizon(mut self, horizon_days: f64) -> Self {
        self.horizon_days = horizon_days;
        self
    }

    /// Set the stabilizing epsilon.
    pub fn with_stabilizer(mut self, epsilon: f64) -> Self {
        self.stabilizer = epsilon;
        self
    }

    /// Check the ranges not already enforced by the newtypes.
    pub fn validate(self) -> Result<Self> {
        if self.window < 2 {
            return Err(RiskError::ConfigError(format!(
                "window must be >= 2, got {}",
                self.window
            )));
        }
        if !(self.horizon_days.is_finite() && self.horizon_days > 0.0) {
            return Err(RiskError::ConfigError(format!(
                "horizon_days must be > 0, got {}",
                self.horizon_days
            )));
        }
        if !(self.stabilizer.is_finite() && self.stabilizer > 0.0) {
            return Err(RiskError::ConfigError(format!(
                "stabilizer must be > 0, got {}",
                self.stabilizer
            )));
        }
        if self.levels.is_empty() {
            return Err(RiskError::ConfigError(
                "at least one confidence level is required".to_string(),
            ));
        }
        Ok(self)
    }
}

/// Complete run configuration loaded from a TOML file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RiskFileConfig {
    #[serde(default)]
    pub portfolio: PortfolioSection,
    #[serde(default)]
    pub estimation: EstimationSection,
    #[serde(default)]
    pub backtest: BacktestSection,
    #[serde(default)]
    pub ewma: EwmaSection,
    #[serde(default)]
    pub simulation: SimulationSection,
    #[serde(default)]
    pub optimizer: OptimizerSection,
    #[serde(default)]
    pub data: DataSection,
}

/// Portfolio composition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PortfolioSection {
    /// Weights in asset column order. Normalized before use.
    #[serde(default = "default_weights")]
    pub weights: Vec<f64>,
}

fn default_weights() -> Vec<f64> { vec![0.2, 0.2, 0.6] }

impl Default for PortfolioSection {
    fn default() -> Self {
        Self {
            weights: default_weights(),
        }
    }
}

/// Point-in-time estimation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EstimationSection {
    #[serde(default = "default_levels")]
    pub confidence_levels: Vec<f64>,
    #[serde(default = "default_horizon")]
    pub horizon_days: f64,
}

fn default_levels() -> Vec<f64> { vec![0.95, 0.99, 0.995] }
fn default_horizon() -> f64 { 1.0 }

impl Default for EstimationSection {
    fn default() -> Self {
        Self {
            confidence_levels: default_levels(),
            horizon_days: 1.0,
        }
    }
}

/// Rolling forecast and backtest settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BacktestSection {
    #[serde(default = "default_backtest_confidence")]
    pub confidence: f64,
    #[serde(default = "default_backtest_confidence")]
    pub es_confidence: f64,
    #[serde(default = "default_window")]
    pub window: usize,
    #[serde(default = "default_stabilizer")]
    pub stabilizer: f64,
}

fn default_backtest_confidence() -> f64 { 0.99 }
fn default_window() -> usize { 250 }
fn default_stabilizer() -> f64 { DEFAULT_STABILIZER }

impl Default for BacktestSection {
    fn default() -> Self {
        Self {
            confidence: 0.99,
            es_confidence: 0.99,
            window: 250,
            stabilizer: DEFAULT_STABILIZER,
        }
    }
}

/// EWMA volatility settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EwmaSection {
    #[serde(default = "default_lambda")]
    pub lambda: f64,
}

fn default_lambda() -> f64 { DEFAULT_EWMA_LAMBDA }

impl Default for EwmaSection {
    fn default() -> Self {
        Self {
            lambda: DEFAULT_EWMA_LAMBDA,
        }
    }
}

/// Monte Carlo scenario settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationSection {
    /// Number of simulated days; `None` means five times the historical length.
    #[serde(default)]
    pub n_days: Option<usize>,
    #[serde(default = "default_dof")]
    pub degrees_of_freedom: f64,
    #[serde(default = "default_seed")]
    pub seed: u64,
}

fn default_dof() -> f64 { 5.0 }
fn default_seed() -> u64 { 42 }

impl Default for SimulationSection {
    fn default() -> Self {
        Self {
            n_days: None,
            degrees_of_freedom: 5.0,
            seed: 42,
        }
    }
}

/// Weight search settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptimizerSection {
    #[serde(default = "default_portfolios")]
    pub n_portfolios: usize,
    #[serde(default = "default_es_objective")]
    pub es_confidence: f64,
    #[serde(default)]
    pub risk_free_rate: f64,
    #[serde(default = "default_annualization")]
    pub annualization_factor: f64,
}

fn default_portfolios() -> usize { 2000 }
fn default_es_objective() -> f64 { 0.95 }
fn default_annualization() -> f64 { 252.0 }

impl Default for OptimizerSection {
    fn default() -> Self {
        Self {
            n_portfolios: 2000,
            es_confidence: 0.95,
            risk_free_rate: 0.0,
            annualization_factor: 252.0,
        }
    }
}

impl OptimizerSection {
    /// Validated optimizer settings for the given holding period.
    pub fn to_settings(&self, horizon_days: f64) -> Result<OptimizerSettings> {
        OptimizerSettings {
            n_portfolios: self.n_portfolios,
            es_confidence: Confidence::new(self.es_confidence)?,
            horizon_days,
            risk_free_rate: self.risk_free_rate,
            annualization_factor: self.annualization_factor,
        }
        .validate()
    }
}

/// Input data settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DataSection {
    /// Path to a CSV of asset returns or prices.
    pub path: Option<String>,
    /// Whether `path` holds prices (log-returns are derived) rather than returns.
    #[serde(default)]
    pub prices: bool,
    /// Date format in the CSV.
    pub date_format: Option<String>,
    /// Start date (YYYY-MM-DD format).
    pub start_date: Option<String>,
    /// End date (YYYY-MM-DD format).
    pub end_date: Option<String>,
}

impl DataSection {
    /// Parsed `(start, end)` bounds.
    pub fn date_range(&self) -> Result<(Option<NaiveDate>, Option<NaiveDate>)> {
        let parse = |s: &Option<String>| -> Result<Option<NaiveDate>> {
            s.as_deref()
                .map(|d| NaiveDate::parse_from_str(d, "%Y-%m-%d"))
                .transpose()
                .map_err(RiskError::from)
        };
        Ok((parse(&self.start_date)?, parse(&self.end_date)?))
    }
}

impl RiskFileConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        info!("Loading configuration from: {}", path.display());

        let content = fs::read_to_string(path)?;
        let config: RiskFileConfig = toml::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to a TOML file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let content =
            toml::to_string_pretty(self).map_err(|e| RiskError::ConfigError(e.to_string()))?;
        fs::write(path, content)?;
        Ok(())
    }

    /// Example configuration written by `tailrisk init`.
    pub fn example() -> Self {
        Self {
            data: DataSection {
                path: Some("data/returns.csv".to_string()),
                start_date: Some("2018-01-01".to_string()),
                ..Default::default()
            },
            ..Default::default()
        }
    }

    /// Validate every range and build the shared [`RiskSettings`].
    pub fn to_settings(&self) -> Result<RiskSettings> {
        let levels = self
            .estimation
            .confidence_levels
            .iter()
            .map(|&c| Confidence::new(c))
            .collect::<Result<Vec<_>>>()?;

        RiskSettings {
            confidence: Confidence::new(self.backtest.confidence)?,
            es_confidence: Confidence::new(self.backtest.es_confidence)?,
            window: self.backtest.window,
            horizon_days: self.estimation.horizon_days,
            decay: EwmaDecay::new(self.ewma.lambda)?,
            levels,
            stabilizer: self.backtest.stabilizer,
        }
        .validate()
    }
}
