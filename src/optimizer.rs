//! Random-search portfolio weights: ES-minimizing, Sharpe-maximizing, and the
//! ES/Sharpe frontier.
//!
//! Candidates are long-only, fully invested weight vectors drawn from a flat
//! Dirichlet distribution, plus the equal-weight portfolio. Sampling uses the
//! caller's RNG sequentially; evaluation runs in parallel with rayon, so a
//! seeded RNG gives the same answer regardless of thread count.

use crate::config::Confidence;
use crate::error::{RiskError, Result};
use crate::historical::estimate_var_es;
use crate::portfolio::project;
use crate::stats::{mean, sample_std};
use crate::types::ReturnMatrix;
use rand::Rng;
use rand_distr::{Dirichlet, Distribution};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Weight search settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptimizerSettings {
    /// Number of random portfolios to draw.
    pub n_portfolios: usize,
    /// Confidence of the ES objective.
    pub es_confidence: Confidence,
    pub horizon_days: f64,
    /// Annual risk-free rate.
    pub risk_free_rate: f64,
    /// Periods per year (252 for daily data).
    pub annualization_factor: f64,
}

impl Default for OptimizerSettings {
    fn default() -> Self {
        Self {
            n_portfolios: 2000,
            es_confidence: Confidence::P95,
            horizon_days: 1.0,
            risk_free_rate: 0.0,
            annualization_factor: 252.0,
        }
    }
}

impl OptimizerSettings {
    pub fn validate(self) -> Result<Self> {
        if self.n_portfolios == 0 {
            return Err(RiskError::ConfigError(
                "n_portfolios must be > 0".to_string(),
            ));
        }
        if !(self.annualization_factor.is_finite() && self.annualization_factor > 0.0) {
            return Err(RiskError::ConfigError(format!(
                "annualization_factor must be > 0, got {}",
                self.annualization_factor
            )));
        }
        if !(self.horizon_days.is_finite() && self.horizon_days > 0.0) {
            return Err(RiskError::ConfigError(format!(
                "horizon_days must be > 0, got {}",
                self.horizon_days
            )));
        }
        Ok(self)
    }
}

/// One evaluated portfolio.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrontierPoint {
    pub weights: Vec<f64>,
    /// Historical ES at the objective confidence.
    pub es: f64,
    /// Annualized Sharpe ratio.
    pub sharpe: f64,
    /// Annualized mean return.
    pub annual_return: f64,
}

/// Annualized Sharpe ratio `(mean - rf / A) / std * sqrt(A)`; zero when the
/// standard deviation is zero.
pub fn annualized_sharpe(returns: &[f64], risk_free_rate: f64, annualization_factor: f64) -> f64 {
    let sigma = sample_std(returns);
    if sigma == 0.0 {
        return 0.0;
    }
    let rf_period = risk_free_rate / annualization_factor;
    (mean(returns) - rf_period) / sigma * annualization_factor.sqrt()
}

/// Evaluate a single weight vector.
pub fn evaluate_weights(
    returns: &ReturnMatrix,
    weights: &[f64],
    settings: &OptimizerSettings,
) -> Result<FrontierPoint> {
    let series = project(returns, weights)?;
    let est = estimate_var_es(series.values(), settings.es_confidence, settings.horizon_days)?;
    let total: f64 = weights.iter().sum();
    Ok(FrontierPoint {
        weights: weights.iter().map(|w| w / total).collect(),
        es: est.es,
        sharpe: annualized_sharpe(
            series.values(),
            settings.risk_free_rate,
            settings.annualization_factor,
        ),
        annual_return: mean(series.values()) * settings.annualization_factor,
    })
}

/// Draw `n` long-only weight vectors from a flat Dirichlet distribution.
pub fn random_weights<R: Rng + ?Sized>(n_assets: usize, n: usize, rng: &mut R) -> Result<Vec<Vec<f64>>> {
    match n_assets {
        0 => Err(RiskError::InvalidWeights("no assets to weight".to_string())),
        1 => Ok(vec![vec![1.0]; n]),
        _ => {
            let alpha = vec![1.0; n_assets];
            let dirichlet = Dirichlet::new(&alpha[..])
                .map_err(|e| RiskError::InvalidInput(e.to_string()))?;
            Ok((0..n).map(|_| dirichlet.sample(rng)).collect())
        }
    }
}

/// Evaluate the equal-weight portfolio and `n_portfolios` random portfolios.
///
/// Points are returned in sampling order, equal weight first.
pub fn sample_portfolios<R: Rng + ?Sized>(
    returns: &ReturnMatrix,
    settings: &OptimizerSettings,
    rng: &mut R,
) -> Result<Vec<FrontierPoint>> {
    let n_assets = returns.n_assets();
    let mut candidates = vec![vec![1.0 / n_assets as f64; n_assets]];
    candidates.extend(random_weights(n_assets, settings.n_portfolios, rng)?);

    info!(
        "Evaluating {} portfolios over {} assets",
        candidates.len(),
        n_assets
    );
    candidates
        .par_iter()
        .map(|w| evaluate_weights(returns, w, settings))
        .collect()
}

/// All sampled portfolios, sorted by ES ascending.
pub fn efficient_frontier<R: Rng + ?Sized>(
    returns: &ReturnMatrix,
    settings: &OptimizerSettings,
    rng: &mut R,
) -> Result<Vec<FrontierPoint>> {
    let mut points = sample_portfolios(returns, settings, rng)?;
    points.sort_by(|a, b| a.es.total_cmp(&b.es));
    Ok(points)
}

/// Portfolios not dominated by any other (lower ES and higher Sharpe).
///
/// `points` must be sorted by ES ascending, as returned by
/// [`efficient_frontier`].
pub fn pareto_front(points: &[FrontierPoint]) -> Vec<FrontierPoint> {
    let mut best_sharpe = f64::NEG_INFINITY;
    points
        .iter()
        .filter(|p| {
            let keep = p.sharpe > best_sharpe;
            if keep {
                best_sharpe = p.sharpe;
            }
            keep
        })
        .cloned()
        .collect()
}

/// Sampled portfolio with the lowest ES.
pub fn min_es_weights<R: Rng + ?Sized>(
    returns: &ReturnMatrix,
    settings: &OptimizerSettings,
    rng: &mut R,
) -> Result<FrontierPoint> {
    let best = sample_portfolios(returns, settings, rng)?
        .into_iter()
        .min_by(|a, b| a.es.total_cmp(&b.es))
        .ok_or_else(|| RiskError::InvalidInput("no portfolios evaluated".to_string()))?;
    debug!("Min-ES weights {:?} (ES {:.6})", best.weights, best.es);
    Ok(best)
}

/// Sampled portfolio with the highest annualized Sharpe ratio.
pub fn max_sharpe_weights<R: Rng + ?Sized>(
    returns: &ReturnMatrix,
    settings: &OptimizerSettings,
    rng: &mut R,
) -> Result<FrontierPoint> {
    let best = sample_portfolios(returns, settings, rng)?
        .into_iter()
        .max_by(|a, b| a.sharpe.total_cmp(&b.sharpe))
        .ok_or_else(|| RiskError::InvalidInput("no portfolios evaluated".to_string()))?;
    debug!("Max-Sharpe weights {:?} (Sharpe {:.3})", best.weights, best.sharpe);
    Ok(best)
}
