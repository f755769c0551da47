//! Historical-simulation VaR and Expected Shortfall.
//!
//! Losses are `-returns`, sorted ascending. With `alpha = 1 - c` and
//! `k = max(1, floor(alpha * n + 1e-9))`:
//!
//! - VaR is the k-th largest loss (position `n - k` of the ascending sort),
//! - ES is the mean of the k largest losses.
//!
//! The rolling generator in [`crate::rolling`] uses exactly the same
//! convention, so a single-window estimate and the matching rolling row agree.
//! Both measures are reported as non-negative loss magnitudes and scaled by
//! `sqrt(horizon_days)`.

use crate::config::Confidence;
use crate::error::{RiskError, Result};
use crate::portfolio::project;
use crate::types::{ReturnMatrix, VarEs};
use serde::{Deserialize, Serialize};

/// Minimum sample size accepted by the estimator.
pub const MIN_SAMPLE: usize = 2;

/// Absorbs representation error in `alpha * n` (e.g. `0.1 * 100 = 9.999...`).
const TAIL_COUNT_TOLERANCE: f64 = 1e-9;

/// Number of observations in the tail, clamped to at least one.
pub fn tail_count(confidence: Confidence, n: usize) -> usize {
    ((confidence.tail() * n as f64 + TAIL_COUNT_TOLERANCE).floor() as usize).clamp(1, n.max(1))
}

/// VaR/ES of an already sorted (ascending) loss sample, unscaled.
pub(crate) fn var_es_from_sorted_losses(sorted: &[f64], confidence: Confidence) -> VarEs {
    let n = sorted.len();
    let k = tail_count(confidence, n);
    let tail = &sorted[n - k..];
    let var = tail[0];
    let es = tail.iter().sum::<f64>() / k as f64;
    VarEs {
        var: var.max(0.0),
        es: es.max(0.0),
    }
}

pub(crate) fn sorted_losses(returns: &[f64]) -> Vec<f64> {
    let mut losses: Vec<f64> = returns.iter().map(|r| -r).collect();
    losses.sort_by(|a, b| a.total_cmp(b));
    losses
}

/// Point-in-time historical VaR and ES.
///
/// Fails with [`RiskError::InsufficientSample`] when fewer than two returns are
/// supplied.
///
/// # Example
///
/// ```
/// use tailrisk::config::Confidence;
/// use tailrisk::historical::estimate_var_es;
///
/// let returns = [-0.05, -0.02, 0.01, 0.03, -0.01, 0.02, 0.00, 0.01, -0.03, 0.04];
/// let c = Confidence::new(0.9).unwrap();
/// let est = estimate_var_es(&returns, c, 1.0).unwrap();
/// assert!((est.var - 0.05).abs() < 1e-12);
/// assert!(est.es >= est.var);
/// ```
pub fn estimate_var_es(returns: &[f64], confidence: Confidence, horizon_days: f64) -> Result<VarEs> {
    if returns.len() < MIN_SAMPLE {
        return Err(RiskError::insufficient(MIN_SAMPLE, returns.len()));
    }
    if returns.iter().any(|r| !r.is_finite()) {
        return Err(RiskError::InvalidInput(
            "return sample contains missing values".to_string(),
        ));
    }
    if !(horizon_days.is_finite() && horizon_days > 0.0) {
        return Err(RiskError::InvalidInput(format!(
            "horizon_days must be > 0, got {}",
            horizon_days
        )));
    }

    let losses = sorted_losses(returns);
    Ok(var_es_from_sorted_losses(&losses, confidence).scaled(horizon_days.sqrt()))
}

/// One row of a multi-level VaR/ES table.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VarEsRow {
    pub confidence: f64,
    pub var: f64,
    pub es: f64,
}

/// VaR/ES at several confidence levels, in the order given.
pub fn var_es_table(
    returns: &[f64],
    levels: &[Confidence],
    horizon_days: f64,
) -> Result<Vec<VarEsRow>> {
    levels
        .iter()
        .map(|&c| {
            estimate_var_es(returns, c, horizon_days).map(|v| VarEsRow {
                confidence: c.level(),
                var: v.var,
                es: v.es,
            })
        })
        .collect()
}

/// Project asset returns onto `weights`, then tabulate VaR/ES per level.
pub fn portfolio_var_es(
    returns: &ReturnMatrix,
    weights: &[f64],
    levels: &[Confidence],
    horizon_days: f64,
) -> Result<Vec<VarEsRow>> {
    let series = project(returns, weights)?;
    var_es_table(series.values(), levels, horizon_days)
}
