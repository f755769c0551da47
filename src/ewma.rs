//! EWMA (RiskMetrics) volatility and the parametric VaR/ES it implies.
//!
//! `sigma_0^2` is the unconditional sample variance; afterwards
//! `sigma_t^2 = lambda * sigma_{t-1}^2 + (1 - lambda) * r_{t-1}^2`.
//!
//! VaR/ES assume returns are conditionally normal given `sigma_T`, a different
//! tail assumption from [`crate::historical`]. The two are never mixed in one
//! backtest.

use crate::config::{Confidence, EwmaDecay};
use crate::error::{RiskError, Result};
use crate::stats::{normal_pdf, normal_quantile, sample_variance};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Latest-day EWMA estimate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EwmaEstimate {
    pub var: f64,
    pub es: f64,
    /// Latest EWMA volatility `sigma_T`.
    pub sigma: f64,
}

/// Full EWMA volatility path, one value per input return.
pub fn ewma_volatility(returns: &[f64], decay: EwmaDecay) -> Result<Vec<f64>> {
    if returns.len() < 2 {
        return Err(RiskError::insufficient(2, returns.len()));
    }
    if returns.iter().any(|r| !r.is_finite()) {
        return Err(RiskError::InvalidInput(
            "return sample contains missing values".to_string(),
        ));
    }

    let lambda = decay.lambda();
    let mut variance = sample_variance(returns);
    let mut vols = Vec::with_capacity(returns.len());
    vols.push(variance.sqrt());
    for r in &returns[..returns.len() - 1] {
        variance = lambda * variance + (1.0 - lambda) * r * r;
        vols.push(variance.sqrt());
    }
    Ok(vols)
}

/// Parametric VaR/ES from the latest EWMA volatility.
///
/// `VaR = z * sigma_T` and `ES = sigma_T * phi(z) / (1 - c)` with `z = Phi^-1(c)`.
pub fn ewma_var_es(returns: &[f64], confidence: Confidence, decay: EwmaDecay) -> Result<EwmaEstimate> {
    let vols = ewma_volatility(returns, decay)?;
    let sigma = vols.last().copied().unwrap_or(0.0);

    let z = normal_quantile(confidence.level())?;
    let var = z * sigma;
    let es = sigma * normal_pdf(z)? / confidence.tail();

    debug!(
        "EWMA lambda={} sigma_T={:.6} z={:.4}",
        decay.lambda(),
        sigma,
        z
    );
    Ok(EwmaEstimate { var, es, sigma })
}
