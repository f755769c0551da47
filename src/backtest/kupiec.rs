//! Kupiec (1995) proportion-of-failures test of unconditional coverage.
//!
//! With `T` observations, `N` violations, `pi0 = 1 - c` and `pi_hat = N / T`:
//!
//! ```text
//! LR = -2 [ (T-N) ln(1-pi0) + N ln(pi0) - (T-N) ln(1-pi_hat) - N ln(pi_hat) ]
//! ```
//!
//! `LR ~ chi2(1)` under a correctly calibrated model.

use super::{ensure_finite, stable_ln};
use crate::config::{Confidence, DEFAULT_STABILIZER};
use crate::error::{RiskError, Result};
use crate::stats::chi_squared_sf;
use serde::{Deserialize, Serialize};
use tracing::debug;

const TEST_NAME: &str = "kupiec";

/// Kupiec POF test output.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct KupiecResult {
    /// Number of observations `T`.
    pub observations: usize,
    /// Number of violations `N`.
    pub violations: usize,
    /// Nominal violation rate `1 - c`.
    pub expected_rate: f64,
    /// Empirical violation rate `N / T`.
    pub empirical_rate: f64,
    /// Likelihood-ratio statistic.
    pub lr: f64,
    pub p_value: f64,
    /// True when `N = 0` or `N = T` and the stabilizer replaced `ln(0)`.
    pub stabilized: bool,
}

impl KupiecResult {
    /// Expected number of violations `T * (1 - c)`.
    pub fn expected_violations(&self) -> f64 {
        self.observations as f64 * self.expected_rate
    }

    /// Whether coverage is rejected at `significance`.
    pub fn rejects(&self, significance: f64) -> bool {
        self.p_value < significance
    }
}

/// Kupiec test with the default stabilizer.
pub fn kupiec_test(violations: &[bool], confidence: Confidence) -> Result<KupiecResult> {
    kupiec_test_with(violations, confidence, DEFAULT_STABILIZER)
}

/// Kupiec test with an explicit stabilizing epsilon.
pub fn kupiec_test_with(
    violations: &[bool],
    confidence: Confidence,
    stabilizer: f64,
) -> Result<KupiecResult> {
    let t = violations.len();
    if t == 0 {
        return Err(RiskError::insufficient(1, 0));
    }
    let n = violations.iter().filter(|&&v| v).count();

    let pi0 = confidence.tail();
    let pi_hat = n as f64 / t as f64;
    let (tf, nf) = (t as f64, n as f64);

    let ln_null = (tf - nf) * (1.0 - pi0).ln() + nf * pi0.ln();
    let ln_alt =
        (tf - nf) * stable_ln(1.0 - pi_hat, stabilizer) + nf * stable_ln(pi_hat, stabilizer);
    let lr = -2.0 * (ln_null - ln_alt);

    let stabilized = n == 0 || n == t;
    if stabilized {
        debug!("Kupiec: N={} of T={}, boundary rate stabilized", n, t);
    }

    let p_value = chi_squared_sf(lr, 1.0)?;
    ensure_finite(TEST_NAME, &[("LR", lr), ("p-value", p_value)])?;

    Ok(KupiecResult {
        observations: t,
        violations: n,
        expected_rate: pi0,
        empirical_rate: pi_hat,
        lr,
        p_value,
        stabilized,
    })
}
