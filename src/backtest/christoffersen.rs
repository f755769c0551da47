//! Christoffersen (1998) independence and conditional-coverage tests.
//!
//! Violations are modelled as a first-order two-state Markov chain. With
//! transition counts `n_ij` (state `i` followed by state `j`):
//!
//! ```text
//! pi0    = n01 / (n00 + n01 + eps)
//! pi1    = n11 / (n10 + n11 + eps)
//! pi_hat = (n01 + n11) / (T - 1)
//!
//! LR_uc  = -2 [ (n00+n01) ln(c) + (n10+n11) ln(1-c)
//!               - n00 ln(1-pi_hat) - (n01+n11) ln(pi_hat) ]
//! L_ind  = n00 ln(1-pi0) + n01 ln(pi0) + n10 ln(1-pi1) + n11 ln(pi1)
//! L_uc   = (n00+n10) ln(1-pi_hat) + (n01+n11) ln(pi_hat)
//! LR_ind = -2 (L_uc - L_ind)
//! LR_cc  = LR_uc + LR_ind
//! ```
//!
//! Every logarithm of an estimated probability is evaluated as `ln(p + eps)`.
//! `LR_uc` and `LR_ind` are referred to `chi2(1)`, `LR_cc` to `chi2(2)`.

use super::{ensure_finite, stable_ln};
use crate::config::{Confidence, DEFAULT_STABILIZER};
use crate::error::{RiskError, Result};
use crate::stats::chi_squared_sf;
use serde::{Deserialize, Serialize};
use tracing::debug;

const TEST_NAME: &str = "christoffersen";

/// First-order transition counts of a violation sequence.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionCounts {
    pub n00: usize,
    pub n01: usize,
    pub n10: usize,
    pub n11: usize,
}

impl TransitionCounts {
    /// Count consecutive pairs `(v[t-1], v[t])`.
    pub fn from_violations(violations: &[bool]) -> Self {
        let mut counts = Self::default();
        for pair in violations.windows(2) {
            match (pair[0], pair[1]) {
                (false, false) => counts.n00 += 1,
                (false, true) => counts.n01 += 1,
                (true, false) => counts.n10 += 1,
                (true, true) => counts.n11 += 1,
            }
        }
        counts
    }

    /// Total number of transitions, `T - 1`.
    pub fn total(&self) -> usize {
        self.n00 + self.n01 + self.n10 + self.n11
    }
}

/// Christoffersen test output.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ChristoffersenResult {
    pub n00: usize,
    pub n01: usize,
    pub n10: usize,
    pub n11: usize,
    /// Probability of a violation after a non-violation.
    pub pi0: f64,
    /// Probability of a violation after a violation.
    pub pi1: f64,
    /// Pooled violation probability.
    pub pi_hat: f64,
    pub lr_uc: f64,
    pub p_uc: f64,
    pub lr_ind: f64,
    pub p_ind: f64,
    pub lr_cc: f64,
    pub p_cc: f64,
    /// True when a Markov state was never left or a probability hit 0 or 1.
    pub stabilized: bool,
}

impl ChristoffersenResult {
    pub fn counts(&self) -> TransitionCounts {
        TransitionCounts {
            n00: self.n00,
            n01: self.n01,
            n10: self.n10,
            n11: self.n11,
        }
    }

    /// Whether conditional coverage is rejected at `significance`.
    pub fn rejects(&self, significance: f64) -> bool {
        self.p_cc < significance
    }

    /// Whether independence alone is rejected at `significance`.
    pub fn rejects_independence(&self, significance: f64) -> bool {
        self.p_ind < significance
    }
}

/// Christoffersen test with the default stabilizer.
pub fn christoffersen_test(violations: &[bool], confidence: Confidence) -> Result<ChristoffersenResult> {
    christoffersen_test_with(violations, confidence, DEFAULT_STABILIZER)
}

/// Christoffersen test with an explicit stabilizing epsilon.
pub fn christoffersen_test_with(
    violations: &[bool],
    confidence: Confidence,
    stabilizer: f64,
) -> Result<ChristoffersenResult> {
    let t = violations.len();
    if t < 2 {
        return Err(RiskError::insufficient(2, t));
    }
    let eps = stabilizer;
    let counts = TransitionCounts::from_violations(violations);
    let (n00, n01, n10, n11) = (
        counts.n00 as f64,
        counts.n01 as f64,
        counts.n10 as f64,
        counts.n11 as f64,
    );

    let pi0 = n01 / (n00 + n01 + eps);
    let pi1 = n11 / (n10 + n11 + eps);
    let pi_hat = (n01 + n11) / (t - 1) as f64;

    let c = confidence.level();
    let lr_uc = -2.0
        * ((n00 + n01) * c.ln() + (n10 + n11) * (1.0 - c).ln()
            - n00 * stable_ln(1.0 - pi_hat, eps)
            - (n01 + n11) * stable_ln(pi_hat, eps));

    let l_ind = n00 * stable_ln(1.0 - pi0, eps)
        + n01 * stable_ln(pi0, eps)
        + n10 * stable_ln(1.0 - pi1, eps)
        + n11 * stable_ln(pi1, eps);
    let l_uc = (n00 + n10) * stable_ln(1.0 - pi_hat, eps) + (n01 + n11) * stable_ln(pi_hat, eps);
    let lr_ind = -2.0 * (l_uc - l_ind);
    let lr_cc = lr_uc + lr_ind;

    let stabilized = counts.n00 + counts.n01 == 0
        || counts.n10 + counts.n11 == 0
        || [pi0, pi1, pi_hat].iter().any(|&p| p <= 0.0 || p >= 1.0);
    if stabilized {
        debug!("Christoffersen: boundary transition counts {:?}", counts);
    }

    let p_uc = chi_squared_sf(lr_uc, 1.0)?;
    let p_ind = chi_squared_sf(lr_ind, 1.0)?;
    let p_cc = chi_squared_sf(lr_cc, 2.0)?;
    ensure_finite(
        TEST_NAME,
        &[
            ("LR_uc", lr_uc),
            ("LR_ind", lr_ind),
            ("LR_cc", lr_cc),
            ("p_uc", p_uc),
            ("p_ind", p_ind),
            ("p_cc", p_cc),
        ],
    )?;

    Ok(ChristoffersenResult {
        n00: counts.n00,
        n01: counts.n01,
        n10: counts.n10,
        n11: counts.n11,
        pi0,
        pi1,
        pi_hat,
        lr_uc,
        p_uc,
        lr_ind,
        p_ind,
        lr_cc,
        p_cc,
        stabilized,
    })
}
