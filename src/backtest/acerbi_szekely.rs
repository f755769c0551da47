//! Acerbi-Szekely (2014) unconditional Expected Shortfall backtest.
//!
//! For each forecast day, `Z_t = I_t (L_t - ES_t) / ES_t` where
//! `I_t = 1{L_t > VaR_t}` (and `Z_t = 0` without a violation). The test
//! statistic is `sqrt(T) * mean(Z) / (sd(Z) + eps)` with an `n - 1` standard
//! deviation.
//!
//! The test is one-sided: only positive scores (ES systematically too low) are
//! evidence against the model, so `p = 1 - Phi(score)`. An over-conservative ES
//! produces a large p-value and is not flagged.

use super::{ensure_finite, violations};
use crate::config::{Confidence, DEFAULT_STABILIZER};
use crate::error::{RiskError, Result};
use crate::stats::{mean, normal_cdf, sample_std};
use crate::types::VarEsForecast;
use serde::{Deserialize, Serialize};
use tracing::debug;

const TEST_NAME: &str = "acerbi-szekely";

/// Acerbi-Szekely test output.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AcerbiSzekelyResult {
    /// Number of forecast days `T`.
    pub observations: usize,
    /// Number of VaR violations.
    pub violations: usize,
    /// Nominal ES confidence the forecast was produced at.
    pub confidence: f64,
    /// Mean of `Z_t`.
    pub z_bar: f64,
    pub z_score: f64,
    /// One-sided p-value `1 - Phi(z_score)`.
    pub p_value: f64,
    /// True when `sd(Z) = 0` and the stabilizer kept the score finite.
    pub stabilized: bool,
}

impl AcerbiSzekelyResult {
    /// Whether "ES is adequate" is rejected in favour of "ES is too low".
    pub fn rejects(&self, significance: f64) -> bool {
        self.p_value < significance
    }
}

/// Acerbi-Szekely test with the default stabilizer.
pub fn acerbi_szekely_test(
    losses: &[f64],
    forecast: &VarEsForecast,
    confidence: Confidence,
) -> Result<AcerbiSzekelyResult> {
    acerbi_szekely_test_with(losses, forecast, confidence, DEFAULT_STABILIZER)
}

/// Acerbi-Szekely test with an explicit stabilizing epsilon.
///
/// `losses[t]` must be the realized loss on `forecast.points[t].date`.
pub fn acerbi_szekely_test_with(
    losses: &[f64],
    forecast: &VarEsForecast,
    confidence: Confidence,
    stabilizer: f64,
) -> Result<AcerbiSzekelyResult> {
    let t = losses.len();
    let hits = violations(losses, &forecast.var())?;
    if t < 2 {
        return Err(RiskError::insufficient(2, t));
    }

    let mut z = Vec::with_capacity(t);
    for ((&loss, point), &hit) in losses.iter().zip(&forecast.points).zip(&hits) {
        if !hit {
            z.push(0.0);
            continue;
        }
        if !(point.es.is_finite() && point.es > 0.0) {
            return Err(RiskError::degenerate(
                TEST_NAME,
                format!("non-positive ES forecast {} on violation date {}", point.es, point.date),
            ));
        }
        z.push((loss - point.es) / point.es);
    }

    let z_bar = mean(&z);
    let sd = sample_std(&z);
    let z_score = (t as f64).sqrt() * z_bar / (sd + stabilizer);
    let p_value = 1.0 - normal_cdf(z_score)?;
    let stabilized = sd == 0.0;
    let n_violations = hits.iter().filter(|&&h| h).count();

    debug!(
        "Acerbi-Szekely: T={} violations={} z_bar={:.6} score={:.4}",
        t, n_violations, z_bar, z_score
    );
    ensure_finite(
        TEST_NAME,
        &[("Z_bar", z_bar), ("Z-score", z_score), ("p-value", p_value)],
    )?;

    Ok(AcerbiSzekelyResult {
        observations: t,
        violations: n_violations,
        confidence: confidence.level(),
        z_bar,
        z_score,
        p_value,
        stabilized,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ForecastPoint;
    use chrono::{Duration, NaiveDate};

    fn c() -> Confidence {
        Confidence::new(0.975).unwrap()
    }

    fn flat_forecast(n: usize, var: f64, es: f64) -> VarEsForecast {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        VarEsForecast {
            window: 250,
            confidence: 0.975,
            points: (0..n)
                .map(|i| ForecastPoint {
                    date: start + Duration::days(i as i64),
                    var,
                    es,
                })
                .collect(),
        }
    }

    #[test]
    fn test_no_violations_gives_half() {
        let losses = vec![0.01; 100];
        let forecast = flat_forecast(100, 1.0, 2.0);
        let r = acerbi_szekely_test(&losses, &forecast, c()).unwrap();

        assert_eq!(r.violations, 0);
        assert_eq!(r.z_bar, 0.0);
        assert_eq!(r.z_score, 0.0);
        assert!((r.p_value - 0.5).abs() < 1e-12);
        assert!(r.stabilized);
    }

    #[test]
    fn test_understated_es_rejected() {
        // violations run far beyond ES
        let mut losses = vec![0.0; 100];
        for i in (0..100).step_by(4) {
            losses[i] = 0.10;
        }
        let forecast = flat_forecast(100, 0.02, 0.03);
        let r = acerbi_szekely_test(&losses, &forecast, c()).unwrap();

        assert_eq!(r.violations, 25);
        assert!(r.z_bar > 0.0);
        assert!(r.z_score > 2.0);
        assert!(r.rejects(0.05));
    }

    #[test]
    fn test_conservative_es_not_flagged() {
        // violations land well below ES: negative score, one-sided test keeps H0
        let mut losses = vec![0.0; 100];
        for i in (0..100).step_by(10) {
            losses[i] = 0.025;
        }
        let forecast = flat_forecast(100, 0.02, 0.10);
        let r = acerbi_szekely_test(&losses, &forecast, c()).unwrap();

        assert!(r.z_score < 0.0);
        assert!(r.p_value > 0.5);
        assert!(!r.rejects(0.05));
    }

    #[test]
    fn test_single_violation() {
        let mut losses = vec![0.0; 50];
        losses[10] = 0.05;
        let forecast = flat_forecast(50, 0.02, 0.04);
        let r = acerbi_szekely_test(&losses, &forecast, c()).unwrap();

        assert_eq!(r.violations, 1);
        assert!(!r.stabilized);
        let z = 0.25;
        let expected_bar = z / 50.0;
        assert!((r.z_bar - expected_bar).abs() < 1e-12);
    }

    #[test]
    fn test_zero_es_on_violation_is_degenerate() {
        let losses = vec![0.01, 0.0];
        let forecast = flat_forecast(2, 0.0, 0.0);
        assert!(matches!(
            acerbi_szekely_test(&losses, &forecast, c()),
            Err(RiskError::DegenerateStatistic { .. })
        ));
    }

    #[test]
    fn test_length_mismatch() {
        let forecast = flat_forecast(3, 0.02, 0.03);
        assert!(matches!(
            acerbi_szekely_test(&[0.01, 0.02], &forecast, c()),
            Err(RiskError::InvalidInput(_))
        ));
    }
}
