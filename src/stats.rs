//! Distribution helpers and sample moments.

use crate::error::{RiskError, Result};
use statrs::distribution::{ChiSquared, Continuous, ContinuousCDF, Normal};

fn standard_normal() -> Result<Normal> {
    Normal::new(0.0, 1.0).map_err(|e| RiskError::InvalidInput(e.to_string()))
}

/// Upper-tail probability `1 - F(x)` of a chi-squared distribution.
///
/// Non-positive statistics map to 1.
pub fn chi_squared_sf(x: f64, dof: f64) -> Result<f64> {
    if x <= 0.0 {
        return Ok(1.0);
    }
    let chi = ChiSquared::new(dof).map_err(|e| RiskError::InvalidInput(e.to_string()))?;
    Ok((1.0 - chi.cdf(x)).clamp(0.0, 1.0))
}

/// Standard normal CDF `Phi(x)`.
pub fn normal_cdf(x: f64) -> Result<f64> {
    Ok(standard_normal()?.cdf(x))
}

/// Standard normal density `phi(x)`.
pub fn normal_pdf(x: f64) -> Result<f64> {
    Ok(standard_normal()?.pdf(x))
}

/// Inverse standard normal CDF `Phi^-1(p)`.
pub fn normal_quantile(p: f64) -> Result<f64> {
    Ok(standard_normal()?.inverse_cdf(p))
}

pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Sample variance with an `n - 1` denominator. Zero for fewer than two values.
pub fn sample_variance(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let m = mean(values);
    values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / (values.len() - 1) as f64
}

pub fn sample_std(values: &[f64]) -> f64 {
    sample_variance(values).sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chi_squared_sf() {
        // 95th percentile of chi2(1) is 3.841
        let p = chi_squared_sf(3.841_458_820_694_124, 1.0).unwrap();
        assert!((p - 0.05).abs() < 1e-6);

        // 95th percentile of chi2(2) is 5.991
        let p = chi_squared_sf(5.991_464_547_107_979, 2.0).unwrap();
        assert!((p - 0.05).abs() < 1e-6);

        assert_eq!(chi_squared_sf(0.0, 1.0).unwrap(), 1.0);
        assert_eq!(chi_squared_sf(-1e-9, 2.0).unwrap(), 1.0);
    }

    #[test]
    fn test_normal_helpers() {
        assert!((normal_cdf(0.0).unwrap() - 0.5).abs() < 1e-12);
        assert!((normal_quantile(0.99).unwrap() - 2.326_347_874).abs() < 1e-6);
        assert!((normal_pdf(0.0).unwrap() - 0.398_942_280_4).abs() < 1e-9);
    }

    #[test]
    fn test_sample_moments() {
        let values = [1.0, 2.0, 3.0, 4.0];
        assert!((mean(&values) - 2.5).abs() < 1e-12);
        assert!((sample_variance(&values) - 5.0 / 3.0).abs() < 1e-12);
        assert_eq!(sample_variance(&[1.0]), 0.0);
        assert_eq!(mean(&[]), 0.0);
    }
}
