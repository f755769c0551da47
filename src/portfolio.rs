//! Portfolio return projection.
//!
//! Maps a multi-asset return matrix and a weight vector to a single scalar
//! return series.

use crate::error::{RiskError, Result};
use crate::types::{ReturnMatrix, ReturnSeries};
use tracing::debug;

/// Normalize weights so they sum to one.
///
/// Fails with [`RiskError::InvalidWeights`] when the sum is zero or not finite.
pub fn normalize_weights(weights: &[f64]) -> Result<Vec<f64>> {
    if weights.is_empty() {
        return Err(RiskError::InvalidWeights("weight vector is empty".to_string()));
    }
    if weights.iter().any(|w| !w.is_finite()) {
        return Err(RiskError::InvalidWeights(format!(
            "weights must be finite: {:?}",
            weights
        )));
    }
    let sum: f64 = weights.iter().sum();
    if sum == 0.0 {
        return Err(RiskError::InvalidWeights(format!(
            "weights sum to zero: {:?}",
            weights
        )));
    }
    Ok(weights.iter().map(|w| w / sum).collect())
}

/// Project a `T x N` return matrix onto normalized weights.
///
/// Rows whose projected value is missing are dropped, never imputed; the
/// surviving rows keep their original date order.
pub fn project(returns: &ReturnMatrix, weights: &[f64]) -> Result<ReturnSeries> {
    if weights.len() != returns.n_assets() {
        return Err(RiskError::InvalidWeights(format!(
            "{} weights for {} assets",
            weights.len(),
            returns.n_assets()
        )));
    }
    let w = normalize_weights(weights)?;

    let values: Vec<f64> = returns
        .rows()
        .iter()
        .map(|row| row.iter().zip(&w).map(|(r, w)| r * w).sum())
        .collect();

    let series = ReturnSeries::dropping_missing(returns.dates().to_vec(), values)?;
    debug!(
        "Projected {} rows onto {} assets ({} kept)",
        returns.len(),
        returns.n_assets(),
        series.len()
    );
    Ok(series)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_weights() {
        let w = normalize_weights(&[1.0, 1.0, 2.0]).unwrap();
        assert_eq!(w, vec![0.25, 0.25, 0.5]);

        let w = normalize_weights(&[0.2, 0.2, 0.6]).unwrap();
        assert!((w.iter().sum::<f64>() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_zero_sum_weights_rejected() {
        let result = normalize_weights(&[1.0, -1.0]);
        assert!(matches!(result, Err(RiskError::InvalidWeights(_))));
        assert!(normalize_weights(&[]).is_err());
    }

    #[test]
    fn test_project_dot_product() {
        let m = ReturnMatrix::from_rows(vec![vec![0.01, 0.03], vec![-0.02, 0.02]]).unwrap();
        let series = project(&m, &[1.0, 3.0]).unwrap();

        assert_eq!(series.len(), 2);
        assert!((series.values()[0] - (0.25 * 0.01 + 0.75 * 0.03)).abs() < 1e-15);
        assert!((series.values()[1] - (0.25 * -0.02 + 0.75 * 0.02)).abs() < 1e-15);
    }

    #[test]
    fn test_project_drops_missing_rows() {
        let m = ReturnMatrix::from_rows(vec![
            vec![0.01, 0.02],
            vec![f64::NAN, 0.02],
            vec![0.03, 0.04],
        ])
        .unwrap();
        let series = project(&m, &[0.5, 0.5]).unwrap();

        assert_eq!(series.len(), 2);
        assert_eq!(series.dates()[0], m.dates()[0]);
        assert_eq!(series.dates()[1], m.dates()[2]);
    }

    #[test]
    fn test_project_weight_count_mismatch() {
        let m = ReturnMatrix::from_rows(vec![vec![0.01, 0.02]]).unwrap();
        assert!(matches!(
            project(&m, &[1.0]),
            Err(RiskError::InvalidWeights(_))
        ));
    }

    #[test]
    fn test_project_does_not_mutate_input() {
        let m = ReturnMatrix::from_rows(vec![vec![0.01, 0.02], vec![0.03, 0.04]]).unwrap();
        let before = m.clone();
        let _ = project(&m, &[2.0, 2.0]).unwrap();
        assert_eq!(m, before);
    }
}
