//! Rolling historical VaR/ES forecasts over a fixed trailing window.
//!
//! For every `t` in `[W, T)` the estimate over returns `[t - W, t)` is attached
//! to date `t`, so each forecast only sees data strictly before the day it
//! forecasts. The window does not expand.

use crate::config::Confidence;
use crate::error::{RiskError, Result};
use crate::historical::{sorted_losses, var_es_from_sorted_losses};
use crate::types::{ForecastPoint, ReturnSeries, VarEs, VarEsForecast};
use tracing::{debug, info};

/// One-step-ahead VaR/ES over bare returns; output has length `T - W`.
pub fn rolling_var_es(returns: &[f64], confidence: Confidence, window: usize) -> Result<Vec<VarEs>> {
    if window < 2 {
        return Err(RiskError::InvalidInput(format!(
            "window must be >= 2, got {}",
            window
        )));
    }
    if returns.len() <= window {
        return Err(RiskError::insufficient(window + 1, returns.len()));
    }
    if let Some(i) = returns.iter().position(|r| !r.is_finite()) {
        return Err(RiskError::InvalidInput(format!(
            "return sample contains missing values (index {})",
            i
        )));
    }

    let forecasts: Vec<VarEs> = (window..returns.len())
        .map(|t| {
            let losses = sorted_losses(&returns[t - window..t]);
            var_es_from_sorted_losses(&losses, confidence)
        })
        .collect();

    debug!(
        "Rolling forecast: {} rows from {} returns (window {})",
        forecasts.len(),
        returns.len(),
        window
    );
    Ok(forecasts)
}

/// Rolling VaR/ES forecast series attached to the forecast dates.
pub fn rolling_forecast(
    series: &ReturnSeries,
    confidence: Confidence,
    window: usize,
) -> Result<VarEsForecast> {
    info!(
        "Rolling {} VaR/ES forecast over {} returns, window {}",
        confidence,
        series.len(),
        window
    );
    let estimates = rolling_var_es(series.values(), confidence, window)?;

    let points = series.dates()[window..]
        .iter()
        .zip(estimates)
        .map(|(&date, est)| ForecastPoint {
            date,
            var: est.var,
            es: est.es,
        })
        .collect();

    Ok(VarEsForecast {
        window,
        confidence: confidence.level(),
        points,
    })
}

/// Realized losses on the forecast dates of `forecast`.
///
/// `forecast` must have been produced from `series`; the first forecast date is
/// checked against the series to catch an obvious mismatch.
pub fn aligned_losses(series: &ReturnSeries, forecast: &VarEsForecast) -> Result<Vec<f64>> {
    let start = forecast.window;
    if series.len() != start + forecast.len() {
        return Err(RiskError::InvalidInput(format!(
            "forecast of {} rows with window {} does not match a series of {} returns",
            forecast.len(),
            start,
            series.len()
        )));
    }
    if let Some(first) = forecast.points.first() {
        if series.dates()[start] != first.date {
            return Err(RiskError::InvalidInput(format!(
                "first forecast date {} does not match series date {}",
                first.date,
                series.dates()[start]
            )));
        }
    }
    Ok(series.values()[start..].iter().map(|r| -r).collect())
}
