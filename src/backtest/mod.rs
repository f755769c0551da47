//! Statistical backtests of VaR/ES forecasts.
//!
//! - [`kupiec`]: proportion-of-failures (unconditional coverage)
//! - [`christoffersen`]: Markov independence and conditional coverage
//! - [`acerbi_szekely`]: unconditional Expected Shortfall test
//!
//! # Degenerate cases
//!
//! All three tests follow one policy. Every logarithm of an estimated
//! probability is evaluated as `ln(p + eps)` and every estimated-probability or
//! standard-deviation denominator is padded by `eps`, where `eps` is the
//! stabilizer from [`RiskSettings`] (default
//! [`DEFAULT_STABILIZER`](crate::config::DEFAULT_STABILIZER)). Results for
//! which the padding was load-bearing (zero violations, a never-visited Markov
//! state, zero variance of the ES statistic) carry `stabilized = true`.
//! Inputs with no finite limit fail with
//! [`RiskError::InsufficientSample`] or [`RiskError::DegenerateStatistic`]
//! instead of returning NaN.
//!
//! Callers supply date-aligned inputs; misalignment cannot be detected here.

pub mod acerbi_szekely;
pub mod christoffersen;
pub mod kupiec;

pub use acerbi_szekely::{acerbi_szekely_test, acerbi_szekely_test_with, AcerbiSzekelyResult};
pub use christoffersen::{christoffersen_test, christoffersen_test_with, ChristoffersenResult};
pub use kupiec::{kupiec_test, kupiec_test_with, KupiecResult};

use crate::config::{Confidence, RiskSettings};
use crate::error::{RiskError, Result};
use crate::rolling::{aligned_losses, rolling_forecast};
use crate::types::ReturnSeries;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// `ln(p + eps)`.
pub(crate) fn stable_ln(p: f64, eps: f64) -> f64 {
    (p + eps).ln()
}

/// Fail with `DegenerateStatistic` if any named value is not finite.
pub(crate) fn ensure_finite(test: &'static str, values: &[(&str, f64)]) -> Result<()> {
    match values.iter().find(|(_, v)| !v.is_finite()) {
        Some((name, v)) => Err(RiskError::degenerate(test, format!("{} is {}", name, v))),
        None => Ok(()),
    }
}

/// Violation indicators: `loss_t > var_t`, strictly.
pub fn violations(losses: &[f64], var: &[f64]) -> Result<Vec<bool>> {
    if losses.len() != var.len() {
        return Err(RiskError::InvalidInput(format!(
            "{} losses for {} VaR forecasts",
            losses.len(),
            var.len()
        )));
    }
    Ok(losses.iter().zip(var).map(|(l, v)| l > v).collect())
}

/// Model acceptance decision at a significance level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Verdict {
    /// No test rejected the model.
    Accept,
    /// At least one test rejected the model.
    Reject,
    /// No test rejected, but at least one could not be computed.
    Inconclusive,
}

impl Verdict {
    pub fn label(&self) -> &'static str {
        match self {
            Verdict::Accept => "accept",
            Verdict::Reject => "reject",
            Verdict::Inconclusive => "inconclusive",
        }
    }
}

/// Rolling forecast plus the three backtests at one confidence level.
///
/// Each test keeps its own `Result` so a degenerate test never hides the others.
#[derive(Debug)]
pub struct BacktestReport {
    pub confidence: f64,
    pub window: usize,
    /// Number of forecast days.
    pub observations: usize,
    /// Number of VaR violations over the forecast days.
    pub violations: usize,
    pub kupiec: Result<KupiecResult>,
    pub christoffersen: Result<ChristoffersenResult>,
    pub acerbi_szekely: Result<AcerbiSzekelyResult>,
}

impl BacktestReport {
    /// Empirical violation rate.
    pub fn violation_rate(&self) -> f64 {
        if self.observations == 0 {
            return 0.0;
        }
        self.violations as f64 / self.observations as f64
    }

    /// Combine the three tests into a single decision.
    pub fn verdict(&self, significance: f64) -> Verdict {
        let outcomes = [
            self.kupiec.as_ref().map(|r| r.rejects(significance)).ok(),
            self.christoffersen
                .as_ref()
                .map(|r| r.rejects(significance))
                .ok(),
            self.acerbi_szekely
                .as_ref()
                .map(|r| r.rejects(significance))
                .ok(),
        ];
        if outcomes.iter().any(|o| *o == Some(true)) {
            Verdict::Reject
        } else if outcomes.iter().any(|o| o.is_none()) {
            Verdict::Inconclusive
        } else {
            Verdict::Accept
        }
    }
}

/// Run the rolling forecast and all three backtests on a return series.
///
/// `settings` is validated on entry. Fails only if the settings are out of
/// range or the forecast itself cannot be produced.
pub fn run_backtests(series: &ReturnSeries, settings: &RiskSettings) -> Result<BacktestReport> {
    let settings = settings.clone().validate()?;
    info!(
        "Backtesting {} VaR over {} returns (window {})",
        settings.confidence,
        series.len(),
        settings.window
    );
    let forecast = rolling_forecast(series, settings.confidence, settings.window)?;
    let losses = aligned_losses(series, &forecast)?;
    let hits = violations(&losses, &forecast.var())?;
    let n_violations = hits.iter().filter(|&&h| h).count();

    let kupiec = kupiec_test_with(&hits, settings.confidence, settings.stabilizer);
    let christoffersen = christoffersen_test_with(&hits, settings.confidence, settings.stabilizer);

    let acerbi_szekely = if settings.es_confidence == settings.confidence {
        acerbi_szekely_test_with(&losses, &forecast, settings.es_confidence, settings.stabilizer)
    } else {
        rolling_forecast(series, settings.es_confidence, settings.window).and_then(|es_forecast| {
            acerbi_szekely_test_with(
                &losses,
                &es_forecast,
                settings.es_confidence,
                settings.stabilizer,
            )
        })
    };

    for (name, err) in [
        ("Kupiec", kupiec.as_ref().err()),
        ("Christoffersen", christoffersen.as_ref().err()),
        ("Acerbi-Szekely", acerbi_szekely.as_ref().err()),
    ] {
        if let Some(e) = err {
            warn!("{} test failed at {}: {}", name, settings.confidence, e);
        }
    }

    Ok(BacktestReport {
        confidence: settings.confidence.level(),
        window: settings.window,
        observations: hits.len(),
        violations: n_violations,
        kupiec,
        christoffersen,
        acerbi_szekely,
    })
}

/// Independent backtest reports for several confidence levels, computed in parallel.
///
/// Each level is backtested for both VaR and ES at that level. A failure at one
/// level is reported in place and never prevents the others.
pub fn confidence_sweep(
    series: &ReturnSeries,
    levels: &[Confidence],
    settings: &RiskSettings,
) -> Vec<(Confidence, Result<BacktestReport>)> {
    levels
        .par_iter()
        .map(|&level| {
            let level_settings = RiskSettings {
                confidence: level,
                es_confidence: level,
                ..settings.clone()
            };
            (level, run_backtests(series, &level_settings))
        })
        .collect()
}
