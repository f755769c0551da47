//! Core data types for the risk engine.
//!
//! All series are value types: every transformation produces a new series and
//! never mutates its input, so any stage can be re-run on the original evidence.

use crate::error::{RiskError, Result};
use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// First date assigned by [`ReturnSeries::from_values`].
const SYNTHETIC_START: (i32, u32, u32) = (2000, 1, 3);

pub(crate) fn synthetic_dates(len: usize) -> Vec<NaiveDate> {
    let (y, m, d) = SYNTHETIC_START;
    let start = NaiveDate::from_ymd_opt(y, m, d).unwrap_or_default();
    (0..len)
        .map(|i| start + Duration::days(i as i64))
        .collect()
}

fn check_increasing(dates: &[NaiveDate]) -> Result<()> {
    if let Some(w) = dates.windows(2).find(|w| w[1] <= w[0]) {
        return Err(RiskError::InvalidInput(format!(
            "dates must be strictly increasing: {} is followed by {}",
            w[0], w[1]
        )));
    }
    Ok(())
}

/// Ordered scalar return series, one log-return per trading date.
///
/// Values are always finite: missing observations are dropped on the way in,
/// never imputed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReturnSeries {
    dates: Vec<NaiveDate>,
    values: Vec<f64>,
}

impl ReturnSeries {
    /// Create a series, rejecting non-finite values and non-increasing dates.
    pub fn new(dates: Vec<NaiveDate>, values: Vec<f64>) -> Result<Self> {
        if dates.len() != values.len() {
            return Err(RiskError::InvalidInput(format!(
                "{} dates for {} values",
                dates.len(),
                values.len()
            )));
        }
        if let Some(i) = values.iter().position(|v| !v.is_finite()) {
            return Err(RiskError::InvalidInput(format!(
                "non-finite return on {}",
                dates[i]
            )));
        }
        check_increasing(&dates)?;
        Ok(Self { dates, values })
    }

    /// Create a series, dropping every date whose value is missing (NaN or infinite).
    pub fn dropping_missing(dates: Vec<NaiveDate>, values: Vec<f64>) -> Result<Self> {
        if dates.len() != values.len() {
            return Err(RiskError::InvalidInput(format!(
                "{} dates for {} values",
                dates.len(),
                values.len()
            )));
        }
        let before = values.len();
        let (dates, values): (Vec<_>, Vec<_>) = dates
            .into_iter()
            .zip(values)
            .filter(|(_, v)| v.is_finite())
            .unzip();
        if values.len() < before {
            debug!("Dropped {} missing observations", before - values.len());
        }
        check_increasing(&dates)?;
        Ok(Self { dates, values })
    }

    /// Create a series from bare values on consecutive synthetic dates.
    ///
    /// Missing values are dropped.
    pub fn from_values(values: Vec<f64>) -> Self {
        let dates = synthetic_dates(values.len());
        let (dates, values) = dates
            .into_iter()
            .zip(values)
            .filter(|(_, v)| v.is_finite())
            .unzip();
        Self { dates, values }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Losses as positive magnitudes (`-return`).
    pub fn losses(&self) -> Vec<f64> {
        self.values.iter().map(|r| -r).collect()
    }
}

/// Date-indexed matrix of per-asset observations (returns or prices).
///
/// Rows are dates, columns are assets. Missing cells are stored as NaN.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssetMatrix {
    dates: Vec<NaiveDate>,
    assets: Vec<String>,
    rows: Vec<Vec<f64>>,
}

/// Matrix of per-asset log-returns.
pub type ReturnMatrix = AssetMatrix;

/// Matrix of per-asset prices.
pub type PriceMatrix = AssetMatrix;

impl AssetMatrix {
    /// Create a matrix, checking that every row has one value per asset.
    pub fn new(dates: Vec<NaiveDate>, assets: Vec<String>, rows: Vec<Vec<f64>>) -> Result<Self> {
        if assets.is_empty() {
            return Err(RiskError::InvalidInput("matrix has no assets".to_string()));
        }
        if dates.len() != rows.len() {
            return Err(RiskError::InvalidInput(format!(
                "{} dates for {} rows",
                dates.len(),
                rows.len()
            )));
        }
        if let Some((i, row)) = rows
            .iter()
            .enumerate()
            .find(|(_, r)| r.len() != assets.len())
        {
            return Err(RiskError::InvalidInput(format!(
                "row {} ({}) has {} values, expected {}",
                i,
                dates[i],
                row.len(),
                assets.len()
            )));
        }
        check_increasing(&dates)?;
        Ok(Self {
            dates,
            assets,
            rows,
        })
    }

    /// Create a matrix on consecutive synthetic dates with generated asset names.
    pub fn from_rows(rows: Vec<Vec<f64>>) -> Result<Self> {
        let n_assets = rows.first().map(|r| r.len()).unwrap_or(0);
        let assets = (0..n_assets).map(|j| format!("ASSET_{}", j + 1)).collect();
        Self::new(synthetic_dates(rows.len()), assets, rows)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn n_assets(&self) -> usize {
        self.assets.len()
    }

    pub fn assets(&self) -> &[String] {
        &self.assets
    }

    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    pub fn rows(&self) -> &[Vec<f64>] {
        &self.rows
    }

    /// All values of one asset column, in date order.
    pub fn column(&self, asset: usize) -> Vec<f64> {
        self.rows.iter().map(|r| r[asset]).collect()
    }

    /// Rows with no missing cell.
    pub fn complete_rows(&self) -> impl Iterator<Item = &Vec<f64>> {
        self.rows.iter().filter(|r| r.iter().all(|v| v.is_finite()))
    }

    /// Restrict to dates within `[start, end]`; either bound may be open.
    pub fn between(&self, start: Option<NaiveDate>, end: Option<NaiveDate>) -> Self {
        let keep = |d: NaiveDate| start.map_or(true, |s| d >= s) && end.map_or(true, |e| d <= e);
        let (dates, rows) = self
            .dates
            .iter()
            .zip(&self.rows)
            .filter(|(d, _)| keep(**d))
            .map(|(d, r)| (*d, r.clone()))
            .unzip();
        Self {
            dates,
            assets: self.assets.clone(),
            rows,
        }
    }
}

/// Point-in-time VaR/ES pair, both positive loss magnitudes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VarEs {
    pub var: f64,
    pub es: f64,
}

impl VarEs {
    /// Scale both measures by a common factor (e.g. `sqrt(horizon_days)`).
    pub fn scaled(self, factor: f64) -> Self {
        Self {
            var: self.var * factor,
            es: self.es * factor,
        }
    }
}

/// A single row of a rolling forecast, attached to the date it forecasts.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ForecastPoint {
    pub date: NaiveDate,
    pub var: f64,
    pub es: f64,
}

/// Rolling VaR/ES forecast series.
///
/// Row `i` is estimated from input rows `[i, i + window)` and forecasts the
/// return at input row `i + window`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VarEsForecast {
    /// Width of the trailing estimation window.
    pub window: usize,
    /// Confidence level the forecasts were produced at.
    pub confidence: f64,
    pub points: Vec<ForecastPoint>,
}

impl VarEsForecast {
    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn dates(&self) -> Vec<NaiveDate> {
        self.points.iter().map(|p| p.date).collect()
    }

    pub fn var(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.var).collect()
    }

    pub fn es(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.es).collect()
    }
}
