//! Loading wide-format asset CSVs.
//!
//! The first column holds the date, every other column one asset. Blank or
//! unparsable cells become missing values (NaN); they are never imputed.

use crate::config::DataSection;
use crate::error::{RiskError, Result};
use crate::types::{AssetMatrix, PriceMatrix, ReturnMatrix};
use chrono::{NaiveDate, NaiveDateTime};
use csv::ReaderBuilder;
use std::fs::File;
use std::io::{BufRead, BufReader, Read, Write};
use std::path::Path;
use tracing::{debug, info, warn};

/// CSV parsing options.
#[derive(Debug, Clone)]
pub struct DataConfig {
    /// Date format string (e.g. "%Y-%m-%d"). If None, common formats are tried.
    pub date_format: Option<String>,
    /// CSV delimiter character. If None, delimiter is auto-detected.
    pub delimiter: Option<u8>,
    /// Skip rows whose date cannot be parsed instead of failing.
    pub skip_invalid: bool,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            date_format: None,
            delimiter: None,
            skip_invalid: true,
        }
    }
}

impl DataConfig {
    pub fn with_date_format(mut self, format: impl Into<String>) -> Self {
        self.date_format = Some(format.into());
        self
    }

    pub fn with_delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = Some(delimiter);
        self
    }
}

fn count_fields(line: &str, delim: u8) -> usize {
    line.as_bytes().iter().filter(|&&b| b == delim).count() + 1
}

/// Pick the delimiter giving the most consistent multi-column split of the
/// first few lines.
fn detect_delimiter(lines: &[String]) -> u8 {
    let delimiters = [b',', b'\t', b';', b'|'];

    let mut best_delimiter = b',';
    let mut best_score = 0;
    for &delim in &delimiters {
        let counts: Vec<usize> = lines.iter().map(|l| count_fields(l, delim)).collect();
        let Some(&first) = counts.first() else {
            continue;
        };
        if first >= 2 && counts.iter().all(|&c| c == first) && first > best_score {
            best_score = first;
            best_delimiter = delim;
        }
    }

    debug!(
        "Detected delimiter {:?} with {} fields",
        best_delimiter as char, best_score
    );
    best_delimiter
}

fn sniff_delimiter(path: &Path) -> Result<u8> {
    let reader = BufReader::new(File::open(path)?);
    let lines: Vec<String> = reader.lines().take(5).filter_map(|l| l.ok()).collect();
    Ok(detect_delimiter(&lines))
}

/// Parse a date cell, trying the explicit format first.
fn parse_date(s: &str, format: Option<&str>) -> Result<NaiveDate> {
    let s = s.trim();
    if let Some(fmt) = format {
        if let Ok(d) = NaiveDate::parse_from_str(s, fmt) {
            return Ok(d);
        }
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Ok(dt.date());
        }
    }

    let date_formats = [
        "%Y-%m-%d",
        "%Y/%m/%d",
        "%d-%m-%Y",
        "%d/%m/%Y",
        "%m/%d/%Y",
        "%d-%b-%Y",  // 15-Jan-2024
        "%d %b %Y",  // 15 Jan 2024
        "%b %d, %Y", // Jan 15, 2024
    ];
    for fmt in &date_formats {
        if let Ok(d) = NaiveDate::parse_from_str(s, fmt) {
            return Ok(d);
        }
    }

    let datetime_formats = [
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%dT%H:%M:%SZ",
        "%Y-%m-%d %H:%M:%S%:z",
    ];
    for fmt in &datetime_formats {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Ok(dt.date());
        }
    }

    Err(RiskError::DataError(format!("Could not parse date: '{}'", s)))
}

/// Parse a numeric cell; blank or unparsable cells are missing.
fn parse_cell(s: &str) -> f64 {
    s.trim().parse::<f64>().unwrap_or(f64::NAN)
}

/// Parse a wide-format CSV from any reader.
pub fn parse_matrix_csv<R: Read>(reader: R, delimiter: u8, config: &DataConfig) -> Result<AssetMatrix> {
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .delimiter(delimiter)
        .flexible(true)
        .from_reader(reader);

    let headers = reader.headers()?.clone();
    if headers.len() < 2 {
        return Err(RiskError::DataError(format!(
            "expected a date column and at least one asset column, found {} columns",
            headers.len()
        )));
    }
    let assets: Vec<String> = headers.iter().skip(1).map(|h| h.trim().to_string()).collect();

    let mut rows: Vec<(NaiveDate, Vec<f64>)> = Vec::new();
    let mut skipped = 0;
    for (row_num, record) in reader.records().enumerate() {
        let record = record?;
        let raw_date = record.get(0).unwrap_or_default();
        let date = match parse_date(raw_date, config.date_format.as_deref()) {
            Ok(d) => d,
            Err(e) if config.skip_invalid => {
                debug!("Skipping row {}: {}", row_num + 1, e);
                skipped += 1;
                continue;
            }
            Err(e) => return Err(e),
        };
        let values = (1..=assets.len())
            .map(|j| record.get(j).map(parse_cell).unwrap_or(f64::NAN))
            .collect();
        rows.push((date, values));
    }

    if skipped > 0 {
        warn!("Skipped {} rows with unparsable dates", skipped);
    }
    if rows.is_empty() {
        return Err(RiskError::DataError("no data rows".to_string()));
    }

    rows.sort_by_key(|(d, _)| *d);
    if let Some(w) = rows.windows(2).find(|w| w[0].0 == w[1].0) {
        return Err(RiskError::DataError(format!("duplicate date {}", w[0].0)));
    }

    let (dates, values): (Vec<_>, Vec<_>) = rows.into_iter().unzip();
    AssetMatrix::new(dates, assets, values)
}

fn load_matrix(path: &Path, config: &DataConfig) -> Result<AssetMatrix> {
    let delimiter = match config.delimiter {
        Some(d) => d,
        None => sniff_delimiter(path)?,
    };
    let matrix = parse_matrix_csv(File::open(path)?, delimiter, config)?;
    info!(
        "Loaded {} rows x {} assets from {} ({} to {})",
        matrix.len(),
        matrix.n_assets(),
        path.display(),
        matrix
            .dates()
            .first()
            .map(|d| d.to_string())
            .unwrap_or_default(),
        matrix
            .dates()
            .last()
            .map(|d| d.to_string())
            .unwrap_or_default()
    );
    Ok(matrix)
}

/// Load a matrix of per-asset log-returns.
pub fn load_returns_csv(path: impl AsRef<Path>, config: &DataConfig) -> Result<ReturnMatrix> {
    load_matrix(path.as_ref(), config)
}

/// Load a matrix of per-asset prices.
pub fn load_prices_csv(path: impl AsRef<Path>, config: &DataConfig) -> Result<PriceMatrix> {
    load_matrix(path.as_ref(), config)
}

/// Daily log-returns `ln(P_t / P_{t-1})`.
///
/// The first date is dropped. A return is missing when either price is
/// missing or non-positive.
pub fn log_returns(prices: &PriceMatrix) -> Result<ReturnMatrix> {
    if prices.len() < 2 {
        return Err(RiskError::insufficient(2, prices.len()));
    }
    let rows = prices
        .rows()
        .windows(2)
        .map(|w| {
            w[0].iter()
                .zip(&w[1])
                .map(|(&prev, &curr)| {
                    if prev > 0.0 && curr > 0.0 {
                        (curr / prev).ln()
                    } else {
                        f64::NAN
                    }
                })
                .collect()
        })
        .collect();
    ReturnMatrix::new(prices.dates()[1..].to_vec(), prices.assets().to_vec(), rows)
}

/// Write a matrix as a wide-format CSV; missing cells are left blank.
pub fn write_matrix_csv<W: Write>(matrix: &AssetMatrix, writer: W) -> Result<()> {
    let mut writer = csv::Writer::from_writer(writer);
    let mut header = vec!["date".to_string()];
    header.extend(matrix.assets().iter().cloned());
    writer.write_record(&header)?;
    for (date, row) in matrix.dates().iter().zip(matrix.rows()) {
        let mut record = vec![date.format("%Y-%m-%d").to_string()];
        record.extend(row.iter().map(|v| {
            if v.is_finite() {
                v.to_string()
            } else {
                String::new()
            }
        }));
        writer.write_record(&record)?;
    }
    writer.flush()?;
    Ok(())
}

/// Load the returns described by a `[data]` config section.
///
/// Prices are converted with [`log_returns`]; the date range is applied last.
pub fn load_from_section(section: &DataSection) -> Result<ReturnMatrix> {
    let path = section
        .path
        .as_deref()
        .ok_or_else(|| RiskError::ConfigError("[data] path is not set".to_string()))?;
    let config = DataConfig {
        date_format: section.date_format.clone(),
        ..Default::default()
    };

    let returns = if section.prices {
        log_returns(&load_prices_csv(path, &config)?)?
    } else {
        load_returns_csv(path, &config)?
    };
    let (start, end) = section.date_range()?;
    Ok(returns.between(start, end))
}
