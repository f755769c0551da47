//! Text and JSON rendering of estimates and backtest results.

use crate::backtest::{
    AcerbiSzekelyResult, BacktestReport, ChristoffersenResult, KupiecResult, Verdict,
};
use crate::config::Confidence;
use crate::error::Result;
use crate::ewma::EwmaEstimate;
use crate::historical::VarEsRow;
use crate::optimizer::FrontierPoint;
use serde::{Deserialize, Serialize};
use tabled::{builder::Builder, settings::Style};

/// Format a fraction as a percentage with four decimals.
pub fn pct(x: f64) -> String {
    format!("{:.4}%", x * 100.0)
}

fn p_value(p: f64) -> String {
    if p < 1e-4 {
        format!("{:.2e}", p)
    } else {
        format!("{:.4}", p)
    }
}

/// VaR/ES table, one row per confidence level.
pub fn var_es_table(rows: &[VarEsRow]) -> String {
    let mut builder = Builder::new();
    builder.push_record(["Confidence", "VaR", "ES"]);
    for row in rows {
        builder.push_record([
            format!("{:.1}%", row.confidence * 100.0),
            pct(row.var),
            pct(row.es),
        ]);
    }
    builder.build().with(Style::rounded()).to_string()
}

pub fn weights_table(assets: &[String], weights: &[f64]) -> String {
    let mut builder = Builder::new();
    builder.push_record(["Asset", "Weight"]);
    for (asset, w) in assets.iter().zip(weights) {
        builder.push_record([asset.clone(), format!("{:.2}%", w * 100.0)]);
    }
    builder.build().with(Style::rounded()).to_string()
}

pub fn ewma_summary(estimate: &EwmaEstimate, confidence: Confidence, lambda: f64) -> String {
    format!(
        "EWMA (lambda = {})\n  Latest volatility: {}\n  VaR {}:   {}\n  ES {}:    {}",
        lambda,
        pct(estimate.sigma),
        confidence,
        pct(estimate.var),
        confidence,
        pct(estimate.es)
    )
}

/// Serializable view of a [`BacktestReport`]; failed tests carry their error text.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BacktestSummary {
    pub confidence: f64,
    pub window: usize,
    pub observations: usize,
    pub violations: usize,
    pub violation_rate: f64,
    pub significance: f64,
    pub verdict: Verdict,
    pub kupiec: Option<KupiecResult>,
    pub christoffersen: Option<ChristoffersenResult>,
    pub acerbi_szekely: Option<AcerbiSzekelyResult>,
    pub errors: Vec<String>,
}

impl BacktestSummary {
    pub fn from_report(report: &BacktestReport, significance: f64) -> Self {
        let mut errors = Vec::new();
        let mut keep = |name: &str, msg: Option<String>| {
            if let Some(m) = msg {
                errors.push(format!("{}: {}", name, m));
            }
        };
        keep("kupiec", report.kupiec.as_ref().err().map(|e| e.to_string()));
        keep(
            "christoffersen",
            report.christoffersen.as_ref().err().map(|e| e.to_string()),
        );
        keep(
            "acerbi-szekely",
            report.acerbi_szekely.as_ref().err().map(|e| e.to_string()),
        );

        Self {
            confidence: report.confidence,
            window: report.window,
            observations: report.observations,
            violations: report.violations,
            violation_rate: report.violation_rate(),
            significance,
            verdict: report.verdict(significance),
            kupiec: report.kupiec.as_ref().ok().copied(),
            christoffersen: report.christoffersen.as_ref().ok().copied(),
            acerbi_szekely: report.acerbi_szekely.as_ref().ok().copied(),
            errors,
        }
    }
}

fn decision(rejects: bool) -> &'static str {
    if rejects {
        "REJECT"
    } else {
        "accept"
    }
}

/// Multi-line report of the three backtests at one confidence level.
pub fn backtest_text(report: &BacktestReport, significance: f64) -> String {
    let mut builder = Builder::new();
    builder.push_record(["Test", "Statistic", "p-value", "Decision"]);

    match &report.kupiec {
        Ok(k) => builder.push_record([
            "Kupiec POF".to_string(),
            format!("{:.4}", k.lr),
            p_value(k.p_value),
            decision(k.rejects(significance)).to_string(),
        ]),
        Err(e) => builder.push_record(["Kupiec POF".to_string(), e.to_string(), "-".into(), "n/a".into()]),
    }
    match &report.christoffersen {
        Ok(c) => {
            builder.push_record([
                "Christoffersen ind".to_string(),
                format!("{:.4}", c.lr_ind),
                p_value(c.p_ind),
                decision(c.rejects_independence(significance)).to_string(),
            ]);
            builder.push_record([
                "Christoffersen cc".to_string(),
                format!("{:.4}", c.lr_cc),
                p_value(c.p_cc),
                decision(c.rejects(significance)).to_string(),
            ]);
        }
        Err(e) => builder.push_record([
            "Christoffersen".to_string(),
            e.to_string(),
            "-".into(),
            "n/a".into(),
        ]),
    }
    match &report.acerbi_szekely {
        Ok(a) => builder.push_record([
            "Acerbi-Szekely ES".to_string(),
            format!("{:.4}", a.z_score),
            p_value(a.p_value),
            decision(a.rejects(significance)).to_string(),
        ]),
        Err(e) => builder.push_record([
            "Acerbi-Szekely ES".to_string(),
            e.to_string(),
            "-".into(),
            "n/a".into(),
        ]),
    }

    let expected = report.observations as f64 * (1.0 - report.confidence);
    format!(
        "Backtest at {:.1}% (window {}, {} forecast days)\n  Violations: {} (expected {:.1}, rate {})\n{}\nVerdict at {}% significance: {}",
        report.confidence * 100.0,
        report.window,
        report.observations,
        report.violations,
        expected,
        pct(report.violation_rate()),
        builder.build().with(Style::rounded()),
        significance * 100.0,
        report.verdict(significance).label()
    )
}

/// One row per confidence level of a sweep.
pub fn sweep_table(results: &[(Confidence, Result<BacktestReport>)], significance: f64) -> String {
    let mut builder = Builder::new();
    builder.push_record([
        "Confidence",
        "Violations",
        "Expected",
        "Kupiec p",
        "Christoffersen p",
        "AS p",
        "Verdict",
    ]);
    for (level, result) in results {
        match result {
            Ok(r) => {
                let p_of = |x: Option<f64>| x.map(p_value).unwrap_or_else(|| "n/a".to_string());
                builder.push_record([
                    level.to_string(),
                    r.violations.to_string(),
                    format!("{:.1}", r.observations as f64 * level.tail()),
                    p_of(r.kupiec.as_ref().ok().map(|k| k.p_value)),
                    p_of(r.christoffersen.as_ref().ok().map(|c| c.p_cc)),
                    p_of(r.acerbi_szekely.as_ref().ok().map(|a| a.p_value)),
                    r.verdict(significance).label().to_string(),
                ]);
            }
            Err(e) => builder.push_record([
                level.to_string(),
                "-".to_string(),
                "-".to_string(),
                "-".to_string(),
                "-".to_string(),
                "-".to_string(),
                format!("error: {}", e),
            ]),
        }
    }
    builder.build().with(Style::rounded()).to_string()
}

/// The first `limit` frontier points.
pub fn frontier_table(points: &[FrontierPoint], assets: &[String], limit: usize) -> String {
    let mut builder = Builder::new();
    let mut header = vec!["ES".to_string(), "Sharpe".to_string(), "Return".to_string()];
    header.extend(assets.iter().cloned());
    builder.push_record(header);
    for p in points.iter().take(limit) {
        let mut row = vec![pct(p.es), format!("{:.3}", p.sharpe), pct(p.annual_return)];
        row.extend(p.weights.iter().map(|w| format!("{:.1}%", w * 100.0)));
        builder.push_record(row);
    }
    builder.build().with(Style::rounded()).to_string()
}

/// Pretty-printed JSON of any serializable result.
pub fn to_json<T: Serialize + ?Sized>(value: &T) -> Result<String> {
    Ok(serde_json::to_string_pretty(value)?)
}
