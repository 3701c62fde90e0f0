//! Population z-scores over the defined relative-change ratios of one run.

use std::collections::BTreeMap;

use crate::error::DegenerateReason;
use crate::models::{ComparisonRow, ScoredRow};

/// Spreads at or below this (relative to the largest magnitude) are rounding noise.
const SPREAD_TOLERANCE: f64 = 1e-12;

/// Mean and sample standard deviation fitted to the defined ratios.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Fit {
    pub mean: f64,
    pub std: f64,
    pub samples: usize,
}

impl Fit {
    pub fn z_score(&self, ratio: f64) -> f64 {
        (ratio - self.mean) / self.std
    }
}

/// Fits mean and sample (n - 1) standard deviation, ignoring undefined values.
pub fn fit<I>(ratios: I) -> Result<Fit, DegenerateReason>
where
    I: IntoIterator<Item = Option<f64>>,
{
    let values: Vec<f64> = ratios
        .into_iter()
        .flatten()
        .filter(|value| value.is_finite())
        .collect();

    if values.len() < 2 {
        return Err(DegenerateReason::TooFewRatios {
            defined: values.len(),
        });
    }

    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1.0);
    let std = variance.sqrt();

    let scale = values.iter().fold(1.0_f64, |acc, v| acc.max(v.abs()));
    if !std.is_finite() || std <= SPREAD_TOLERANCE * scale {
        return Err(DegenerateReason::NoSpread { std });
    }

    Ok(Fit {
        mean,
        std,
        samples: values.len(),
    })
}

/// Scores every row. Undefined ratios, or a degenerate fit, leave `z_score` empty.
pub fn standardize(
    rows: BTreeMap<String, ComparisonRow>,
) -> (BTreeMap<String, ScoredRow>, Result<Fit, DegenerateReason>) {
    let fitted = fit(rows.values().map(|row| row.ratio));

    let scored = rows
        .into_iter()
        .map(|(client_id, comparison)| {
            let z_score = match (&fitted, comparison.ratio) {
                (Ok(fit), Some(ratio)) => Some(fit.z_score(ratio)),
                _ => None,
            };
            (client_id, ScoredRow { comparison, z_score })
        })
        .collect();

    (scored, fitted)
}
