use chrono::NaiveDate;
use thiserror::Error;

/// Why a run could not fit a distribution to its ratios.
#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum DegenerateReason {
    #[error("only {defined} defined ratio(s), need at least 2")]
    TooFewRatios { defined: usize },
    #[error("ratios have no spread (std = {std})")]
    NoSpread { std: f64 },
}

/// Conditions a run handles locally. None of these abort a run.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Anomaly {
    #[error(
        "client {client_id} has no record on or before {}",
        .cutoff.map_or_else(|| "the earliest representable date".to_string(), |d| d.to_string())
    )]
    InsufficientHistory {
        client_id: String,
        cutoff: Option<NaiveDate>,
    },
    #[error("client {client_id} had no goals in the previous period")]
    UndefinedRatio { client_id: String },
    #[error("z-scores undefined: {0}")]
    DegenerateDistribution(DegenerateReason),
    #[error("client {client_id} has no display attributes")]
    JoinMiss { client_id: String },
}

/// Failures that end a single interval run.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("interval length must be a positive number of days, got {0}")]
    InvalidInterval(i64),
    #[error("failed to publish sheet {ordinal}")]
    Publish {
        ordinal: usize,
        #[source]
        source: anyhow::Error,
    },
}
