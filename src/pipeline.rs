use std::collections::HashMap;

use chrono::NaiveDate;
use tracing::{debug, info, info_span, warn};
use uuid::Uuid;

use crate::aggregate::aggregate;
use crate::eligibility::{anchor_date, eligible, excluded};
use crate::error::{Anomaly, DegenerateReason, RunError};
use crate::models::{ActivityRecord, ClientAttributes, ReportRow};
use crate::publish::{Publication, PublishSink};
use crate::report::{assemble, client_attributes};
use crate::standardize::{standardize, Fit};
use crate::trajectory::compare;
use crate::window::{eligibility_cutoff, WindowPair};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineConfig {
    /// Interval lengths in days; output destinations follow this order.
    pub intervals: Vec<i64>,
    /// Overrides the latest date found in the data.
    pub anchor: Option<NaiveDate>,
}

impl PipelineConfig {
    pub fn new(intervals: Vec<i64>, anchor: Option<NaiveDate>) -> Result<Self, RunError> {
        if let Some(bad) = intervals.iter().copied().find(|days| *days <= 0) {
            return Err(RunError::InvalidInterval(bad));
        }
        Ok(Self { intervals, anchor })
    }
}

/// Everything one interval length produced.
#[derive(Debug, Clone)]
pub struct IntervalRun {
    pub interval_days: i64,
    pub anchor: NaiveDate,
    pub windows: WindowPair,
    pub cutoff: Option<NaiveDate>,
    pub eligible: usize,
    pub fit: Result<Fit, DegenerateReason>,
    pub rows: Vec<ReportRow>,
    pub anomalies: Vec<Anomaly>,
}

impl IntervalRun {
    pub fn count(&self, predicate: impl Fn(&Anomaly) -> bool) -> usize {
        self.anomalies.iter().filter(|a| predicate(a)).count()
    }
}

/// Runs eligibility, aggregation, comparison, scoring and assembly for one interval.
pub fn run_interval(
    records: &[ActivityRecord],
    attributes: &HashMap<String, ClientAttributes>,
    anchor: NaiveDate,
    interval_days: i64,
) -> Result<IntervalRun, RunError> {
    if interval_days <= 0 {
        return Err(RunError::InvalidInterval(interval_days));
    }

    let windows = WindowPair::new(anchor, interval_days);
    let cutoff = eligibility_cutoff(anchor, interval_days);
    let eligible_clients = eligible(records, anchor, interval_days);
    let mut anomalies = excluded(records, &eligible_clients, cutoff);

    let current = aggregate(records, &eligible_clients, &windows.current);
    let previous = aggregate(records, &eligible_clients, &windows.previous);
    let comparisons = compare(&current, &previous);

    anomalies.extend(
        comparisons
            .values()
            .filter(|row| row.ratio.is_none())
            .map(|row| Anomaly::UndefinedRatio {
                client_id: row.client_id.clone(),
            }),
    );

    let (scored, fit) = standardize(comparisons);
    if let Err(reason) = fit {
        anomalies.push(Anomaly::DegenerateDistribution(reason));
    }

    let (rows, misses) = assemble(scored, attributes);
    anomalies.extend(misses);

    Ok(IntervalRun {
        interval_days,
        anchor,
        windows,
        cutoff,
        eligible: eligible_clients.len(),
        fit,
        rows,
        anomalies,
    })
}

#[derive(Debug)]
pub struct RunOutcome {
    pub ordinal: usize,
    pub interval_days: i64,
    pub run_id: Uuid,
    /// Number of rows published.
    pub result: Result<usize, RunError>,
}

/// Explicitly configured pipeline over one batch of records.
pub struct Pipeline<'a> {
    records: &'a [ActivityRecord],
    attributes: HashMap<String, ClientAttributes>,
    anchor: NaiveDate,
    config: PipelineConfig,
}

impl<'a> Pipeline<'a> {
    /// `fallback_anchor` is used only when the config has no anchor and `records` is empty.
    pub fn new(
        records: &'a [ActivityRecord],
        config: PipelineConfig,
        fallback_anchor: NaiveDate,
    ) -> Self {
        let anchor = config
            .anchor
            .or_else(|| anchor_date(records))
            .unwrap_or(fallback_anchor);

        Self {
            records,
            attributes: client_attributes(records),
            anchor,
            config,
        }
    }

    pub fn anchor(&self) -> NaiveDate {
        self.anchor
    }

    pub fn run(&self, interval_days: i64) -> Result<IntervalRun, RunError> {
        run_interval(self.records, &self.attributes, self.anchor, interval_days)
    }

    /// Runs every configured interval and publishes each to its own ordinal.
    ///
    /// A failed run is recorded in its outcome and does not stop the rest.
    pub fn publish_all(&self, sink: &mut dyn PublishSink, as_of: NaiveDate) -> Vec<RunOutcome> {
        self.config
            .intervals
            .iter()
            .enumerate()
            .map(|(ordinal, &interval_days)| {
                let run_id = Uuid::new_v4();
                let span = info_span!("interval_run", ordinal, interval_days, %run_id);
                let _guard = span.enter();

                let result = self.run_and_publish(sink, ordinal, interval_days, run_id, as_of);
                match &result {
                    Ok(published) => info!(published, "interval run complete"),
                    Err(err) => warn!(error = %err, "interval run failed"),
                }

                RunOutcome {
                    ordinal,
                    interval_days,
                    run_id,
                    result,
                }
            })
            .collect()
    }

    fn run_and_publish(
        &self,
        sink: &mut dyn PublishSink,
        ordinal: usize,
        interval_days: i64,
        run_id: Uuid,
        as_of: NaiveDate,
    ) -> Result<usize, RunError> {
        let run = self.run(interval_days)?;
        log_run(&run);

        let publication = Publication {
            interval_days,
            as_of,
            anchor: run.anchor,
            run_id,
            rows: &run.rows,
        };
        sink.publish(ordinal, &publication)
            .map_err(|source| RunError::Publish { ordinal, source })?;

        Ok(run.rows.len())
    }
}

fn log_run(run: &IntervalRun) {
    info!(
        anchor = %run.anchor,
        cutoff = ?run.cutoff,
        current = %run.windows.current,
        previous = %run.windows.previous,
        eligible = run.eligible,
        "windows resolved"
    );

    let short_history = run.count(|a| matches!(a, Anomaly::InsufficientHistory { .. }));
    let undefined = run.count(|a| matches!(a, Anomaly::UndefinedRatio { .. }));
    info!(short_history, undefined, "clients without a defined ratio");

    match &run.fit {
        Ok(fit) => info!(mean = fit.mean, std = fit.std, samples = fit.samples, "ratios fitted"),
        Err(reason) => warn!(%reason, "z-scores undefined for this run"),
    }

    for anomaly in &run.anomalies {
        match anomaly {
            Anomaly::JoinMiss { .. } => warn!(%anomaly, "row dropped"),
            _ => debug!(%anomaly),
        }
    }
}
