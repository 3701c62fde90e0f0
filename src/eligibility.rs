use std::collections::BTreeSet;

use chrono::NaiveDate;

use crate::error::Anomaly;
use crate::models::ActivityRecord;
use crate::window::eligibility_cutoff;

/// Most recent date present in the data.
pub fn anchor_date(records: &[ActivityRecord]) -> Option<NaiveDate> {
    records.iter().map(|record| record.date).max()
}

/// Clients with at least one record dated on or before `anchor - 2 * interval_days`.
pub fn eligible(
    records: &[ActivityRecord],
    anchor: NaiveDate,
    interval_days: i64,
) -> BTreeSet<String> {
    let Some(cutoff) = eligibility_cutoff(anchor, interval_days) else {
        return BTreeSet::new();
    };
    records
        .iter()
        .filter(|record| record.date <= cutoff)
        .map(|record| record.client_id.clone())
        .collect()
}

/// One `InsufficientHistory` per client that was left out.
pub fn excluded(
    records: &[ActivityRecord],
    eligible: &BTreeSet<String>,
    cutoff: Option<NaiveDate>,
) -> Vec<Anomaly> {
    let all: BTreeSet<&str> = records.iter().map(|r| r.client_id.as_str()).collect();
    all.into_iter()
        .filter(|client_id| !eligible.contains(*client_id))
        .map(|client_id| Anomaly::InsufficientHistory {
            client_id: client_id.to_string(),
            cutoff,
        })
        .collect()
}
