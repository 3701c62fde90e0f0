use std::collections::BTreeMap;

use crate::models::{ComparisonRow, Counters};

/// Relative change of the primary metric, `None` when `previous` is zero.
pub fn relative_change(current: i64, previous: i64) -> Option<f64> {
    if previous == 0 {
        return None;
    }
    let ratio = (current - previous) as f64 / previous as f64;
    ratio.is_finite().then_some(ratio)
}

/// Pairs the two aggregates per client.
///
/// Only clients present in `previous` produce a row; a missing current
/// aggregate counts as zero activity.
pub fn compare(
    current: &BTreeMap<String, Counters>,
    previous: &BTreeMap<String, Counters>,
) -> BTreeMap<String, ComparisonRow> {
    previous
        .iter()
        .map(|(client_id, prev)| {
            let curr = current.get(client_id).copied().unwrap_or_default();
            let row = ComparisonRow {
                client_id: client_id.clone(),
                current: curr,
                previous: *prev,
                ratio: relative_change(curr.unique_goals, prev.unique_goals),
            };
            (client_id.clone(), row)
        })
        .collect()
}
