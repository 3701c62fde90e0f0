use std::collections::{BTreeMap, BTreeSet};

use crate::models::{ActivityRecord, Counters};
use crate::window::Window;

/// Sums counters per eligible client over `window`.
///
/// Clients with no record in the window are absent from the result.
/// Duplicate (client, date) rows are summed as-is.
pub fn aggregate(
    records: &[ActivityRecord],
    eligible: &BTreeSet<String>,
    window: &Window,
) -> BTreeMap<String, Counters> {
    let mut totals: BTreeMap<String, Counters> = BTreeMap::new();

    for record in records {
        if !window.contains(record.date) || !eligible.contains(&record.client_id) {
            continue;
        }

        totals
            .entry(record.client_id.clone())
            .or_default()
            .add(&record.counters());
    }

    totals
}
