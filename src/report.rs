use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};

use crate::error::Anomaly;
use crate::models::{ActivityRecord, ClientAttributes, ReportRow, ScoredRow};

/// Display name and manager per client, taken from each client's latest record.
pub fn client_attributes(records: &[ActivityRecord]) -> HashMap<String, ClientAttributes> {
    let mut latest: HashMap<String, &ActivityRecord> = HashMap::new();

    for record in records {
        let entry = latest.entry(record.client_id.clone()).or_insert(record);
        if record.date > entry.date {
            *entry = record;
        }
    }

    latest
        .into_iter()
        .filter(|(_, record)| !record.client_name.is_empty() && !record.manager_name.is_empty())
        .map(|(client_id, record)| {
            (
                client_id,
                ClientAttributes {
                    client_name: record.client_name.clone(),
                    manager_name: record.manager_name.clone(),
                },
            )
        })
        .collect()
}

/// Joins attributes onto scored rows and orders them by ratio, highest first.
///
/// Rows without attributes are dropped and reported as `JoinMiss`.
pub fn assemble(
    scored: BTreeMap<String, ScoredRow>,
    attributes: &HashMap<String, ClientAttributes>,
) -> (Vec<ReportRow>, Vec<Anomaly>) {
    let mut misses = Vec::new();
    let mut rows = Vec::with_capacity(scored.len());

    for (client_id, row) in scored {
        let Some(attrs) = attributes.get(&client_id) else {
            misses.push(Anomaly::JoinMiss { client_id });
            continue;
        };

        rows.push(ReportRow {
            client_id,
            client_name: attrs.client_name.clone(),
            manager_name: attrs.manager_name.clone(),
            current: row.comparison.current,
            previous: row.comparison.previous,
            ratio: row.comparison.ratio,
            z_score: row.z_score,
        });
    }

    rows.sort_by(|a, b| descending_nulls_last(a.ratio, b.ratio));
    (rows, misses)
}

fn descending_nulls_last(a: Option<f64>, b: Option<f64>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => b.partial_cmp(&a).unwrap_or(Ordering::Equal),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}
