use std::path::{Path, PathBuf};

use anyhow::Context;
use sqlx::mysql::{MySqlPool, MySqlPoolOptions};
use sqlx::Row;
use tracing::info;

use crate::models::ActivityRecord;

/// Daily totals for every account that has not been terminated, with the
/// owning performance manager's name.
const ACTIVITY_QUERY: &str = r#"
    SELECT
        CAST(leads.DealerID AS CHAR) AS client_id,
        COALESCE(leads.DealerName, '') AS client_name,
        CAST(leads.`Date` AS DATE) AS activity_date,
        CAST(COALESCE(leads.Sessions, 0) AS SIGNED) AS sessions,
        CAST(COALESCE(leads.TotalUniqueGoals, 0) AS SIGNED) AS unique_goals,
        CAST(COALESCE(leads.TotalForms, 0) AS SIGNED) AS forms,
        CAST(COALESCE(leads.TotalCalls, 0) AS SIGNED) AS calls,
        CAST(COALESCE(leads.TotalChats, 0) AS SIGNED) AS chats,
        COALESCE(emp.FullName, '') AS manager_name
    FROM `data_5d67cfa96d8c0`.`Total Conversions by Client and Date - CACHED (161)` AS leads
    JOIN `data_5d67cfa96d8c0`.`Client Accounts (22)` AS accounts ON leads.DealerID = accounts.DealerID
    JOIN `data_5d67cfa96d8c0`.`Employees (61)` AS emp ON accounts.PerformanceManagerID = emp.EmployeeID
    WHERE accounts.TerminationDate IS NULL
"#;

/// Columns `fetch_activity` decodes; every one must be aliased in `ACTIVITY_QUERY`.
const ACTIVITY_COLUMNS: [&str; 9] = [
    "client_id",
    "client_name",
    "activity_date",
    "sessions",
    "unique_goals",
    "forms",
    "calls",
    "chats",
    "manager_name",
];

/// Where activity records are read from.
#[derive(Debug, Clone)]
pub enum Source {
    Warehouse { database_url: String },
    Csv(PathBuf),
}

impl Source {
    pub async fn load(&self) -> anyhow::Result<Vec<ActivityRecord>> {
        let records = match self {
            Source::Warehouse { database_url } => {
                let pool = connect(database_url).await?;
                fetch_activity(&pool).await?
            }
            Source::Csv(path) => read_csv(path)?,
        };
        info!(records = records.len(), "activity loaded");
        Ok(records)
    }
}

pub async fn connect(database_url: &str) -> anyhow::Result<MySqlPool> {
    MySqlPoolOptions::new()
        .max_connections(5)
        .connect(database_url)
        .await
        .context("failed to connect to the data warehouse")
}

pub async fn fetch_activity(pool: &MySqlPool) -> anyhow::Result<Vec<ActivityRecord>> {
    let rows = sqlx::query(ACTIVITY_QUERY)
        .fetch_all(pool)
        .await
        .context("failed to query daily activity")?;

    let [client_id, client_name, date, sessions, unique_goals, forms, calls, chats, manager] =
        ACTIVITY_COLUMNS;
    let mut records = Vec::with_capacity(rows.len());
    for row in rows {
        records.push(ActivityRecord {
            client_id: row.try_get(client_id)?,
            client_name: row.try_get(client_name)?,
            date: row.try_get(date)?,
            sessions: row.try_get(sessions)?,
            unique_goals: row.try_get(unique_goals)?,
            forms: row.try_get(forms)?,
            calls: row.try_get(calls)?,
            chats: row.try_get(chats)?,
            manager_name: row.try_get(manager)?,
        });
    }

    Ok(records)
}

/// Reads a snapshot written by [`write_csv`] or any file with the same header.
pub fn read_csv(path: &Path) -> anyhow::Result<Vec<ActivityRecord>> {
    let mut reader = csv::Reader::from_path(path)
        .with_context(|| format!("failed to open {}", path.display()))?;
    let mut records = Vec::new();

    for (line, result) in reader.deserialize::<ActivityRecord>().enumerate() {
        let record = result.with_context(|| {
            format!("invalid activity row {} in {}", line + 1, path.display())
        })?;
        records.push(record);
    }

    Ok(records)
}

pub fn write_csv(path: &Path, records: &[ActivityRecord]) -> anyhow::Result<usize> {
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("failed to create {}", path.display()))?;
    for record in records {
        writer.serialize(record)?;
    }
    writer.flush()?;
    Ok(records.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn record(client_id: &str, day: u32, goals: i64) -> ActivityRecord {
        ActivityRecord {
            client_id: client_id.to_string(),
            client_name: "Alpha Ford, Inc.".to_string(),
            date: NaiveDate::from_ymd_opt(2024, 5, day).unwrap(),
            sessions: 90,
            unique_goals: goals,
            forms: 2,
            calls: 3,
            chats: 1,
            manager_name: "Dana Ortiz".to_string(),
        }
    }

    #[test]
    fn query_reads_warehouse_columns_under_decoded_aliases() {
        for column in ACTIVITY_COLUMNS {
            assert!(
                ACTIVITY_QUERY.contains(&format!(" AS {column},"))
                    || ACTIVITY_QUERY.contains(&format!(" AS {column}\n")),
                "{column} is not aliased"
            );
        }
        for identifier in [
            "`Total Conversions by Client and Date - CACHED (161)`",
            "`Client Accounts (22)`",
            "`Employees (61)`",
            "leads.DealerID",
            "leads.TotalUniqueGoals",
            "accounts.PerformanceManagerID",
            "emp.FullName",
            "accounts.TerminationDate IS NULL",
        ] {
            assert!(ACTIVITY_QUERY.contains(identifier), "missing {identifier}");
        }
    }

    #[test]
    fn snapshot_reads_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("activity.csv");
        let records = vec![record("101", 1, 4), record("102", 2, 0)];

        assert_eq!(write_csv(&path, &records).unwrap(), 2);
        assert_eq!(read_csv(&path).unwrap(), records);
    }

    #[test]
    fn sessions_column_is_optional() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("activity.csv");
        std::fs::write(
            &path,
            "client_id,client_name,date,unique_goals,forms,calls,chats,manager_name\n\
             7,Bravo Kia,2024-05-03,5,1,1,0,Sam Reyes\n",
        )
        .unwrap();

        let records = read_csv(&path).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].sessions, 0);
        assert_eq!(records[0].unique_goals, 5);
        assert_eq!(records[0].date, NaiveDate::from_ymd_opt(2024, 5, 3).unwrap());
    }

    #[test]
    fn malformed_row_names_the_line() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("activity.csv");
        std::fs::write(
            &path,
            "client_id,client_name,date,sessions,unique_goals,forms,calls,chats,manager_name\n\
             7,Bravo Kia,2024-05-03,1,5,1,1,0,Sam Reyes\n\
             8,Charlie VW,not-a-date,1,5,1,1,0,Sam Reyes\n",
        )
        .unwrap();

        let err = read_csv(&path).unwrap_err();
        assert!(format!("{err}").contains("invalid activity row 2"));
    }
}
