use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// One row per client and calendar day, as supplied by the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivityRecord {
    pub client_id: String,
    pub client_name: String,
    pub date: NaiveDate,
    #[serde(default)]
    pub sessions: i64,
    pub unique_goals: i64,
    pub forms: i64,
    pub calls: i64,
    pub chats: i64,
    pub manager_name: String,
}

impl ActivityRecord {
    pub fn counters(&self) -> Counters {
        Counters {
            sessions: self.sessions,
            unique_goals: self.unique_goals,
            forms: self.forms,
            calls: self.calls,
            chats: self.chats,
        }
    }
}

/// Summed activity for one client over one window.
///
/// `unique_goals` is the primary metric; the rest are informational.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Counters {
    pub sessions: i64,
    pub unique_goals: i64,
    pub forms: i64,
    pub calls: i64,
    pub chats: i64,
}

impl Counters {
    pub fn add(&mut self, other: &Counters) {
        self.sessions += other.sessions;
        self.unique_goals += other.unique_goals;
        self.forms += other.forms;
        self.calls += other.calls;
        self.chats += other.chats;
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ComparisonRow {
    pub client_id: String,
    pub current: Counters,
    pub previous: Counters,
    /// `None` when the previous primary total is zero.
    pub ratio: Option<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScoredRow {
    pub comparison: ComparisonRow,
    pub z_score: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientAttributes {
    pub client_name: String,
    pub manager_name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportRow {
    pub client_id: String,
    pub client_name: String,
    pub manager_name: String,
    pub current: Counters,
    pub previous: Counters,
    pub ratio: Option<f64>,
    pub z_score: Option<f64>,
}
