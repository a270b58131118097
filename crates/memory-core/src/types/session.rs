//! Session summaries fed into reflection (§3.3, §4.G).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSummary {
    pub id: Uuid,
    pub user_id: String,
    pub session_id: String,
    pub summary: String,
    /// Raw message count, used by the gap scanner's engagement heuristics.
    pub message_count: u32,
    pub started_at: DateTime<Utc>,
    pub ended_at: DateTime<Utc>,
    #[serde(default)]
    pub metadata: serde_json::Value,
}

impl SessionSummary {
    pub fn new(user_id: impl Into<String>, session_id: impl Into<String>, summary: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            user_id: user_id.into(),
            session_id: session_id.into(),
            summary: summary.into(),
            message_count: 0,
            started_at: now,
            ended_at: now,
            metadata: serde_json::Value::Null,
        }
    }

    pub fn duration(&self) -> chrono::Duration {
        self.ended_at - self.started_at
    }
}
