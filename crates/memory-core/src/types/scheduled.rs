//! Scheduled items (§3.5, §4.I): proactive nudges and delegated tasks.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScheduledKind {
    Nudge,
    Task,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScheduledStatus {
    Pending,
    Acted,
    Dismissed,
    Expired,
}

impl ScheduledStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScheduledStatus::Pending => "pending",
            ScheduledStatus::Acted => "acted",
            ScheduledStatus::Dismissed => "dismissed",
            ScheduledStatus::Expired => "expired",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(ScheduledStatus::Pending),
            "acted" => Some(ScheduledStatus::Acted),
            "dismissed" => Some(ScheduledStatus::Dismissed),
            "expired" => Some(ScheduledStatus::Expired),
            _ => None,
        }
    }
}

/// Configuration for a delegated sub-agent task, used when `kind = task`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskConfig {
    pub goal: String,
    pub tools: Vec<String>,
    pub max_iterations: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduledItem {
    pub id: Uuid,
    pub user_id: String,
    pub session_id: Option<String>,
    /// Free-form provenance tag (e.g. `"gap_scanner"`, `"rem_dream"`).
    pub source: String,
    pub kind: ScheduledKind,
    /// Sub-category, e.g. `"stale_goal"`, `"follow_up"`.
    #[serde(rename = "type")]
    pub item_type: String,
    pub message: String,
    #[serde(default)]
    pub context: serde_json::Value,
    pub trigger_at: DateTime<Utc>,
    pub recurring: bool,
    pub source_memory_id: Option<Uuid>,
    pub task_config: Option<TaskConfig>,
    pub status: ScheduledStatus,
    pub created_at: DateTime<Utc>,
}

impl ScheduledItem {
    pub fn nudge(
        user_id: impl Into<String>,
        item_type: impl Into<String>,
        message: impl Into<String>,
        trigger_at: DateTime<Utc>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            user_id: user_id.into(),
            session_id: None,
            source: "gap_scanner".to_string(),
            kind: ScheduledKind::Nudge,
            item_type: item_type.into(),
            message: message.into(),
            context: serde_json::Value::Null,
            trigger_at,
            recurring: false,
            source_memory_id: None,
            task_config: None,
            status: ScheduledStatus::Pending,
            created_at: now,
        }
    }

    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.status == ScheduledStatus::Pending && self.trigger_at <= now
    }
}
