//! Ambient persona/profile types, added in the expanded design: reflection
//! writes both insight memories and a standing persona document, and callers
//! need a typed view onto the aggregate store state for monitoring.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The persona document reflection maintains for a user: a running synthesis
/// of stable traits plus a most-recent-session addendum. Stored as a single
/// row per user, not as a memory (it isn't retrieved by search).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    pub user_id: String,
    pub persona_document: String,
    pub last_reflected_session_id: Option<String>,
    pub updated_at: DateTime<Utc>,
}

impl Profile {
    pub fn empty(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            persona_document: String::new(),
            last_reflected_session_id: None,
            updated_at: Utc::now(),
        }
    }
}

/// Read-only aggregate counters, exposed for monitoring and the e2e test
/// suite's invariant checks. Computed on demand, not persisted.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MemoryStats {
    pub total: u64,
    pub latest: u64,
    pub superseded: u64,
    pub derived: u64,
    pub archived: u64,
    pub avg_prominence: f64,
}

/// One audit row per NREM consolidation run, per §4.F.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsolidationHistory {
    pub id: uuid::Uuid,
    pub user_id: String,
    pub clusters_considered: u32,
    pub clusters_fused: u32,
    pub memories_superseded: u32,
    pub ran_at: DateTime<Utc>,
}

/// One audit row per REM exploration run, per §4.F.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DreamHistory {
    pub id: uuid::Uuid,
    pub user_id: String,
    pub seeds_sampled: u32,
    pub candidates_judged: u32,
    pub connections_accepted: u32,
    pub ran_at: DateTime<Utc>,
}
