//! The `Memory` entity (§3.1).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Preference,
    Fact,
    Event,
    Relationship,
    Insight,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Preference => "preference",
            Category::Fact => "fact",
            Category::Event => "event",
            Category::Relationship => "relationship",
            Category::Insight => "insight",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "preference" => Some(Category::Preference),
            "fact" => Some(Category::Fact),
            "event" => Some(Category::Event),
            "relationship" => Some(Category::Relationship),
            "insight" => Some(Category::Insight),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemoryType {
    Regular,
    Derived,
    Superseded,
    StaticProfile,
    DynamicProfile,
}

impl MemoryType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MemoryType::Regular => "regular",
            MemoryType::Derived => "derived",
            MemoryType::Superseded => "superseded",
            MemoryType::StaticProfile => "static_profile",
            MemoryType::DynamicProfile => "dynamic_profile",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "regular" => Some(MemoryType::Regular),
            "derived" => Some(MemoryType::Derived),
            "superseded" => Some(MemoryType::Superseded),
            "static_profile" => Some(MemoryType::StaticProfile),
            "dynamic_profile" => Some(MemoryType::DynamicProfile),
            _ => None,
        }
    }
}

/// Provenance tag for a memory written by something other than the user
/// directly (§3.1 `learnedFrom`). Not a foreign key — a closed set of
/// origins, not a pointer back to whatever produced the memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LearnedFrom {
    NremConsolidation,
    SelfReflection,
    Inference,
}

impl LearnedFrom {
    pub fn as_str(&self) -> &'static str {
        match self {
            LearnedFrom::NremConsolidation => "nrem_consolidation",
            LearnedFrom::SelfReflection => "self_reflection",
            LearnedFrom::Inference => "inference",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "nrem_consolidation" => Some(LearnedFrom::NremConsolidation),
            "self_reflection" => Some(LearnedFrom::SelfReflection),
            "inference" => Some(LearnedFrom::Inference),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Source {
    User,
    Agent,
    System,
}

impl Source {
    pub fn as_str(&self) -> &'static str {
        match self {
            Source::User => "user",
            Source::Agent => "agent",
            Source::System => "system",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "user" => Some(Source::User),
            "agent" => Some(Source::Agent),
            "system" => Some(Source::System),
            _ => None,
        }
    }
}

/// A single unit of long-term memory.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Memory {
    pub id: Uuid,
    pub user_id: String,
    pub content: String,
    pub category: Category,
    pub memory_type: MemoryType,
    /// 1-10, caller-assigned or classifier-assigned salience.
    pub importance: u8,
    /// 0-1 classifier confidence.
    pub confidence: f32,
    /// Whether this is the current, non-superseded version of its lineage.
    pub is_latest: bool,
    pub source: Source,
    pub document_date: Option<DateTime<Utc>>,
    pub event_date: Option<DateTime<Utc>>,
    /// Decaying retrieval weight in `[0, 1]`, see §4.E.
    pub prominence: f32,
    pub last_accessed: DateTime<Utc>,
    pub access_count: u32,
    pub source_chunk: Option<String>,
    #[serde(skip)]
    pub embedding: Option<Vec<f32>>,
    #[serde(default)]
    pub metadata: serde_json::Value,
    pub learned_from: Option<LearnedFrom>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Memory {
    pub fn new(user_id: impl Into<String>, content: impl Into<String>, category: Category) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            user_id: user_id.into(),
            content: content.into(),
            category,
            memory_type: MemoryType::Regular,
            importance: 5,
            confidence: 1.0,
            is_latest: true,
            source: Source::User,
            document_date: None,
            event_date: None,
            prominence: 1.0,
            last_accessed: now,
            access_count: 0,
            source_chunk: None,
            embedding: None,
            metadata: serde_json::Value::Null,
            learned_from: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Utility score used by archival decisions (§9 Open Question): higher
    /// access counts buy a stale memory more headroom before it is archived.
    pub fn utility(&self) -> f32 {
        self.prominence * (1.0 + self.access_count as f32).ln()
    }
}
