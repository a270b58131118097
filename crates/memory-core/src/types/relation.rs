//! Typed relation graph edges (§3.2, §4.D).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Hash)]
#[serde(rename_all = "snake_case")]
pub enum RelationType {
    /// `target` supersedes `source` (source is no longer current).
    Updates,
    /// `target` adds detail to `source` without superseding it.
    Extends,
    /// `target` was synthesized from `source` (NREM fusion).
    Derives,
}

impl RelationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            RelationType::Updates => "UPDATES",
            RelationType::Extends => "EXTENDS",
            RelationType::Derives => "DERIVES",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_uppercase().as_str() {
            "UPDATES" => Some(RelationType::Updates),
            "EXTENDS" => Some(RelationType::Extends),
            "DERIVES" => Some(RelationType::Derives),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Relation {
    pub id: Uuid,
    pub source_id: Uuid,
    pub target_id: Uuid,
    pub relation_type: RelationType,
    pub confidence: f32,
    pub created_at: DateTime<Utc>,
}

impl Relation {
    pub fn new(source_id: Uuid, target_id: Uuid, relation_type: RelationType, confidence: f32) -> Self {
        Self {
            id: Uuid::new_v4(),
            source_id,
            target_id,
            relation_type,
            confidence,
            created_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relation_type_str_round_trips() {
        for rt in [RelationType::Updates, RelationType::Extends, RelationType::Derives] {
            assert_eq!(RelationType::parse(rt.as_str()), Some(rt));
        }
    }

    #[test]
    fn parse_is_case_insensitive() {
        assert_eq!(RelationType::parse("updates"), Some(RelationType::Updates));
    }
}
