//! Domain types shared across every module (§3).

mod behavior;
mod memory;
mod profile;
mod relation;
mod scheduled;
mod session;

pub use behavior::BehavioralPatterns;
pub use memory::{Category, LearnedFrom, Memory, MemoryType, Source};
pub use profile::{ConsolidationHistory, DreamHistory, MemoryStats, Profile};
pub use relation::{Relation, RelationType};
pub use scheduled::{ScheduledItem, ScheduledKind, ScheduledStatus, TaskConfig};
pub use session::SessionSummary;
