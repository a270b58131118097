//! Prominence decay and utility-based archival (§4.E).
//!
//! Replaces the teacher's FSRS scheduler with the simpler exponential model
//! this design calls for: prominence decays continuously at a per-category
//! rate and is boosted on access, rather than being scheduled around
//! discrete spaced-repetition reviews.

use chrono::{DateTime, Utc};

use crate::config::DecayConfig;
use crate::types::{Category, Memory};

/// `prominence(t) = prominence(0) * e^(-lambda * t)`, `t` in days.
pub fn decay_rate_for(config: &DecayConfig, category: Category) -> f64 {
    config
        .category_overrides
        .get(category.as_str())
        .copied()
        .unwrap_or(config.base_rate)
}

/// Applies continuous exponential decay to `memory.prominence` for the
/// elapsed time since `memory.last_accessed`, in place.
pub fn apply_decay(config: &DecayConfig, memory: &mut Memory, now: DateTime<Utc>) {
    let elapsed_days = (now - memory.last_accessed).num_seconds() as f64 / 86_400.0;
    if elapsed_days <= 0.0 {
        return;
    }
    let lambda = decay_rate_for(config, memory.category);
    let factor = (-lambda * elapsed_days).exp() as f32;
    memory.prominence = (memory.prominence * factor).clamp(0.0, 1.0);
}

/// Boost applied to prominence when a memory is retrieved and used, per
/// §4.E: retrieval reinforces prominence rather than leaving it to decay
/// through the next tick untouched.
pub fn boost_on_access(memory: &mut Memory, boost: f32) {
    memory.prominence = (memory.prominence + boost).clamp(0.0, 1.0);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchivalDecision {
    Keep,
    Archive,
}

/// Decides whether a decayed memory should be archived: below
/// `archive_threshold` prominence, old enough (`min_age_days`) that a
/// recent note isn't archived before it gets a chance to be used, and with
/// low enough utility (prominence weighted by historical access) that
/// archiving it doesn't lose something the user keeps coming back to.
pub fn archival_decision(config: &DecayConfig, memory: &Memory, now: DateTime<Utc>) -> ArchivalDecision {
    if config.disable_archival {
        return ArchivalDecision::Keep;
    }
    let age_days = (now - memory.created_at).num_days();
    if age_days < config.min_age_days {
        return ArchivalDecision::Keep;
    }
    if memory.prominence > config.archive_threshold as f32 {
        return ArchivalDecision::Keep;
    }
    if memory.utility() > config.archive_threshold as f32 * 2.0 {
        return ArchivalDecision::Keep;
    }
    ArchivalDecision::Archive
}

pub fn is_dormant(config: &DecayConfig, memory: &Memory) -> bool {
    memory.prominence <= config.dormant_threshold as f32
}
