//! Gap-signal scanning (§4.H): heuristic scanners surface candidate nudges,
//! an LLM triages them against the user's proactiveness dial, and accepted
//! candidates are written as `ScheduledItem`s via the shared delivery model.

pub mod delivery;

use chrono::Utc;

use crate::config::GapConfig;
use crate::error::{CoreError, Result};
use crate::llm::{CompleteRequest, LlmProvider};
use crate::store::{MemoryQuery, Store};
use crate::types::{BehavioralPatterns, Memory, ScheduledItem};
pub use delivery::Urgency;

const TRIAGE_SYSTEM_PROMPT: &str = "You decide whether a candidate proactive nudge is worth sending to a \
user, given their stated proactiveness preference. Reply with a single line: VERDICT: <SEND|SKIP>.";

/// A candidate nudge surfaced by a heuristic scanner, not yet triaged.
#[derive(Debug, Clone)]
pub struct GapCandidate {
    pub item_type: String,
    pub message: String,
    pub source_memory_id: Option<uuid::Uuid>,
    pub urgency: Urgency,
}

/// Scans for goal-shaped memories that haven't been touched in
/// `gap.stale_days` and have no apparent follow-up.
pub fn scan_stale_goals(config: &GapConfig, memories: &[Memory], now: chrono::DateTime<Utc>) -> Vec<GapCandidate> {
    memories
        .iter()
        .filter(|m| m.is_latest && matches!(m.category, crate::types::Category::Event | crate::types::Category::Insight))
        .filter(|m| (now - m.last_accessed).num_days() >= config.stale_days)
        .map(|m| GapCandidate {
            item_type: "stale_goal".to_string(),
            message: format!("Haven't touched this in a while: {}", m.content),
            source_memory_id: Some(m.id),
            urgency: Urgency::Low,
        })
        .collect()
}

/// Scans for a steep engagement drop relative to the smoothed baseline
/// (§4.H, via `BehavioralPatterns::is_engagement_anomaly`).
pub fn scan_behavioral_anomaly(
    config: &GapConfig,
    patterns: &BehavioralPatterns,
    observed_session_len: u32,
) -> Vec<GapCandidate> {
    if patterns.is_engagement_anomaly(observed_session_len, config.checkin_ratio) {
        vec![GapCandidate {
            item_type: "engagement_drop".to_string(),
            message: "Noticed our conversations have gotten a lot shorter lately, just checking in.".to_string(),
            source_memory_id: None,
            urgency: Urgency::Medium,
        }]
    } else {
        Vec::new()
    }
}

/// Scans for unresolved threads: recent-ish memories tagged `event` whose
/// age is still inside `unresolved_max_age_days` but no newer memory
/// references them, i.e. nothing has followed up.
pub fn scan_unresolved_threads(config: &GapConfig, memories: &[Memory], now: chrono::DateTime<Utc>) -> Vec<GapCandidate> {
    memories
        .iter()
        .filter(|m| m.is_latest && m.category == crate::types::Category::Event)
        .filter(|m| {
            let age_days = (now - m.created_at).num_days();
            age_days > 0 && age_days <= config.unresolved_max_age_days
        })
        .filter(|m| m.access_count == 0)
        .map(|m| GapCandidate {
            item_type: "unresolved_thread".to_string(),
            message: format!("Following up on: {}", m.content),
            source_memory_id: Some(m.id),
            urgency: Urgency::Medium,
        })
        .collect()
}

fn parse_triage_verdict(reply: &str) -> bool {
    reply
        .lines()
        .find_map(|line| line.trim().strip_prefix("VERDICT:"))
        .map(|rest| rest.trim().eq_ignore_ascii_case("SEND"))
        .unwrap_or(false)
}

async fn triage(provider: &dyn LlmProvider, candidate: &GapCandidate, proactiveness: f32) -> Result<bool> {
    let prompt = format!(
        "Candidate nudge: \"{}\"\nUser proactiveness preference (0 = never interrupt, 1 = very proactive): {proactiveness:.2}",
        candidate.message
    );
    let request = CompleteRequest::simple(TRIAGE_SYSTEM_PROMPT, prompt);
    let response = provider.complete(request).await.map_err(CoreError::Provider)?;
    Ok(parse_triage_verdict(&response.text()))
}

/// Runs all three scanners, triages each candidate against `proactiveness`,
/// and schedules the accepted ones, deferring delivery out of quiet hours.
pub async fn run_gap_scan(
    store: &Store,
    provider: &dyn LlmProvider,
    config: &crate::config::Config,
    user_id: &str,
    proactiveness: f32,
    observed_session_len: u32,
) -> Result<usize> {
    let now = Utc::now();
    let memories = store.get_memories_by_user(user_id, &MemoryQuery::latest()).map_err(CoreError::from)?;
    let patterns = store
        .get_behavioral_patterns(user_id)
        .map_err(CoreError::from)?
        .unwrap_or_else(|| BehavioralPatterns::new(user_id));

    let mut candidates = scan_stale_goals(&config.gap, &memories, now);
    candidates.extend(scan_behavioral_anomaly(&config.gap, &patterns, observed_session_len));
    candidates.extend(scan_unresolved_threads(&config.gap, &memories, now));

    let last_delivered = store
        .get_last_delivered_scheduled_item(user_id)
        .map_err(CoreError::from)?
        .map(|item| item.trigger_at);

    let mut scheduled = 0;
    for candidate in candidates {
        let accepted = match triage(provider, &candidate, proactiveness).await {
            Ok(v) => v,
            Err(e) => {
                tracing::warn!(error = %e, "gap triage call failed, skipping candidate");
                continue;
            }
        };
        if !accepted {
            continue;
        }

        let trigger_at = delivery::next_deliverable_time(
            &config.quiet_hours,
            &config.proactive,
            candidate.urgency,
            last_delivered,
            now,
        );
        let mut item = ScheduledItem::nudge(user_id, candidate.item_type, candidate.message, trigger_at);
        item.source = "gap_scanner".to_string();
        item.source_memory_id = candidate.source_memory_id;
        store.add_scheduled_item(&item).map_err(CoreError::from)?;
        scheduled += 1;
    }

    Ok(scheduled)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Category;
    use chrono::Duration;

    #[test]
    fn scan_stale_goals_only_flags_old_untouched_memories() {
        let config = GapConfig::default();
        let now = Utc::now();
        let mut fresh = Memory::new("u1", "exercise more", Category::Insight);
        fresh.last_accessed = now;
        let mut stale = Memory::new("u1", "learn spanish", Category::Insight);
        stale.last_accessed = now - Duration::days(20);

        let candidates = scan_stale_goals(&config, &[fresh, stale], now);
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].item_type, "stale_goal");
    }

    #[test]
    fn scan_behavioral_anomaly_fires_on_steep_drop() {
        let config = GapConfig::default();
        let mut patterns = BehavioralPatterns::new("u1");
        patterns.observe(10, 30, 100.0, 0.0, 0.3);
        let candidates = scan_behavioral_anomaly(&config, &patterns, 5);
        assert_eq!(candidates.len(), 1);
    }

    #[test]
    fn scan_unresolved_threads_requires_zero_access() {
        let config = GapConfig::default();
        let now = Utc::now();
        let mut touched = Memory::new("u1", "project kickoff", Category::Event);
        touched.created_at = now - Duration::days(2);
        touched.access_count = 1;
        let mut untouched = Memory::new("u1", "doctor appointment", Category::Event);
        untouched.created_at = now - Duration::days(2);

        let candidates = scan_unresolved_threads(&config, &[touched, untouched], now);
        assert_eq!(candidates.len(), 1);
    }

    #[test]
    fn parse_triage_verdict_is_case_insensitive() {
        assert!(parse_triage_verdict("VERDICT: send\n"));
        assert!(!parse_triage_verdict("VERDICT: SKIP\n"));
        assert!(!parse_triage_verdict("no verdict line\n"));
    }
}
