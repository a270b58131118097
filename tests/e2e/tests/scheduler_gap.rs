//! Scenarios 4 and 5 (spec §8): the gap scanner schedules a nudge for a
//! stale goal, and any nudge's delivery time lands outside quiet hours.

mod support;

use chrono::{Duration, Timelike, Utc};
use memory_core::config::{Config, QuietHoursConfig};
use memory_core::gap::{delivery, run_gap_scan, Urgency};
use memory_core::store::Store;
use memory_core::types::{Category, Memory, ScheduledKind, ScheduledStatus};

#[tokio::test]
async fn stale_goal_produces_a_pending_follow_up_nudge() {
    let store = Store::open_in_memory().unwrap();

    let mut goal = Memory::new("u1", "Ship the side project", Category::Insight);
    goal.last_accessed = Utc::now() - Duration::days(20);
    goal.metadata = serde_json::json!({ "goalType": "goal", "status": "active" });
    store.add_memory(&goal).unwrap();

    let provider = support::always_send();
    let config = Config::default();
    let scheduled = run_gap_scan(&store, &provider, &config, "u1", 0.5, 12).await.unwrap();
    assert_eq!(scheduled, 1);

    let due = store.get_pending_scheduled_items_by_user("u1", Utc::now() + Duration::days(2)).unwrap();
    assert_eq!(due.len(), 1);
    let item = &due[0];
    assert_eq!(item.item_type, "stale_goal");
    assert_eq!(item.kind, ScheduledKind::Nudge);
    assert_eq!(item.status, ScheduledStatus::Pending);
    assert_eq!(item.source_memory_id, Some(goal.id));
    assert!(item.trigger_at <= Utc::now() + Duration::days(1));
    assert!(!config.quiet_hours.contains(item.trigger_at.hour() as u8));
}

#[test]
fn delivery_time_at_quiet_hour_boundary_lands_exactly_at_window_end() {
    let quiet_hours = QuietHoursConfig { start: 22, end: 8, utc_offset_minutes: 0 };
    let proactive = memory_core::config::ProactiveConfig::default();
    let now = Utc::now().date_naive().and_hms_opt(3, 0, 0).unwrap().and_utc();

    let trigger_at = delivery::next_deliverable_time(&quiet_hours, &proactive, Urgency::Medium, None, now);
    assert_eq!(trigger_at.hour(), 8);
    assert_eq!(trigger_at.minute(), 0);
}
