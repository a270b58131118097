//! Shared quiet-hours/delivery-time model used by both the gap scanner and
//! the scheduler (§4.H): a nudge raised during quiet hours is deferred to
//! the next open window instead of dropped, with the offset and minimum
//! spacing between deliveries both depending on how urgent the nudge is.

use chrono::{DateTime, Timelike, Utc};

use crate::config::{ProactiveConfig, QuietHoursConfig};

/// How urgently a candidate nudge wants to be delivered. Drives both the
/// offset applied outside quiet hours and whether the minimum delivery gap
/// can be skipped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Urgency {
    Low,
    Medium,
    High,
}

fn local_hour(quiet_hours: &QuietHoursConfig, at: DateTime<Utc>) -> DateTime<Utc> {
    at + chrono::Duration::minutes(quiet_hours.utc_offset_minutes as i64)
}

/// Returns the `DateTime` a nudge raised at `now` with the given `urgency`
/// should actually fire at.
///
/// - Outside quiet hours: `high` urgency fires 5 minutes out, anything else
///   15 minutes out.
/// - Inside quiet hours: deferred to the first local hour after the window
///   ends, regardless of urgency.
/// - The result is never pushed sooner than `last_delivered +
///   proactive.min_gap_ms`, unless `urgency` is `high`, which bypasses the
///   minimum gap entirely.
/// - The whole thing is capped at `proactive.max_deferral_ms` from `now`.
///
/// The local hour is computed via `quiet_hours.utc_offset_minutes` rather
/// than `now`'s own (UTC) hour, since quiet hours are a statement about the
/// user's wall-clock day, not UTC's.
pub fn next_deliverable_time(
    quiet_hours: &QuietHoursConfig,
    proactive: &ProactiveConfig,
    urgency: Urgency,
    last_delivered: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> DateTime<Utc> {
    let local_now = local_hour(quiet_hours, now);
    let in_quiet = !quiet_hours.is_disabled() && quiet_hours.contains(local_now.hour() as u8);

    let mut trigger_at = if in_quiet {
        let local_end = local_now
            .date_naive()
            .and_hms_opt(quiet_hours.end as u32, 0, 0)
            .expect("valid hour")
            .and_utc();
        let local_deferred = if local_end > local_now {
            local_end
        } else {
            local_end + chrono::Duration::days(1)
        };
        local_deferred - chrono::Duration::minutes(quiet_hours.utc_offset_minutes as i64)
    } else {
        match urgency {
            Urgency::High => now + chrono::Duration::minutes(5),
            Urgency::Medium | Urgency::Low => now + chrono::Duration::minutes(15),
        }
    };

    if urgency != Urgency::High {
        if let Some(last) = last_delivered {
            trigger_at = trigger_at.max(last + chrono::Duration::milliseconds(proactive.min_gap_ms));
        }
    }

    let cap = now + chrono::Duration::milliseconds(proactive.max_deferral_ms);
    trigger_at.min(cap)
}

/// Whether `trigger_at` is far enough after `last_delivered` to respect
/// `proactive.min_gap_ms`, ignoring `urgency == high` which always passes.
pub fn respects_min_gap(
    proactive: &ProactiveConfig,
    urgency: Urgency,
    last_delivered: Option<DateTime<Utc>>,
    trigger_at: DateTime<Utc>,
) -> bool {
    if urgency == Urgency::High {
        return true;
    }
    match last_delivered {
        None => true,
        Some(last) => (trigger_at - last).num_milliseconds() >= proactive.min_gap_ms,
    }
}
