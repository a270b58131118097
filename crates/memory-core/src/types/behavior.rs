//! Behavioral pattern tracking used by the gap scanner's anomaly heuristic
//! (§3.4, §4.H).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BehavioralPatterns {
    pub user_id: String,
    /// Exponentially smoothed messages-per-day.
    pub message_frequency: f64,
    /// Exponentially smoothed session length in messages.
    pub session_engagement: f64,
    /// Exponentially smoothed average response length in characters.
    pub response_length: f64,
    /// Smoothed affect score in `[-1, 1]`, negative is more negative affect.
    pub smoothed_affect: f64,
    #[serde(default)]
    pub response_preferences: serde_json::Value,
    pub updated_at: DateTime<Utc>,
}

impl BehavioralPatterns {
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            message_frequency: 0.0,
            session_engagement: 0.0,
            response_length: 0.0,
            smoothed_affect: 0.0,
            response_preferences: serde_json::Value::Null,
            updated_at: Utc::now(),
        }
    }

    /// Folds a new observation in with smoothing factor `alpha`, the same
    /// exponential-moving-average idiom used throughout §4.H.
    pub fn observe(&mut self, message_count: u32, session_len: u32, avg_response_len: f64, affect: f64, alpha: f64) {
        self.message_frequency = ema(self.message_frequency, message_count as f64, alpha);
        self.session_engagement = ema(self.session_engagement, session_len as f64, alpha);
        self.response_length = ema(self.response_length, avg_response_len, alpha);
        self.smoothed_affect = ema(self.smoothed_affect, affect, alpha);
        self.updated_at = Utc::now();
    }

    /// Whether a new observed session-engagement value is anomalously low
    /// relative to the smoothed baseline, per the gap scanner's
    /// `checkin_ratio` threshold.
    pub fn is_engagement_anomaly(&self, observed_session_len: u32, checkin_ratio: f64) -> bool {
        self.session_engagement > 0.0
            && (self.session_engagement / (observed_session_len as f64).max(1.0)) >= checkin_ratio
    }
}

fn ema(prev: f64, observed: f64, alpha: f64) -> f64 {
    if prev == 0.0 {
        observed
    } else {
        alpha * observed + (1.0 - alpha) * prev
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn observe_initializes_from_first_sample() {
        let mut b = BehavioralPatterns::new("u1");
        b.observe(10, 20, 120.0, 0.2, 0.3);
        assert_eq!(b.message_frequency, 10.0);
        assert_eq!(b.session_engagement, 20.0);
    }

    #[test]
    fn engagement_anomaly_fires_on_steep_drop() {
        let mut b = BehavioralPatterns::new("u1");
        b.observe(10, 30, 100.0, 0.0, 0.3);
        assert!(b.is_engagement_anomaly(5, 3.0));
        assert!(!b.is_engagement_anomaly(25, 3.0));
    }
}
