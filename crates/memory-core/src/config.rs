//! Typed configuration, grouped to match spec §6.4.
//!
//! Every option documented in §6.4 has a field here with the documented
//! default. `Config` is `#[serde(default)]` throughout so a TOML file only
//! needs to specify the overrides it cares about.

use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub decay: DecayConfig,
    pub search: SearchConfig,
    pub nrem: NremConfig,
    pub rem: RemConfig,
    pub quiet_hours: QuietHoursConfig,
    pub gap: GapConfig,
    pub proactive: ProactiveConfig,
    pub gardener: GardenerConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            decay: DecayConfig::default(),
            search: SearchConfig::default(),
            nrem: NremConfig::default(),
            rem: RemConfig::default(),
            quiet_hours: QuietHoursConfig::default(),
            gap: GapConfig::default(),
            proactive: ProactiveConfig::default(),
            gardener: GardenerConfig::default(),
        }
    }
}

impl Config {
    /// Load from a TOML file, falling back to defaults for anything absent.
    pub fn load(path: &Path) -> std::io::Result<Self> {
        let text = std::fs::read_to_string(path)?;
        toml::from_str(&text)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DecayConfig {
    /// Per-day lambda for the base exponential decay.
    pub base_rate: f64,
    /// Per-category override of `base_rate`. Categories not listed use
    /// `base_rate`.
    pub category_overrides: std::collections::HashMap<String, f64>,
    pub dormant_threshold: f64,
    pub archive_threshold: f64,
    /// Minimum age, in days, before a memory is archival-eligible.
    pub min_age_days: i64,
    /// Skip utility archival entirely (used by bulk-ingest tests).
    pub disable_archival: bool,
}

impl Default for DecayConfig {
    fn default() -> Self {
        let mut category_overrides = std::collections::HashMap::new();
        // Events are ephemeral and should fall out of prominence faster than
        // facts/preferences; insights and relationships are sticky.
        category_overrides.insert("event".to_string(), 0.06);
        category_overrides.insert("fact".to_string(), 0.015);
        category_overrides.insert("preference".to_string(), 0.01);
        category_overrides.insert("relationship".to_string(), 0.01);
        category_overrides.insert("insight".to_string(), 0.02);
        Self {
            base_rate: 0.02,
            category_overrides,
            dormant_threshold: 0.1,
            archive_threshold: 0.02,
            min_age_days: 14,
            disable_archival: false,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum SearchProfile {
    LexicalHeavy,
    BalancedProminence,
    PureVector,
}

impl Default for SearchProfile {
    fn default() -> Self {
        SearchProfile::BalancedProminence
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    pub lexical_weight: f32,
    pub vector_weight: f32,
    pub min_score: f32,
    pub rerank: bool,
    pub profile: SearchProfile,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            lexical_weight: 0.3,
            vector_weight: 0.7,
            min_score: 0.35,
            rerank: false,
            profile: SearchProfile::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NremConfig {
    pub min_prominence: f32,
    pub max_prominence: f32,
    pub max_clusters: usize,
    pub min_cluster_size: usize,
    pub max_relations_per_memory: usize,
}

impl Default for NremConfig {
    fn default() -> Self {
        Self {
            min_prominence: 0.05,
            max_prominence: 0.8,
            max_clusters: 10,
            min_cluster_size: 3,
            max_relations_per_memory: 3,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RemConfig {
    /// Same eligible-memory window as `NremConfig` (spec §4.F): memories
    /// outside this prominence band never get sampled as seeds or ranked as
    /// candidates.
    pub min_prominence: f32,
    pub max_prominence: f32,
    pub max_seeds: usize,
    pub max_seeds_per_category: usize,
    pub noise_sigma: f32,
    pub seed_noise_sigma: f32,
    pub max_steps: u32,
    pub decay_factor: f32,
    pub activation_threshold: f32,
    pub result_threshold: f32,
    pub max_candidates_per_seed: usize,
    pub min_judge_score: f32,
}

impl Default for RemConfig {
    fn default() -> Self {
        Self {
            min_prominence: 0.05,
            max_prominence: 0.8,
            max_seeds: 6,
            max_seeds_per_category: 2,
            noise_sigma: 0.6,
            seed_noise_sigma: 0.3,
            max_steps: 4,
            decay_factor: 0.4,
            activation_threshold: 0.005,
            result_threshold: 0.02,
            max_candidates_per_seed: 8,
            min_judge_score: 3.0,
        }
    }
}

/// Targeted-retrieval spreading activation uses a smaller noise sigma than
/// REM exploration (spec §4.D: "small (0.1) for targeted retrieval").
pub const TARGETED_ACTIVATION_NOISE_SIGMA: f32 = 0.1;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct QuietHoursConfig {
    /// Hour of day (0-23) quiet hours start, in the user's local time.
    pub start: u8,
    /// Hour of day (0-23) quiet hours end (exclusive), in the user's local
    /// time.
    pub end: u8,
    /// Offset from UTC, in minutes, used to resolve `start`/`end` against a
    /// `DateTime<Utc>` without pulling in a full IANA timezone database.
    pub utc_offset_minutes: i32,
}

impl Default for QuietHoursConfig {
    fn default() -> Self {
        Self { start: 22, end: 8, utc_offset_minutes: 0 }
    }
}

impl QuietHoursConfig {
    /// `start == end` disables the quiet-hours policy entirely.
    pub fn is_disabled(&self) -> bool {
        self.start == self.end
    }

    /// Whether `hour` (0-23) falls inside the (possibly wrap-around) window.
    pub fn contains(&self, hour: u8) -> bool {
        if self.is_disabled() {
            return false;
        }
        if self.start < self.end {
            hour >= self.start && hour < self.end
        } else {
            hour >= self.start || hour < self.end
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GapConfig {
    pub stale_days: i64,
    pub checkin_ratio: f64,
    pub unresolved_max_age_days: i64,
    pub follow_up_window_ms: i64,
}

impl Default for GapConfig {
    fn default() -> Self {
        Self {
            stale_days: 14,
            checkin_ratio: 3.0,
            unresolved_max_age_days: 7,
            follow_up_window_ms: 48 * 60 * 60 * 1000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProactiveConfig {
    pub min_gap_ms: i64,
    pub max_deferral_ms: i64,
}

impl Default for ProactiveConfig {
    fn default() -> Self {
        Self {
            min_gap_ms: 2 * 60 * 60 * 1000,
            max_deferral_ms: 24 * 60 * 60 * 1000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GardenerConfig {
    pub light_tick_interval_ms: i64,
    pub deep_tick_interval_ms: i64,
    pub sleep_tick_interval_ms: i64,
    pub disable_archival: bool,
}

impl Default for GardenerConfig {
    fn default() -> Self {
        Self {
            light_tick_interval_ms: 5 * 60 * 1000,
            deep_tick_interval_ms: 30 * 60 * 1000,
            sleep_tick_interval_ms: 24 * 60 * 60 * 1000,
            disable_archival: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_spec() {
        let cfg = Config::default();
        assert_eq!(cfg.decay.base_rate, 0.02);
        assert_eq!(cfg.search.min_score, 0.35);
        assert_eq!(cfg.nrem.min_cluster_size, 3);
        assert_eq!(cfg.rem.max_seeds, 6);
        assert_eq!(cfg.quiet_hours.start, 22);
        assert_eq!(cfg.quiet_hours.end, 8);
    }

    #[test]
    fn quiet_hours_wraps_around_midnight() {
        let qh = QuietHoursConfig { start: 22, end: 8, utc_offset_minutes: 0 };
        assert!(qh.contains(23));
        assert!(qh.contains(3));
        assert!(qh.contains(7));
        assert!(!qh.contains(8));
        assert!(!qh.contains(21));
        assert!(!qh.contains(12));
    }

    #[test]
    fn equal_start_end_disables_quiet_hours() {
        let qh = QuietHoursConfig { start: 9, end: 9, utc_offset_minutes: 0 };
        assert!(qh.is_disabled());
        assert!(!qh.contains(9));
        assert!(!qh.contains(0));
    }

    #[test]
    fn parse_partial_toml_keeps_other_defaults() {
        let toml_str = "[search]\nmin_score = 0.5\n";
        let cfg: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(cfg.search.min_score, 0.5);
        assert_eq!(cfg.search.lexical_weight, 0.3);
        assert_eq!(cfg.decay.base_rate, 0.02);
    }
}
