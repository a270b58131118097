//! The Gardener (§4.J): orchestrates the three background ticks. Every
//! sub-step is isolated so one failing user or phase never aborts the tick.

use chrono::{Timelike, Utc};
use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::config::Config;
use crate::embeddings::Embedder;
use crate::error::TickSummary;
use crate::llm::{LlmProvider, SubAgentExecutor};
use crate::store::{MemoryQuery, Store};
use crate::{decay, dream, gap, reflection, scheduler};

/// The capability set the Gardener needs injected; mirrors the
/// capability-boundary pattern used throughout (§4.D): the core never owns
/// model weights or provider quirks directly.
pub struct Gardener<'a> {
    pub store: &'a Store,
    pub llm: &'a dyn LlmProvider,
    pub embedder: &'a dyn Embedder,
    pub executor: &'a dyn SubAgentExecutor,
    pub config: &'a Config,
}

impl<'a> Gardener<'a> {
    pub fn new(
        store: &'a Store,
        llm: &'a dyn LlmProvider,
        embedder: &'a dyn Embedder,
        executor: &'a dyn SubAgentExecutor,
        config: &'a Config,
    ) -> Self {
        Self { store, llm, embedder, executor, config }
    }

    /// Light tick (§4.J): cheap, frequent. Decays prominence and fires any
    /// scheduled items that have come due.
    pub async fn light_tick(&self, user_id: &str) -> TickSummary {
        let started = Utc::now();
        let mut summary = TickSummary::new("light");

        match self.run_decay(user_id) {
            Ok(()) => summary.record_ok("decay"),
            Err(e) => summary.record_err("decay", e),
        }

        match scheduler::fire_due_items(self.store, self.executor, user_id).await {
            Ok(fired) => summary.record_ok(format!("scheduler ({} items fired)", fired.len())),
            Err(e) => summary.record_err("scheduler", e),
        }

        summary.duration_ms = (Utc::now() - started).num_milliseconds();
        summary
    }

    /// Deep tick (§4.J): periodic, scans for gap signals and schedules any
    /// triaged nudges.
    pub async fn deep_tick(&self, user_id: &str, proactiveness: f32, observed_session_len: u32) -> TickSummary {
        let started = Utc::now();
        let mut summary = TickSummary::new("deep");

        if self.config.quiet_hours.contains(Utc::now().hour() as u8) {
            summary.record_ok("skipped (quiet hours)");
            summary.duration_ms = (Utc::now() - started).num_milliseconds();
            return summary;
        }

        match gap::run_gap_scan(self.store, self.llm, self.config, user_id, proactiveness, observed_session_len).await {
            Ok(n) => summary.record_ok(format!("gap_scan ({n} scheduled)")),
            Err(e) => summary.record_err("gap_scan", e),
        }

        summary.duration_ms = (Utc::now() - started).num_milliseconds();
        summary
    }

    /// Sleep tick (§4.J): the nightly dream cycle. Runs NREM consolidation,
    /// REM exploration, then self-reflection over the day's sessions.
    pub async fn sleep_tick(&self, user_id: &str, seed: u64) -> TickSummary {
        let started = Utc::now();
        let mut summary = TickSummary::new("sleep");
        let mut rng = StdRng::seed_from_u64(seed);

        match dream::run_nrem(self.store, self.llm, &self.config.nrem, user_id).await {
            Ok(n) => summary.record_ok(format!("nrem ({n} clusters fused)")),
            Err(e) => summary.record_err("nrem", e),
        }

        match dream::run_rem(self.store, self.llm, &self.config.rem, user_id, &mut rng).await {
            Ok(n) => summary.record_ok(format!("rem ({n} connections accepted)")),
            Err(e) => summary.record_err("rem", e),
        }

        match self.store.get_recent_sessions(user_id, 20) {
            Ok(sessions) => {
                for session in &sessions {
                    match reflection::reflect(self.store, self.llm, session).await {
                        Ok(_) => summary.record_ok(format!("reflect ({})", session.session_id)),
                        Err(e) => summary.record_err(format!("reflect ({})", session.session_id), e),
                    }
                }
            }
            Err(e) => summary.record_err("reflect (load sessions)", e),
        }

        summary.duration_ms = (Utc::now() - started).num_milliseconds();
        summary
    }

    fn run_decay(&self, user_id: &str) -> crate::error::Result<()> {
        let memories = self.store.get_memories_by_user(user_id, &MemoryQuery::latest()).map_err(crate::error::CoreError::from)?;
        let now = Utc::now();
        for mut memory in memories {
            decay::apply_decay(&self.config.decay, &mut memory, now);
            self.store.set_prominence(memory.id, memory.prominence).map_err(crate::error::CoreError::from)?;

            if !self.config.gardener.disable_archival
                && decay::archival_decision(&self.config.decay, &memory, now) == decay::ArchivalDecision::Archive
            {
                self.store.archive_memory(memory.id).map_err(crate::error::CoreError::from)?;
            }
        }
        Ok(())
    }
}
