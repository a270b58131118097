//! SQLite-backed storage (§4.A, §5).
//!
//! Reader and writer each get their own connection behind their own
//! `Mutex`, so `Store` is `Send + Sync` without forcing every caller through
//! a single lock; the writer lock only serializes writes against each
//! other, reads never wait on them.

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::Mutex;
use uuid::Uuid;

use crate::types::{
    BehavioralPatterns, Category, ConsolidationHistory, DreamHistory, LearnedFrom, Memory,
    MemoryStats, MemoryType, Profile, Relation, RelationType, ScheduledItem, ScheduledKind,
    ScheduledStatus, Source, TaskConfig,
};

/// Query options for `Store::get_memories_by_user` (§4.A): a plain struct
/// with public fields and chainable `with_*` builders, rather than a long
/// positional argument list that grows every time a caller needs one more
/// filter.
#[derive(Debug, Clone, Default)]
pub struct MemoryQuery {
    pub min_prominence: Option<f32>,
    pub is_latest: Option<bool>,
    /// By default, archived memories (`is_latest = false` and
    /// `prominence = 0`) are excluded even when `is_latest` isn't set.
    /// Setting this includes them.
    pub include_all_sources: bool,
    pub category: Option<Category>,
    pub memory_type: Option<MemoryType>,
    pub limit: Option<usize>,
}

impl MemoryQuery {
    /// Shorthand for the common "latest, non-archived" query.
    pub fn latest() -> Self {
        Self { is_latest: Some(true), ..Self::default() }
    }

    pub fn with_min_prominence(mut self, min_prominence: f32) -> Self {
        self.min_prominence = Some(min_prominence);
        self
    }

    pub fn with_is_latest(mut self, is_latest: bool) -> Self {
        self.is_latest = Some(is_latest);
        self
    }

    pub fn with_all_sources(mut self) -> Self {
        self.include_all_sources = true;
        self
    }

    pub fn with_category(mut self, category: Category) -> Self {
        self.category = Some(category);
        self
    }

    pub fn with_memory_type(mut self, memory_type: MemoryType) -> Self {
        self.memory_type = Some(memory_type);
        self
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }
}

#[non_exhaustive]
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid row data: {0}")]
    InvalidRow(String),
}

pub type Result<T> = std::result::Result<T, StorageError>;

pub struct Store {
    writer: Mutex<Connection>,
    reader: Mutex<Connection>,
    /// True for `open_in_memory`, where a second connection would open a
    /// distinct, empty database rather than sharing state with the writer.
    shared_connection: bool,
}

fn configure_connection(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "PRAGMA journal_mode = WAL;
         PRAGMA synchronous = NORMAL;
         PRAGMA foreign_keys = ON;
         PRAGMA busy_timeout = 5000;",
    )?;
    Ok(())
}

/// The default on-disk database location: `<data dir>/memory-core/memory.db`,
/// following platform convention via `directories`.
pub fn default_db_path() -> Option<std::path::PathBuf> {
    directories::ProjectDirs::from("", "", "memory-core").map(|dirs| dirs.data_dir().join("memory.db"))
}

impl Store {
    pub fn open(path: &Path) -> Result<Self> {
        let writer_conn = Connection::open(path)?;
        configure_connection(&writer_conn)?;
        super::migrations::apply_migrations(&writer_conn)?;

        let reader_conn = Connection::open(path)?;
        configure_connection(&reader_conn)?;

        Ok(Self {
            writer: Mutex::new(writer_conn),
            reader: Mutex::new(reader_conn),
            shared_connection: false,
        })
    }

    /// In-memory store for tests. A second in-memory connection would open
    /// an unrelated, empty database, so reads are routed through the same
    /// writer lock instead; test workloads have no read/write contention to
    /// lose by sharing it.
    pub fn open_in_memory() -> Result<Self> {
        let writer_conn = Connection::open_in_memory()?;
        configure_connection(&writer_conn)?;
        super::migrations::apply_migrations(&writer_conn)?;
        Ok(Self {
            reader: Mutex::new(Connection::open_in_memory()?),
            writer: Mutex::new(writer_conn),
            shared_connection: true,
        })
    }

    fn writer(&self) -> std::sync::MutexGuard<'_, Connection> {
        self.writer.lock().expect("writer lock poisoned")
    }

    fn reader_for(&self) -> std::sync::MutexGuard<'_, Connection> {
        if self.shared_connection {
            self.writer()
        } else {
            self.reader.lock().expect("reader lock poisoned")
        }
    }

    // -- memories --------------------------------------------------------

    pub fn add_memory(&self, memory: &Memory) -> Result<()> {
        let conn = self.writer();
        conn.execute(
            "INSERT INTO memories (
                id, user_id, content, category, memory_type, importance, confidence,
                is_latest, source, document_date, event_date, prominence, last_accessed,
                access_count, source_chunk, embedding, metadata, learned_from, created_at, updated_at
            ) VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9,?10,?11,?12,?13,?14,?15,?16,?17,?18,?19,?20)",
            params![
                memory.id.to_string(),
                memory.user_id,
                memory.content,
                memory.category.as_str(),
                memory.memory_type.as_str(),
                memory.importance,
                memory.confidence,
                memory.is_latest,
                memory.source.as_str(),
                memory.document_date.map(|d| d.to_rfc3339()),
                memory.event_date.map(|d| d.to_rfc3339()),
                memory.prominence,
                memory.last_accessed.to_rfc3339(),
                memory.access_count,
                memory.source_chunk,
                memory.embedding.as_ref().map(|e| encode_embedding(e)),
                memory.metadata.to_string(),
                memory.learned_from.map(|tag| tag.as_str()),
                memory.created_at.to_rfc3339(),
                memory.updated_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    pub fn update_memory(&self, memory: &Memory) -> Result<()> {
        let conn = self.writer();
        let changed = conn.execute(
            "UPDATE memories SET
                content = ?2, category = ?3, memory_type = ?4, importance = ?5, confidence = ?6,
                is_latest = ?7, prominence = ?8, last_accessed = ?9, access_count = ?10,
                metadata = ?11, updated_at = ?12
             WHERE id = ?1",
            params![
                memory.id.to_string(),
                memory.content,
                memory.category.as_str(),
                memory.memory_type.as_str(),
                memory.importance,
                memory.confidence,
                memory.is_latest,
                memory.prominence,
                memory.last_accessed.to_rfc3339(),
                memory.access_count,
                memory.metadata.to_string(),
                memory.updated_at.to_rfc3339(),
            ],
        )?;
        if changed == 0 {
            return Err(StorageError::NotFound(memory.id.to_string()));
        }
        Ok(())
    }

    pub fn get_memory(&self, id: Uuid) -> Result<Memory> {
        let conn = self.reader_for();
        conn.query_row(
            "SELECT * FROM memories WHERE id = ?1",
            params![id.to_string()],
            row_to_memory,
        )
        .optional()?
        .ok_or_else(|| StorageError::NotFound(id.to_string()))
    }

    /// Fetches a user's memories filtered by `query` (§4.A). Always scoped
    /// to `user_id`; every other clause is optional and only appears in the
    /// generated SQL when the corresponding field is set.
    pub fn get_memories_by_user(&self, user_id: &str, query: &MemoryQuery) -> Result<Vec<Memory>> {
        let conn = self.reader_for();

        let mut clauses = vec!["user_id = ?1".to_string()];
        let mut bound: Vec<Box<dyn rusqlite::ToSql>> = vec![Box::new(user_id.to_string())];

        if let Some(is_latest) = query.is_latest {
            bound.push(Box::new(is_latest));
            clauses.push(format!("is_latest = ?{}", bound.len()));
        }
        if !query.include_all_sources {
            clauses.push("NOT (is_latest = 0 AND prominence = 0)".to_string());
        }
        if let Some(min_prominence) = query.min_prominence {
            bound.push(Box::new(min_prominence));
            clauses.push(format!("prominence >= ?{}", bound.len()));
        }
        if let Some(category) = query.category {
            bound.push(Box::new(category.as_str().to_string()));
            clauses.push(format!("category = ?{}", bound.len()));
        }
        if let Some(memory_type) = query.memory_type {
            bound.push(Box::new(memory_type.as_str().to_string()));
            clauses.push(format!("memory_type = ?{}", bound.len()));
        }

        let mut sql = format!(
            "SELECT * FROM memories WHERE {} ORDER BY prominence DESC",
            clauses.join(" AND ")
        );
        if let Some(limit) = query.limit {
            sql.push_str(&format!(" LIMIT {limit}"));
        }

        let mut stmt = conn.prepare(&sql)?;
        let params_ref: Vec<&dyn rusqlite::ToSql> = bound.iter().map(|b| b.as_ref()).collect();
        let rows = stmt
            .query_map(params_ref.as_slice(), row_to_memory)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// Latest memories whose `Memory::utility()` falls below `max_utility`,
    /// least useful first — the candidate set for archival or pruning
    /// decisions (§8 scenario: low-utility cleanup).
    pub fn find_low_utility_memories(&self, user_id: &str, max_utility: f32, limit: usize) -> Result<Vec<Memory>> {
        let mut memories = self.get_memories_by_user(user_id, &MemoryQuery::latest())?;
        memories.retain(|m| m.utility() < max_utility);
        memories.sort_by(|a, b| a.utility().partial_cmp(&b.utility()).unwrap_or(std::cmp::Ordering::Equal));
        memories.truncate(limit);
        Ok(memories)
    }

    pub fn get_memories_by_ids(&self, ids: &[Uuid]) -> Result<Vec<Memory>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let conn = self.reader_for();
        let placeholders = ids.iter().map(|_| "?").collect::<Vec<_>>().join(",");
        let sql = format!("SELECT * FROM memories WHERE id IN ({placeholders})");
        let mut stmt = conn.prepare(&sql)?;
        let id_strings: Vec<String> = ids.iter().map(|id| id.to_string()).collect();
        let params_ref: Vec<&dyn rusqlite::ToSql> =
            id_strings.iter().map(|s| s as &dyn rusqlite::ToSql).collect();
        let rows = stmt
            .query_map(params_ref.as_slice(), row_to_memory)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// All latest, non-archived memories for a user; the working set that
    /// decay, consolidation and search all iterate over.
    pub fn get_active_memories(&self, user_id: &str, min_prominence: f32) -> Result<Vec<Memory>> {
        let conn = self.reader_for();
        let mut stmt = conn.prepare(
            "SELECT * FROM memories WHERE user_id = ?1 AND is_latest = 1 AND prominence > ?2 ORDER BY prominence DESC",
        )?;
        let rows = stmt
            .query_map(params![user_id, min_prominence], row_to_memory)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    pub fn search_fts(&self, user_id: &str, query: &str, limit: usize) -> Result<Vec<(Memory, f64)>> {
        let conn = self.reader_for();
        let sanitized = sanitize_fts5_query(query);
        if sanitized.is_empty() {
            return Ok(Vec::new());
        }
        let mut stmt = conn.prepare(
            "SELECT m.*, bm25(memories_fts) as rank
             FROM memories_fts
             JOIN memories m ON m.id = memories_fts.id
             WHERE memories_fts MATCH ?1 AND m.user_id = ?2 AND m.is_latest = 1
             ORDER BY rank LIMIT ?3",
        )?;
        let rows = stmt
            .query_map(params![sanitized, user_id, limit as i64], |row| {
                let memory = row_to_memory(row)?;
                let rank: f64 = row.get("rank")?;
                Ok((memory, rank))
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    pub fn record_access(&self, id: Uuid, at: DateTime<Utc>) -> Result<()> {
        let conn = self.writer();
        conn.execute(
            "UPDATE memories SET access_count = access_count + 1, last_accessed = ?2 WHERE id = ?1",
            params![id.to_string(), at.to_rfc3339()],
        )?;
        Ok(())
    }

    pub fn set_prominence(&self, id: Uuid, prominence: f32) -> Result<()> {
        let conn = self.writer();
        conn.execute(
            "UPDATE memories SET prominence = ?2 WHERE id = ?1",
            params![id.to_string(), prominence],
        )?;
        Ok(())
    }

    /// Marks a memory archived by zeroing its prominence and dropping it
    /// from `is_latest`, so it stops being retrieved without being deleted
    /// (§9 Open Question: supersession model, not hard delete).
    pub fn archive_memory(&self, id: Uuid) -> Result<()> {
        let conn = self.writer();
        conn.execute(
            "UPDATE memories SET prominence = 0, is_latest = 0 WHERE id = ?1",
            params![id.to_string()],
        )?;
        Ok(())
    }

    /// Permanently deletes memories that have been archived for longer than
    /// `older_than`. The only hard-delete path in the store; everything
    /// else works through `archive_memory`.
    pub fn purge_archived(&self, user_id: &str, older_than: DateTime<Utc>) -> Result<u64> {
        let conn = self.writer();
        let deleted = conn.execute(
            "DELETE FROM memories WHERE user_id = ?1 AND is_latest = 0 AND prominence = 0 AND updated_at < ?2",
            params![user_id, older_than.to_rfc3339()],
        )?;
        Ok(deleted as u64)
    }

    pub fn stats(&self, user_id: &str) -> Result<MemoryStats> {
        let conn = self.reader_for();
        conn.query_row(
            "SELECT
                COUNT(*) as total,
                COALESCE(SUM(is_latest), 0) as latest,
                COALESCE(SUM(CASE WHEN memory_type = 'superseded' THEN 1 ELSE 0 END), 0) as superseded,
                COALESCE(SUM(CASE WHEN memory_type = 'derived' THEN 1 ELSE 0 END), 0) as derived,
                COALESCE(SUM(CASE WHEN is_latest = 0 AND prominence = 0 THEN 1 ELSE 0 END), 0) as archived,
                COALESCE(AVG(prominence), 0.0) as avg_prominence
             FROM memories WHERE user_id = ?1",
            params![user_id],
            |row| {
                Ok(MemoryStats {
                    total: row.get(0)?,
                    latest: row.get(1)?,
                    superseded: row.get(2)?,
                    derived: row.get(3)?,
                    archived: row.get(4)?,
                    avg_prominence: row.get(5)?,
                })
            },
        )
        .map_err(StorageError::from)
    }

    // -- relations ---------------------------------------------------------

    pub fn add_relation(&self, relation: &Relation) -> Result<()> {
        let conn = self.writer();
        conn.execute(
            "INSERT INTO memory_relations (id, source_id, target_id, relation_type, confidence, created_at)
             VALUES (?1,?2,?3,?4,?5,?6)",
            params![
                relation.id.to_string(),
                relation.source_id.to_string(),
                relation.target_id.to_string(),
                relation.relation_type.as_str(),
                relation.confidence,
                relation.created_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    pub fn get_relations(&self, memory_id: Uuid) -> Result<Vec<Relation>> {
        let conn = self.reader_for();
        let mut stmt = conn.prepare(
            "SELECT * FROM memory_relations WHERE source_id = ?1 OR target_id = ?1",
        )?;
        let rows = stmt
            .query_map(params![memory_id.to_string()], row_to_relation)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    pub fn get_relations_for_user(&self, user_id: &str) -> Result<Vec<Relation>> {
        let conn = self.reader_for();
        let mut stmt = conn.prepare(
            "SELECT r.* FROM memory_relations r
             JOIN memories m ON m.id = r.source_id
             WHERE m.user_id = ?1",
        )?;
        let rows = stmt
            .query_map(params![user_id], row_to_relation)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// Atomically writes the result of one NREM cluster fusion: the derived
    /// memory, its `DERIVES` edges back to the sources, and supersession of
    /// the sources, all inside one transaction (§9 Open Question: NREM
    /// transactional boundary is one cluster, not the whole tick).
    pub fn commit_nrem_cluster(
        &self,
        derived: &Memory,
        edges: &[Relation],
        superseded_ids: &[Uuid],
    ) -> Result<()> {
        let mut conn = self.writer();
        let tx = conn.transaction()?;

        tx.execute(
            "INSERT INTO memories (
                id, user_id, content, category, memory_type, importance, confidence,
                is_latest, source, document_date, event_date, prominence, last_accessed,
                access_count, source_chunk, embedding, metadata, learned_from, created_at, updated_at
            ) VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9,?10,?11,?12,?13,?14,?15,?16,?17,?18,?19,?20)",
            params![
                derived.id.to_string(),
                derived.user_id,
                derived.content,
                derived.category.as_str(),
                derived.memory_type.as_str(),
                derived.importance,
                derived.confidence,
                derived.is_latest,
                derived.source.as_str(),
                derived.document_date.map(|d| d.to_rfc3339()),
                derived.event_date.map(|d| d.to_rfc3339()),
                derived.prominence,
                derived.last_accessed.to_rfc3339(),
                derived.access_count,
                derived.source_chunk,
                derived.embedding.as_ref().map(|e| encode_embedding(e)),
                derived.metadata.to_string(),
                derived.learned_from.map(|tag| tag.as_str()),
                derived.created_at.to_rfc3339(),
                derived.updated_at.to_rfc3339(),
            ],
        )?;

        for edge in edges {
            tx.execute(
                "INSERT INTO memory_relations (id, source_id, target_id, relation_type, confidence, created_at)
                 VALUES (?1,?2,?3,?4,?5,?6)",
                params![
                    edge.id.to_string(),
                    edge.source_id.to_string(),
                    edge.target_id.to_string(),
                    edge.relation_type.as_str(),
                    edge.confidence,
                    edge.created_at.to_rfc3339(),
                ],
            )?;
        }

        for id in superseded_ids {
            tx.execute(
                "UPDATE memories SET is_latest = 0, memory_type = 'superseded' WHERE id = ?1",
                params![id.to_string()],
            )?;
        }

        tx.commit()?;
        Ok(())
    }

    // -- sessions / behavior -------------------------------------------------

    pub fn add_session_summary(&self, summary: &crate::types::SessionSummary) -> Result<()> {
        let conn = self.writer();
        conn.execute(
            "INSERT INTO session_summaries (id, user_id, session_id, summary, message_count, started_at, ended_at, metadata)
             VALUES (?1,?2,?3,?4,?5,?6,?7,?8)",
            params![
                summary.id.to_string(),
                summary.user_id,
                summary.session_id,
                summary.summary,
                summary.message_count,
                summary.started_at.to_rfc3339(),
                summary.ended_at.to_rfc3339(),
                summary.metadata.to_string(),
            ],
        )?;
        Ok(())
    }

    pub fn get_recent_sessions(&self, user_id: &str, limit: usize) -> Result<Vec<crate::types::SessionSummary>> {
        let conn = self.reader_for();
        let mut stmt = conn.prepare(
            "SELECT * FROM session_summaries WHERE user_id = ?1 ORDER BY ended_at DESC LIMIT ?2",
        )?;
        let rows = stmt
            .query_map(params![user_id, limit as i64], row_to_session)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    pub fn get_behavioral_patterns(&self, user_id: &str) -> Result<Option<BehavioralPatterns>> {
        let conn = self.reader_for();
        conn.query_row(
            "SELECT * FROM behavioral_patterns WHERE user_id = ?1",
            params![user_id],
            row_to_behavior,
        )
        .optional()
        .map_err(StorageError::from)
    }

    pub fn upsert_behavioral_patterns(&self, patterns: &BehavioralPatterns) -> Result<()> {
        let conn = self.writer();
        conn.execute(
            "INSERT INTO behavioral_patterns (user_id, message_frequency, session_engagement, response_length, smoothed_affect, response_preferences, updated_at)
             VALUES (?1,?2,?3,?4,?5,?6,?7)
             ON CONFLICT(user_id) DO UPDATE SET
                message_frequency = excluded.message_frequency,
                session_engagement = excluded.session_engagement,
                response_length = excluded.response_length,
                smoothed_affect = excluded.smoothed_affect,
                response_preferences = excluded.response_preferences,
                updated_at = excluded.updated_at",
            params![
                patterns.user_id,
                patterns.message_frequency,
                patterns.session_engagement,
                patterns.response_length,
                patterns.smoothed_affect,
                patterns.response_preferences.to_string(),
                patterns.updated_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    // -- profiles ------------------------------------------------------------

    pub fn get_profile(&self, user_id: &str) -> Result<Option<Profile>> {
        let conn = self.reader_for();
        conn.query_row(
            "SELECT * FROM profiles WHERE user_id = ?1",
            params![user_id],
            row_to_profile,
        )
        .optional()
        .map_err(StorageError::from)
    }

    pub fn upsert_profile(&self, profile: &Profile) -> Result<()> {
        let conn = self.writer();
        conn.execute(
            "INSERT INTO profiles (user_id, persona_document, last_reflected_session_id, updated_at)
             VALUES (?1,?2,?3,?4)
             ON CONFLICT(user_id) DO UPDATE SET
                persona_document = excluded.persona_document,
                last_reflected_session_id = excluded.last_reflected_session_id,
                updated_at = excluded.updated_at",
            params![
                profile.user_id,
                profile.persona_document,
                profile.last_reflected_session_id,
                profile.updated_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    // -- scheduled items -----------------------------------------------------

    pub fn add_scheduled_item(&self, item: &ScheduledItem) -> Result<()> {
        let conn = self.writer();
        conn.execute(
            "INSERT INTO scheduled_items (
                id, user_id, session_id, source, kind, item_type, message, context,
                trigger_at, recurring, source_memory_id, task_config, status, created_at
            ) VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9,?10,?11,?12,?13,?14)",
            params![
                item.id.to_string(),
                item.user_id,
                item.session_id,
                item.source,
                kind_str(item.kind),
                item.item_type,
                item.message,
                item.context.to_string(),
                item.trigger_at.to_rfc3339(),
                item.recurring,
                item.source_memory_id.map(|id| id.to_string()),
                item.task_config.as_ref().map(|c| serde_json::to_string(c).unwrap_or_default()),
                item.status.as_str(),
                item.created_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    pub fn get_pending_scheduled_items_by_user(&self, user_id: &str, now: DateTime<Utc>) -> Result<Vec<ScheduledItem>> {
        let conn = self.reader_for();
        let mut stmt = conn.prepare(
            "SELECT * FROM scheduled_items WHERE user_id = ?1 AND status = 'pending' AND trigger_at <= ?2 ORDER BY trigger_at ASC",
        )?;
        let rows = stmt
            .query_map(params![user_id, now.to_rfc3339()], row_to_scheduled)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// Most recently triggered nudge for a user, used to enforce the
    /// minimum gap between proactive deliveries (§4.H). `Acted` is the
    /// status a nudge moves to once `fire_due_items` delivers it.
    pub fn get_last_delivered_scheduled_item(&self, user_id: &str) -> Result<Option<ScheduledItem>> {
        let conn = self.reader_for();
        conn.query_row(
            "SELECT * FROM scheduled_items WHERE user_id = ?1 AND kind = 'nudge' AND status = 'acted'
             ORDER BY trigger_at DESC LIMIT 1",
            params![user_id],
            row_to_scheduled,
        )
        .optional()
        .map_err(StorageError::from)
    }

    pub fn update_scheduled_item_status(&self, id: Uuid, status: ScheduledStatus) -> Result<()> {
        let conn = self.writer();
        let changed = conn.execute(
            "UPDATE scheduled_items SET status = ?2 WHERE id = ?1",
            params![id.to_string(), status.as_str()],
        )?;
        if changed == 0 {
            return Err(StorageError::NotFound(id.to_string()));
        }
        Ok(())
    }

    // -- consolidation / dream history audit rows ----------------------------

    pub fn record_consolidation(&self, record: &ConsolidationHistory) -> Result<()> {
        let conn = self.writer();
        conn.execute(
            "INSERT INTO consolidation_history (id, user_id, clusters_considered, clusters_fused, memories_superseded, ran_at)
             VALUES (?1,?2,?3,?4,?5,?6)",
            params![
                record.id.to_string(),
                record.user_id,
                record.clusters_considered,
                record.clusters_fused,
                record.memories_superseded,
                record.ran_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    pub fn record_dream(&self, record: &DreamHistory) -> Result<()> {
        let conn = self.writer();
        conn.execute(
            "INSERT INTO dream_history (id, user_id, seeds_sampled, candidates_judged, connections_accepted, ran_at)
             VALUES (?1,?2,?3,?4,?5,?6)",
            params![
                record.id.to_string(),
                record.user_id,
                record.seeds_sampled,
                record.candidates_judged,
                record.connections_accepted,
                record.ran_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    /// Escape hatch for callers (and tests) that need a query shape not
    /// covered above; mirrors the teacher's own `raw` accessor rather than
    /// growing this struct's public surface without bound.
    pub fn raw(&self) -> std::sync::MutexGuard<'_, Connection> {
        self.writer()
    }
}

fn kind_str(kind: ScheduledKind) -> &'static str {
    match kind {
        ScheduledKind::Nudge => "nudge",
        ScheduledKind::Task => "task",
    }
}

fn encode_embedding(embedding: &[f32]) -> Vec<u8> {
    embedding.iter().flat_map(|f| f.to_le_bytes()).collect()
}

fn decode_embedding(bytes: &[u8]) -> Vec<f32> {
    bytes
        .chunks_exact(4)
        .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect()
}

fn parse_dt(s: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(e)))
}

fn row_to_memory(row: &rusqlite::Row) -> rusqlite::Result<Memory> {
    let id: String = row.get("id")?;
    let category: String = row.get("category")?;
    let memory_type: String = row.get("memory_type")?;
    let source: String = row.get("source")?;
    let document_date: Option<String> = row.get("document_date")?;
    let event_date: Option<String> = row.get("event_date")?;
    let last_accessed: String = row.get("last_accessed")?;
    let embedding: Option<Vec<u8>> = row.get("embedding")?;
    let metadata: String = row.get("metadata")?;
    let learned_from: Option<String> = row.get("learned_from")?;
    let created_at: String = row.get("created_at")?;
    let updated_at: String = row.get("updated_at")?;

    Ok(Memory {
        id: Uuid::parse_str(&id).unwrap_or_default(),
        user_id: row.get("user_id")?,
        content: row.get("content")?,
        category: Category::parse(&category).unwrap_or(Category::Fact),
        memory_type: MemoryType::parse(&memory_type).unwrap_or(MemoryType::Regular),
        importance: row.get("importance")?,
        confidence: row.get("confidence")?,
        is_latest: row.get("is_latest")?,
        source: Source::parse(&source).unwrap_or(Source::User),
        document_date: document_date.map(|s| parse_dt(&s)).transpose()?,
        event_date: event_date.map(|s| parse_dt(&s)).transpose()?,
        prominence: row.get("prominence")?,
        last_accessed: parse_dt(&last_accessed)?,
        access_count: row.get("access_count")?,
        source_chunk: row.get("source_chunk")?,
        embedding: embedding.map(|b| decode_embedding(&b)),
        metadata: serde_json::from_str(&metadata).unwrap_or(serde_json::Value::Null),
        learned_from: learned_from.and_then(|s| LearnedFrom::parse(&s)),
        created_at: parse_dt(&created_at)?,
        updated_at: parse_dt(&updated_at)?,
    })
}

fn row_to_relation(row: &rusqlite::Row) -> rusqlite::Result<Relation> {
    let id: String = row.get("id")?;
    let source_id: String = row.get("source_id")?;
    let target_id: String = row.get("target_id")?;
    let relation_type: String = row.get("relation_type")?;
    let created_at: String = row.get("created_at")?;
    Ok(Relation {
        id: Uuid::parse_str(&id).unwrap_or_default(),
        source_id: Uuid::parse_str(&source_id).unwrap_or_default(),
        target_id: Uuid::parse_str(&target_id).unwrap_or_default(),
        relation_type: RelationType::parse(&relation_type).unwrap_or(RelationType::Extends),
        confidence: row.get("confidence")?,
        created_at: parse_dt(&created_at)?,
    })
}

fn row_to_session(row: &rusqlite::Row) -> rusqlite::Result<crate::types::SessionSummary> {
    let id: String = row.get("id")?;
    let started_at: String = row.get("started_at")?;
    let ended_at: String = row.get("ended_at")?;
    let metadata: String = row.get("metadata")?;
    Ok(crate::types::SessionSummary {
        id: Uuid::parse_str(&id).unwrap_or_default(),
        user_id: row.get("user_id")?,
        session_id: row.get("session_id")?,
        summary: row.get("summary")?,
        message_count: row.get("message_count")?,
        started_at: parse_dt(&started_at)?,
        ended_at: parse_dt(&ended_at)?,
        metadata: serde_json::from_str(&metadata).unwrap_or(serde_json::Value::Null),
    })
}

fn row_to_behavior(row: &rusqlite::Row) -> rusqlite::Result<BehavioralPatterns> {
    let updated_at: String = row.get("updated_at")?;
    let response_preferences: String = row.get("response_preferences")?;
    Ok(BehavioralPatterns {
        user_id: row.get("user_id")?,
        message_frequency: row.get("message_frequency")?,
        session_engagement: row.get("session_engagement")?,
        response_length: row.get("response_length")?,
        smoothed_affect: row.get("smoothed_affect")?,
        response_preferences: serde_json::from_str(&response_preferences).unwrap_or(serde_json::Value::Null),
        updated_at: parse_dt(&updated_at)?,
    })
}

fn row_to_profile(row: &rusqlite::Row) -> rusqlite::Result<Profile> {
    let updated_at: String = row.get("updated_at")?;
    Ok(Profile {
        user_id: row.get("user_id")?,
        persona_document: row.get("persona_document")?,
        last_reflected_session_id: row.get("last_reflected_session_id")?,
        updated_at: parse_dt(&updated_at)?,
    })
}

fn row_to_scheduled(row: &rusqlite::Row) -> rusqlite::Result<ScheduledItem> {
    let id: String = row.get("id")?;
    let kind: String = row.get("kind")?;
    let context: String = row.get("context")?;
    let trigger_at: String = row.get("trigger_at")?;
    let source_memory_id: Option<String> = row.get("source_memory_id")?;
    let task_config: Option<String> = row.get("task_config")?;
    let status: String = row.get("status")?;
    let created_at: String = row.get("created_at")?;
    Ok(ScheduledItem {
        id: Uuid::parse_str(&id).unwrap_or_default(),
        user_id: row.get("user_id")?,
        session_id: row.get("session_id")?,
        source: row.get("source")?,
        kind: if kind == "task" { ScheduledKind::Task } else { ScheduledKind::Nudge },
        item_type: row.get("item_type")?,
        message: row.get("message")?,
        context: serde_json::from_str(&context).unwrap_or(serde_json::Value::Null),
        trigger_at: parse_dt(&trigger_at)?,
        recurring: row.get("recurring")?,
        source_memory_id: source_memory_id.and_then(|s| Uuid::parse_str(&s).ok()),
        task_config: task_config.and_then(|s| serde_json::from_str::<TaskConfig>(&s).ok()),
        status: ScheduledStatus::parse(&status).unwrap_or(ScheduledStatus::Pending),
        created_at: parse_dt(&created_at)?,
    })
}

/// Strips FTS5 special characters that would otherwise make a user-supplied
/// query string a malformed or injected MATCH expression.
pub fn sanitize_fts5_query(query: &str) -> String {
    let cleaned: String = query
        .chars()
        .map(|c| if c.is_alphanumeric() || c.is_whitespace() { c } else { ' ' })
        .collect();
    cleaned
        .split_whitespace()
        .map(|term| format!("{term}*"))
        .collect::<Vec<_>>()
        .join(" OR ")
}
