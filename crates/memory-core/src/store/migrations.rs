//! Schema migrations (§6.2).

/// A single forward-only migration.
#[derive(Debug, Clone)]
pub struct Migration {
    pub version: u32,
    pub description: &'static str,
    pub up: &'static str,
}

pub const MIGRATIONS: &[Migration] = &[Migration {
    version: 1,
    description: "Initial schema: memories, relations, sessions, behavior, scheduled items, profiles",
    up: MIGRATION_V1_UP,
}];

const MIGRATION_V1_UP: &str = r#"
CREATE TABLE IF NOT EXISTS schema_version (
    version INTEGER NOT NULL,
    applied_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS memories (
    id TEXT PRIMARY KEY,
    user_id TEXT NOT NULL,
    content TEXT NOT NULL,
    category TEXT NOT NULL,
    memory_type TEXT NOT NULL DEFAULT 'regular',
    importance INTEGER NOT NULL DEFAULT 5,
    confidence REAL NOT NULL DEFAULT 1.0,
    is_latest INTEGER NOT NULL DEFAULT 1,
    source TEXT NOT NULL DEFAULT 'user',
    document_date TEXT,
    event_date TEXT,
    prominence REAL NOT NULL DEFAULT 1.0,
    last_accessed TEXT NOT NULL,
    access_count INTEGER NOT NULL DEFAULT 0,
    source_chunk TEXT,
    embedding BLOB,
    metadata TEXT NOT NULL DEFAULT '{}',
    learned_from TEXT,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_memories_user ON memories(user_id);
CREATE INDEX IF NOT EXISTS idx_memories_user_latest ON memories(user_id, is_latest);
CREATE INDEX IF NOT EXISTS idx_memories_prominence ON memories(prominence);
CREATE INDEX IF NOT EXISTS idx_memories_category ON memories(category);

CREATE VIRTUAL TABLE IF NOT EXISTS memories_fts USING fts5(
    id UNINDEXED,
    content,
    tokenize = 'porter'
);

CREATE TRIGGER IF NOT EXISTS memories_ai AFTER INSERT ON memories BEGIN
    INSERT INTO memories_fts(rowid, id, content) VALUES (NEW.rowid, NEW.id, NEW.content);
END;

CREATE TRIGGER IF NOT EXISTS memories_ad AFTER DELETE ON memories BEGIN
    INSERT INTO memories_fts(memories_fts, rowid, id, content) VALUES ('delete', OLD.rowid, OLD.id, OLD.content);
END;

CREATE TRIGGER IF NOT EXISTS memories_au AFTER UPDATE ON memories BEGIN
    INSERT INTO memories_fts(memories_fts, rowid, id, content) VALUES ('delete', OLD.rowid, OLD.id, OLD.content);
    INSERT INTO memories_fts(rowid, id, content) VALUES (NEW.rowid, NEW.id, NEW.content);
END;

CREATE TABLE IF NOT EXISTS memory_relations (
    id TEXT PRIMARY KEY,
    source_id TEXT NOT NULL REFERENCES memories(id) ON DELETE CASCADE,
    target_id TEXT NOT NULL REFERENCES memories(id) ON DELETE CASCADE,
    relation_type TEXT NOT NULL,
    confidence REAL NOT NULL DEFAULT 1.0,
    created_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_relations_source ON memory_relations(source_id);
CREATE INDEX IF NOT EXISTS idx_relations_target ON memory_relations(target_id);

CREATE TABLE IF NOT EXISTS session_summaries (
    id TEXT PRIMARY KEY,
    user_id TEXT NOT NULL,
    session_id TEXT NOT NULL,
    summary TEXT NOT NULL,
    message_count INTEGER NOT NULL DEFAULT 0,
    started_at TEXT NOT NULL,
    ended_at TEXT NOT NULL,
    metadata TEXT NOT NULL DEFAULT '{}'
);

CREATE INDEX IF NOT EXISTS idx_sessions_user ON session_summaries(user_id, ended_at);

CREATE TABLE IF NOT EXISTS behavioral_patterns (
    user_id TEXT PRIMARY KEY,
    message_frequency REAL NOT NULL DEFAULT 0,
    session_engagement REAL NOT NULL DEFAULT 0,
    response_length REAL NOT NULL DEFAULT 0,
    smoothed_affect REAL NOT NULL DEFAULT 0,
    response_preferences TEXT NOT NULL DEFAULT '{}',
    updated_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS scheduled_items (
    id TEXT PRIMARY KEY,
    user_id TEXT NOT NULL,
    session_id TEXT,
    source TEXT NOT NULL,
    kind TEXT NOT NULL,
    item_type TEXT NOT NULL,
    message TEXT NOT NULL,
    context TEXT NOT NULL DEFAULT '{}',
    trigger_at TEXT NOT NULL,
    recurring INTEGER NOT NULL DEFAULT 0,
    source_memory_id TEXT,
    task_config TEXT,
    status TEXT NOT NULL DEFAULT 'pending',
    created_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_scheduled_user_status ON scheduled_items(user_id, status, trigger_at);

CREATE TABLE IF NOT EXISTS profiles (
    user_id TEXT PRIMARY KEY,
    persona_document TEXT NOT NULL DEFAULT '',
    last_reflected_session_id TEXT,
    updated_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS consolidation_history (
    id TEXT PRIMARY KEY,
    user_id TEXT NOT NULL,
    clusters_considered INTEGER NOT NULL DEFAULT 0,
    clusters_fused INTEGER NOT NULL DEFAULT 0,
    memories_superseded INTEGER NOT NULL DEFAULT 0,
    ran_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS dream_history (
    id TEXT PRIMARY KEY,
    user_id TEXT NOT NULL,
    seeds_sampled INTEGER NOT NULL DEFAULT 0,
    candidates_judged INTEGER NOT NULL DEFAULT 0,
    connections_accepted INTEGER NOT NULL DEFAULT 0,
    ran_at TEXT NOT NULL
);

UPDATE schema_version SET version = 1, applied_at = datetime('now');
INSERT INTO schema_version (version, applied_at)
    SELECT 1, datetime('now') WHERE NOT EXISTS (SELECT 1 FROM schema_version);
"#;

pub fn get_current_version(conn: &rusqlite::Connection) -> rusqlite::Result<u32> {
    conn.query_row("SELECT COALESCE(MAX(version), 0) FROM schema_version", [], |row| {
        row.get(0)
    })
    .or(Ok(0))
}

/// Applies every migration newer than the database's current version.
pub fn apply_migrations(conn: &rusqlite::Connection) -> rusqlite::Result<u32> {
    let current_version = get_current_version(conn)?;
    let mut applied = 0;

    for migration in MIGRATIONS {
        if migration.version > current_version {
            tracing::info!(
                version = migration.version,
                description = migration.description,
                "applying migration"
            );
            conn.execute_batch(migration.up)?;
            applied += 1;
        }
    }

    Ok(applied)
}
