//! Pluggable session persistence. The authenticator talks to any
//! [`SessionStore`]; the default is a process-local sharded map.

use crate::error::StoreError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};
use std::sync::RwLock;

/// The stored unit, keyed by session id.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SessionRecord {
    pub data: HashMap<String, serde_json::Value>,
    pub last_used: DateTime<Utc>,
}

impl SessionRecord {
    pub fn empty() -> Self {
        Self {
            data: HashMap::new(),
            last_used: Utc::now(),
        }
    }
}

/// Key→record persistence. `read` must not fail for a missing id; `write`
/// must upsert. Eviction of stale entries is the adapter's own concern.
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn read(&self, session_id: &str) -> Result<Option<SessionRecord>, StoreError>;
    async fn write(&self, session_id: &str, record: SessionRecord) -> Result<(), StoreError>;
}

const SHARD_COUNT: usize = 16;

/// Default in-memory store, sharded by session id so concurrent requests for
/// different sessions do not contend on one lock.
pub struct MemoryStore {
    shards: Vec<RwLock<HashMap<String, SessionRecord>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            shards: (0..SHARD_COUNT).map(|_| RwLock::new(HashMap::new())).collect(),
        }
    }

    fn shard(&self, session_id: &str) -> &RwLock<HashMap<String, SessionRecord>> {
        let mut hasher = DefaultHasher::new();
        session_id.hash(&mut hasher);
        &self.shards[(hasher.finish() as usize) % SHARD_COUNT]
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SessionStore for MemoryStore {
    async fn read(&self, session_id: &str) -> Result<Option<SessionRecord>, StoreError> {
        let shard = self
            .shard(session_id)
            .read()
            .map_err(|_| StoreError::Backend("memory store lock poisoned".into()))?;
        Ok(shard.get(session_id).cloned())
    }

    async fn write(&self, session_id: &str, record: SessionRecord) -> Result<(), StoreError> {
        let mut shard = self
            .shard(session_id)
            .write()
            .map_err(|_| StoreError::Backend("memory store lock poisoned".into()))?;
        shard.insert(session_id.to_string(), record);
        Ok(())
    }
}

/// PostgreSQL-backed store: one row per session id, JSONB payload, upsert on
/// write. Call [`PgSessionStore::ensure_table`] once at startup.
pub struct PgSessionStore {
    pool: sqlx::PgPool,
}

impl PgSessionStore {
    pub fn new(pool: sqlx::PgPool) -> Self {
        Self { pool }
    }

    pub async fn ensure_table(&self) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS portico_sessions (
                id TEXT PRIMARY KEY,
                data JSONB NOT NULL,
                last_used TIMESTAMPTZ NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

#[async_trait]
impl SessionStore for PgSessionStore {
    async fn read(&self, session_id: &str) -> Result<Option<SessionRecord>, StoreError> {
        let row: Option<(serde_json::Value, DateTime<Utc>)> =
            sqlx::query_as("SELECT data, last_used FROM portico_sessions WHERE id = $1")
                .bind(session_id)
                .fetch_optional(&self.pool)
                .await?;
        match row {
            None => Ok(None),
            Some((data, last_used)) => {
                let data = serde_json::from_value(data)
                    .map_err(|e| StoreError::Backend(format!("corrupt session payload: {}", e)))?;
                Ok(Some(SessionRecord { data, last_used }))
            }
        }
    }

    async fn write(&self, session_id: &str, record: SessionRecord) -> Result<(), StoreError> {
        let data = serde_json::to_value(&record.data)
            .map_err(|e| StoreError::Backend(format!("serialize session payload: {}", e)))?;
        sqlx::query(
            r#"
            INSERT INTO portico_sessions (id, data, last_used) VALUES ($1, $2, $3)
            ON CONFLICT (id) DO UPDATE SET data = EXCLUDED.data, last_used = EXCLUDED.last_used
            "#,
        )
        .bind(session_id)
        .bind(data)
        .bind(record.last_used)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}
