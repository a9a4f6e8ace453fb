//! Injected SQL collaborator for compile-time DDL execution.

use crate::error::SqlError;
use async_trait::async_trait;
use sqlx::Row;

/// Executes DDL statements handed over by the compiler, one at a time, in
/// declaration order. `get_all` is the optional introspection hook used only
/// in auto-migrate mode; executors without introspection keep the default.
#[async_trait]
pub trait SqlExecutor: Send + Sync {
    async fn run(&self, statement: &str) -> Result<(), SqlError>;

    /// Run an introspection query and return the first column of each row.
    async fn get_all(&self, _statement: &str) -> Result<Vec<String>, SqlError> {
        Err(SqlError::IntrospectionUnsupported)
    }
}

/// PostgreSQL executor backed by an sqlx pool.
pub struct PgExecutor {
    pool: sqlx::PgPool,
}

impl PgExecutor {
    pub fn new(pool: sqlx::PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SqlExecutor for PgExecutor {
    async fn run(&self, statement: &str) -> Result<(), SqlError> {
        sqlx::query(statement).execute(&self.pool).await?;
        Ok(())
    }

    async fn get_all(&self, statement: &str) -> Result<Vec<String>, SqlError> {
        let rows = sqlx::query(statement).fetch_all(&self.pool).await?;
        let mut values = Vec::with_capacity(rows.len());
        for row in rows {
            values.push(row.try_get::<String, _>(0)?);
        }
        Ok(values)
    }
}
