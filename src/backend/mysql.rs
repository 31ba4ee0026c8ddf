use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::mysql::MySqlPoolOptions;
use sqlx::MySqlPool;

use crate::config::types::Table;
use crate::planner::diff::TableDelta;

use super::ddl::{self, Dialect};
use super::SchemaBackend;

/// Direct MySQL adapter. The pool is lazy: no connection is opened until
/// the first statement runs.
pub struct MySqlBackend {
    pool: MySqlPool,
}

impl MySqlBackend {
    pub fn connect(host: &str, user: &str, password: &str, database: &str) -> Result<Self> {
        let dsn = format!("mysql://{}:{}@{}/{}", user, password, host, database);
        let pool = MySqlPoolOptions::new()
            .max_connections(1)
            .connect_lazy(&dsn)
            .with_context(|| format!("invalid MySQL connection settings for host '{}'", host))?;
        Ok(Self { pool })
    }

    async fn execute(&self, sql: &str) -> Result<()> {
        tracing::debug!(sql, "Executing SQL");
        sqlx::query(sql)
            .execute(&self.pool)
            .await
            .with_context(|| format!("SQL execution failed: {}", sql))?;
        Ok(())
    }
}

#[async_trait]
impl SchemaBackend for MySqlBackend {
    async fn exists(&self, table_name: &str) -> Result<bool> {
        let row: Option<(i64,)> = sqlx::query_as(
            "SELECT 1 FROM information_schema.tables \
             WHERE table_schema = DATABASE() AND table_name = ?",
        )
        .bind(table_name)
        .fetch_optional(&self.pool)
        .await
        .context("failed to query information_schema")?;
        Ok(row.is_some())
    }

    async fn create(&self, table: &Table) -> Result<()> {
        self.execute(&ddl::create_table(Dialect::MySql, table)).await
    }

    async fn alter(&self, table: &Table, delta: &TableDelta) -> Result<()> {
        for stmt in ddl::alter_statements(Dialect::MySql, &table.name, delta) {
            self.execute(&stmt).await?;
        }
        Ok(())
    }

    async fn drop(&self, table_name: &str) -> Result<()> {
        self.execute(&ddl::drop_table(Dialect::MySql, table_name))
            .await
    }
}
