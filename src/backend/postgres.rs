use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use serde_json::json;

use crate::config::types::Table;
use crate::planner::diff::TableDelta;

use super::ddl::{self, Dialect};
use super::SchemaBackend;

/// Adapter for Postgres behind the Supabase REST API. Every statement goes
/// through the `execute_sql` RPC the target project must expose; the RPC
/// reports logical failures as `{"success": false, "error": "…"}` with a
/// 200 status.
#[derive(Debug)]
pub struct PostgresRest {
    client: reqwest::Client,
    rest_url: String,
    key: String,
}

impl PostgresRest {
    /// Construction validates that the URL parses, which is also where an
    /// unresolved `${VAR}` placeholder surfaces as a per-resource error.
    pub fn new(url: &str, key: &str) -> Result<Self> {
        reqwest::Url::parse(url).with_context(|| format!("invalid Supabase URL '{}'", url))?;
        Ok(Self {
            client: reqwest::Client::new(),
            rest_url: format!("{}/rest/v1", url.trim_end_matches('/')),
            key: key.to_string(),
        })
    }

    async fn execute_sql(&self, sql: &str) -> Result<()> {
        tracing::debug!(sql, "Executing SQL via REST");
        let endpoint = format!("{}/rpc/execute_sql", self.rest_url);
        let response = self
            .client
            .post(&endpoint)
            .header("apikey", &self.key)
            .bearer_auth(&self.key)
            .header("Prefer", "return=representation")
            .json(&json!({ "command": sql }))
            .send()
            .await
            .with_context(|| format!("request to {} failed", endpoint))?
            .error_for_status()
            .context("execute_sql returned an error status")?;

        let body: serde_json::Value = response.json().await.unwrap_or(serde_json::Value::Null);
        if body.get("success").and_then(|v| v.as_bool()) == Some(false) {
            let message = body
                .get("error")
                .and_then(|v| v.as_str())
                .unwrap_or("unknown error");
            bail!("SQL execution failed: {}", message);
        }
        Ok(())
    }
}

#[async_trait]
impl SchemaBackend for PostgresRest {
    async fn exists(&self, table_name: &str) -> Result<bool> {
        let response = self
            .client
            .get(format!("{}/", self.rest_url))
            .header("apikey", &self.key)
            .bearer_auth(&self.key)
            .send()
            .await
            .context("failed to query the REST root")?
            .error_for_status()?;

        // The REST root exposes the schema; a table is present when it
        // appears among the top-level keys or path entries.
        let body: serde_json::Value = response.json().await?;
        Ok(match body {
            serde_json::Value::Object(map) => {
                map.contains_key(table_name)
                    || map
                        .get("paths")
                        .and_then(|p| p.as_object())
                        .map(|paths| paths.contains_key(&format!("/{}", table_name)))
                        .unwrap_or(false)
            }
            serde_json::Value::Array(items) => items
                .iter()
                .any(|item| item.as_str() == Some(table_name)),
            _ => false,
        })
    }

    async fn create(&self, table: &Table) -> Result<()> {
        self.execute_sql(&ddl::create_table(Dialect::Postgres, table))
            .await
    }

    async fn alter(&self, table: &Table, delta: &TableDelta) -> Result<()> {
        for stmt in ddl::alter_statements(Dialect::Postgres, &table.name, delta) {
            self.execute_sql(&stmt).await?;
        }
        Ok(())
    }

    async fn drop(&self, table_name: &str) -> Result<()> {
        self.execute_sql(&ddl::drop_table(Dialect::Postgres, table_name))
            .await
    }
}
