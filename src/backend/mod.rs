pub mod ddl;
#[cfg(feature = "mysql")]
pub mod mysql;
pub mod postgres;

use anyhow::{bail, Result};
use async_trait::async_trait;

use crate::config::types::{Connection, Table};
use crate::planner::diff::TableDelta;

/// Which database backend a run targets. The kind selects the resource-type
/// discriminator accepted by the loader, the config glob, the default state
/// file, and the SQL dialect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum BackendKind {
    /// Postgres through the Supabase REST API.
    Postgres,
    /// Direct MySQL connection.
    Mysql,
}

impl BackendKind {
    pub fn resource_type(self) -> &'static str {
        match self {
            BackendKind::Postgres => "supabase_table",
            BackendKind::Mysql => "mysql_table",
        }
    }

    pub fn config_glob(self) -> &'static str {
        match self {
            BackendKind::Postgres => "aqua.*.yaml",
            BackendKind::Mysql => "aquamy.*.yaml",
        }
    }

    pub fn default_state_file(self) -> &'static str {
        match self {
            BackendKind::Postgres => "aqua.state.json",
            BackendKind::Mysql => "aquamy.state.json",
        }
    }

    pub fn default_model_file(self) -> &'static str {
        match self {
            BackendKind::Postgres => "aqua.model.yaml",
            BackendKind::Mysql => "aquamy.model.yaml",
        }
    }
}

// ─── Adapter contract ───────────────────────────────────────────────────────

/// One live database connection capable of executing planned changes.
///
/// Every operation is a single logical DDL action; an `Err` is the failure
/// signal the reconciler uses to skip the state update for that resource and
/// move on to the next one.
#[async_trait]
pub trait SchemaBackend: Send + Sync {
    /// Check whether a table exists on the live database. The reconciler
    /// never consults this — the state file is the source of truth — but
    /// adapters expose it for callers that want a sanity probe.
    async fn exists(&self, table_name: &str) -> Result<bool>;

    /// Create the table with its full column set, primary key and inline
    /// foreign keys. Must be idempotent (`IF NOT EXISTS` semantics).
    async fn create(&self, table: &Table) -> Result<()>;

    /// Apply a structural delta as a sequence of single-purpose statements.
    async fn alter(&self, table: &Table, delta: &TableDelta) -> Result<()>;

    /// Drop the table. Must be idempotent (`IF EXISTS` semantics).
    async fn drop(&self, table_name: &str) -> Result<()>;
}

/// Constructs an adapter from a resolved connection descriptor.
///
/// The reconciler goes through this seam once per planned change, so tests
/// can substitute a recording fake without touching any network code.
pub trait AdapterFactory: Send + Sync {
    fn connect(&self, conn: &Connection) -> Result<Box<dyn SchemaBackend>>;
}

/// The production factory: hands out REST or MySQL adapters according to the
/// backend kind selected on the command line.
pub struct LiveFactory {
    kind: BackendKind,
}

impl LiveFactory {
    pub fn new(kind: BackendKind) -> Self {
        Self { kind }
    }
}

impl AdapterFactory for LiveFactory {
    fn connect(&self, conn: &Connection) -> Result<Box<dyn SchemaBackend>> {
        match (self.kind, conn) {
            (BackendKind::Postgres, Connection::Postgres { url, key }) => {
                Ok(Box::new(postgres::PostgresRest::new(url, key)?))
            }
            #[cfg(feature = "mysql")]
            (
                BackendKind::Mysql,
                Connection::MySql {
                    host,
                    user,
                    password,
                    database,
                },
            ) => Ok(Box::new(mysql::MySqlBackend::connect(
                host, user, password, database,
            )?)),
            #[cfg(not(feature = "mysql"))]
            (BackendKind::Mysql, Connection::MySql { .. }) => {
                bail!("this build was compiled without the `mysql` feature")
            }
            _ => bail!(
                "connection fields do not match the {:?} backend",
                self.kind
            ),
        }
    }
}
