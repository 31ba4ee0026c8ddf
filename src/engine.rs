use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use anyhow::{bail, Result};
use colored::Colorize;

use crate::backend::{AdapterFactory, SchemaBackend};
use crate::config::types::Table;
use crate::dag::graph::{build_table_graph, deletion_order};
use crate::planner::plan::{build_plan, Plan, PlannedChange};
use crate::state::lock::StateLock;
use crate::state::store::{parse_recorded, StateStore};
use crate::vars;

/// Counts of what an apply or destroy run actually did.
#[derive(Debug, Default)]
pub struct ApplySummary {
    pub created: usize,
    pub updated: usize,
    pub destroyed: usize,
    pub failed: usize,
    pub is_destroy: bool,
}

impl std::fmt::Display for ApplySummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_destroy {
            write!(
                f,
                "Destroy complete! Resources: {} destroyed",
                self.destroyed
            )?;
        } else {
            write!(
                f,
                "Apply complete! Resources: {} created, {} updated, {} destroyed",
                self.created, self.updated, self.destroyed
            )?;
        }
        if self.failed > 0 {
            write!(f, ", {} failed", self.failed)?;
        }
        write!(f, ".")
    }
}

/// Drives the reconcile loop: plan against the recorded state, execute the
/// changes through a backend adapter in dependency order, and record every
/// success back into the state file.
pub struct Reconciler {
    desired: BTreeMap<String, Table>,
    state: StateStore,
    factory: Arc<dyn AdapterFactory>,
}

impl Reconciler {
    pub fn new(
        desired: BTreeMap<String, Table>,
        state: StateStore,
        factory: Arc<dyn AdapterFactory>,
    ) -> Self {
        Self {
            desired,
            state,
            factory,
        }
    }

    pub fn state(&self) -> &StateStore {
        &self.state
    }

    /// Create an empty state file, or report that one already exists.
    pub fn init(&mut self) -> Result<()> {
        if self.state.file_exists() {
            println!(
                "{} State already exists: {}",
                "→".blue(),
                self.state.path().display()
            );
        } else {
            self.state.commit()?;
            crate::output::formatter::print_success(&format!(
                "Initialized empty state: {}",
                self.state.path().display()
            ));
        }
        Ok(())
    }

    /// Compute the set of changes without touching any database.
    pub fn plan(&self) -> Plan<'_> {
        build_plan(&self.desired, &self.state)
    }

    /// Execute the plan. The planner already ordered it into the three
    /// phases (updates, creates, deletes) with dependency-safe ordering
    /// inside each, so execution is a single front-to-back walk. A failing
    /// resource is reported and skipped; the state is committed at the end
    /// either way so earlier successes are never lost.
    pub async fn apply(&mut self) -> Result<ApplySummary> {
        let _lock = StateLock::acquire(self.state.path())?;
        let Self {
            desired,
            state,
            factory,
        } = self;

        let plan = build_plan(desired, state);
        let mut summary = ApplySummary::default();
        if plan.is_empty() {
            return Ok(summary);
        }

        for change in &plan.changes {
            match change {
                PlannedChange::Update {
                    resource_id,
                    table,
                    delta,
                } => {
                    println!("{} Updating table {}", "~".yellow().bold(), table.name.bold());
                    let conn = vars::resolve_connection(&table.conn);
                    let outcome = match factory.connect(&conn) {
                        Ok(adapter) => adapter.alter(table, delta).await,
                        Err(e) => Err(e),
                    };
                    match outcome {
                        Ok(()) => {
                            state.put(resource_id, table)?;
                            summary.updated += 1;
                            println!("  {} Table updated", "✓".green());
                        }
                        Err(e) => {
                            summary.failed += 1;
                            println!("  {} Failed to update table: {}", "✗".red(), e);
                        }
                    }
                }
                PlannedChange::Create { resource_id, table } => {
                    println!("{} Creating table {}", "+".green().bold(), table.name.bold());
                    let conn = vars::resolve_connection(&table.conn);
                    let outcome = match factory.connect(&conn) {
                        Ok(adapter) => adapter.create(table).await,
                        Err(e) => Err(e),
                    };
                    match outcome {
                        Ok(()) => {
                            state.put(resource_id, table)?;
                            summary.created += 1;
                            println!("  {} Table created", "✓".green());
                        }
                        Err(e) => {
                            summary.failed += 1;
                            println!("  {} Failed to create table: {}", "✗".red(), e);
                        }
                    }
                }
                PlannedChange::Delete {
                    resource_id,
                    table_name,
                    conn,
                } => {
                    println!("{} Dropping table {}", "-".red().bold(), table_name.bold());
                    let resolved = vars::resolve_connection(conn);
                    let outcome = match factory.connect(&resolved) {
                        Ok(adapter) => SchemaBackend::drop(&*adapter, table_name).await,
                        Err(e) => Err(e),
                    };
                    match outcome {
                        Ok(()) => {
                            state.remove(resource_id);
                            summary.destroyed += 1;
                            println!("  {} Table dropped", "✓".green());
                        }
                        Err(e) => {
                            summary.failed += 1;
                            println!("  {} Failed to drop table: {}", "✗".red(), e);
                        }
                    }
                }
            }
        }

        state.commit()?;
        Ok(summary)
    }

    /// Drop one recorded resource, or every known table in reverse
    /// dependency order. Connections always come from the recorded
    /// descriptors; desired definitions only refine the ordering edges.
    pub async fn destroy(&mut self, resource_id: Option<&str>) -> Result<ApplySummary> {
        let _lock = StateLock::acquire(self.state.path())?;
        let Self {
            desired,
            state,
            factory,
        } = self;

        let mut summary = ApplySummary {
            is_destroy: true,
            ..Default::default()
        };

        if let Some(id) = resource_id {
            let Some(value) = state.get(id) else {
                bail!("Resource not found in state: {}", id);
            };
            let recorded = parse_recorded(id, value)?;

            println!("{} Dropping table {}", "-".red().bold(), recorded.name.bold());
            let conn = vars::resolve_connection(&recorded.conn);
            let outcome = match factory.connect(&conn) {
                Ok(adapter) => SchemaBackend::drop(&*adapter, &recorded.name).await,
                Err(e) => Err(e),
            };
            match outcome {
                Ok(()) => {
                    state.remove(id);
                    summary.destroyed += 1;
                    println!("  {} Table dropped", "✓".green());
                }
                Err(e) => {
                    summary.failed += 1;
                    println!("  {} Failed to drop table: {}", "✗".red(), e);
                }
            }

            state.commit()?;
            return Ok(summary);
        }

        let recorded: Vec<Table> = state
            .resources()
            .filter_map(|(id, value)| match parse_recorded(id, value) {
                Ok(table) => Some(table),
                Err(e) => {
                    tracing::warn!(resource = %id, error = %e, "Skipping unreadable recorded resource");
                    None
                }
            })
            .collect();

        if recorded.is_empty() {
            println!("{}", "No resources in state. Nothing to destroy.".dimmed());
            return Ok(summary);
        }

        let graph = build_table_graph(desired.values().chain(recorded.iter()));
        let order = deletion_order(&graph);
        tracing::debug!(order = ?order, "Resolved drop order");

        let by_name: HashMap<&str, &Table> =
            recorded.iter().map(|t| (t.name.as_str(), t)).collect();

        for table_name in &order {
            let Some(table) = by_name.get(table_name.as_str()).copied() else {
                continue;
            };
            println!("{} Dropping table {}", "-".red().bold(), table.name.bold());

            let conn = vars::resolve_connection(&table.conn);
            let outcome = match factory.connect(&conn) {
                Ok(adapter) => SchemaBackend::drop(&*adapter, &table.name).await,
                Err(e) => Err(e),
            };
            match outcome {
                Ok(()) => {
                    state.remove(&table.resource_id);
                    summary.destroyed += 1;
                    println!("  {} Table dropped", "✓".green());
                }
                Err(e) => {
                    summary.failed += 1;
                    println!("  {} Failed to drop table: {}", "✗".red(), e);
                }
            }
        }

        state.commit()?;
        Ok(summary)
    }
}
