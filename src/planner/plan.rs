use std::collections::{BTreeMap, HashMap};
use std::fmt;

use crate::config::types::{Connection, Table};
use crate::dag::graph::{build_table_graph, creation_order};
use crate::state::store::{parse_recorded, StateStore};

use super::diff::{diff_tables, TableDelta};

/// One planned operation against a single resource.
#[derive(Debug)]
pub enum PlannedChange<'a> {
    /// The resource has no recorded state: create the table from scratch.
    Create {
        resource_id: &'a str,
        table: &'a Table,
    },
    /// The desired table differs structurally from the recorded one.
    Update {
        resource_id: &'a str,
        table: &'a Table,
        delta: TableDelta,
    },
    /// The resource is recorded but no longer desired. The name and
    /// connection come from the recorded descriptor since the config no
    /// longer mentions it.
    Delete {
        resource_id: String,
        table_name: String,
        conn: Connection,
    },
}

impl PlannedChange<'_> {
    pub fn table_name(&self) -> &str {
        match self {
            PlannedChange::Create { table, .. } => &table.name,
            PlannedChange::Update { table, .. } => &table.name,
            PlannedChange::Delete { table_name, .. } => table_name,
        }
    }

    pub fn resource_id(&self) -> &str {
        match self {
            PlannedChange::Create { resource_id, .. } => resource_id,
            PlannedChange::Update { resource_id, .. } => resource_id,
            PlannedChange::Delete { resource_id, .. } => resource_id,
        }
    }
}

/// The full set of changes a run would perform, in execution order.
#[derive(Debug, Default)]
pub struct Plan<'a> {
    pub changes: Vec<PlannedChange<'a>>,
}

impl Plan<'_> {
    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    pub fn creates(&self) -> usize {
        self.changes
            .iter()
            .filter(|c| matches!(c, PlannedChange::Create { .. }))
            .count()
    }

    pub fn updates(&self) -> usize {
        self.changes
            .iter()
            .filter(|c| matches!(c, PlannedChange::Update { .. }))
            .count()
    }

    pub fn deletes(&self) -> usize {
        self.changes
            .iter()
            .filter(|c| matches!(c, PlannedChange::Delete { .. }))
            .count()
    }
}

impl fmt::Display for Plan<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts = Vec::new();
        if self.creates() > 0 {
            parts.push(format!("{} to add", self.creates()));
        }
        if self.updates() > 0 {
            parts.push(format!("{} to change", self.updates()));
        }
        if self.deletes() > 0 {
            parts.push(format!("{} to destroy", self.deletes()));
        }
        if parts.is_empty() {
            write!(f, "No changes.")
        } else {
            write!(f, "Plan: {}.", parts.join(", "))
        }
    }
}

/// Derive the plan: desired resources missing from state become creates,
/// structurally changed ones become updates, and recorded resources absent
/// from the desired set become deletes. Recorded descriptors that no longer
/// parse are reported and skipped rather than failing the whole plan.
///
/// The returned changes are already in execution order: updates first, then
/// creates, both with referenced tables before the tables that reference
/// them, then deletes in the reverse order. The reconciler just walks the
/// vector front to back.
pub fn build_plan<'a>(desired: &'a BTreeMap<String, Table>, state: &StateStore) -> Plan<'a> {
    let mut updates = Vec::new();
    let mut creates = Vec::new();
    // Delete targets are recorded only; their parsed descriptors are kept
    // around so their foreign keys still contribute ordering edges.
    let mut delete_records: Vec<Table> = Vec::new();

    for (resource_id, table) in desired {
        match state.get(resource_id) {
            None => creates.push(PlannedChange::Create {
                resource_id: resource_id.as_str(),
                table,
            }),
            Some(value) => match parse_recorded(resource_id, value) {
                Ok(recorded) => {
                    let delta = diff_tables(&recorded, table);
                    if !delta.is_empty() {
                        updates.push(PlannedChange::Update {
                            resource_id: resource_id.as_str(),
                            table,
                            delta,
                        });
                    }
                }
                Err(e) => {
                    tracing::warn!(
                        resource = %resource_id,
                        error = %e,
                        "Skipping resource with unreadable recorded state"
                    );
                }
            },
        }
    }

    for (resource_id, value) in state.resources() {
        if desired.contains_key(resource_id) {
            continue;
        }
        match parse_recorded(resource_id, value) {
            Ok(recorded) => delete_records.push(recorded),
            Err(e) => {
                tracing::warn!(
                    resource = %resource_id,
                    error = %e,
                    "Recorded resource is unreadable and cannot be deleted"
                );
            }
        }
    }

    let graph = build_table_graph(desired.values().chain(delete_records.iter()));
    let order = creation_order(&graph);
    let rank: HashMap<&str, usize> = order
        .iter()
        .enumerate()
        .map(|(i, name)| (name.as_str(), i))
        .collect();
    let rank_of = |name: &str| rank.get(name).copied().unwrap_or(usize::MAX);

    updates.sort_by_key(|c| rank_of(c.table_name()));
    creates.sort_by_key(|c| rank_of(c.table_name()));
    delete_records.sort_by_key(|t| std::cmp::Reverse(rank_of(&t.name)));

    let mut changes = Vec::new();
    changes.extend(updates);
    changes.extend(creates);
    changes.extend(delete_records.into_iter().map(|recorded| {
        PlannedChange::Delete {
            resource_id: recorded.resource_id,
            table_name: recorded.name,
            conn: recorded.conn,
        }
    }));

    Plan { changes }
}
