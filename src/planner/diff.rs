use std::collections::HashMap;

use crate::config::types::{Column, ForeignKey, Table};

/// Structural difference between a recorded table and its desired
/// counterpart. Every field may be empty; an all-empty delta means the
/// resource needs no work.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TableDelta {
    /// Columns present in the desired table only, in desired order.
    pub add_columns: Vec<Column>,
    /// `(recorded, desired)` pairs sharing a name but differing in type,
    /// nullability or default, in desired order.
    pub modify_columns: Vec<(Column, Column)>,
    /// Columns present in the recorded table only, in recorded order.
    pub remove_columns: Vec<Column>,
    /// `(recorded, desired)` primary-key sequences, when they differ.
    pub modify_primary_key: Option<(Vec<String>, Vec<String>)>,
    /// Foreign keys to add, in desired order.
    pub add_foreign_keys: Vec<ForeignKey>,
    /// Foreign keys to drop, in recorded order.
    pub remove_foreign_keys: Vec<ForeignKey>,
}

impl TableDelta {
    pub fn is_empty(&self) -> bool {
        self.add_columns.is_empty()
            && self.modify_columns.is_empty()
            && self.remove_columns.is_empty()
            && self.modify_primary_key.is_none()
            && self.add_foreign_keys.is_empty()
            && self.remove_foreign_keys.is_empty()
    }
}

/// Compare two tables with the same resource id and name.
///
/// Columns are keyed by name; a rename therefore shows up as a removal plus
/// an addition. Foreign keys are keyed by the ordered tuple of their owning
/// columns; a key whose tuple survives but whose other fields changed is
/// emitted as both a removal and an addition (drop-and-recreate).
pub fn diff_tables(old: &Table, new: &Table) -> TableDelta {
    let mut delta = TableDelta::default();

    let old_columns: HashMap<&str, &Column> =
        old.columns.iter().map(|c| (c.name.as_str(), c)).collect();
    let new_columns: HashMap<&str, &Column> =
        new.columns.iter().map(|c| (c.name.as_str(), c)).collect();

    for col in &new.columns {
        match old_columns.get(col.name.as_str()) {
            None => delta.add_columns.push(col.clone()),
            Some(old_col) if *old_col != col => {
                delta.modify_columns.push(((*old_col).clone(), col.clone()));
            }
            Some(_) => {}
        }
    }

    for col in &old.columns {
        if !new_columns.contains_key(col.name.as_str()) {
            delta.remove_columns.push(col.clone());
        }
    }

    if old.primary_key != new.primary_key {
        delta.modify_primary_key = Some((old.primary_key.clone(), new.primary_key.clone()));
    }

    let old_fks: HashMap<&[String], &ForeignKey> = old
        .foreign_keys
        .iter()
        .map(|fk| (fk.columns.as_slice(), fk))
        .collect();
    let new_fks: HashMap<&[String], &ForeignKey> = new
        .foreign_keys
        .iter()
        .map(|fk| (fk.columns.as_slice(), fk))
        .collect();

    for fk in &new.foreign_keys {
        match old_fks.get(fk.columns.as_slice()) {
            None => delta.add_foreign_keys.push(fk.clone()),
            Some(old_fk) if *old_fk != fk => delta.add_foreign_keys.push(fk.clone()),
            Some(_) => {}
        }
    }

    for fk in &old.foreign_keys {
        match new_fks.get(fk.columns.as_slice()) {
            None => delta.remove_foreign_keys.push(fk.clone()),
            Some(new_fk) if *new_fk != fk => delta.remove_foreign_keys.push(fk.clone()),
            Some(_) => {}
        }
    }

    delta
}
