//! DDL text generation shared by the concrete adapters.
//!
//! Types and default expressions pass through verbatim; the engine never
//! interprets SQL. Only identifier quoting and a few ALTER spellings differ
//! between the two dialects.

use crate::config::types::{Column, ForeignKey, Table, NO_ACTION};
use crate::planner::diff::TableDelta;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    Postgres,
    MySql,
}

impl Dialect {
    pub fn quote(self, ident: &str) -> String {
        match self {
            Dialect::Postgres => format!("\"{}\"", ident),
            Dialect::MySql => format!("`{}`", ident),
        }
    }

    fn quote_list(self, idents: &[String]) -> String {
        idents
            .iter()
            .map(|i| self.quote(i))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// Constraint name for a foreign key, derived from every participating
/// column so that two keys on the same table never collide.
pub fn fk_constraint_name(table_name: &str, fk: &ForeignKey) -> String {
    format!("{}_{}_fkey", table_name, fk.columns.join("_"))
}

fn column_def(dialect: Dialect, col: &Column) -> String {
    let mut def = format!("{} {}", dialect.quote(&col.name), col.sql_type);
    if !col.nullable {
        def.push_str(" NOT NULL");
    }
    if let Some(default) = &col.default {
        def.push_str(&format!(" DEFAULT {}", default));
    }
    def
}

fn fk_clause(dialect: Dialect, fk: &ForeignKey) -> String {
    let mut clause = format!(
        "FOREIGN KEY ({}) REFERENCES {} ({})",
        dialect.quote_list(&fk.columns),
        dialect.quote(&fk.reference_table),
        dialect.quote_list(&fk.reference_columns),
    );
    if fk.on_delete != NO_ACTION {
        clause.push_str(&format!(" ON DELETE {}", fk.on_delete));
    }
    if fk.on_update != NO_ACTION {
        clause.push_str(&format!(" ON UPDATE {}", fk.on_update));
    }
    clause
}

/// `CREATE TABLE IF NOT EXISTS` with columns in declared order, one primary
/// key constraint, and every foreign key inline.
pub fn create_table(dialect: Dialect, table: &Table) -> String {
    let mut parts: Vec<String> = table
        .columns
        .iter()
        .map(|col| column_def(dialect, col))
        .collect();

    parts.push(format!(
        "PRIMARY KEY ({})",
        dialect.quote_list(&table.primary_key)
    ));

    for fk in &table.foreign_keys {
        parts.push(fk_clause(dialect, fk));
    }

    format!(
        "CREATE TABLE IF NOT EXISTS {} (\n  {}\n)",
        dialect.quote(&table.name),
        parts.join(",\n  ")
    )
}

/// `ALTER TABLE … ADD CONSTRAINT … FOREIGN KEY …` for a single key.
pub fn add_foreign_key(dialect: Dialect, table_name: &str, fk: &ForeignKey) -> String {
    format!(
        "ALTER TABLE {} ADD CONSTRAINT {} {}",
        dialect.quote(table_name),
        dialect.quote(&fk_constraint_name(table_name, fk)),
        fk_clause(dialect, fk),
    )
}

fn drop_foreign_key(dialect: Dialect, table_name: &str, fk: &ForeignKey) -> String {
    let constraint = fk_constraint_name(table_name, fk);
    match dialect {
        Dialect::Postgres => format!(
            "ALTER TABLE {} DROP CONSTRAINT IF EXISTS {}",
            dialect.quote(table_name),
            dialect.quote(&constraint)
        ),
        Dialect::MySql => format!(
            "ALTER TABLE {} DROP FOREIGN KEY {}",
            dialect.quote(table_name),
            dialect.quote(&constraint)
        ),
    }
}

/// Statements realizing a delta, one statement per sub-change, in the fixed
/// order: add columns, modify columns, drop columns, replace primary key,
/// add foreign keys, drop foreign keys.
pub fn alter_statements(dialect: Dialect, table_name: &str, delta: &TableDelta) -> Vec<String> {
    let table = dialect.quote(table_name);
    let mut stmts = Vec::new();

    for col in &delta.add_columns {
        stmts.push(format!(
            "ALTER TABLE {} ADD COLUMN {}",
            table,
            column_def(dialect, col)
        ));
    }

    for (old, new) in &delta.modify_columns {
        stmts.extend(modify_column(dialect, &table, old, new));
    }

    for col in &delta.remove_columns {
        stmts.push(format!(
            "ALTER TABLE {} DROP COLUMN {}",
            table,
            dialect.quote(&col.name)
        ));
    }

    if let Some((_, new_pk)) = &delta.modify_primary_key {
        match dialect {
            Dialect::Postgres => stmts.push(format!(
                "ALTER TABLE {} DROP CONSTRAINT IF EXISTS {}",
                table,
                dialect.quote(&format!("{}_pkey", table_name))
            )),
            Dialect::MySql => stmts.push(format!("ALTER TABLE {} DROP PRIMARY KEY", table)),
        }
        stmts.push(format!(
            "ALTER TABLE {} ADD PRIMARY KEY ({})",
            table,
            dialect.quote_list(new_pk)
        ));
    }

    for fk in &delta.add_foreign_keys {
        stmts.push(add_foreign_key(dialect, table_name, fk));
    }

    for fk in &delta.remove_foreign_keys {
        stmts.push(drop_foreign_key(dialect, table_name, fk));
    }

    stmts
}

/// Statements for one modified column, restricted to the attributes that
/// actually differ.
///
/// MySQL's `MODIFY COLUMN` replaces the whole definition, so a type or
/// nullability change carries the full new definition in one statement; a
/// default-only change uses `ALTER COLUMN` on both dialects.
fn modify_column(dialect: Dialect, table: &str, old: &Column, new: &Column) -> Vec<String> {
    let mut stmts = Vec::new();
    let col = dialect.quote(&new.name);

    match dialect {
        Dialect::Postgres => {
            if old.sql_type != new.sql_type {
                stmts.push(format!(
                    "ALTER TABLE {} ALTER COLUMN {} TYPE {}",
                    table, col, new.sql_type
                ));
            }
            if old.nullable != new.nullable {
                let verb = if new.nullable { "DROP" } else { "SET" };
                stmts.push(format!(
                    "ALTER TABLE {} ALTER COLUMN {} {} NOT NULL",
                    table, col, verb
                ));
            }
            if old.default != new.default {
                match &new.default {
                    Some(default) => stmts.push(format!(
                        "ALTER TABLE {} ALTER COLUMN {} SET DEFAULT {}",
                        table, col, default
                    )),
                    None => stmts.push(format!(
                        "ALTER TABLE {} ALTER COLUMN {} DROP DEFAULT",
                        table, col
                    )),
                }
            }
        }
        Dialect::MySql => {
            if old.sql_type != new.sql_type || old.nullable != new.nullable {
                stmts.push(format!(
                    "ALTER TABLE {} MODIFY COLUMN {}",
                    table,
                    column_def(dialect, new)
                ));
            } else if old.default != new.default {
                match &new.default {
                    Some(default) => stmts.push(format!(
                        "ALTER TABLE {} ALTER COLUMN {} SET DEFAULT {}",
                        table, col, default
                    )),
                    None => stmts.push(format!(
                        "ALTER TABLE {} ALTER COLUMN {} DROP DEFAULT",
                        table, col
                    )),
                }
            }
        }
    }

    stmts
}

/// Idempotent drop. Postgres cascades so dependent constraints go with the
/// table; MySQL relies on foreign keys having been torn down first.
pub fn drop_table(dialect: Dialect, table_name: &str) -> String {
    match dialect {
        Dialect::Postgres => format!(
            "DROP TABLE IF EXISTS {} CASCADE",
            dialect.quote(table_name)
        ),
        Dialect::MySql => format!("DROP TABLE IF EXISTS {}", dialect.quote(table_name)),
    }
}
