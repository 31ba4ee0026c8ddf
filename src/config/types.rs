use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashSet;
use thiserror::Error;

// ─── Column ─────────────────────────────────────────────────────────────────

/// A single table column. Columns are value objects: two columns are equal
/// iff all four attributes match.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Column {
    pub name: String,

    /// Opaque SQL type string (`UUID`, `VARCHAR(255)`, …), passed through to
    /// DDL verbatim.
    #[serde(rename = "type")]
    pub sql_type: String,

    pub nullable: bool,

    /// Optional default expression or literal, passed through to DDL verbatim
    /// (quoting included). Any YAML scalar is accepted and normalized to its
    /// string rendering.
    #[serde(
        default,
        deserialize_with = "opt_scalar_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub default: Option<String>,
}

// ─── Foreign key ────────────────────────────────────────────────────────────

/// A foreign-key constraint owned by a table. Identified in diffs by the
/// ordered tuple of its owning `columns`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForeignKey {
    #[serde(deserialize_with = "one_or_many")]
    pub columns: Vec<String>,

    pub reference_table: String,

    #[serde(deserialize_with = "one_or_many")]
    pub reference_columns: Vec<String>,

    #[serde(default = "no_action")]
    pub on_delete: String,

    #[serde(default = "no_action")]
    pub on_update: String,
}

pub const NO_ACTION: &str = "NO ACTION";

fn no_action() -> String {
    NO_ACTION.to_string()
}

// ─── Connection ─────────────────────────────────────────────────────────────

/// Backend-specific connection descriptor, flattened into the table fields in
/// both the YAML config and the JSON state file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Connection {
    /// Postgres reached through the Supabase REST API.
    Postgres { url: String, key: String },

    /// Direct MySQL connection.
    MySql {
        host: String,
        user: String,
        password: String,
        database: String,
    },
}

// ─── Table ──────────────────────────────────────────────────────────────────

/// A desired or recorded table. The `resource_id` is the user-chosen key in
/// the `resources` mapping; it is not serialized into the descriptor itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Table {
    #[serde(skip)]
    pub resource_id: String,

    pub name: String,

    #[serde(flatten)]
    pub conn: Connection,

    pub columns: Vec<Column>,

    #[serde(deserialize_with = "one_or_many")]
    pub primary_key: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub foreign_keys: Vec<ForeignKey>,
}

/// A structural defect in a table definition, reported per-resource by the
/// loader without aborting the rest of the load.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("duplicate column \"{0}\"")]
    DuplicateColumn(String),

    #[error("primary key must not be empty")]
    EmptyPrimaryKey,

    #[error("primary key names unknown column \"{0}\"")]
    UnknownPrimaryKeyColumn(String),

    #[error("foreign key must list at least one column")]
    EmptyForeignKey,

    #[error("foreign key names unknown column \"{0}\"")]
    UnknownForeignKeyColumn(String),

    #[error("foreign key on ({columns}) references {got} column(s) in \"{reference_table}\", expected {expected}")]
    ForeignKeyArityMismatch {
        columns: String,
        reference_table: String,
        expected: usize,
        got: usize,
    },
}

impl Table {
    /// Check the structural invariants that must hold after loading: unique
    /// column names, primary-key and foreign-key columns existing in the
    /// table, and matching foreign-key arity.
    pub fn validate(&self) -> Result<(), ValidationError> {
        let mut seen: HashSet<&str> = HashSet::new();
        for col in &self.columns {
            if !seen.insert(col.name.as_str()) {
                return Err(ValidationError::DuplicateColumn(col.name.clone()));
            }
        }

        if self.primary_key.is_empty() {
            return Err(ValidationError::EmptyPrimaryKey);
        }
        for pk in &self.primary_key {
            if !seen.contains(pk.as_str()) {
                return Err(ValidationError::UnknownPrimaryKeyColumn(pk.clone()));
            }
        }

        for fk in &self.foreign_keys {
            if fk.columns.is_empty() {
                return Err(ValidationError::EmptyForeignKey);
            }
            for col in &fk.columns {
                if !seen.contains(col.as_str()) {
                    return Err(ValidationError::UnknownForeignKeyColumn(col.clone()));
                }
            }
            if fk.reference_columns.len() != fk.columns.len() {
                return Err(ValidationError::ForeignKeyArityMismatch {
                    columns: fk.columns.join(", "),
                    reference_table: fk.reference_table.clone(),
                    expected: fk.columns.len(),
                    got: fk.reference_columns.len(),
                });
            }
        }

        Ok(())
    }
}

// ─── Serde helpers ──────────────────────────────────────────────────────────

#[derive(Deserialize)]
#[serde(untagged)]
enum OneOrMany {
    One(String),
    Many(Vec<String>),
}

/// Promote a bare string to a one-element sequence so that
/// `primary_key: "id"` and `primary_key: ["id"]` load identically.
fn one_or_many<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match OneOrMany::deserialize(deserializer)? {
        OneOrMany::One(value) => vec![value],
        OneOrMany::Many(values) => values,
    })
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Scalar {
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
}

/// Accept any scalar for `default` and keep its string rendering; the value
/// is never interpreted, only spliced into DDL.
fn opt_scalar_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let scalar = Option::<Scalar>::deserialize(deserializer)?;
    Ok(scalar.map(|s| match s {
        Scalar::Bool(b) => b.to_string(),
        Scalar::Int(i) => i.to_string(),
        Scalar::Float(f) => f.to_string(),
        Scalar::Str(s) => s,
    }))
}
