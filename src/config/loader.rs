use anyhow::{Context, Result};
use regex::Regex;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::backend::BackendKind;

use super::types::{Connection, Table};

/// Shape of one YAML config file: a `resources` mapping from resource id to
/// a descriptor. Descriptors are held raw here so one bad resource can be
/// reported and skipped without losing the rest of the file.
#[derive(serde::Deserialize)]
struct ConfigFile {
    resources: BTreeMap<String, serde_yaml::Value>,
}

/// Load the desired table set, either from an explicit config path or from
/// every file matching the backend's glob in the current directory.
///
/// Unreadable files and invalid resources are reported and skipped; the
/// load always returns whatever parsed cleanly.
pub fn load_tables(config: Option<&Path>, kind: BackendKind) -> Result<BTreeMap<String, Table>> {
    let files = match config {
        Some(path) => vec![path.to_path_buf()],
        None => discover(kind)?,
    };

    if files.is_empty() {
        tracing::warn!(
            pattern = kind.config_glob(),
            "No config files matched the pattern"
        );
    }

    let mut tables = BTreeMap::new();
    for file in &files {
        if let Err(e) = load_file(file, kind, &mut tables) {
            tracing::error!(
                file = %file.display(),
                error = %e,
                "Failed to load config file; skipping"
            );
        }
    }
    Ok(tables)
}

/// Find config files for the backend (`aqua.*.yaml` / `aquamy.*.yaml`),
/// sorted so load order is stable.
fn discover(kind: BackendKind) -> Result<Vec<PathBuf>> {
    let mut files: Vec<PathBuf> = glob::glob(kind.config_glob())
        .context("invalid config glob pattern")?
        .filter_map(|entry| entry.ok())
        .collect();
    files.sort();
    Ok(files)
}

fn load_file(
    path: &Path,
    kind: BackendKind,
    tables: &mut BTreeMap<String, Table>,
) -> Result<()> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let config: ConfigFile = serde_yaml::from_str(&content)
        .with_context(|| format!("failed to parse YAML in {}", path.display()))?;

    for (resource_id, value) in config.resources {
        let resource_type = value
            .get("type")
            .and_then(|v| v.as_str())
            .unwrap_or_default()
            .to_string();
        if resource_type != kind.resource_type() {
            continue;
        }

        let mut table: Table = match serde_yaml::from_value(value) {
            Ok(table) => table,
            Err(e) => {
                tracing::error!(
                    resource = %resource_id,
                    file = %path.display(),
                    error = %e,
                    "Missing or malformed keys; skipping resource"
                );
                continue;
            }
        };
        table.resource_id = resource_id.clone();

        if let Err(e) = table.validate() {
            tracing::error!(
                resource = %resource_id,
                file = %path.display(),
                error = %e,
                "Invalid table definition; skipping resource"
            );
            continue;
        }

        lint_connection(&resource_id, &table.conn);

        if tables.insert(resource_id.clone(), table).is_some() {
            tracing::warn!(
                resource = %resource_id,
                file = %path.display(),
                "Duplicate resource id across config files; the later definition wins"
            );
        }
    }

    Ok(())
}

/// Warn about `${…}` references the resolver will never expand: only values
/// that are a single whole-value reference are substituted at apply time.
fn lint_connection(resource_id: &str, conn: &Connection) {
    let re = Regex::new(r"\$\{[^}]+\}").unwrap();
    for (field, value) in connection_fields(conn) {
        let whole_value = value.starts_with("${") && value.ends_with('}');
        if re.is_match(value) && !whole_value {
            tracing::warn!(
                resource = %resource_id,
                field,
                "Partial variable interpolation is not supported; the value is passed through as-is"
            );
        }
    }
}

/// Field names and values of a connection descriptor, for lints and display.
pub fn connection_fields(conn: &Connection) -> Vec<(&'static str, &str)> {
    match conn {
        Connection::Postgres { url, key } => vec![("url", url), ("key", key)],
        Connection::MySql {
            host,
            user,
            password,
            database,
        } => vec![
            ("host", host),
            ("user", user),
            ("password", password),
            ("database", database),
        ],
    }
}
