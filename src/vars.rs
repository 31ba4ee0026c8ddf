//! Environment-variable expansion for connection fields.
//!
//! Only whole-value references are supported: `url: ${SUPABASE_URL}` expands,
//! `url: https://${HOST}/x` does not (the loader warns about the latter).
//! Resolution happens freshly before each per-resource DDL, never at load
//! time, and a missing variable leaves the literal untouched.

use crate::config::types::Connection;

/// Expand a single field value against the process environment.
pub fn resolve(value: &str) -> String {
    match value
        .strip_prefix("${")
        .and_then(|rest| rest.strip_suffix('}'))
    {
        Some(name) => std::env::var(name).unwrap_or_else(|_| value.to_string()),
        None => value.to_string(),
    }
}

/// Resolve every field of a connection descriptor, returning a new value.
/// The input is never mutated.
pub fn resolve_connection(conn: &Connection) -> Connection {
    match conn {
        Connection::Postgres { url, key } => Connection::Postgres {
            url: resolve(url),
            key: resolve(key),
        },
        Connection::MySql {
            host,
            user,
            password,
            database,
        } => Connection::MySql {
            host: resolve(host),
            user: resolve(user),
            password: resolve(password),
            database: resolve(database),
        },
    }
}
