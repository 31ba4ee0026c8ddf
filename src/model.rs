//! Starter config generation for the `model` subcommand.

use anyhow::{Context, Result};
use std::path::Path;

use crate::backend::BackendKind;

const SUPABASE_MODEL: &str = r#"resources:
  users_table:
    type: supabase_table
    name: users
    url: ${SUPABASE_URL}
    key: ${SUPABASE_KEY}
    columns:
      - name: id
        type: UUID
        nullable: false
        default: gen_random_uuid()
      - name: email
        type: VARCHAR(255)
        nullable: false
      - name: full_name
        type: VARCHAR(100)
        nullable: true
      - name: status
        type: VARCHAR(20)
        nullable: false
        default: "'active'"
      - name: created_at
        type: TIMESTAMPTZ
        nullable: false
        default: CURRENT_TIMESTAMP
    primary_key: [id]

  posts_table:
    type: supabase_table
    name: posts
    url: ${SUPABASE_URL}
    key: ${SUPABASE_KEY}
    columns:
      - name: id
        type: UUID
        nullable: false
        default: gen_random_uuid()
      - name: user_id
        type: UUID
        nullable: false
      - name: title
        type: VARCHAR(200)
        nullable: false
      - name: content
        type: TEXT
        nullable: true
      - name: published_at
        type: TIMESTAMPTZ
        nullable: true
      - name: created_at
        type: TIMESTAMPTZ
        nullable: false
        default: CURRENT_TIMESTAMP
    primary_key: [id]
    foreign_keys:
      - columns: [user_id]
        reference_table: users
        reference_columns: [id]
        on_delete: CASCADE
        on_update: CASCADE

  comments_table:
    type: supabase_table
    name: comments
    url: ${SUPABASE_URL}
    key: ${SUPABASE_KEY}
    columns:
      - name: id
        type: UUID
        nullable: false
        default: gen_random_uuid()
      - name: post_id
        type: UUID
        nullable: false
      - name: user_id
        type: UUID
        nullable: false
      - name: content
        type: TEXT
        nullable: false
      - name: created_at
        type: TIMESTAMPTZ
        nullable: false
        default: CURRENT_TIMESTAMP
    primary_key: [id]
    foreign_keys:
      - columns: [post_id]
        reference_table: posts
        reference_columns: [id]
        on_delete: CASCADE
        on_update: CASCADE
      - columns: [user_id]
        reference_table: users
        reference_columns: [id]
        on_delete: CASCADE
        on_update: CASCADE
"#;

const MYSQL_MODEL: &str = r#"resources:
  users_table:
    type: mysql_table
    name: users
    host: ${MYSQL_HOST}
    user: ${MYSQL_USER}
    password: ${MYSQL_PASSWORD}
    database: ${MYSQL_DATABASE}
    columns:
      - name: id
        type: INT AUTO_INCREMENT
        nullable: false
      - name: email
        type: VARCHAR(255)
        nullable: false
      - name: full_name
        type: VARCHAR(100)
        nullable: true
      - name: created_at
        type: TIMESTAMP
        nullable: false
        default: CURRENT_TIMESTAMP
    primary_key: [id]

  posts_table:
    type: mysql_table
    name: posts
    host: ${MYSQL_HOST}
    user: ${MYSQL_USER}
    password: ${MYSQL_PASSWORD}
    database: ${MYSQL_DATABASE}
    columns:
      - name: id
        type: INT AUTO_INCREMENT
        nullable: false
      - name: user_id
        type: INT
        nullable: false
      - name: title
        type: VARCHAR(200)
        nullable: false
      - name: content
        type: TEXT
        nullable: true
      - name: created_at
        type: TIMESTAMP
        nullable: false
        default: CURRENT_TIMESTAMP
    primary_key: [id]
    foreign_keys:
      - columns: [user_id]
        reference_table: users
        reference_columns: [id]
        on_delete: CASCADE
        on_update: CASCADE
"#;

/// Write a starter config for the selected backend.
pub fn write_model(kind: BackendKind, output: &Path) -> Result<()> {
    let content = match kind {
        BackendKind::Postgres => SUPABASE_MODEL,
        BackendKind::Mysql => MYSQL_MODEL,
    };
    std::fs::write(output, content)
        .with_context(|| format!("failed to write model file {}", output.display()))?;
    Ok(())
}

/// Environment variables the generated model expects.
pub fn model_env_vars(kind: BackendKind) -> &'static [&'static str] {
    match kind {
        BackendKind::Postgres => &["SUPABASE_URL", "SUPABASE_KEY"],
        BackendKind::Mysql => &["MYSQL_HOST", "MYSQL_USER", "MYSQL_PASSWORD", "MYSQL_DATABASE"],
    }
}
