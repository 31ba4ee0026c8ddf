use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use anyhow::{bail, Result};
use async_trait::async_trait;
use tempfile::TempDir;

use aquaform::backend::{AdapterFactory, SchemaBackend};
use aquaform::config::types::{Column, Connection, ForeignKey, Table};
use aquaform::engine::Reconciler;
use aquaform::planner::diff::TableDelta;
use aquaform::state::store::StateStore;

// ─── Recording fake adapter ─────────────────────────────────────────────────

struct MockFactory {
    log: Arc<Mutex<Vec<String>>>,
    fail_on: Vec<String>,
    record_connects: bool,
}

struct MockBackend {
    log: Arc<Mutex<Vec<String>>>,
    fail_on: Vec<String>,
}

fn mock() -> (Arc<MockFactory>, Arc<Mutex<Vec<String>>>) {
    let log = Arc::new(Mutex::new(Vec::new()));
    let factory = Arc::new(MockFactory {
        log: log.clone(),
        fail_on: vec![],
        record_connects: false,
    });
    (factory, log)
}

fn mock_failing(fail_on: &[&str]) -> (Arc<MockFactory>, Arc<Mutex<Vec<String>>>) {
    let log = Arc::new(Mutex::new(Vec::new()));
    let factory = Arc::new(MockFactory {
        log: log.clone(),
        fail_on: fail_on.iter().map(|s| s.to_string()).collect(),
        record_connects: false,
    });
    (factory, log)
}

fn mock_recording_connects() -> (Arc<MockFactory>, Arc<Mutex<Vec<String>>>) {
    let log = Arc::new(Mutex::new(Vec::new()));
    let factory = Arc::new(MockFactory {
        log: log.clone(),
        fail_on: vec![],
        record_connects: true,
    });
    (factory, log)
}

impl AdapterFactory for MockFactory {
    fn connect(&self, conn: &Connection) -> Result<Box<dyn SchemaBackend>> {
        if self.record_connects {
            if let Connection::Postgres { url, .. } = conn {
                self.log.lock().unwrap().push(format!("connect {}", url));
            }
        }
        Ok(Box::new(MockBackend {
            log: self.log.clone(),
            fail_on: self.fail_on.clone(),
        }))
    }
}

#[async_trait]
impl SchemaBackend for MockBackend {
    async fn exists(&self, _table_name: &str) -> Result<bool> {
        Ok(false)
    }

    async fn create(&self, table: &Table) -> Result<()> {
        if self.fail_on.contains(&table.name) {
            bail!("injected failure for {}", table.name);
        }
        self.log
            .lock()
            .unwrap()
            .push(format!("create {}", table.name));
        Ok(())
    }

    async fn alter(&self, table: &Table, _delta: &TableDelta) -> Result<()> {
        if self.fail_on.contains(&table.name) {
            bail!("injected failure for {}", table.name);
        }
        self.log
            .lock()
            .unwrap()
            .push(format!("alter {}", table.name));
        Ok(())
    }

    async fn drop(&self, table_name: &str) -> Result<()> {
        if self.fail_on.iter().any(|n| n == table_name) {
            bail!("injected failure for {}", table_name);
        }
        self.log.lock().unwrap().push(format!("drop {}", table_name));
        Ok(())
    }
}

// ─── Fixtures ───────────────────────────────────────────────────────────────

fn col(name: &str, sql_type: &str) -> Column {
    Column {
        name: name.to_string(),
        sql_type: sql_type.to_string(),
        nullable: false,
        default: None,
    }
}

fn table(resource_id: &str, name: &str, fks: Vec<(&str, &str)>) -> Table {
    let mut columns = vec![col("id", "UUID")];
    for (fk_col, _) in &fks {
        columns.push(col(fk_col, "UUID"));
    }
    Table {
        resource_id: resource_id.to_string(),
        name: name.to_string(),
        conn: Connection::Postgres {
            url: "https://example.supabase.co".to_string(),
            key: "secret".to_string(),
        },
        columns,
        primary_key: vec!["id".to_string()],
        foreign_keys: fks
            .into_iter()
            .map(|(fk_col, ref_table)| ForeignKey {
                columns: vec![fk_col.to_string()],
                reference_table: ref_table.to_string(),
                reference_columns: vec!["id".to_string()],
                on_delete: "CASCADE".to_string(),
                on_update: "NO ACTION".to_string(),
            })
            .collect(),
    }
}

fn desired(tables: Vec<Table>) -> BTreeMap<String, Table> {
    tables
        .into_iter()
        .map(|t| (t.resource_id.clone(), t))
        .collect()
}

fn state_path(dir: &TempDir) -> std::path::PathBuf {
    dir.path().join("aqua.state.json")
}

// ─── Tests ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_first_apply_creates_in_dependency_order() {
    let dir = TempDir::new().unwrap();
    let (factory, log) = mock();

    // "posts_table" sorts before "users_table", so correct ordering must
    // come from the dependency graph, not from map iteration.
    let users = table("users_table", "users", vec![]);
    let posts = table("posts_table", "posts", vec![("user_id", "users")]);

    let mut reconciler = Reconciler::new(
        desired(vec![users, posts]),
        StateStore::load(state_path(&dir)),
        factory,
    );

    let summary = reconciler.apply().await.unwrap();
    assert_eq!(summary.created, 2);
    assert_eq!(summary.failed, 0);
    assert_eq!(*log.lock().unwrap(), vec!["create users", "create posts"]);

    // Applying the same desired state again plans nothing.
    assert!(reconciler.plan().is_empty());

    // Both resources persisted.
    let reloaded = StateStore::load(state_path(&dir));
    assert_eq!(reloaded.len(), 2);
    assert!(reloaded.get("users_table").is_some());
    assert!(reloaded.get("posts_table").is_some());
}

#[tokio::test]
async fn test_phases_run_updates_then_creates_then_deletes() {
    let dir = TempDir::new().unwrap();

    // Recorded: alpha (will change) and legacy (no longer desired).
    let alpha = table("alpha_table", "alpha", vec![]);
    let legacy = table("legacy_table", "legacy", vec![]);
    {
        let mut store = StateStore::load(state_path(&dir));
        store.put("alpha_table", &alpha).unwrap();
        store.put("legacy_table", &legacy).unwrap();
        store.commit().unwrap();
    }

    let mut changed_alpha = alpha.clone();
    changed_alpha.columns.push(col("extra", "TEXT"));
    let beta = table("beta_table", "beta", vec![]);

    let (factory, log) = mock();
    let mut reconciler = Reconciler::new(
        desired(vec![changed_alpha, beta]),
        StateStore::load(state_path(&dir)),
        factory,
    );

    let summary = reconciler.apply().await.unwrap();
    assert_eq!(summary.updated, 1);
    assert_eq!(summary.created, 1);
    assert_eq!(summary.destroyed, 1);
    assert_eq!(
        *log.lock().unwrap(),
        vec!["alter alpha", "create beta", "drop legacy"]
    );
}

#[tokio::test]
async fn test_apply_deletes_run_in_reverse_dependency_order() {
    let dir = TempDir::new().unwrap();

    // Both tables exist only in state; posts references users, so posts
    // must be dropped first even though the desired set is empty.
    let users = table("users_table", "users", vec![]);
    let posts = table("posts_table", "posts", vec![("user_id", "users")]);
    {
        let mut store = StateStore::load(state_path(&dir));
        store.put("users_table", &users).unwrap();
        store.put("posts_table", &posts).unwrap();
        store.commit().unwrap();
    }

    let (factory, log) = mock();
    let mut reconciler = Reconciler::new(
        desired(vec![]),
        StateStore::load(state_path(&dir)),
        factory,
    );

    let summary = reconciler.apply().await.unwrap();
    assert_eq!(summary.destroyed, 2);
    assert_eq!(*log.lock().unwrap(), vec!["drop posts", "drop users"]);

    let reloaded = StateStore::load(state_path(&dir));
    assert!(reloaded.is_empty());
}

#[tokio::test]
async fn test_failure_is_isolated_and_state_still_committed() {
    let dir = TempDir::new().unwrap();
    let (factory, log) = mock_failing(&["users"]);

    let users = table("users_table", "users", vec![]);
    let topics = table("topics_table", "topics", vec![]);

    let mut reconciler = Reconciler::new(
        desired(vec![users, topics]),
        StateStore::load(state_path(&dir)),
        factory,
    );

    let summary = reconciler.apply().await.unwrap();
    assert_eq!(summary.created, 1);
    assert_eq!(summary.failed, 1);
    assert_eq!(*log.lock().unwrap(), vec!["create topics"]);

    // The successful resource is committed, the failed one is not.
    let reloaded = StateStore::load(state_path(&dir));
    assert_eq!(reloaded.len(), 1);
    assert!(reloaded.get("topics_table").is_some());
    assert!(reloaded.get("users_table").is_none());

    // A rerun plans only the failed resource.
    let plan = reconciler.plan();
    assert_eq!(plan.creates(), 1);
}

#[tokio::test]
async fn test_destroy_all_drops_dependents_first() {
    let dir = TempDir::new().unwrap();

    let users = table("users_table", "users", vec![]);
    let posts = table("posts_table", "posts", vec![("user_id", "users")]);
    let comments = table(
        "comments_table",
        "comments",
        vec![("user_id", "users"), ("post_id", "posts")],
    );
    {
        let mut store = StateStore::load(state_path(&dir));
        store.put("users_table", &users).unwrap();
        store.put("posts_table", &posts).unwrap();
        store.put("comments_table", &comments).unwrap();
        store.commit().unwrap();
    }

    let (factory, log) = mock();
    let mut reconciler = Reconciler::new(
        desired(vec![users, posts, comments]),
        StateStore::load(state_path(&dir)),
        factory,
    );

    let summary = reconciler.destroy(None).await.unwrap();
    assert_eq!(summary.destroyed, 3);
    assert_eq!(
        *log.lock().unwrap(),
        vec!["drop comments", "drop posts", "drop users"]
    );

    let reloaded = StateStore::load(state_path(&dir));
    assert!(reloaded.is_empty());
}

#[tokio::test]
async fn test_destroy_single_resource() {
    let dir = TempDir::new().unwrap();

    let users = table("users_table", "users", vec![]);
    let posts = table("posts_table", "posts", vec![("user_id", "users")]);
    {
        let mut store = StateStore::load(state_path(&dir));
        store.put("users_table", &users).unwrap();
        store.put("posts_table", &posts).unwrap();
        store.commit().unwrap();
    }

    let (factory, log) = mock();
    let mut reconciler = Reconciler::new(
        desired(vec![users, posts]),
        StateStore::load(state_path(&dir)),
        factory,
    );

    let summary = reconciler.destroy(Some("posts_table")).await.unwrap();
    assert_eq!(summary.destroyed, 1);
    assert_eq!(*log.lock().unwrap(), vec!["drop posts"]);

    let reloaded = StateStore::load(state_path(&dir));
    assert_eq!(reloaded.len(), 1);
    assert!(reloaded.get("users_table").is_some());
}

#[tokio::test]
async fn test_destroy_unknown_resource_is_an_error() {
    let dir = TempDir::new().unwrap();
    let (factory, _log) = mock();
    let mut reconciler = Reconciler::new(
        desired(vec![]),
        StateStore::load(state_path(&dir)),
        factory,
    );

    let result = reconciler.destroy(Some("ghost_table")).await;
    assert!(result.is_err());
    assert!(result.unwrap_err().to_string().contains("ghost_table"));
}

#[tokio::test]
async fn test_connection_variables_resolve_at_apply_time() {
    let dir = TempDir::new().unwrap();
    std::env::set_var("AQUAFORM_ENGINE_TEST_URL", "https://resolved.supabase.co");

    let mut users = table("users_table", "users", vec![]);
    users.conn = Connection::Postgres {
        url: "${AQUAFORM_ENGINE_TEST_URL}".to_string(),
        key: "secret".to_string(),
    };

    let (factory, log) = mock_recording_connects();
    let mut reconciler = Reconciler::new(
        desired(vec![users]),
        StateStore::load(state_path(&dir)),
        factory,
    );

    let summary = reconciler.apply().await.unwrap();
    assert_eq!(summary.created, 1);
    assert_eq!(
        *log.lock().unwrap(),
        vec!["connect https://resolved.supabase.co", "create users"]
    );

    // The descriptor is recorded unresolved so later runs re-resolve.
    let reloaded = StateStore::load(state_path(&dir));
    let value = reloaded.get("users_table").unwrap();
    assert_eq!(value["url"], "${AQUAFORM_ENGINE_TEST_URL}");
}

#[tokio::test]
async fn test_failed_drop_keeps_resource_in_state() {
    let dir = TempDir::new().unwrap();

    let legacy = table("legacy_table", "legacy", vec![]);
    {
        let mut store = StateStore::load(state_path(&dir));
        store.put("legacy_table", &legacy).unwrap();
        store.commit().unwrap();
    }

    let (factory, log) = mock_failing(&["legacy"]);
    let mut reconciler = Reconciler::new(
        desired(vec![]),
        StateStore::load(state_path(&dir)),
        factory,
    );

    let summary = reconciler.apply().await.unwrap();
    assert_eq!(summary.destroyed, 0);
    assert_eq!(summary.failed, 1);
    assert!(log.lock().unwrap().is_empty());

    let reloaded = StateStore::load(state_path(&dir));
    assert!(reloaded.get("legacy_table").is_some());
}
