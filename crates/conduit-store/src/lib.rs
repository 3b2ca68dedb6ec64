//! # conduit-store
//!
//! Durable, transactional metadata store for projects, sessions,
//! dev-server instances, and dev-server templates. Backed by a single
//! SQLite file with an append-only migration log; the store is the sole
//! writer, accessed through typed accessors rather than raw SQL from
//! callers.

mod dev_servers;
mod errors;
mod migrations;
mod projects;
mod sessions;
mod templates;
pub mod types;

pub use errors::{StoreError, StoreResult};
pub use sessions::NewSession;
pub use types::{
    DevServerInstance, DevServerStatus, DevServerType, PrStatus, Project,
    ProjectDevServerTemplate, Session, SessionStatus, WorkerStatus, WorktreeBinding,
    UNCATEGORIZED_PROJECT_ID,
};

use std::path::Path;
use std::sync::Mutex;

use rusqlite::Connection;

/// The durable store. A single SQLite connection guarded by a mutex: the
/// Store is a single writer with many readers, per the scheduling model —
/// there is no separate reader pool, so reads also serialize on the mutex,
/// which is acceptable at the row counts this store is sized for.
pub struct Store {
    conn: Mutex<Connection>,
}

impl Store {
    /// Opens (creating if absent) the SQLite database at `path` and runs
    /// any pending migrations.
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        let conn = Connection::open(path.as_ref())?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "foreign_keys", "ON")?;
        migrations::run_migrations(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// An in-memory store, used by tests and by short-lived tooling.
    pub fn open_in_memory() -> StoreResult<Self> {
        let conn = Connection::open_in_memory()?;
        conn.pragma_update(None, "foreign_keys", "ON")?;
        migrations::run_migrations(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// UTC timestamp string of second precision; the only clock the store uses
/// for `created_at` / `updated_at`.
pub(crate) fn now_timestamp() -> String {
    chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ").to_string()
}

pub(crate) fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn open_in_memory_runs_migrations_and_seeds_uncategorized() {
        let store = Store::open_in_memory().unwrap();
        let project = store.get_project(UNCATEGORIZED_PROJECT_ID).unwrap();
        assert!(project.is_uncategorized);
        assert_eq!(project.sort_order, -1);
    }

    #[test]
    fn migrations_are_idempotent_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("store.db");
        {
            let store = Store::open(&db_path).unwrap();
            store
                .create_project("proj-a", "Proj A", "/tmp/a", "claude")
                .unwrap();
        }
        let store = Store::open(&db_path).unwrap();
        let project = store.get_project("proj-a").unwrap();
        assert_eq!(project.name, "Proj A");
    }
}
