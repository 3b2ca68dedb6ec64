use rusqlite::{Connection, OptionalExtension};

use crate::errors::{StoreError, StoreResult};

pub struct Migration {
    pub id: &'static str,
    pub name: &'static str,
    pub apply: fn(&Connection) -> rusqlite::Result<()>,
}

/// Ordered list of migrations. Applied in order against a fresh or
/// existing database; never reordered or removed once released.
fn migrations() -> Vec<Migration> {
    vec![
        Migration {
            id: "0001",
            name: "create_projects",
            apply: |conn| {
                conn.execute_batch(
                    "CREATE TABLE IF NOT EXISTS projects (
                        id TEXT PRIMARY KEY,
                        name TEXT NOT NULL,
                        working_directory TEXT NOT NULL,
                        agent_type TEXT NOT NULL,
                        default_model TEXT,
                        expanded INTEGER NOT NULL DEFAULT 1,
                        sort_order INTEGER NOT NULL DEFAULT 0,
                        is_uncategorized INTEGER NOT NULL DEFAULT 0,
                        created_at TEXT NOT NULL,
                        updated_at TEXT NOT NULL
                    );",
                )
            },
        },
        Migration {
            id: "0002",
            name: "create_dev_server_templates",
            apply: |conn| {
                conn.execute_batch(
                    "CREATE TABLE IF NOT EXISTS dev_server_templates (
                        id TEXT PRIMARY KEY,
                        project_id TEXT NOT NULL REFERENCES projects(id) ON DELETE CASCADE,
                        name TEXT NOT NULL,
                        server_type TEXT NOT NULL,
                        command TEXT NOT NULL,
                        port INTEGER,
                        port_env_var TEXT,
                        sort_order INTEGER NOT NULL DEFAULT 0
                    );",
                )
            },
        },
        Migration {
            id: "0003",
            name: "create_sessions",
            apply: |conn| {
                conn.execute_batch(
                    "CREATE TABLE IF NOT EXISTS sessions (
                        id TEXT PRIMARY KEY,
                        name TEXT NOT NULL,
                        status TEXT NOT NULL DEFAULT 'idle',
                        working_directory TEXT NOT NULL,
                        agent_type TEXT NOT NULL,
                        model TEXT NOT NULL,
                        system_prompt TEXT,
                        tmux_name TEXT UNIQUE,
                        project_id TEXT NOT NULL REFERENCES projects(id) ON DELETE CASCADE,
                        parent_session_id TEXT REFERENCES sessions(id) ON DELETE SET NULL,
                        claude_session_id TEXT,
                        auto_approve INTEGER NOT NULL DEFAULT 0,
                        worktree_path TEXT UNIQUE,
                        branch_name TEXT,
                        base_branch TEXT,
                        dev_server_port INTEGER,
                        pr_url TEXT,
                        pr_number INTEGER,
                        pr_status TEXT,
                        conductor_session_id TEXT REFERENCES sessions(id) ON DELETE SET NULL,
                        worker_task TEXT,
                        worker_status TEXT,
                        created_at TEXT NOT NULL,
                        updated_at TEXT NOT NULL
                    );
                    CREATE UNIQUE INDEX IF NOT EXISTS idx_sessions_branch_per_dir
                        ON sessions(working_directory, branch_name)
                        WHERE branch_name IS NOT NULL;",
                )
            },
        },
        Migration {
            id: "0004",
            name: "create_dev_server_instances",
            apply: |conn| {
                conn.execute_batch(
                    "CREATE TABLE IF NOT EXISTS dev_server_instances (
                        id TEXT PRIMARY KEY,
                        project_id TEXT NOT NULL REFERENCES projects(id) ON DELETE CASCADE,
                        server_type TEXT NOT NULL,
                        name TEXT NOT NULL,
                        command TEXT NOT NULL,
                        status TEXT NOT NULL DEFAULT 'stopped',
                        pid INTEGER,
                        container_id TEXT,
                        ports TEXT NOT NULL DEFAULT '[]',
                        working_directory TEXT NOT NULL
                    );",
                )
            },
        },
        Migration {
            id: "0005",
            name: "seed_uncategorized_project",
            apply: |conn| {
                let now = crate::now_timestamp();
                conn.execute(
                    "INSERT OR IGNORE INTO projects
                        (id, name, working_directory, agent_type, default_model,
                         expanded, sort_order, is_uncategorized, created_at, updated_at)
                     VALUES ('uncategorized', 'Uncategorized', '', 'claude', NULL,
                             1, -1, 1, ?1, ?1)",
                    rusqlite::params![now],
                )?;
                Ok(())
            },
        },
    ]
}

/// Applies all migrations not yet recorded in `_migrations`, in order.
/// Safe to call on every daemon startup: already-applied ids are skipped
/// via `INSERT OR IGNORE`, so concurrent starts cannot double-apply.
pub fn run_migrations(conn: &Connection) -> StoreResult<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS _migrations (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            applied_at TEXT NOT NULL
        );",
    )?;

    for migration in migrations() {
        let already_applied: bool = conn
            .query_row(
                "SELECT 1 FROM _migrations WHERE id = ?1",
                rusqlite::params![migration.id],
                |_| Ok(true),
            )
            .optional()?
            .unwrap_or(false);

        if already_applied {
            continue;
        }

        (migration.apply)(conn).map_err(|source| StoreError::MigrationError {
            name: migration.name.to_string(),
            source,
        })?;

        let now = crate::now_timestamp();
        conn.execute(
            "INSERT OR IGNORE INTO _migrations (id, name, applied_at) VALUES (?1, ?2, ?3)",
            rusqlite::params![migration.id, migration.name, now],
        )?;

        tracing::info!(
            event = "store.migration.applied",
            id = migration.id,
            name = migration.name
        );
    }

    Ok(())
}
