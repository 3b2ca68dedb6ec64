use rusqlite::{OptionalExtension, Row, params};

use crate::errors::{StoreError, StoreResult};
use crate::types::{Project, UNCATEGORIZED_PROJECT_ID};
use crate::{Store, new_id, now_timestamp};

fn row_to_project(row: &Row<'_>) -> rusqlite::Result<Project> {
    Ok(Project {
        id: row.get("id")?,
        name: row.get("name")?,
        working_directory: row.get("working_directory")?,
        agent_type: row.get("agent_type")?,
        default_model: row.get("default_model")?,
        expanded: row.get::<_, i64>("expanded")? != 0,
        sort_order: row.get("sort_order")?,
        is_uncategorized: row.get::<_, i64>("is_uncategorized")? != 0,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}

impl Store {
    /// Creates a project with a caller-supplied id (generated by the
    /// session manager's id allocator, not by the store itself).
    pub fn create_project(
        &self,
        id: &str,
        name: &str,
        working_directory: &str,
        agent_type: &str,
    ) -> StoreResult<Project> {
        let conn = self.lock();
        let now = now_timestamp();
        let sort_order: i64 = conn
            .query_row(
                "SELECT COALESCE(MAX(sort_order), -1) + 1 FROM projects WHERE is_uncategorized = 0",
                [],
                |row| row.get(0),
            )
            .unwrap_or(0);

        conn.execute(
            "INSERT INTO projects
                (id, name, working_directory, agent_type, default_model,
                 expanded, sort_order, is_uncategorized, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, NULL, 1, ?5, 0, ?6, ?6)",
            params![id, name, working_directory, agent_type, sort_order, now],
        )
        .map_err(|e| {
            if StoreError::is_unique_violation(&e) {
                StoreError::conflict(format!("project '{id}' already exists"))
            } else {
                e.into()
            }
        })?;

        drop(conn);
        self.get_project(id)
    }

    pub fn get_project(&self, id: &str) -> StoreResult<Project> {
        let conn = self.lock();
        conn.query_row(
            "SELECT * FROM projects WHERE id = ?1",
            params![id],
            row_to_project,
        )
        .optional()?
        .ok_or_else(|| StoreError::not_found("project", id))
    }

    /// Deterministic order: non-uncategorized projects by `sort_order`,
    /// with `uncategorized` always last.
    pub fn list_projects(&self) -> StoreResult<Vec<Project>> {
        let conn = self.lock();
        let mut stmt = conn.prepare(
            "SELECT * FROM projects ORDER BY is_uncategorized ASC, sort_order ASC, id ASC",
        )?;
        let rows = stmt
            .query_map([], row_to_project)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    pub fn rename_project(&self, id: &str, name: &str) -> StoreResult<Project> {
        let conn = self.lock();
        let now = now_timestamp();
        let changed = conn.execute(
            "UPDATE projects SET name = ?1, updated_at = ?2 WHERE id = ?3",
            params![name, now, id],
        )?;
        if changed == 0 {
            return Err(StoreError::not_found("project", id));
        }
        drop(conn);
        self.get_project(id)
    }

    pub fn reorder_project(&self, id: &str, sort_order: i64) -> StoreResult<Project> {
        let conn = self.lock();
        let now = now_timestamp();
        let changed = conn.execute(
            "UPDATE projects SET sort_order = ?1, updated_at = ?2 WHERE id = ?3 AND is_uncategorized = 0",
            params![sort_order, now, id],
        )?;
        if changed == 0 {
            return Err(StoreError::not_found("project", id));
        }
        drop(conn);
        self.get_project(id)
    }

    /// Deletes a project. Fails with `Conflict` unless the project has no
    /// sessions and no dev-server instances. `uncategorized` cannot be
    /// deleted at all, per the invariant that it absorbs orphaned rows on
    /// migration rather than ever being removed.
    pub fn delete_project(&self, id: &str) -> StoreResult<()> {
        if id == UNCATEGORIZED_PROJECT_ID {
            return Err(StoreError::conflict(
                "the uncategorized project cannot be deleted",
            ));
        }

        let conn = self.lock();
        let session_count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM sessions WHERE project_id = ?1",
            params![id],
            |row| row.get(0),
        )?;
        if session_count > 0 {
            return Err(StoreError::conflict(format!(
                "project '{id}' still has {session_count} session(s)"
            )));
        }
        let dev_server_count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM dev_server_instances WHERE project_id = ?1",
            params![id],
            |row| row.get(0),
        )?;
        if dev_server_count > 0 {
            return Err(StoreError::conflict(format!(
                "project '{id}' still has {dev_server_count} dev server(s)"
            )));
        }

        let changed = conn.execute("DELETE FROM projects WHERE id = ?1", params![id])?;
        if changed == 0 {
            return Err(StoreError::not_found("project", id));
        }
        Ok(())
    }

    pub fn new_project_id(&self) -> String {
        new_id()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_and_get_project_round_trips() {
        let store = Store::open_in_memory().unwrap();
        let created = store
            .create_project("p1", "Widgets", "/home/x/widgets", "claude")
            .unwrap();
        assert_eq!(created.name, "Widgets");
        let fetched = store.get_project("p1").unwrap();
        assert_eq!(fetched, created);
    }

    #[test]
    fn duplicate_project_id_is_conflict() {
        let store = Store::open_in_memory().unwrap();
        store.create_project("p1", "A", "/a", "claude").unwrap();
        let err = store.create_project("p1", "B", "/b", "claude").unwrap_err();
        assert!(matches!(err, StoreError::Conflict { .. }));
    }

    #[test]
    fn uncategorized_project_cannot_be_deleted() {
        let store = Store::open_in_memory().unwrap();
        let err = store.delete_project(UNCATEGORIZED_PROJECT_ID).unwrap_err();
        assert!(matches!(err, StoreError::Conflict { .. }));
    }

    #[test]
    fn list_projects_orders_uncategorized_last() {
        let store = Store::open_in_memory().unwrap();
        store.create_project("p1", "A", "/a", "claude").unwrap();
        let projects = store.list_projects().unwrap();
        assert_eq!(projects.last().unwrap().id, UNCATEGORIZED_PROJECT_ID);
    }
}
