use rusqlite::{OptionalExtension, Row, params};

use crate::errors::{StoreError, StoreResult};
use crate::types::{DevServerInstance, DevServerStatus, DevServerType, decode_ports, encode_ports};
use crate::{Store, new_id};

fn row_to_instance(row: &Row<'_>) -> rusqlite::Result<DevServerInstance> {
    let server_type_raw: String = row.get("server_type")?;
    let status_raw: String = row.get("status")?;
    let ports_raw: String = row.get("ports")?;
    Ok(DevServerInstance {
        id: row.get("id")?,
        project_id: row.get("project_id")?,
        server_type: DevServerType::parse(&server_type_raw).unwrap_or(DevServerType::Node),
        name: row.get("name")?,
        command: row.get("command")?,
        status: DevServerStatus::parse(&status_raw).unwrap_or(DevServerStatus::Stopped),
        pid: row.get("pid")?,
        container_id: row.get("container_id")?,
        ports: decode_ports(&ports_raw),
        working_directory: row.get("working_directory")?,
    })
}

impl Store {
    pub fn create_dev_server_instance(
        &self,
        project_id: &str,
        server_type: DevServerType,
        name: &str,
        command: &str,
        working_directory: &str,
    ) -> StoreResult<DevServerInstance> {
        let conn = self.lock();
        let id = new_id();
        conn.execute(
            "INSERT INTO dev_server_instances
                (id, project_id, server_type, name, command, status, pid, container_id, ports, working_directory)
             VALUES (?1, ?2, ?3, ?4, ?5, 'stopped', NULL, NULL, '[]', ?6)",
            params![id, project_id, server_type.as_str(), name, command, working_directory],
        )
        .map_err(|e| match &e {
            rusqlite::Error::SqliteFailure(code, _)
                if code.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                StoreError::integrity(format!("project '{project_id}' does not exist"))
            }
            _ => e.into(),
        })?;
        drop(conn);
        self.get_dev_server_instance(&id)
    }

    pub fn get_dev_server_instance(&self, id: &str) -> StoreResult<DevServerInstance> {
        let conn = self.lock();
        conn.query_row(
            "SELECT * FROM dev_server_instances WHERE id = ?1",
            params![id],
            row_to_instance,
        )
        .optional()?
        .ok_or_else(|| StoreError::not_found("dev_server_instance", id))
    }

    pub fn list_dev_server_instances(&self, project_id: &str) -> StoreResult<Vec<DevServerInstance>> {
        let conn = self.lock();
        let mut stmt = conn.prepare(
            "SELECT * FROM dev_server_instances WHERE project_id = ?1 ORDER BY id ASC",
        )?;
        let rows = stmt
            .query_map(params![project_id], row_to_instance)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    /// Transitions a dev server to `starting`/`running` and binds its
    /// ports, verifying none collide with a live session or another
    /// running dev server (invariant 3 in §3).
    pub fn start_dev_server_instance(
        &self,
        id: &str,
        status: DevServerStatus,
        pid: Option<i64>,
        container_id: Option<&str>,
        ports: &[i64],
    ) -> StoreResult<DevServerInstance> {
        let conn = self.lock();
        if status.is_live() {
            for &port in ports {
                Store::check_port_available(&conn, port, None)?;
            }
        }
        let changed = conn.execute(
            "UPDATE dev_server_instances
             SET status = ?1, pid = ?2, container_id = ?3, ports = ?4
             WHERE id = ?5",
            params![status.as_str(), pid, container_id, encode_ports(ports), id],
        )?;
        if changed == 0 {
            return Err(StoreError::not_found("dev_server_instance", id));
        }
        drop(conn);
        self.get_dev_server_instance(id)
    }

    pub fn stop_dev_server_instance(&self, id: &str) -> StoreResult<DevServerInstance> {
        let conn = self.lock();
        let changed = conn.execute(
            "UPDATE dev_server_instances
             SET status = 'stopped', pid = NULL, container_id = NULL, ports = '[]'
             WHERE id = ?1",
            params![id],
        )?;
        if changed == 0 {
            return Err(StoreError::not_found("dev_server_instance", id));
        }
        drop(conn);
        self.get_dev_server_instance(id)
    }

    pub fn mark_dev_server_instance_failed(&self, id: &str) -> StoreResult<DevServerInstance> {
        let conn = self.lock();
        let changed = conn.execute(
            "UPDATE dev_server_instances SET status = 'failed' WHERE id = ?1",
            params![id],
        )?;
        if changed == 0 {
            return Err(StoreError::not_found("dev_server_instance", id));
        }
        drop(conn);
        self.get_dev_server_instance(id)
    }

    pub fn delete_dev_server_instance(&self, id: &str) -> StoreResult<()> {
        let conn = self.lock();
        let changed = conn.execute("DELETE FROM dev_server_instances WHERE id = ?1", params![id])?;
        if changed == 0 {
            return Err(StoreError::not_found("dev_server_instance", id));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dev_server_lifecycle_round_trips() {
        let store = Store::open_in_memory().unwrap();
        store.create_project("p1", "A", "/a", "claude").unwrap();
        let instance = store
            .create_dev_server_instance("p1", DevServerType::Node, "web", "npm run dev", "/a")
            .unwrap();
        assert_eq!(instance.status, DevServerStatus::Stopped);

        let started = store
            .start_dev_server_instance(&instance.id, DevServerStatus::Running, Some(123), None, &[3100])
            .unwrap();
        assert_eq!(started.ports, vec![3100]);

        let stopped = store.stop_dev_server_instance(&instance.id).unwrap();
        assert!(stopped.ports.is_empty());
    }

    #[test]
    fn starting_on_a_held_port_is_conflict() {
        let store = Store::open_in_memory().unwrap();
        store.create_project("p1", "A", "/a", "claude").unwrap();
        let first = store
            .create_dev_server_instance("p1", DevServerType::Node, "web", "npm run dev", "/a")
            .unwrap();
        store
            .start_dev_server_instance(&first.id, DevServerStatus::Running, None, None, &[3100])
            .unwrap();

        let second = store
            .create_dev_server_instance("p1", DevServerType::Node, "api", "npm run api", "/a")
            .unwrap();
        let err = store
            .start_dev_server_instance(&second.id, DevServerStatus::Running, None, None, &[3100])
            .unwrap_err();
        assert!(matches!(err, StoreError::Conflict { .. }));
    }
}
