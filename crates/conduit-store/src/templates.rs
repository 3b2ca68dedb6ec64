use rusqlite::{OptionalExtension, Row, params};

use crate::errors::{StoreError, StoreResult};
use crate::types::{DevServerType, ProjectDevServerTemplate};
use crate::{Store, new_id};

fn row_to_template(row: &Row<'_>) -> rusqlite::Result<ProjectDevServerTemplate> {
    let server_type_raw: String = row.get("server_type")?;
    Ok(ProjectDevServerTemplate {
        id: row.get("id")?,
        project_id: row.get("project_id")?,
        name: row.get("name")?,
        server_type: DevServerType::parse(&server_type_raw).ok_or_else(|| {
            rusqlite::Error::InvalidColumnType(
                0,
                "server_type".to_string(),
                rusqlite::types::Type::Text,
            )
        })?,
        command: row.get("command")?,
        port: row.get("port")?,
        port_env_var: row.get("port_env_var")?,
        sort_order: row.get("sort_order")?,
    })
}

impl Store {
    pub fn create_dev_server_template(
        &self,
        project_id: &str,
        name: &str,
        server_type: DevServerType,
        command: &str,
        port: Option<i64>,
        port_env_var: Option<&str>,
    ) -> StoreResult<ProjectDevServerTemplate> {
        let conn = self.lock();
        let id = new_id();
        let sort_order: i64 = conn
            .query_row(
                "SELECT COALESCE(MAX(sort_order), -1) + 1 FROM dev_server_templates WHERE project_id = ?1",
                params![project_id],
                |row| row.get(0),
            )
            .unwrap_or(0);

        conn.execute(
            "INSERT INTO dev_server_templates
                (id, project_id, name, server_type, command, port, port_env_var, sort_order)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                id,
                project_id,
                name,
                server_type.as_str(),
                command,
                port,
                port_env_var,
                sort_order
            ],
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
        self.get_dev_server_template(&id)
    }

    pub fn get_dev_server_template(&self, id: &str) -> StoreResult<ProjectDevServerTemplate> {
        let conn = self.lock();
        conn.query_row(
            "SELECT * FROM dev_server_templates WHERE id = ?1",
            params![id],
            row_to_template,
        )
        .optional()?
        .ok_or_else(|| StoreError::not_found("dev_server_template", id))
    }

    pub fn list_dev_server_templates(
        &self,
        project_id: &str,
    ) -> StoreResult<Vec<ProjectDevServerTemplate>> {
        let conn = self.lock();
        let mut stmt = conn.prepare(
            "SELECT * FROM dev_server_templates WHERE project_id = ?1 ORDER BY sort_order ASC, id ASC",
        )?;
        let rows = stmt
            .query_map(params![project_id], row_to_template)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    pub fn delete_dev_server_template(&self, id: &str) -> StoreResult<()> {
        let conn = self.lock();
        let changed = conn.execute(
            "DELETE FROM dev_server_templates WHERE id = ?1",
            params![id],
        )?;
        if changed == 0 {
            return Err(StoreError::not_found("dev_server_template", id));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn template_cascades_with_project_deletion() {
        let store = Store::open_in_memory().unwrap();
        store.create_project("p1", "A", "/a", "claude").unwrap();
        let template = store
            .create_dev_server_template("p1", "web", DevServerType::Node, "npm run dev", None, None)
            .unwrap();

        store.delete_dev_server_template(&template.id).unwrap();
        let err = store.get_dev_server_template(&template.id).unwrap_err();
        assert!(matches!(err, StoreError::NotFound { .. }));
    }

    #[test]
    fn template_for_missing_project_is_integrity_error() {
        let store = Store::open_in_memory().unwrap();
        let err = store
            .create_dev_server_template("missing", "web", DevServerType::Node, "npm run dev", None, None)
            .unwrap_err();
        assert!(matches!(err, StoreError::IntegrityError { .. }));
    }
}
