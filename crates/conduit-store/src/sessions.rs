use rusqlite::{OptionalExtension, Row, params};

use crate::errors::{StoreError, StoreResult};
use crate::types::{PrStatus, Session, SessionStatus, WorkerStatus, WorktreeBinding};
use crate::{Store, new_id, now_timestamp};

fn row_to_session(row: &Row<'_>) -> rusqlite::Result<Session> {
    let status_raw: String = row.get("status")?;
    let worktree_path: Option<String> = row.get("worktree_path")?;
    let branch_name: Option<String> = row.get("branch_name")?;
    let base_branch: Option<String> = row.get("base_branch")?;
    let dev_server_port: Option<i64> = row.get("dev_server_port")?;
    let worktree = match (worktree_path, branch_name, base_branch) {
        (Some(worktree_path), Some(branch_name), Some(base_branch)) => Some(WorktreeBinding {
            worktree_path,
            branch_name,
            base_branch,
            dev_server_port,
        }),
        _ => None,
    };
    let pr_status_raw: Option<String> = row.get("pr_status")?;
    let worker_status_raw: Option<String> = row.get("worker_status")?;

    Ok(Session {
        id: row.get("id")?,
        name: row.get("name")?,
        status: SessionStatus::parse(&status_raw).unwrap_or(SessionStatus::Idle),
        working_directory: row.get("working_directory")?,
        agent_type: row.get("agent_type")?,
        model: row.get("model")?,
        system_prompt: row.get("system_prompt")?,
        tmux_name: row.get("tmux_name")?,
        project_id: row.get("project_id")?,
        parent_session_id: row.get("parent_session_id")?,
        claude_session_id: row.get("claude_session_id")?,
        auto_approve: row.get::<_, i64>("auto_approve")? != 0,
        worktree,
        pr_url: row.get("pr_url")?,
        pr_number: row.get("pr_number")?,
        pr_status: pr_status_raw.as_deref().and_then(PrStatus::parse),
        conductor_session_id: row.get("conductor_session_id")?,
        worker_task: row.get("worker_task")?,
        worker_status: worker_status_raw.as_deref().and_then(WorkerStatus::parse),
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}

/// Fields accepted by [`Store::create_session`]. Worktree fields are
/// all-or-nothing per invariant 2 in §3; callers (the session manager)
/// are expected to have already allocated the port and worktree path
/// before calling this, since the store itself does not reach out to
/// the port allocator or worktree manager.
#[derive(Debug, Clone, Default)]
pub struct NewSession<'a> {
    pub name: &'a str,
    pub working_directory: &'a str,
    pub agent_type: &'a str,
    pub model: &'a str,
    pub system_prompt: Option<&'a str>,
    pub tmux_name: Option<&'a str>,
    pub project_id: &'a str,
    pub parent_session_id: Option<&'a str>,
    pub auto_approve: bool,
    pub worktree: Option<WorktreeBinding>,
    pub conductor_session_id: Option<&'a str>,
    pub worker_task: Option<&'a str>,
    pub worker_status: Option<WorkerStatus>,
}

impl Store {
    /// Creates a session after validating the invariants the store is
    /// responsible for: worktree all-or-nothing (enforced by the type
    /// signature, not re-checked here), port not already held by a live
    /// session or running dev server, and conductor chain depth.
    pub fn create_session(&self, id: &str, fields: NewSession<'_>) -> StoreResult<Session> {
        let conn = self.lock();

        if fields.parent_session_id.is_some() {
            let parent_project: Option<String> = conn
                .query_row(
                    "SELECT project_id FROM sessions WHERE id = ?1",
                    params![fields.parent_session_id],
                    |row| row.get(0),
                )
                .optional()?;
            match parent_project {
                Some(pid) if pid == fields.project_id => {}
                Some(_) => {
                    return Err(StoreError::integrity(
                        "parent_session_id must be in the same project",
                    ));
                }
                None => {
                    return Err(StoreError::not_found(
                        "session",
                        fields.parent_session_id.unwrap_or_default(),
                    ));
                }
            }
        }

        if let Some(conductor_id) = fields.conductor_session_id {
            let conductor_chain: Option<Option<String>> = conn
                .query_row(
                    "SELECT conductor_session_id FROM sessions WHERE id = ?1",
                    params![conductor_id],
                    |row| row.get(0),
                )
                .optional()?;
            match conductor_chain {
                None => return Err(StoreError::not_found("session", conductor_id)),
                Some(Some(_)) => {
                    return Err(StoreError::conflict(
                        "workers do not spawn workers: conductor is itself a worker",
                    ));
                }
                Some(None) => {}
            }
        }

        if let Some(worktree) = &fields.worktree {
            if let Some(port) = worktree.dev_server_port {
                Self::check_port_available(&conn, port, None)?;
            }
        }

        let now = now_timestamp();
        let (worktree_path, branch_name, base_branch, dev_server_port) = match &fields.worktree {
            Some(w) => (
                Some(w.worktree_path.as_str()),
                Some(w.branch_name.as_str()),
                Some(w.base_branch.as_str()),
                w.dev_server_port,
            ),
            None => (None, None, None, None),
        };

        conn.execute(
            "INSERT INTO sessions
                (id, name, status, working_directory, agent_type, model, system_prompt,
                 tmux_name, project_id, parent_session_id, claude_session_id, auto_approve,
                 worktree_path, branch_name, base_branch, dev_server_port,
                 pr_url, pr_number, pr_status,
                 conductor_session_id, worker_task, worker_status,
                 created_at, updated_at)
             VALUES (?1, ?2, 'idle', ?3, ?4, ?5, ?6,
                     ?7, ?8, ?9, NULL, ?10,
                     ?11, ?12, ?13, ?14,
                     NULL, NULL, NULL,
                     ?15, ?16, ?17,
                     ?18, ?18)",
            params![
                id,
                fields.name,
                fields.working_directory,
                fields.agent_type,
                fields.model,
                fields.system_prompt,
                fields.tmux_name,
                fields.project_id,
                fields.parent_session_id,
                fields.auto_approve as i64,
                worktree_path,
                branch_name,
                base_branch,
                dev_server_port,
                fields.conductor_session_id,
                fields.worker_task,
                fields.worker_status.map(|s| s.as_str()),
                now,
            ],
        )
        .map_err(Self::map_session_write_error)?;

        drop(conn);
        self.get_session(id)
    }

    pub fn get_session(&self, id: &str) -> StoreResult<Session> {
        let conn = self.lock();
        conn.query_row(
            "SELECT * FROM sessions WHERE id = ?1",
            params![id],
            row_to_session,
        )
        .optional()?
        .ok_or_else(|| StoreError::not_found("session", id))
    }

    /// Lists sessions, optionally scoped to one project, ordered by
    /// creation time then id for determinism.
    pub fn list_sessions(&self, project_id: Option<&str>) -> StoreResult<Vec<Session>> {
        let conn = self.lock();
        let rows = match project_id {
            Some(project_id) => {
                let mut stmt = conn.prepare(
                    "SELECT * FROM sessions WHERE project_id = ?1 ORDER BY created_at ASC, id ASC",
                )?;
                stmt.query_map(params![project_id], row_to_session)?
                    .collect::<rusqlite::Result<Vec<_>>>()?
            }
            None => {
                let mut stmt =
                    conn.prepare("SELECT * FROM sessions ORDER BY created_at ASC, id ASC")?;
                stmt.query_map([], row_to_session)?
                    .collect::<rusqlite::Result<Vec<_>>>()?
            }
        };
        Ok(rows)
    }

    /// Lists worker sessions owned by a conductor, in creation order.
    pub fn list_workers(&self, conductor_session_id: &str) -> StoreResult<Vec<Session>> {
        let conn = self.lock();
        let mut stmt = conn.prepare(
            "SELECT * FROM sessions WHERE conductor_session_id = ?1 ORDER BY created_at ASC, id ASC",
        )?;
        let rows = stmt
            .query_map(params![conductor_session_id], row_to_session)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    pub fn rename_session(&self, id: &str, name: &str) -> StoreResult<Session> {
        let conn = self.lock();
        let now = now_timestamp();
        let changed = conn.execute(
            "UPDATE sessions SET name = ?1, updated_at = ?2 WHERE id = ?3",
            params![name, now, id],
        )?;
        if changed == 0 {
            return Err(StoreError::not_found("session", id));
        }
        drop(conn);
        self.get_session(id)
    }

    pub fn set_session_status(&self, id: &str, status: SessionStatus) -> StoreResult<Session> {
        let conn = self.lock();
        let now = now_timestamp();
        let changed = conn.execute(
            "UPDATE sessions SET status = ?1, updated_at = ?2 WHERE id = ?3",
            params![status.as_str(), now, id],
        )?;
        if changed == 0 {
            return Err(StoreError::not_found("session", id));
        }
        drop(conn);
        self.get_session(id)
    }

    /// `claude_session_id` is set exactly once and never overwritten
    /// (invariant 7 in §3); a second call with a different value is
    /// silently ignored and returns the session unchanged.
    pub fn set_claude_session_id_if_unset(
        &self,
        id: &str,
        claude_session_id: &str,
    ) -> StoreResult<Session> {
        let conn = self.lock();
        let now = now_timestamp();
        conn.execute(
            "UPDATE sessions SET claude_session_id = ?1, updated_at = ?2
             WHERE id = ?3 AND claude_session_id IS NULL",
            params![claude_session_id, now, id],
        )?;
        drop(conn);
        self.get_session(id)
    }

    /// Reassigns a session to a different project; no filesystem action
    /// (the worktree, if any, is left exactly where it is).
    pub fn reassign_session_project(&self, id: &str, project_id: &str) -> StoreResult<Session> {
        let conn = self.lock();
        let now = now_timestamp();
        let changed = conn.execute(
            "UPDATE sessions SET project_id = ?1, updated_at = ?2 WHERE id = ?3",
            params![project_id, now, id],
        )?;
        if changed == 0 {
            return Err(StoreError::not_found("session", id));
        }
        drop(conn);
        self.get_session(id)
    }

    pub fn set_worker_status(&self, id: &str, status: WorkerStatus) -> StoreResult<Session> {
        let conn = self.lock();
        let now = now_timestamp();
        let changed = conn.execute(
            "UPDATE sessions SET worker_status = ?1, updated_at = ?2 WHERE id = ?3",
            params![status.as_str(), now, id],
        )?;
        if changed == 0 {
            return Err(StoreError::not_found("session", id));
        }
        drop(conn);
        self.get_session(id)
    }

    pub fn set_pr_info(
        &self,
        id: &str,
        pr_url: &str,
        pr_number: i64,
        pr_status: PrStatus,
    ) -> StoreResult<Session> {
        let conn = self.lock();
        let now = now_timestamp();
        let changed = conn.execute(
            "UPDATE sessions SET pr_url = ?1, pr_number = ?2, pr_status = ?3, updated_at = ?4
             WHERE id = ?5",
            params![pr_url, pr_number, pr_status.as_str(), now, id],
        )?;
        if changed == 0 {
            return Err(StoreError::not_found("session", id));
        }
        drop(conn);
        self.get_session(id)
    }

    /// Releases a session's worktree and port binding, leaving all three
    /// fields null together (the all-or-nothing invariant applies in
    /// reverse on release too).
    pub fn release_worktree(&self, id: &str) -> StoreResult<Session> {
        let conn = self.lock();
        let now = now_timestamp();
        let changed = conn.execute(
            "UPDATE sessions SET worktree_path = NULL, branch_name = NULL, base_branch = NULL,
                 dev_server_port = NULL, updated_at = ?1
             WHERE id = ?2",
            params![now, id],
        )?;
        if changed == 0 {
            return Err(StoreError::not_found("session", id));
        }
        drop(conn);
        self.get_session(id)
    }

    /// Forks a session: copies the parent's metadata snapshot but gets a
    /// fresh id and tmux name (invariant 6 in §3). The fork does not
    /// inherit the parent's worktree, port, PR tracking, or orchestration
    /// fields — those are session-exclusive resources the caller must
    /// allocate fresh if the fork needs them.
    pub fn fork_session(&self, parent_id: &str, new_id: &str, new_tmux_name: Option<&str>) -> StoreResult<Session> {
        let parent = self.get_session(parent_id)?;
        self.create_session(
            new_id,
            NewSession {
                name: &format!("{} (fork)", parent.name),
                working_directory: &parent.working_directory,
                agent_type: &parent.agent_type,
                model: &parent.model,
                system_prompt: parent.system_prompt.as_deref(),
                tmux_name: new_tmux_name,
                project_id: &parent.project_id,
                parent_session_id: Some(parent_id),
                auto_approve: parent.auto_approve,
                worktree: None,
                conductor_session_id: None,
                worker_task: None,
                worker_status: None,
            },
        )
    }

    pub fn delete_session(&self, id: &str) -> StoreResult<()> {
        let conn = self.lock();
        let changed = conn.execute("DELETE FROM sessions WHERE id = ?1", params![id])?;
        if changed == 0 {
            return Err(StoreError::not_found("session", id));
        }
        Ok(())
    }

    pub fn new_session_id(&self) -> String {
        new_id()
    }

    /// Public probe used by the port allocator: `true` if `port` is already
    /// held by a live session or a running dev-server instance.
    pub fn is_port_recorded(&self, port: i64) -> StoreResult<bool> {
        let conn = self.lock();
        Ok(Self::check_port_available(&conn, port, None).is_err())
    }

    /// Checks that `port` is not held by any other live session or any
    /// running dev-server instance. `exclude_session_id` allows a session
    /// to keep its own existing port across an update.
    pub(crate) fn check_port_available(
        conn: &rusqlite::Connection,
        port: i64,
        exclude_session_id: Option<&str>,
    ) -> StoreResult<()> {
        let held_by_session: i64 = conn.query_row(
            "SELECT COUNT(*) FROM sessions
             WHERE dev_server_port = ?1 AND id != COALESCE(?2, '')",
            params![port, exclude_session_id],
            |row| row.get(0),
        )?;
        if held_by_session > 0 {
            return Err(StoreError::conflict(format!(
                "port {port} is already held by another session"
            )));
        }

        let held_by_dev_server: i64 = conn.query_row(
            "SELECT COUNT(*) FROM dev_server_instances, json_each(dev_server_instances.ports)
             WHERE dev_server_instances.status IN ('starting', 'running')
               AND json_each.value = ?1",
            params![port],
            |row| row.get(0),
        )?;
        if held_by_dev_server > 0 {
            return Err(StoreError::conflict(format!(
                "port {port} is already held by a running dev server"
            )));
        }
        Ok(())
    }

    fn map_session_write_error(e: rusqlite::Error) -> StoreError {
        if StoreError::is_unique_violation(&e) {
            StoreError::conflict(
                "tmux_name, worktree_path, or branch_name collides with an existing session",
            )
        } else {
            e.into()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::UNCATEGORIZED_PROJECT_ID;

    fn minimal(project_id: &'static str, tmux_name: &'static str) -> NewSession<'static> {
        NewSession {
            name: "Session 1",
            working_directory: "/tmp/work",
            agent_type: "claude",
            model: "claude-opus",
            tmux_name: Some(tmux_name),
            project_id,
            ..Default::default()
        }
    }

    #[test]
    fn duplicate_tmux_name_is_conflict() {
        let store = Store::open_in_memory().unwrap();
        store
            .create_session("s1", minimal(UNCATEGORIZED_PROJECT_ID, "claude-s1"))
            .unwrap();
        let err = store
            .create_session("s2", minimal(UNCATEGORIZED_PROJECT_ID, "claude-s1"))
            .unwrap_err();
        assert!(matches!(err, StoreError::Conflict { .. }));
    }

    #[test]
    fn worker_chain_of_depth_two_is_rejected() {
        let store = Store::open_in_memory().unwrap();
        store
            .create_session("conductor", minimal(UNCATEGORIZED_PROJECT_ID, "claude-conductor"))
            .unwrap();
        let mut worker = minimal(UNCATEGORIZED_PROJECT_ID, "claude-worker");
        worker.conductor_session_id = Some("conductor");
        worker.worker_status = Some(WorkerStatus::Pending);
        store.create_session("worker-1", worker).unwrap();

        let mut sub_worker = minimal(UNCATEGORIZED_PROJECT_ID, "claude-sub-worker");
        sub_worker.conductor_session_id = Some("worker-1");
        let err = store.create_session("worker-2", sub_worker).unwrap_err();
        assert!(matches!(err, StoreError::Conflict { .. }));
    }

    #[test]
    fn claude_session_id_is_set_once() {
        let store = Store::open_in_memory().unwrap();
        store
            .create_session("s1", minimal(UNCATEGORIZED_PROJECT_ID, "claude-s1"))
            .unwrap();
        store.set_claude_session_id_if_unset("s1", "upstream-1").unwrap();
        let session = store.set_claude_session_id_if_unset("s1", "upstream-2").unwrap();
        assert_eq!(session.claude_session_id.as_deref(), Some("upstream-1"));
    }

    #[test]
    fn fork_gets_fresh_id_and_no_worktree() {
        let store = Store::open_in_memory().unwrap();
        let mut parent = minimal(UNCATEGORIZED_PROJECT_ID, "claude-parent");
        parent.worktree = Some(WorktreeBinding {
            worktree_path: "/tmp/wt".to_string(),
            branch_name: "feature/x".to_string(),
            base_branch: "main".to_string(),
            dev_server_port: None,
        });
        store.create_session("parent", parent).unwrap();

        let fork = store
            .fork_session("parent", "fork-1", Some("claude-fork-1"))
            .unwrap();
        assert_eq!(fork.parent_session_id.as_deref(), Some("parent"));
        assert!(fork.worktree.is_none());
        assert_ne!(fork.id, "parent");
    }

    #[test]
    fn dev_server_port_collision_is_conflict() {
        let store = Store::open_in_memory().unwrap();
        let mut a = minimal(UNCATEGORIZED_PROJECT_ID, "claude-a");
        a.worktree = Some(WorktreeBinding {
            worktree_path: "/tmp/a".to_string(),
            branch_name: "feature/a".to_string(),
            base_branch: "main".to_string(),
            dev_server_port: Some(3100),
        });
        store.create_session("a", a).unwrap();

        let mut b = minimal(UNCATEGORIZED_PROJECT_ID, "claude-b");
        b.worktree = Some(WorktreeBinding {
            worktree_path: "/tmp/b".to_string(),
            branch_name: "feature/b".to_string(),
            base_branch: "main".to_string(),
            dev_server_port: Some(3100),
        });
        let err = store.create_session("b", b).unwrap_err();
        assert!(matches!(err, StoreError::Conflict { .. }));
    }
}
