//! Pre/post task execution and the recursion guard.
//!
//! Every task process sees `STAMP_IN_TASK=1`. A nested `stamp render` refuses
//! to run when it sees that marker. Post tasks additionally get
//! `STAMP_PARENT_STATE`, the path of a JSON snapshot of the finalized
//! context, so `stamp var` inside a post task can answer without resolving
//! anything. A pre task has no snapshot, so `stamp var` there fails too.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use stamp_core::{ResolvedContext, Task, TaskPhase};

use crate::error::TaskError;
use crate::process::run_command;

/// Set to `1` in the environment of every task process.
pub const IN_TASK_ENV: &str = "STAMP_IN_TASK";

/// Path of the parent-state snapshot, set for post tasks only.
pub const PARENT_STATE_ENV: &str = "STAMP_PARENT_STATE";

/// What a post task can see of the run that spawned it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParentState {
    pub config_path: PathBuf,
    pub root: PathBuf,
    pub context: ResolvedContext,
}

impl ParentState {
    /// Look up one finalized context value.
    pub fn var(&self, name: &str) -> Result<&serde_json::Value, TaskError> {
        self.context
            .get(name)
            .ok_or_else(|| TaskError::UnknownVariable {
                name: name.to_string(),
                known: self.context.keys().map(str::to_string).collect(),
            })
    }
}

/// `true` when this process was started by a task.
pub fn in_task() -> bool {
    std::env::var_os(IN_TASK_ENV).is_some()
}

/// Refuse `operation` when running inside any task.
pub fn ensure_not_in_task(operation: &'static str) -> Result<(), TaskError> {
    if in_task() {
        return Err(TaskError::TaskRecursion { operation });
    }
    Ok(())
}

/// Read the parent-state snapshot, if this process is a post task.
pub fn load_parent_state() -> Result<Option<ParentState>, TaskError> {
    let Some(path) = std::env::var_os(PARENT_STATE_ENV) else {
        return Ok(None);
    };
    let path = PathBuf::from(path);
    let raw = std::fs::read_to_string(&path).map_err(|source| TaskError::ParentStateIo {
        path: path.clone(),
        source,
    })?;
    let state = serde_json::from_str(&raw)
        .map_err(|source| TaskError::ParentStateJson { path, source })?;
    Ok(Some(state))
}

/// Run every task of `phase` in order; the first failure aborts.
///
/// `parent` must be set for post tasks and is ignored for pre tasks.
pub async fn run_tasks(
    phase: TaskPhase,
    tasks: &[Task],
    cwd: &Path,
    parent: Option<&ParentState>,
) -> Result<(), TaskError> {
    if tasks.is_empty() {
        return Ok(());
    }

    // Kept alive until every post task has finished.
    let snapshot = match (phase, parent) {
        (TaskPhase::Post, Some(state)) => Some(write_snapshot(state)?),
        _ => None,
    };
    let snapshot_path = snapshot
        .as_ref()
        .map(|f| f.path().to_string_lossy().into_owned());

    let mut envs: Vec<(&str, &str)> = vec![(IN_TASK_ENV, "1")];
    if let Some(path) = snapshot_path.as_deref() {
        envs.push((PARENT_STATE_ENV, path));
    }

    for (index, task) in tasks.iter().enumerate() {
        tracing::info!("running {phase} task {index}");
        for command in &task.commands {
            let stdout = run_command(command, cwd, &envs)
                .await
                .map_err(|source| TaskError::Command {
                    phase,
                    index,
                    source,
                })?;
            if !stdout.trim().is_empty() {
                tracing::info!("[{phase} {index}] {}", stdout.trim_end());
            }
        }
    }
    Ok(())
}

fn write_snapshot(state: &ParentState) -> Result<tempfile::NamedTempFile, TaskError> {
    let io = |source, path: &Path| TaskError::ParentStateIo {
        path: path.to_path_buf(),
        source,
    };
    let file = tempfile::Builder::new()
        .prefix("stamp-parent-")
        .suffix(".json")
        .tempfile()
        .map_err(|e| io(e, &std::env::temp_dir()))?;
    let json = serde_json::to_vec(state).map_err(|source| TaskError::ParentStateJson {
        path: file.path().to_path_buf(),
        source,
    })?;
    std::fs::write(file.path(), json).map_err(|e| io(e, file.path()))?;
    Ok(file)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn task(commands: &[&str]) -> Task {
        Task {
            commands: commands.iter().map(|c| c.to_string()).collect(),
        }
    }

    #[tokio::test]
    async fn tasks_run_in_order_with_marker() {
        let dir = TempDir::new().unwrap();
        let tasks = vec![
            task(&["echo one >> log.txt"]),
            task(&["echo \"$STAMP_IN_TASK\" >> log.txt", "echo three >> log.txt"]),
        ];
        run_tasks(TaskPhase::Pre, &tasks, dir.path(), None)
            .await
            .unwrap();
        let log = std::fs::read_to_string(dir.path().join("log.txt")).unwrap();
        assert_eq!(log, "one\n1\nthree\n");
    }

    #[tokio::test]
    async fn failure_stops_the_phase() {
        let dir = TempDir::new().unwrap();
        let tasks = vec![task(&["exit 1"]), task(&["touch never"])];
        let err = run_tasks(TaskPhase::Pre, &tasks, dir.path(), None)
            .await
            .unwrap_err();
        assert!(matches!(err, TaskError::Command { index: 0, .. }));
        assert!(!dir.path().join("never").exists());
    }

    #[tokio::test]
    async fn post_tasks_see_parent_state() {
        let dir = TempDir::new().unwrap();
        let mut context = ResolvedContext::default();
        context.insert("VERSION", json!("1.2.3"));
        let state = ParentState {
            config_path: dir.path().join("stamp.config.toml"),
            root: dir.path().to_path_buf(),
            context,
        };
        let tasks = vec![task(&["cat \"$STAMP_PARENT_STATE\" > state.json"])];
        run_tasks(TaskPhase::Post, &tasks, dir.path(), Some(&state))
            .await
            .unwrap();

        let raw = std::fs::read_to_string(dir.path().join("state.json")).unwrap();
        let loaded: ParentState = serde_json::from_str(&raw).unwrap();
        assert_eq!(loaded, state);
        assert_eq!(loaded.var("VERSION").unwrap(), &json!("1.2.3"));
        assert!(loaded.var("MISSING").is_err());
    }

    #[tokio::test]
    async fn pre_tasks_get_no_parent_state() {
        let dir = TempDir::new().unwrap();
        let tasks = vec![task(&["printf %s \"${STAMP_PARENT_STATE:-none}\" > out"])];
        run_tasks(TaskPhase::Pre, &tasks, dir.path(), None)
            .await
            .unwrap();
        assert_eq!(std::fs::read_to_string(dir.path().join("out")).unwrap(), "none");
    }
}
