//! # stamp-runtime
//!
//! Everything that spawns processes during a run.
//!
//! - [`resolver`] resolves the declared context, running cli chains concurrently.
//! - [`tasks`] runs pre/post tasks and guards against re-entrant renders.
//! - [`process`] is the shared `sh -c` runner.

pub mod error;
pub mod process;
pub mod resolver;
pub mod tasks;

pub use error::{ResolveError, TaskError, VarError};
pub use process::{run_command, CommandError};
pub use resolver::{resolve, resolve_one, BanDefaults, ResolveOptions};
pub use tasks::{
    ensure_not_in_task, in_task, load_parent_state, run_tasks, ParentState, IN_TASK_ENV,
    PARENT_STATE_ENV,
};
