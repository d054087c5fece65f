//! Prints the task tree stored in a context snapshot.
//!
//! Usage:
//!
//! ```text
//! taskforge <snapshot.json> [highlight-task-id]
//! ```
//!
//! When a task id is given, that task is marked in the printed tree.
//! `RUST_LOG` controls diagnostic output on stderr.

use std::env;
use std::io::{self, Write};
use std::sync::Arc;

use camino::Utf8PathBuf;
use mockable::DefaultClock;
use taskforge::{
    task::{
        adapters::memory::InMemoryTaskStore,
        domain::{TaskDomainError, TaskId},
        services::{TaskContextError, TaskContextStore},
    },
    telemetry,
};
use thiserror::Error;
use tokio::runtime::Builder;
use tracing::{debug, info};

/// Boxed error type for the main result.
type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug, Error)]
enum InspectError {
    #[error("usage: taskforge <snapshot.json> [highlight-task-id]")]
    Usage,
    #[error("argument is not valid UTF-8")]
    NonUtf8Argument,
    #[error("invalid task id: {0}")]
    TaskId(#[source] TaskDomainError),
    #[error("no snapshot found at {0}")]
    MissingSnapshot(Utf8PathBuf),
    #[error("runtime init failed: {0}")]
    RuntimeInit(#[source] io::Error),
    #[error(transparent)]
    Context(#[from] TaskContextError),
    #[error("failed to write output: {0}")]
    Output(#[source] io::Error),
}

#[derive(Debug)]
struct Invocation {
    snapshot: Utf8PathBuf,
    highlight: Option<TaskId>,
}

fn main() -> Result<(), BoxError> {
    let installed = telemetry::init_tracing("warn");
    let invocation = parse_args(env::args_os().skip(1))?;
    debug!(subscriber = installed, snapshot = %invocation.snapshot, "inspecting snapshot");
    let tree = render(&invocation)?;
    let mut stdout = io::stdout().lock();
    writeln!(stdout, "{tree}").map_err(InspectError::Output)?;
    Ok(())
}

fn parse_args(
    args: impl Iterator<Item = std::ffi::OsString>,
) -> Result<Invocation, InspectError> {
    let values: Vec<String> = args
        .map(|arg| arg.into_string().map_err(|_| InspectError::NonUtf8Argument))
        .collect::<Result<_, _>>()?;
    match values.as_slice() {
        [snapshot] => Ok(Invocation {
            snapshot: Utf8PathBuf::from(snapshot),
            highlight: None,
        }),
        [snapshot, highlight] => Ok(Invocation {
            snapshot: Utf8PathBuf::from(snapshot),
            highlight: Some(TaskId::parse(highlight).map_err(InspectError::TaskId)?),
        }),
        _ => Err(InspectError::Usage),
    }
}

fn render(invocation: &Invocation) -> Result<String, InspectError> {
    let runtime = Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(InspectError::RuntimeInit)?;
    runtime.block_on(async {
        let store = TaskContextStore::new(Arc::new(InMemoryTaskStore::new()), Arc::new(DefaultClock));
        if !store.load_from_file(&invocation.snapshot, None).await? {
            return Err(InspectError::MissingSnapshot(invocation.snapshot.clone()));
        }
        let tasks = store.tasks().await?;
        info!(tasks = tasks.len(), "snapshot loaded");
        Ok(store.repr_current_context(invocation.highlight).await?)
    })
}
