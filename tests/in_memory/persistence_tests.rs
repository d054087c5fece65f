//! Snapshots written after terminal transitions, driven by configuration.

use std::collections::BTreeMap;
use std::sync::Arc;

use camino::Utf8PathBuf;
use eyre::ensure;
use rstest::{fixture, rstest};
use taskforge::config::{EngineConfig, PERSIST_PATH_VAR, PERSIST_VAR};
use taskforge::executor::services::{SingleTaskPhases, TaskManager};
use taskforge::task::domain::{TaskStatus, TaskType};
use tempfile::TempDir;

use crate::test_helpers::{ScriptedWorker, new_store, new_task, unattended_context};

struct Workspace {
    _dir: TempDir,
    snapshot: Utf8PathBuf,
}

#[fixture]
fn workspace() -> Workspace {
    let dir = TempDir::new().expect("temporary directory");
    let snapshot = Utf8PathBuf::from_path_buf(dir.path().join("storage").join("taskstore.json"))
        .expect("temporary path is UTF-8");
    Workspace {
        _dir: dir,
        snapshot,
    }
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn finished_manager_persists_the_context(workspace: Workspace) -> eyre::Result<()> {
    let env = BTreeMap::from([
        (PERSIST_VAR.to_owned(), "true".to_owned()),
        (PERSIST_PATH_VAR.to_owned(), workspace.snapshot.to_string()),
    ]);
    let config = EngineConfig::default().with_env(&env)?;
    let store = new_store();
    let task = new_task("persisted", TaskType::Task).with_outputs(["answer"]);
    store.add_task(&task).await?;
    let context = unattended_context(&store, Arc::new(ScriptedWorker::new())).with_config(&config);

    TaskManager::new(task.clone(), context, SingleTaskPhases::new())
        .run()
        .await?;

    let restored = new_store();
    ensure!(
        restored.load_from_file(&workspace.snapshot, None).await?,
        "snapshot should exist"
    );
    let reloaded = restored.get_task(task.id()).await?.expect("task restored");
    ensure!(reloaded.status() == TaskStatus::Closed, "got {:?}", reloaded.status());
    ensure!(reloaded.results().is_some(), "results should be persisted");
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn persistence_is_off_by_default(workspace: Workspace) -> eyre::Result<()> {
    let config = EngineConfig {
        persist_path: workspace.snapshot.clone(),
        ..EngineConfig::default()
    };
    let store = new_store();
    let task = new_task("transient", TaskType::Task);
    store.add_task(&task).await?;
    let context = unattended_context(&store, Arc::new(ScriptedWorker::new())).with_config(&config);

    TaskManager::new(task, context, SingleTaskPhases::new())
        .run()
        .await?;

    ensure!(!workspace.snapshot.exists(), "no snapshot expected");
    Ok(())
}
