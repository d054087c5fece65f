//! JSON snapshot of a task context: store content, graph index and board
//! reference.

use crate::task::{
    domain::{Task, TaskId},
    graph::TaskGraph,
    ports::BoardRef,
};
use camino::{Utf8Path, Utf8PathBuf};
use cap_std::ambient_authority;
use cap_std::fs_utf8::Dir;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

/// Errors raised while reading or writing snapshots.
#[derive(Debug, Error)]
pub enum SnapshotError {
    /// The snapshot path has no file name component.
    #[error("snapshot path must name a file: {0}")]
    InvalidPath(Utf8PathBuf),

    /// Filesystem access failed.
    #[error("snapshot I/O failed for {path}: {source}")]
    Io {
        /// Path being accessed.
        path: Utf8PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The document could not be encoded or decoded.
    #[error("snapshot at {path} is not valid JSON: {source}")]
    Json {
        /// Path being accessed.
        path: Utf8PathBuf,
        /// Underlying serde error.
        source: serde_json::Error,
    },
}

/// Result type for snapshot operations.
pub type SnapshotResult<T> = Result<T, SnapshotError>;

/// Serialised form of a task context.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContextSnapshot {
    /// Every stored task keyed by id.
    #[serde(default)]
    pub task_store: BTreeMap<TaskId, Task>,
    /// The structural graph index.
    #[serde(default)]
    pub task_network: TaskGraph,
    /// Reference to the mirrored board, if one was attached.
    #[serde(default)]
    pub project_board: Option<BoardRef>,
}

impl ContextSnapshot {
    /// Writes the snapshot to `path`, creating parent directories.
    ///
    /// The document is written to a temporary sibling and renamed over the
    /// target.
    ///
    /// # Errors
    ///
    /// Returns [`SnapshotError`] when encoding or any filesystem step fails.
    pub fn write(&self, path: &Utf8Path) -> SnapshotResult<()> {
        let (parent, file_name) = split_path(path)?;
        let io_err = |source: std::io::Error| SnapshotError::Io {
            path: path.to_owned(),
            source,
        };
        let encoded = serde_json::to_string_pretty(self).map_err(|source| SnapshotError::Json {
            path: path.to_owned(),
            source,
        })?;

        Dir::create_ambient_dir_all(parent, ambient_authority()).map_err(io_err)?;
        let dir = Dir::open_ambient_dir(parent, ambient_authority()).map_err(io_err)?;
        let staging = format!(".{file_name}.tmp");
        dir.write(&staging, encoded).map_err(io_err)?;
        dir.rename(&staging, &dir, file_name).map_err(io_err)?;
        Ok(())
    }

    /// Reads the snapshot at `path`, or `None` when the file does not exist.
    ///
    /// # Errors
    ///
    /// Returns [`SnapshotError`] when the file cannot be read or decoded.
    pub fn read(path: &Utf8Path) -> SnapshotResult<Option<Self>> {
        let (parent, file_name) = split_path(path)?;
        let io_err = |source: std::io::Error| SnapshotError::Io {
            path: path.to_owned(),
            source,
        };
        let dir = match Dir::open_ambient_dir(parent, ambient_authority()) {
            Ok(dir) => dir,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(io_err(err)),
        };
        let contents = match dir.read_to_string(file_name) {
            Ok(contents) => contents,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(io_err(err)),
        };
        serde_json::from_str(&contents)
            .map(Some)
            .map_err(|source| SnapshotError::Json {
                path: path.to_owned(),
                source,
            })
    }
}

fn split_path(path: &Utf8Path) -> SnapshotResult<(&Utf8Path, &str)> {
    let file_name = path
        .file_name()
        .ok_or_else(|| SnapshotError::InvalidPath(path.to_owned()))?;
    let parent = path
        .parent()
        .filter(|parent| !parent.as_str().is_empty())
        .unwrap_or_else(|| Utf8Path::new("."));
    Ok((parent, file_name))
}
