//! Resource pool shared between the managers of one execution.

use crate::task::domain::{Task, TaskResults};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Pool key holding accumulated feedback text.
pub const FEEDBACK_KEY: &str = "feedback";

/// Key-value accumulation of task outputs and feedback.
///
/// Closed tasks only ever add keys, so a task whose inputs are satisfied
/// stays satisfied for the rest of a pipeline run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResourcePool(BTreeMap<String, Value>);

impl ResourcePool {
    /// Creates an empty pool.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the value stored under `key`.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Returns whether `key` is present.
    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    /// Stores `value` under `key`, replacing any previous value.
    pub fn insert(&mut self, key: impl Into<String>, value: Value) {
        self.0.insert(key.into(), value);
    }

    /// Builder form of [`Self::insert`].
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: Value) -> Self {
        self.insert(key, value);
        self
    }

    /// Merges the results of a closed task into the pool.
    pub fn merge(&mut self, results: &TaskResults) {
        self.0
            .extend(results.iter().map(|(key, value)| (key.clone(), value.clone())));
    }

    /// Returns whether every declared input of `task` is available.
    ///
    /// A task without inputs is always ready.
    #[must_use]
    pub fn satisfies(&self, task: &Task) -> bool {
        task.inputs().iter().all(|input| self.contains(input))
    }

    /// Returns the entries whose keys are listed in `keys`.
    #[must_use]
    pub fn subset(&self, keys: &[String]) -> BTreeMap<String, Value> {
        keys.iter()
            .filter_map(|key| self.0.get(key).map(|value| (key.clone(), value.clone())))
            .collect()
    }

    /// Returns the accumulated feedback text.
    #[must_use]
    pub fn feedback(&self) -> Option<&str> {
        self.0.get(FEEDBACK_KEY).and_then(Value::as_str)
    }

    /// Replaces the feedback text.
    pub fn set_feedback(&mut self, feedback: impl Into<String>) {
        self.0
            .insert(FEEDBACK_KEY.to_owned(), Value::String(feedback.into()));
    }

    /// Appends `text` to the feedback on a new line.
    pub fn append_feedback(&mut self, text: &str) {
        let combined = match self.feedback() {
            Some(existing) if !existing.is_empty() => format!("{existing}\n{text}"),
            _ => text.to_owned(),
        };
        self.set_feedback(combined);
    }

    /// Returns a copy of the pool without the feedback entry.
    #[must_use]
    pub fn without_feedback(&self) -> Self {
        let mut copy = self.clone();
        copy.0.remove(FEEDBACK_KEY);
        copy
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns whether the pool is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterates over the entries in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }
}

impl From<BTreeMap<String, Value>> for ResourcePool {
    fn from(entries: BTreeMap<String, Value>) -> Self {
        Self(entries)
    }
}

impl FromIterator<(String, Value)> for ResourcePool {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}
