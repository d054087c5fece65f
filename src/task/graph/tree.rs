//! Box-drawing list rendering of the task forest.

use super::TaskGraph;
use crate::task::domain::TaskId;
use std::collections::BTreeSet;

const HIGHLIGHT: &str = " <<<<<<<<";

pub(super) fn render(
    graph: &TaskGraph,
    highlight: Option<TaskId>,
    label: &dyn Fn(TaskId) -> String,
) -> String {
    let mut lines = vec!["┐".to_owned()];
    let mut seen = BTreeSet::new();
    let roots = graph.root_ids();
    let last = roots.len().saturating_sub(1);
    for (position, root) in roots.into_iter().enumerate() {
        let (branch, indent) = connectors(position == last);
        lines.push(format!("{branch}{}", node_label(root, highlight, label)));
        seen.insert(root);
        render_children(graph, root, indent, highlight, label, &mut seen, &mut lines);
    }
    lines.join("\n")
}

fn render_children(
    graph: &TaskGraph,
    node: TaskId,
    prefix: &str,
    highlight: Option<TaskId>,
    label: &dyn Fn(TaskId) -> String,
    seen: &mut BTreeSet<TaskId>,
    lines: &mut Vec<String>,
) {
    let children = graph.get_children(node).unwrap_or_default();
    let last = children.len().saturating_sub(1);
    for (position, child) in children.iter().enumerate() {
        let (branch, indent) = connectors(position == last);
        if !seen.insert(*child) {
            lines.push(format!("{prefix}{branch}{} (repeated)", label(*child)));
            continue;
        }
        lines.push(format!(
            "{prefix}{branch}{}",
            node_label(*child, highlight, label)
        ));
        let nested = format!("{prefix}{indent}");
        render_children(graph, *child, &nested, highlight, label, seen, lines);
    }
}

const fn connectors(is_last: bool) -> (&'static str, &'static str) {
    if is_last {
        ("└──", "   ")
    } else {
        ("├──", "│  ")
    }
}

fn node_label(id: TaskId, highlight: Option<TaskId>, label: &dyn Fn(TaskId) -> String) -> String {
    let text = label(id);
    if highlight == Some(id) {
        format!("{text}{HIGHLIGHT}")
    } else {
        text
    }
}
