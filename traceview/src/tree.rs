//! Open/selected state of the trace tree panel

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use trace_model::{NodeState, TraceNode};

use crate::time::{human_readable_duration, node_duration};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", content = "uid", rename_all = "snake_case")]
pub enum TreeAction {
    Toggle(String),
    Open(String),
    Close(String),
    Select(String),
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeState {
    pub opened: BTreeSet<String>,
    pub selected: String,
}

impl TreeState {
    /// Opens the chain of single-child nodes below `root` and the node ending
    /// it, so the first branching point is visible. `root` is selected.
    pub fn initial(root: &TraceNode) -> Self {
        let mut opened = BTreeSet::new();
        let mut node = root;
        while let [only] = node.children() {
            opened.insert(node.uid.clone());
            node = only;
        }
        opened.insert(node.uid.clone());
        Self {
            opened,
            selected: root.uid.clone(),
        }
    }

    pub fn apply(&self, action: TreeAction) -> Self {
        let mut next = self.clone();
        match action {
            TreeAction::Toggle(uid) => {
                if !next.opened.remove(&uid) {
                    next.opened.insert(uid);
                }
            }
            TreeAction::Open(uid) => {
                next.opened.insert(uid);
            }
            TreeAction::Close(uid) => {
                next.opened.remove(&uid);
            }
            TreeAction::Select(uid) => next.selected = uid,
        }
        next
    }

    pub fn is_opened(&self, uid: &str) -> bool {
        self.opened.contains(uid)
    }

    pub fn selected_node<'a>(&self, root: &'a TraceNode) -> Option<&'a TraceNode> {
        root.find(&self.selected)
    }
}

/// One line of the flattened tree panel
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct TreeRow {
    pub uid: String,
    pub name: String,
    pub depth: usize,
    pub state: Option<NodeState>,
    pub icon: Option<String>,
    pub child_count: usize,
    pub group: bool,
    pub opened: bool,
    pub selected: bool,
    pub duration: Option<String>,
}

/// Flattens the display tree into the rows currently visible
pub fn visible_rows(root: &TraceNode, state: &TreeState, now: DateTime<Utc>) -> Vec<TreeRow> {
    let mut rows = Vec::new();
    let mut stack = vec![(root, 0usize)];
    while let Some((node, depth)) = stack.pop() {
        let opened = state.is_opened(&node.uid);
        rows.push(TreeRow {
            uid: node.uid.clone(),
            name: node.name.clone(),
            depth,
            state: node.state,
            icon: node.icon().map(String::from),
            child_count: node.children().len(),
            group: node.is_group(),
            opened,
            selected: node.uid == state.selected,
            duration: node_duration(node, now).map(human_readable_duration),
        });
        if opened {
            stack.extend(node.children().iter().rev().map(|child| (child, depth + 1)));
        }
    }
    rows
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chain() -> TraceNode {
        TraceNode::new("r", "root").with_children(vec![TraceNode::new("a", "a").with_children(
            vec![
                TraceNode::new("b1", "b1").with_children(vec![TraceNode::new("c", "c")]),
                TraceNode::new("b2", "b2"),
            ],
        )])
    }

    #[test]
    fn test_initial_follows_single_child_chain() {
        let state = TreeState::initial(&chain());
        let opened: Vec<&str> = state.opened.iter().map(String::as_str).collect();
        assert_eq!(opened, vec!["a", "r"]);
        assert_eq!(state.selected, "r");
    }

    #[test]
    fn test_initial_opens_leaf_root() {
        let state = TreeState::initial(&TraceNode::new("solo", "solo"));
        assert!(state.is_opened("solo"));
    }

    #[test]
    fn test_reducer_is_pure() {
        let state = TreeState::initial(&chain());
        let toggled = state.apply(TreeAction::Toggle("b1".into()));
        assert!(toggled.is_opened("b1"));
        assert!(!state.is_opened("b1"));
        assert_eq!(toggled.apply(TreeAction::Toggle("b1".into())), state);

        let closed = state.apply(TreeAction::Close("a".into()));
        assert!(!closed.is_opened("a"));
        assert_eq!(closed.apply(TreeAction::Open("a".into())), state);

        let selected = state.apply(TreeAction::Select("c".into()));
        assert_eq!(
            selected.selected_node(&chain()).map(|n| n.name.as_str()),
            Some("c")
        );
    }

    #[test]
    fn test_visible_rows_honor_opened_set() {
        let root = chain();
        let state = TreeState::initial(&root);
        let now = Utc::now();
        let rows = visible_rows(&root, &state, now);
        let shown: Vec<(&str, usize)> = rows.iter().map(|r| (r.uid.as_str(), r.depth)).collect();
        assert_eq!(shown, vec![("r", 0), ("a", 1), ("b1", 2), ("b2", 2)]);
        assert!(rows[0].selected);
        assert_eq!(rows[2].child_count, 1);

        let rows = visible_rows(&root, &state.apply(TreeAction::Open("b1".into())), now);
        assert_eq!(rows.len(), 5);
        assert_eq!(rows[3].uid, "c");
    }

    #[test]
    fn test_action_wire_format() {
        let action: TreeAction =
            serde_json::from_str(r#"{"action": "select", "uid": "n1"}"#).unwrap();
        assert_eq!(action, TreeAction::Select("n1".into()));
    }
}
