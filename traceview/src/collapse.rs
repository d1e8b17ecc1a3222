//! Run-length grouping of sibling nodes
//!
//! Consecutive siblings sharing a `meta.collapse` tag are merged into a
//! synthetic group node named `"<count> <tag>"`. The transform is post-order
//! and pure: it returns a new tree and leaves the input untouched.

use std::collections::HashSet;
use std::sync::Arc;

use trace_model::{Metadata, TraceNode};

/// Derives the display tree of `root`
pub fn collapse(root: &TraceNode) -> TraceNode {
    let mut ids = UidRegistry::from_tree(root);
    collapse_node(root, &mut ids)
}

// ── Synthetic ids ────────────────────────────────────────────────────────────

/// Every uid in the tree, real or minted, so new ids never collide
struct UidRegistry {
    taken: HashSet<String>,
}

impl UidRegistry {
    fn from_tree(root: &TraceNode) -> Self {
        Self {
            taken: root.walk().map(|node| node.uid.clone()).collect(),
        }
    }

    /// `<parent>:group-<n>` with `n` increasing per parent
    fn mint(&mut self, parent_uid: &str, seq: &mut usize) -> String {
        loop {
            *seq += 1;
            let candidate = format!("{parent_uid}:group-{seq}");
            if self.taken.insert(candidate.clone()) {
                return candidate;
            }
        }
    }
}

// ── Fold ─────────────────────────────────────────────────────────────────────

/// The run currently open at the end of the output sequence
enum Pending {
    Single(TraceNode),
    Group {
        uid: String,
        tag: String,
        icon: Option<String>,
        members: Vec<TraceNode>,
    },
}

impl Pending {
    fn into_node(self, parent_uid: &str) -> TraceNode {
        match self {
            Pending::Single(node) => node,
            Pending::Group {
                uid,
                tag,
                icon,
                members,
            } => {
                tracing::debug!(
                    parent = parent_uid,
                    group = %uid,
                    tag = %tag,
                    members = members.len(),
                    "collapsed sibling run"
                );
                group_node(uid, tag, icon, members)
            }
        }
    }
}

fn group_node(
    uid: String,
    tag: String,
    icon: Option<String>,
    members: Vec<TraceNode>,
) -> TraceNode {
    let mut node = TraceNode::new(uid, format!("{} {tag}", members.len()));
    node.meta = icon.map(|icon| Metadata {
        icon: Some(icon),
        ..Metadata::default()
    });
    node.children = Some(members);
    node.group_tag = Some(tag);
    node
}

fn same_run(prev: &TraceNode, next: &TraceNode) -> bool {
    matches!((prev.collapse_tag(), next.collapse_tag()), (Some(a), Some(b)) if a == b)
}

fn collapse_node(node: &TraceNode, ids: &mut UidRegistry) -> TraceNode {
    let Some(children) = node.children.as_ref() else {
        return node.clone();
    };

    let mut seq = 0usize;
    let mut out = Vec::with_capacity(children.len());
    let mut pending: Option<Pending> = None;

    for child in children {
        let child = collapse_node(child, ids);
        pending = Some(match pending.take() {
            Some(Pending::Single(prev)) if same_run(&prev, &child) => Pending::Group {
                uid: ids.mint(&node.uid, &mut seq),
                tag: prev.collapse_tag().unwrap_or_default().to_string(),
                icon: prev.icon().map(ToString::to_string),
                members: vec![prev, child],
            },
            // Compared against the group's tag, which is also the tag of its last
            // member; a mismatch seals the group.
            Some(Pending::Group {
                uid,
                tag,
                icon,
                mut members,
            }) if child.collapse_tag() == Some(tag.as_str()) => {
                members.push(child);
                Pending::Group {
                    uid,
                    tag,
                    icon,
                    members,
                }
            }
            other => {
                if let Some(run) = other {
                    out.push(run.into_node(&node.uid));
                }
                Pending::Single(child)
            }
        });
    }
    if let Some(run) = pending {
        out.push(run.into_node(&node.uid));
    }

    TraceNode {
        uid: node.uid.clone(),
        name: node.name.clone(),
        kind: node.kind.clone(),
        state: node.state,
        entries: node.entries.clone(),
        meta: node.meta.clone(),
        children: Some(out),
        start_time: node.start_time.clone(),
        end_time: node.end_time.clone(),
        group_tag: node.group_tag.clone(),
    }
}

// ── Memoization ──────────────────────────────────────────────────────────────

/// Remembers the display tree of the last root, keyed on the root's identity
#[derive(Debug, Clone, Default)]
pub struct CollapseCache {
    entry: Option<(Arc<TraceNode>, Arc<TraceNode>)>,
}

impl CollapseCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn display_tree(&mut self, root: &Arc<TraceNode>) -> Arc<TraceNode> {
        if let Some(display) = self.get(root) {
            return display;
        }
        let display = Arc::new(collapse(root));
        self.insert(root, Arc::clone(&display));
        display
    }

    /// Cached display tree, if it was derived from this very root
    pub fn get(&self, root: &Arc<TraceNode>) -> Option<Arc<TraceNode>> {
        match &self.entry {
            Some((raw, display)) if Arc::ptr_eq(raw, root) => Some(Arc::clone(display)),
            _ => None,
        }
    }

    /// Records a display tree computed elsewhere, replacing any earlier entry
    pub fn insert(&mut self, root: &Arc<TraceNode>, display: Arc<TraceNode>) {
        self.entry = Some((Arc::clone(root), display));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn leaf(uid: &str, tag: Option<&str>) -> TraceNode {
        let node = TraceNode::new(uid, format!("node {uid}"));
        match tag {
            Some(tag) => node.with_collapse(tag),
            None => node,
        }
    }

    fn names(node: &TraceNode) -> Vec<&str> {
        node.children().iter().map(|c| c.name.as_str()).collect()
    }

    #[test]
    fn test_run_length_only() {
        let root = TraceNode::new("r", "root").with_children(vec![
            leaf("1", Some("A")),
            leaf("2", Some("A")),
            leaf("3", Some("B")),
            leaf("4", Some("A")),
        ]);
        let out = collapse(&root);
        assert_eq!(names(&out), vec!["2 A", "node 3", "node 4"]);
        let group = &out.children()[0];
        assert_eq!(group.group_tag.as_deref(), Some("A"));
        assert_eq!(group.uid, "r:group-1");
        let members: Vec<&str> = group.children().iter().map(|c| c.uid.as_str()).collect();
        assert_eq!(members, vec!["1", "2"]);
    }

    #[test]
    fn test_long_run_keeps_every_member() {
        let root = TraceNode::new("r", "root").with_children(
            (1..=5).map(|i| leaf(&i.to_string(), Some("q"))).collect(),
        );
        let out = collapse(&root);
        assert_eq!(names(&out), vec!["5 q"]);
        assert_eq!(out.children()[0].children().len(), 5);
    }

    #[test]
    fn test_untagged_nodes_never_merge() {
        let root = TraceNode::new("r", "root")
            .with_children(vec![leaf("1", None), leaf("2", None), leaf("3", Some("A"))]);
        let out = collapse(&root);
        assert_eq!(out, collapse(&root));
        assert_eq!(names(&out), vec!["node 1", "node 2", "node 3"]);
    }

    #[test]
    fn test_mismatch_seals_group() {
        let root = TraceNode::new("r", "root").with_children(vec![
            leaf("1", Some("A")),
            leaf("2", Some("A")),
            leaf("3", Some("A")),
            leaf("4", Some("B")),
            leaf("5", Some("B")),
        ]);
        let out = collapse(&root);
        assert_eq!(names(&out), vec!["3 A", "2 B"]);
        assert_eq!(out.children()[1].uid, "r:group-2");
    }

    #[test]
    fn test_group_carries_first_icon() {
        let mut first = leaf("1", Some("A"));
        first.meta.as_mut().unwrap().icon = Some("query".to_string());
        let root =
            TraceNode::new("r", "root").with_children(vec![first, leaf("2", Some("A"))]);
        let out = collapse(&root);
        assert_eq!(out.children()[0].icon(), Some("query"));
        assert_eq!(out.children()[0].collapse_tag(), None);
    }

    #[test]
    fn test_post_order_collapses_grandchildren() {
        let root = TraceNode::new("r", "root").with_children(vec![TraceNode::new("p", "parent")
            .with_children(vec![leaf("1", Some("A")), leaf("2", Some("A"))])]);
        let out = collapse(&root);
        let parent = &out.children()[0];
        assert_eq!(names(parent), vec!["2 A"]);
        assert_eq!(parent.children()[0].uid, "p:group-1");
    }

    #[test]
    fn test_minted_ids_avoid_real_ids() {
        let root = TraceNode::new("r", "root").with_children(vec![
            leaf("r:group-1", None),
            leaf("1", Some("A")),
            leaf("2", Some("A")),
        ]);
        let out = collapse(&root);
        assert_eq!(out.children()[1].uid, "r:group-2");
        let mut uids: Vec<&str> = out.walk().map(|n| n.uid.as_str()).collect();
        let total = uids.len();
        uids.sort_unstable();
        uids.dedup();
        assert_eq!(uids.len(), total);
    }

    #[test]
    fn test_input_is_untouched() {
        let root = TraceNode::new("r", "root")
            .with_children(vec![leaf("1", Some("A")), leaf("2", Some("A"))]);
        let before = root.clone();
        let _ = collapse(&root);
        assert_eq!(root, before);
    }

    #[test]
    fn test_absent_children_stay_absent() {
        let root = leaf("solo", Some("A"));
        assert_eq!(collapse(&root), root);
    }

    #[test]
    fn test_cache_hits_on_same_root() {
        let root = Arc::new(
            TraceNode::new("r", "root")
                .with_children(vec![leaf("1", Some("A")), leaf("2", Some("A"))]),
        );
        let mut cache = CollapseCache::new();
        let first = cache.display_tree(&root);
        let second = cache.display_tree(&root);
        assert!(Arc::ptr_eq(&first, &second));

        let reloaded = Arc::new((*root).clone());
        let third = cache.display_tree(&reloaded);
        assert!(!Arc::ptr_eq(&first, &third));
        assert_eq!(first, third);
    }

    #[test]
    fn test_cache_get_and_insert() {
        let root = Arc::new(
            TraceNode::new("r", "root")
                .with_children(vec![leaf("1", Some("A")), leaf("2", Some("A"))]),
        );
        let mut cache = CollapseCache::new();
        assert!(cache.get(&root).is_none());

        let display = Arc::new(collapse(&root));
        cache.insert(&root, Arc::clone(&display));
        assert!(Arc::ptr_eq(&cache.get(&root).unwrap(), &display));
        assert!(Arc::ptr_eq(&cache.display_tree(&root), &display));

        let other = Arc::new((*root).clone());
        assert!(cache.get(&other).is_none());
    }
}
