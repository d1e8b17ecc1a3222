use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use trace_model::TraceNode;

use crate::collapse::CollapseCache;
use crate::detail::{node_detail, NodeDetail};
use crate::disclosure::DisclosureState;
use crate::render::Renderer;
use crate::tree::{visible_rows, TreeAction, TreeRow, TreeState};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ViewAction {
    ToggleNode { uid: String },
    SelectNode { uid: String },
    /// Flips one value path inside one entry of the selected node
    ToggleValue { entry: usize, path: String },
}

/// View state of one trace viewing session.
///
/// Owns the raw root, its memoized display tree, the tree panel state and the
/// disclosure state of each entry of the selected node.
#[derive(Debug)]
pub struct TraceView {
    root: Arc<TraceNode>,
    display: Arc<TraceNode>,
    cache: CollapseCache,
    tree: TreeState,
    disclosures: BTreeMap<usize, DisclosureState>,
    renderer: Renderer,
}

impl TraceView {
    pub fn new(root: Arc<TraceNode>, renderer: Renderer) -> Self {
        let mut cache = CollapseCache::new();
        let display = cache.display_tree(&root);
        let tree = TreeState::initial(&display);
        Self {
            root,
            display,
            cache,
            tree,
            disclosures: BTreeMap::new(),
            renderer,
        }
    }

    pub fn root(&self) -> &Arc<TraceNode> {
        &self.root
    }

    pub fn display_tree(&self) -> &Arc<TraceNode> {
        &self.display
    }

    pub fn tree_state(&self) -> &TreeState {
        &self.tree
    }

    pub fn disclosure(&self, entry: usize) -> Option<&DisclosureState> {
        self.disclosures.get(&entry)
    }

    pub fn apply(&mut self, action: ViewAction) {
        match action {
            ViewAction::ToggleNode { uid } => {
                self.tree = self.tree.apply(TreeAction::Toggle(uid));
            }
            ViewAction::SelectNode { uid } => {
                self.tree = self.tree.apply(TreeAction::Select(uid));
                self.disclosures.clear();
            }
            ViewAction::ToggleValue { entry, path } => {
                self.disclosures.entry(entry).or_default().toggle(&path);
            }
        }
    }

    /// Swaps in a new snapshot of the trace. The collapse transform reruns only
    /// when the root reference changed; the selection survives if its uid is
    /// still present.
    pub fn reload(&mut self, root: Arc<TraceNode>) {
        if Arc::ptr_eq(&self.root, &root) {
            return;
        }
        self.display = self.cache.display_tree(&root);
        self.root = root;
        if self.display.find(&self.tree.selected).is_none() {
            tracing::debug!(uid = %self.tree.selected, "selected node gone after reload");
            self.tree = self.tree.apply(TreeAction::Select(self.display.uid.clone()));
            self.disclosures.clear();
        }
    }

    pub fn selected(&self) -> Option<&TraceNode> {
        self.tree.selected_node(&self.display)
    }

    pub fn rows(&self, now: DateTime<Utc>) -> Vec<TreeRow> {
        visible_rows(&self.display, &self.tree, now)
    }

    pub fn detail(&self) -> Option<NodeDetail> {
        self.selected()
            .map(|node| node_detail(node, &self.renderer, &self.disclosures))
    }
}
