use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::value::FieldKey;

/// Path of the value an entry renders at the top level
pub const ROOT_PATH: &str = "";

/// Disclosure path of a nested value, JSON Pointer style (`/a/0/b`)
pub fn child_path(parent: &str, key: &FieldKey) -> String {
    format!("{parent}/{}", key.path_segment())
}

/// Caller-owned set of expanded value paths within one rendered value tree.
///
/// Every path toggles independently; flipping one never changes how siblings
/// or ancestors render.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DisclosureState {
    expanded: BTreeSet<String>,
}

impl DisclosureState {
    pub fn new() -> Self {
        Self::default()
    }

    /// State with only the top-level value expanded
    pub fn root_expanded() -> Self {
        Self::from_paths([ROOT_PATH])
    }

    pub fn from_paths<I, S>(paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            expanded: paths.into_iter().map(Into::into).collect(),
        }
    }

    pub fn is_expanded(&self, path: &str) -> bool {
        self.expanded.contains(path)
    }

    pub fn toggle(&mut self, path: &str) {
        if !self.expanded.remove(path) {
            self.expanded.insert(path.to_string());
        }
    }

    /// Copy of this state with one path flipped
    pub fn toggled(&self, path: &str) -> Self {
        let mut next = self.clone();
        next.toggle(path);
        next
    }

    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.expanded.iter().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.expanded.is_empty()
    }
}
