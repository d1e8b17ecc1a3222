//! Trace tree data model
//!
//! These types are used by both:
//! - the `traceview` rendering core (pure transforms over immutable snapshots)
//! - the `trace-server` HTTP surface (JSON in and out)
//!
//! Serializable with serde for JSON over HTTP, exportable to TypeScript via ts-rs.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use ts_rs::TS;

// ============================================================================
// Errors
// ============================================================================

/// Error type for the trace document boundary
#[derive(Debug, thiserror::Error)]
pub enum TraceError {
    #[error("Failed to parse trace: {0}")]
    Parse(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, TraceError>;

// ============================================================================
// Trace Nodes
// ============================================================================

/// Lifecycle state of a node. An absent state means the node closed normally.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, TS)]
#[serde(rename_all = "lowercase")]
#[ts(export, export_to = "traceview.ts")]
pub enum NodeState {
    Open,
    Error,
    Finished,
    #[serde(other)]
    Unknown,
}

/// Short label attached to a node, optionally colored
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, TS)]
#[ts(export, export_to = "traceview.ts")]
pub struct Tag {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[ts(optional)]
    pub color: Option<String>,
}

/// Producers write tags either as bare names or as full objects
#[derive(Deserialize)]
#[serde(untagged)]
enum TagRepr {
    Name(String),
    Full(Tag),
}

impl From<TagRepr> for Tag {
    fn from(repr: TagRepr) -> Self {
        match repr {
            TagRepr::Name(name) => Tag { name, color: None },
            TagRepr::Full(tag) => tag,
        }
    }
}

fn deserialize_tags<'de, D>(deserializer: D) -> std::result::Result<Option<Vec<Tag>>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let tags = Option::<Vec<TagRepr>>::deserialize(deserializer)?;
    Ok(tags.map(|tags| tags.into_iter().map(Tag::from).collect()))
}

/// Presentation and grouping hints carried by a node
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, TS)]
#[ts(export, export_to = "traceview.ts")]
pub struct Metadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[ts(optional)]
    pub color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[ts(optional)]
    pub icon: Option<String>,
    #[serde(
        default,
        deserialize_with = "deserialize_tags",
        skip_serializing_if = "Option::is_none"
    )]
    #[ts(optional)]
    pub tags: Option<Vec<Tag>>,
    /// Label → count; aggregated over subtrees in node details
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[ts(optional)]
    pub counters: Option<BTreeMap<String, f64>>,
    /// Consecutive siblings sharing this key are merged into one group node
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[ts(optional)]
    pub collapse: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[ts(type = "unknown")]
    pub custom: Option<serde_json::Value>,
}

impl Metadata {
    pub fn is_empty(&self) -> bool {
        self == &Metadata::default()
    }
}

/// One recorded input, output or error of a node
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, TS)]
#[ts(export, export_to = "traceview.ts")]
pub struct Entry {
    /// "input", "output", "error" or any producer-defined kind
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[ts(optional)]
    pub name: Option<String>,
    /// Payload of arbitrary shape; field order is preserved
    #[serde(default)]
    #[ts(type = "unknown")]
    pub value: serde_json::Value,
}

impl Entry {
    pub fn new(kind: impl Into<String>, value: serde_json::Value) -> Self {
        Self {
            kind: kind.into(),
            name: None,
            value,
        }
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }
}

/// Node of a trace tree
///
/// Snapshots are immutable once delivered; transforms derive new trees.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, TS)]
#[ts(export, export_to = "traceview.ts")]
pub struct TraceNode {
    /// Unique across the whole tree, synthetic group nodes included
    pub uid: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[ts(optional)]
    pub kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[ts(optional)]
    pub state: Option<NodeState>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[ts(optional)]
    pub entries: Option<Vec<Entry>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[ts(optional)]
    pub meta: Option<Metadata>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[ts(optional)]
    pub children: Option<Vec<TraceNode>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[ts(optional)]
    pub start_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[ts(optional)]
    pub end_time: Option<String>,
    /// Collapse tag a synthetic group node was built for; absent on real nodes
    #[serde(
        rename = "group_node",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    #[ts(optional)]
    pub group_tag: Option<String>,
}

impl TraceNode {
    pub fn new(uid: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            uid: uid.into(),
            name: name.into(),
            kind: None,
            state: None,
            entries: None,
            meta: None,
            children: None,
            start_time: None,
            end_time: None,
            group_tag: None,
        }
    }

    pub fn from_json(raw: &str) -> Result<Self> {
        Self::from_slice(raw.as_bytes())
    }

    /// Parses a trace document of any nesting depth; the stack grows on demand
    pub fn from_slice(raw: &[u8]) -> Result<Self> {
        let mut de = serde_json::Deserializer::from_slice(raw);
        de.disable_recursion_limit();
        let node = TraceNode::deserialize(serde_stacker::Deserializer::new(&mut de))?;
        de.end()?;
        Ok(node)
    }

    pub fn with_children(mut self, children: Vec<TraceNode>) -> Self {
        self.children = Some(children);
        self
    }

    pub fn with_entries(mut self, entries: Vec<Entry>) -> Self {
        self.entries = Some(entries);
        self
    }

    pub fn with_meta(mut self, meta: Metadata) -> Self {
        self.meta = Some(meta);
        self
    }

    pub fn with_state(mut self, state: NodeState) -> Self {
        self.state = Some(state);
        self
    }

    /// Shorthand for a node carrying only a collapse tag in its metadata
    pub fn with_collapse(self, tag: impl Into<String>) -> Self {
        self.with_meta(Metadata {
            collapse: Some(tag.into()),
            ..Metadata::default()
        })
    }

    pub fn children(&self) -> &[TraceNode] {
        self.children.as_deref().unwrap_or_default()
    }

    pub fn entries(&self) -> &[Entry] {
        self.entries.as_deref().unwrap_or_default()
    }

    pub fn collapse_tag(&self) -> Option<&str> {
        self.meta.as_ref().and_then(|m| m.collapse.as_deref())
    }

    pub fn icon(&self) -> Option<&str> {
        self.meta.as_ref().and_then(|m| m.icon.as_deref())
    }

    pub fn counters(&self) -> Option<&BTreeMap<String, f64>> {
        self.meta.as_ref().and_then(|m| m.counters.as_ref())
    }

    pub fn is_open(&self) -> bool {
        self.state == Some(NodeState::Open)
    }

    pub fn is_error(&self) -> bool {
        self.state == Some(NodeState::Error)
    }

    pub fn is_group(&self) -> bool {
        self.group_tag.is_some()
    }

    /// Pre-order traversal of this node and all descendants
    pub fn walk(&self) -> Walk<'_> {
        Walk { stack: vec![self] }
    }

    /// Depth-first lookup by uid
    pub fn find(&self, uid: &str) -> Option<&TraceNode> {
        self.walk().find(|node| node.uid == uid)
    }
}

/// Pre-order iterator returned by [`TraceNode::walk`]
pub struct Walk<'a> {
    stack: Vec<&'a TraceNode>,
}

impl<'a> Iterator for Walk<'a> {
    type Item = &'a TraceNode;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.stack.pop()?;
        self.stack.extend(node.children().iter().rev());
        Some(node)
    }
}

// ============================================================================
// Trace Summaries
// ============================================================================

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, TS)]
#[serde(rename_all = "lowercase")]
#[ts(export, export_to = "traceview.ts")]
pub enum SummaryState {
    Open,
    Finished,
    Error,
}

impl From<Option<NodeState>> for SummaryState {
    fn from(state: Option<NodeState>) -> Self {
        match state {
            Some(NodeState::Open) => SummaryState::Open,
            Some(NodeState::Error) => SummaryState::Error,
            _ => SummaryState::Finished,
        }
    }
}

/// One row of the trace listing
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, TS)]
#[ts(export, export_to = "traceview.ts")]
pub struct TraceSummary {
    /// File stem the trace was read from
    pub storage_id: String,
    pub uid: String,
    pub name: String,
    pub state: SummaryState,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
}

impl TraceSummary {
    pub fn from_node(storage_id: impl Into<String>, node: &TraceNode) -> Self {
        let state = SummaryState::from(node.state);
        Self {
            storage_id: storage_id.into(),
            uid: node.uid.clone(),
            name: node.name.clone(),
            state,
            start_time: node.start_time.clone(),
            end_time: match state {
                SummaryState::Open => None,
                _ => node.end_time.clone(),
            },
        }
    }

    pub fn is_open(&self) -> bool {
        self.state == SummaryState::Open
    }
}
