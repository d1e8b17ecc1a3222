//! Detail panel of a selected node

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use trace_model::{Entry, NodeState, TraceNode};

use crate::disclosure::DisclosureState;
use crate::render::{RenderResult, Renderer};

// ── Types ────────────────────────────────────────────────────────────────────

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    Input,
    Output,
    Error,
    Other,
}

impl EntryKind {
    pub fn from_kind(kind: &str) -> Self {
        match kind {
            "input" => EntryKind::Input,
            "output" => EntryKind::Output,
            "error" => EntryKind::Error,
            _ => EntryKind::Other,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Counter {
    pub label: String,
    pub value: f64,
    /// `"<label>: <value>"`
    pub display: String,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct EntryView {
    pub index: usize,
    pub kind: EntryKind,
    /// Entry kind with its first letter capitalized
    pub title: String,
    pub name: Option<String>,
    pub body: RenderResult,
    pub copy_text: String,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct NodeDetail {
    pub uid: String,
    pub name: String,
    pub state: Option<NodeState>,
    pub icon: Option<String>,
    pub counters: Vec<Counter>,
    pub entries: Vec<EntryView>,
}

// ── Assembly ─────────────────────────────────────────────────────────────────

/// Builds the detail of `node`. Each entry is budgeted on its own, using the
/// disclosure state stored under its index (collapsed when absent).
pub fn node_detail(
    node: &TraceNode,
    renderer: &Renderer,
    disclosures: &BTreeMap<usize, DisclosureState>,
) -> NodeDetail {
    let collapsed = DisclosureState::new();
    let entries = node
        .entries()
        .iter()
        .enumerate()
        .map(|(index, entry)| {
            let state = disclosures.get(&index).unwrap_or(&collapsed);
            entry_view(index, entry, renderer, state)
        })
        .collect();

    let counters = collect_counters(node)
        .into_iter()
        .map(|(label, value)| Counter {
            display: format!("{label}: {}", format_count(value)),
            label,
            value,
        })
        .collect();

    NodeDetail {
        uid: node.uid.clone(),
        name: node.name.clone(),
        state: node.state,
        icon: node.icon().map(String::from),
        counters,
        entries,
    }
}

fn entry_view(
    index: usize,
    entry: &Entry,
    renderer: &Renderer,
    state: &DisclosureState,
) -> EntryView {
    EntryView {
        index,
        kind: EntryKind::from_kind(&entry.kind),
        title: capitalize(&entry.kind),
        name: entry.name.clone(),
        body: renderer.render_with(&entry.value, state),
        copy_text: data_to_text(&entry.value),
    }
}

/// Sums counters per label over `node` and all its descendants
pub fn collect_counters(node: &TraceNode) -> BTreeMap<String, f64> {
    let mut totals = BTreeMap::new();
    for counters in node.walk().filter_map(TraceNode::counters) {
        for (label, value) in counters {
            *totals.entry(label.clone()).or_insert(0.0) += value;
        }
    }
    totals
}

/// Plain-text form of a value for copying
pub fn data_to_text(value: &Value) -> String {
    match value {
        Value::Null => "None".to_string(),
        Value::Bool(flag) => flag.to_string(),
        Value::Number(number) => number.to_string(),
        Value::String(text) => text.clone(),
        Value::Array(_) | Value::Object(_) => {
            serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
        }
    }
}

/// Whole counts print without a fractional part
fn format_count(value: f64) -> String {
    if value.is_finite() && value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        value.to_string()
    }
}

fn capitalize(kind: &str) -> String {
    let mut chars = kind.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use trace_model::Metadata;

    fn counted(uid: &str, counters: &[(&str, f64)]) -> TraceNode {
        TraceNode::new(uid, uid).with_meta(Metadata {
            counters: Some(
                counters
                    .iter()
                    .map(|(label, value)| (label.to_string(), *value))
                    .collect(),
            ),
            ..Metadata::default()
        })
    }

    #[test]
    fn test_counters_sum_over_subtree() {
        let root = counted("r", &[("tokens", 10.0)]).with_children(vec![
            counted("a", &[("tokens", 5.0), ("calls", 1.0)]),
            TraceNode::new("b", "b").with_children(vec![counted("c", &[("calls", 2.5)])]),
        ]);
        let totals = collect_counters(&root);
        assert_eq!(totals.get("tokens"), Some(&15.0));
        assert_eq!(totals.get("calls"), Some(&3.5));

        let detail = node_detail(&root, &Renderer::default(), &BTreeMap::new());
        let shown: Vec<&str> = detail.counters.iter().map(|c| c.display.as_str()).collect();
        assert_eq!(shown, vec!["calls: 3.5", "tokens: 15"]);
    }

    #[test]
    fn test_entry_views() {
        let node = TraceNode::new("n", "call").with_entries(vec![
            Entry::new("input", json!({"x": 1})).named("args"),
            Entry::new("error", json!("boom")),
            Entry::new("log", Value::Null),
        ]);
        let detail = node_detail(&node, &Renderer::default(), &BTreeMap::new());
        assert!(detail.counters.is_empty());

        let kinds: Vec<EntryKind> = detail.entries.iter().map(|e| e.kind).collect();
        assert_eq!(kinds, vec![EntryKind::Input, EntryKind::Error, EntryKind::Other]);
        let titles: Vec<&str> = detail.entries.iter().map(|e| e.title.as_str()).collect();
        assert_eq!(titles, vec!["Input", "Error", "Log"]);
        assert_eq!(detail.entries[0].name.as_deref(), Some("args"));
        assert_eq!(detail.entries[0].copy_text, "{\n  \"x\": 1\n}");
        assert_eq!(detail.entries[1].copy_text, "boom");
        assert_eq!(detail.entries[2].copy_text, "None");
        assert_eq!(detail.entries[2].body, RenderResult::Null);
    }

    #[test]
    fn test_entries_use_their_own_disclosure() {
        let long = (0..30).map(|i| format!("line {i}")).collect::<Vec<_>>().join("\n");
        let node = TraceNode::new("n", "call").with_entries(vec![
            Entry::new("input", json!(long)),
            Entry::new("output", json!(long)),
        ]);
        let disclosures = BTreeMap::from([(1, DisclosureState::root_expanded())]);
        let detail = node_detail(&node, &Renderer::default(), &disclosures);
        match (&detail.entries[0].body, &detail.entries[1].body) {
            (RenderResult::Text(collapsed), RenderResult::Text(expanded)) => {
                assert_eq!(collapsed.lines.len(), 10);
                assert_eq!(expanded.lines.len(), 30);
            }
            other => panic!("expected text bodies, got {other:?}"),
        }
    }

    #[test]
    fn test_data_to_text_scalars() {
        assert_eq!(data_to_text(&json!(true)), "true");
        assert_eq!(data_to_text(&json!(2.5)), "2.5");
        assert_eq!(data_to_text(&json!([])), "[]");
    }
}
