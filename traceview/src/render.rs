//! Complexity-bounded rendering of dynamic values
//!
//! Each value is classified once and rendered into a [`RenderResult`] tree.
//! Records and sequences withhold trailing fields once their accumulated cost
//! exceeds the budget; texts show a bounded number of clipped lines. Every
//! nested value applies the same policy with its own disclosure flag and its own
//! budget, so expanding one value never changes the rendering of another.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::complexity::cost;
use crate::disclosure::{child_path, DisclosureState, ROOT_PATH};
use crate::value::{DataValue, FieldKey, TracebackFrame};

// ── Constants ────────────────────────────────────────────────────────────────

pub const DEFAULT_TEXT_MAX_LINES: usize = 10;
pub const DEFAULT_TEXT_MAX_LINE_CHARS: usize = 120;
pub const DEFAULT_COMPLEXITY_BUDGET: usize = 20;
pub const DEFAULT_MAX_DEPTH: usize = 64;

/// Appended to a line clipped in the collapsed text view
pub const TRUNCATION_MARKER: &str = "…";

// ── Configuration ────────────────────────────────────────────────────────────

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderConfig {
    /// Lines shown by a collapsed text
    pub text_max_lines: usize,
    /// Characters shown per line by a collapsed text
    pub text_max_line_chars: usize,
    /// Cost after which further record fields are withheld
    pub complexity_budget: usize,
    /// Nesting depth beyond which values are not rendered
    pub max_depth: usize,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            text_max_lines: DEFAULT_TEXT_MAX_LINES,
            text_max_line_chars: DEFAULT_TEXT_MAX_LINE_CHARS,
            complexity_budget: DEFAULT_COMPLEXITY_BUDGET,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

// ── Render results ───────────────────────────────────────────────────────────

/// Disclosure affordance attached to a text or record view
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Toggle {
    ShowRemainingCharacters { count: usize },
    HideText,
    ShowRemainingItems { count: usize },
    HideItems,
}

impl Toggle {
    pub fn label(&self) -> String {
        match self {
            Toggle::ShowRemainingCharacters { count } => {
                format!("show remaining {count} characters")
            }
            Toggle::HideText => "hide text".to_string(),
            Toggle::ShowRemainingItems { count } => format!("show remaining {count} items"),
            Toggle::HideItems => "hide items".to_string(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextLine {
    pub text: String,
    pub clipped: bool,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextView {
    /// Disclosure path to toggle
    pub path: String,
    pub lines: Vec<TextLine>,
    pub toggle: Option<Toggle>,
}

impl TextView {
    /// Shown text with lines joined back together
    pub fn joined(&self) -> String {
        self.lines
            .iter()
            .map(|line| line.text.as_str())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FieldView {
    pub key: FieldKey,
    pub value: RenderResult,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RecordView {
    /// Disclosure path to toggle
    pub path: String,
    /// Items of a sequence rather than named fields
    pub sequence: bool,
    pub fields: Vec<FieldView>,
    pub toggle: Option<Toggle>,
}

impl RecordView {
    pub fn withheld(&self) -> usize {
        match self.toggle {
            Some(Toggle::ShowRemainingItems { count }) => count,
            _ => 0,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RenderResult {
    Null,
    Bool { value: bool },
    Number { value: String },
    Text(TextView),
    Image { mime_type: String, src: String },
    Markup { html: String },
    Traceback { frames: Vec<TracebackFrame> },
    InvalidTraceback,
    Record(RecordView),
    DepthLimit { cost: usize },
}

// ── Renderer ─────────────────────────────────────────────────────────────────

/// Renders a value with the default configuration
pub fn render(value: &Value, expanded: bool) -> RenderResult {
    Renderer::default().render(value, expanded)
}

#[derive(Clone, Debug, Default)]
pub struct Renderer {
    config: RenderConfig,
}

impl Renderer {
    pub fn new(config: RenderConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RenderConfig {
        &self.config
    }

    /// `expanded` applies to the top-level value only; nested values start collapsed
    pub fn render(&self, value: &Value, expanded: bool) -> RenderResult {
        let state = if expanded {
            DisclosureState::root_expanded()
        } else {
            DisclosureState::new()
        };
        self.render_with(value, &state)
    }

    pub fn render_with(&self, value: &Value, state: &DisclosureState) -> RenderResult {
        self.render_at(value, ROOT_PATH, 0, state)
    }

    fn render_at(
        &self,
        value: &Value,
        path: &str,
        depth: usize,
        state: &DisclosureState,
    ) -> RenderResult {
        if depth > self.config.max_depth {
            tracing::trace!(path, depth, "value nested beyond render depth ceiling");
            return RenderResult::DepthLimit { cost: cost(value) };
        }

        match DataValue::classify(value) {
            DataValue::Null => RenderResult::Null,
            DataValue::Bool(value) => RenderResult::Bool { value },
            DataValue::Number(number) => RenderResult::Number {
                value: number.to_string(),
            },
            DataValue::Text(text) => {
                RenderResult::Text(self.render_text(text, path, state.is_expanded(path)))
            }
            DataValue::Blob { mime_type, data } => RenderResult::Image {
                mime_type: mime_type.to_string(),
                src: format!("data:{mime_type};base64,{}", data.trim()),
            },
            DataValue::Markup(html) => RenderResult::Markup {
                html: html.to_string(),
            },
            DataValue::Stack(Some(frames)) => RenderResult::Traceback { frames },
            DataValue::Stack(None) => RenderResult::InvalidTraceback,
            DataValue::Record(fields) => {
                RenderResult::Record(self.render_fields(fields, false, path, depth, state))
            }
            DataValue::Sequence(items) => {
                let fields = items
                    .iter()
                    .enumerate()
                    .map(|(idx, item)| (FieldKey::Index(idx), item))
                    .collect();
                RenderResult::Record(self.render_fields(fields, true, path, depth, state))
            }
        }
    }

    fn render_text(&self, text: &str, path: &str, expanded: bool) -> TextView {
        let max_lines = self.config.text_max_lines;
        let max_chars = self.config.text_max_line_chars;

        let mut lines = Vec::new();
        let mut remaining = 0usize;
        for (idx, line) in text.split('\n').enumerate() {
            let len = line.chars().count();
            if idx >= max_lines {
                // The dropped line plus the break in front of it
                remaining += len + 1;
            } else if len > max_chars {
                remaining += len - max_chars;
                let kept: String = line.chars().take(max_chars).collect();
                lines.push(TextLine {
                    text: format!("{kept}{TRUNCATION_MARKER}"),
                    clipped: true,
                });
            } else {
                lines.push(TextLine {
                    text: line.to_string(),
                    clipped: false,
                });
            }
        }

        if remaining == 0 {
            return TextView {
                path: path.to_string(),
                lines,
                toggle: None,
            };
        }

        if expanded {
            TextView {
                path: path.to_string(),
                lines: text
                    .split('\n')
                    .map(|line| TextLine {
                        text: line.to_string(),
                        clipped: false,
                    })
                    .collect(),
                toggle: Some(Toggle::HideText),
            }
        } else {
            TextView {
                path: path.to_string(),
                lines,
                toggle: Some(Toggle::ShowRemainingCharacters { count: remaining }),
            }
        }
    }

    fn render_fields(
        &self,
        fields: Vec<(FieldKey, &Value)>,
        sequence: bool,
        path: &str,
        depth: usize,
        state: &DisclosureState,
    ) -> RecordView {
        let budget = self.config.complexity_budget;

        // Fields are included while the running total is within budget; the
        // field that crosses it is still shown.
        let mut total = 0usize;
        let mut visible = fields.len();
        for (idx, (_, value)) in fields.iter().enumerate() {
            if total > budget {
                visible = idx;
                break;
            }
            total += cost(value);
        }
        let withheld = fields.len() - visible;

        let expanded = state.is_expanded(path);
        let shown = if expanded { fields.len() } else { visible };
        let toggle = match (withheld, expanded) {
            (0, _) => None,
            (_, true) => Some(Toggle::HideItems),
            (count, false) => Some(Toggle::ShowRemainingItems { count }),
        };

        let fields = fields
            .into_iter()
            .take(shown)
            .map(|(key, value)| {
                let nested = child_path(path, &key);
                FieldView {
                    value: self.render_at(value, &nested, depth + 1, state),
                    key,
                }
            })
            .collect();

        RecordView {
            path: path.to_string(),
            sequence,
            fields,
            toggle,
        }
    }
}
