//! Trace view core
//!
//! Pure transforms over immutable trace snapshots:
//! - `collapse`: run-length grouping of tagged siblings into group nodes
//! - `complexity` + `render`: budgeted, progressively disclosed value rendering
//! - `tree`, `disclosure`, `view`: explicit view state and its reducers
//! - `detail`, `time`, `summary`: node detail panel, durations, trace listing order

pub mod collapse;
pub mod complexity;
pub mod detail;
pub mod disclosure;
pub mod render;
pub mod summary;
pub mod time;
pub mod tree;
pub mod value;
pub mod view;

pub use trace_model;

pub use collapse::{collapse, CollapseCache};
pub use complexity::cost;
pub use detail::{node_detail, Counter, EntryKind, EntryView, NodeDetail};
pub use disclosure::DisclosureState;
pub use render::{render, RenderConfig, RenderResult, Renderer, Toggle};
pub use summary::sort_summaries;
pub use time::{human_readable_duration, node_duration};
pub use tree::{visible_rows, TreeAction, TreeRow, TreeState};
pub use value::DataValue;
pub use view::{TraceView, ViewAction};
