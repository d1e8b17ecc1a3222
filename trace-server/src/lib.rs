//! Trace viewer server
//!
//! Serves trace files from a directory over a read-only JSON API: the trace
//! listing, raw and collapsed trace trees, and rendered node details.

pub mod api;
pub mod config;
pub mod reader;
