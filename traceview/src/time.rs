use chrono::{DateTime, NaiveDateTime, Utc};

use trace_model::TraceNode;

/// Parses an ISO-8601 timestamp; values without an offset are taken as UTC
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|ts| ts.and_utc())
}

/// Duration of a node in milliseconds.
///
/// Open nodes run until `now` regardless of any recorded end time. Missing or
/// unparseable timestamps yield `None`.
pub fn node_duration(node: &TraceNode, now: DateTime<Utc>) -> Option<i64> {
    let start = parse_timestamp(node.start_time.as_deref()?)?;
    let end = if node.is_open() {
        now
    } else {
        parse_timestamp(node.end_time.as_deref()?)?
    };
    Some((end - start).num_milliseconds().max(0))
}

/// Whole units round half up, so 150 minutes reads as "3h"
pub fn human_readable_duration(ms: i64) -> String {
    if ms < 500 {
        return format!("{ms}ms");
    }
    let seconds = ms as f64 / 1000.0;
    if seconds < 120.0 {
        return format!("{seconds:.1}s");
    }
    let minutes = seconds / 60.0;
    if minutes < 120.0 {
        return format!("{:.0}m", minutes.round());
    }
    let hours = minutes / 60.0;
    if hours < 48.0 {
        return format!("{:.0}h", hours.round());
    }
    format!("{:.0} days", (hours / 24.0).round())
}
