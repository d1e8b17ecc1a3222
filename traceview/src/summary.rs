use std::cmp::Ordering;

use trace_model::TraceSummary;

use crate::time::parse_timestamp;

/// Orders a trace listing: open traces first, then newest start time first.
/// Traces without a parseable start time sort last within their group.
pub fn sort_summaries(summaries: &mut [TraceSummary]) {
    summaries.sort_by(compare_summaries);
}

fn compare_summaries(a: &TraceSummary, b: &TraceSummary) -> Ordering {
    let start = |s: &TraceSummary| s.start_time.as_deref().and_then(parse_timestamp);
    b.is_open()
        .cmp(&a.is_open())
        .then_with(|| match (start(a), start(b)) {
            (Some(a), Some(b)) => b.cmp(&a),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        })
}
