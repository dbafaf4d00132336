use chrono::{DateTime, Utc};

/// Total seconds covered by the union of `[start, end)` intervals.
pub fn union_seconds(mut intervals: Vec<(DateTime<Utc>, DateTime<Utc>)>) -> i64 {
    if intervals.is_empty() {
        return 0;
    }
    intervals.sort_by_key(|(start, _)| *start);

    let mut total = 0i64;
    let (mut cur_start, mut cur_end) = intervals[0];
    for &(start, end) in &intervals[1..] {
        if start <= cur_end {
            if end > cur_end {
                cur_end = end;
            }
        } else {
            total = total.saturating_add((cur_end - cur_start).num_seconds());
            cur_start = start;
            cur_end = end;
        }
    }
    total = total.saturating_add((cur_end - cur_start).num_seconds());
    total.max(0)
}
