use chrono::{Duration, NaiveDate};

/// Inclusive civil-date range.
pub(crate) fn days_inclusive(from: NaiveDate, to: NaiveDate) -> impl Iterator<Item = NaiveDate> {
    let len = (to - from).num_days().max(-1) + 1;
    (0..len).map(move |offset| from + Duration::days(offset))
}

/// Half-open interval intersection over minutes.
pub(crate) fn intervals_overlap(a: (i64, i64), b: (i64, i64)) -> bool {
    a.0 < b.1 && b.0 < a.1
}
