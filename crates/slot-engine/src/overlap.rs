//! Detect overlapping time windows.
//!
//! Windows are half-open: two windows that only touch at an endpoint
//! (one ends exactly when the other starts) do NOT overlap. The same
//! predicate guards slot creation, break exclusion, calendar grouping and
//! panelist availability.

use std::ops::Sub;

/// Whether `[start_a, start_a + duration_a)` and `[start_b, start_b + duration_b)`
/// intersect.
///
/// Symmetric in its two windows. A window with a positive duration always
/// overlaps itself; zero-length windows never overlap anything.
pub fn overlaps(start_a: i64, duration_a: i64, start_b: i64, duration_b: i64) -> bool {
    let end_a = start_a + duration_a;
    let end_b = start_b + duration_b;
    windows_overlap(start_a, end_a, start_b, end_b)
}

/// Whether `[a_start, a_end)` and `[b_start, b_end)` intersect, for any
/// ordered instant type (minutes, `DateTime`, ...).
pub fn windows_overlap<T: PartialOrd>(a_start: T, a_end: T, b_start: T, b_end: T) -> bool {
    // Strict comparisons exclude the adjacent case a_end == b_start.
    a_start < b_end && b_start < a_end
}

/// Length of the intersection of two half-open windows, or `None` if they do
/// not overlap.
pub fn overlap_length<T, D>(a_start: T, a_end: T, b_start: T, b_end: T) -> Option<D>
where
    T: PartialOrd + Copy + Sub<Output = D>,
{
    if !windows_overlap(a_start, a_end, b_start, b_end) {
        return None;
    }
    let start = if a_start > b_start { a_start } else { b_start };
    let end = if a_end < b_end { a_end } else { b_end };
    Some(end - start)
}
