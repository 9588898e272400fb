//! Tests for calendar column packing and vertical placement.

use chrono::{NaiveDate, TimeZone, Utc};
use slot_engine::layout::{layout_records, parse_timestamp, EventRecord};
use slot_engine::{layout_day, layout_week, CalendarEvent, DayWindow, PositionedEvent, Zone};

// ── Helpers ─────────────────────────────────────────────────────────────────

fn event(id: &str, day: u32, start: (u32, u32), end: (u32, u32)) -> CalendarEvent {
    CalendarEvent {
        id: id.to_string(),
        start: Utc.with_ymd_and_hms(2026, 3, day, start.0, start.1, 0).unwrap(),
        end: Utc.with_ymd_and_hms(2026, 3, day, end.0, end.1, 0).unwrap(),
        title: format!("Interview {}", id),
        metadata: Default::default(),
    }
}

fn find<'a>(positioned: &'a [PositionedEvent], id: &str) -> &'a PositionedEvent {
    positioned
        .iter()
        .find(|p| p.event.id == id)
        .unwrap_or_else(|| panic!("event {} not positioned", id))
}

fn window() -> DayWindow {
    DayWindow::default()
}

// ── Grouping ────────────────────────────────────────────────────────────────

#[test]
fn overlapping_pair_and_isolated_event() {
    let events = vec![
        event("C", 16, (11, 0), (12, 0)),
        event("A", 16, (9, 0), (10, 0)),
        event("B", 16, (9, 30), (10, 30)),
    ];
    let positioned = layout_day(&events, &window(), Zone::default());
    assert_eq!(positioned.len(), 3);

    let a = find(&positioned, "A");
    let b = find(&positioned, "B");
    let c = find(&positioned, "C");

    assert_eq!((a.column_index, a.column_count), (0, 2));
    assert_eq!((b.column_index, b.column_count), (1, 2));
    assert_eq!(a.width_percent, 50.0);
    assert_eq!(a.left_percent, 0.0);
    assert_eq!(b.left_percent, 50.0);

    assert_eq!((c.column_index, c.column_count), (0, 1));
    assert_eq!(c.width_percent, 100.0);
    assert_eq!(c.left_percent, 0.0);
}

#[test]
fn single_event_takes_full_width() {
    let positioned = layout_day(&[event("A", 16, (9, 0), (10, 0))], &window(), Zone::default());
    assert_eq!(positioned[0].column_count, 1);
    assert_eq!(positioned[0].width_percent, 100.0);
}

#[test]
fn chained_overlaps_share_one_group() {
    // A overlaps B, B overlaps C, A and C do not overlap.
    let events = vec![
        event("A", 16, (9, 0), (10, 30)),
        event("B", 16, (10, 0), (11, 30)),
        event("C", 16, (11, 0), (12, 0)),
    ];
    let positioned = layout_day(&events, &window(), Zone::default());
    for (id, column) in [("A", 0), ("B", 1), ("C", 2)] {
        let p = find(&positioned, id);
        assert_eq!(p.column_count, 3, "{} should be in a 3-column group", id);
        assert_eq!(p.column_index, column);
    }
}

#[test]
fn touching_events_are_separate_groups() {
    let events = vec![
        event("A", 16, (9, 0), (10, 0)),
        event("B", 16, (10, 0), (11, 0)),
    ];
    let positioned = layout_day(&events, &window(), Zone::default());
    assert!(positioned.iter().all(|p| p.column_count == 1));
}

#[test]
fn output_is_ordered_by_start() {
    let events = vec![
        event("late", 16, (15, 0), (16, 0)),
        event("early", 16, (8, 0), (9, 0)),
    ];
    let positioned = layout_day(&events, &window(), Zone::default());
    let ids: Vec<&str> = positioned.iter().map(|p| p.event.id.as_str()).collect();
    assert_eq!(ids, vec!["early", "late"]);
}

// ── Vertical placement ──────────────────────────────────────────────────────

#[test]
fn top_and_height_follow_scale() {
    let positioned = layout_day(&[event("A", 16, (9, 30), (11, 0))], &window(), Zone::default());
    // Day starts at 08:00 at 60px per hour -> 1px per minute.
    assert_eq!(positioned[0].top, 90.0);
    assert_eq!(positioned[0].height, 90.0);
}

#[test]
fn short_events_get_minimum_height() {
    let positioned = layout_day(&[event("A", 16, (9, 0), (9, 10))], &window(), Zone::default());
    assert_eq!(positioned[0].height, 40.0);

    let custom = DayWindow {
        min_event_height_px: 25.0,
        ..DayWindow::default()
    };
    let positioned = layout_day(&[event("A", 16, (9, 0), (9, 10))], &custom, Zone::default());
    assert_eq!(positioned[0].height, 25.0);
}

#[test]
fn vertical_position_uses_local_time() {
    let paris: Zone = "Europe/Paris".parse().unwrap();
    // 08:00 UTC is 09:00 in Paris in March before DST.
    let positioned = layout_day(&[event("A", 16, (8, 0), (9, 0))], &window(), paris);
    assert_eq!(positioned[0].top, 60.0);
}

// ── Invalid events ──────────────────────────────────────────────────────────

#[test]
fn invalid_events_are_dropped_and_take_no_column() {
    let mut untitled = event("untitled", 16, (9, 15), (9, 45));
    untitled.title = "  ".to_string();
    let inverted = event("inverted", 16, (10, 0), (9, 0));

    let events = vec![event("A", 16, (9, 0), (10, 0)), untitled, inverted];
    let positioned = layout_day(&events, &window(), Zone::default());

    assert_eq!(positioned.len(), 1);
    assert_eq!(positioned[0].event.id, "A");
    assert_eq!(positioned[0].column_count, 1);
}

#[test]
fn records_missing_start_or_title_are_dropped() {
    let json = r#"[
        {"id": "ok", "start": "2026-03-16T09:00:00Z", "end": "2026-03-16T10:00:00Z", "title": "Panel"},
        {"id": "no-start", "end": "2026-03-16T10:00:00Z", "title": "Panel"},
        {"id": "bad-start", "start": "yesterday", "end": "2026-03-16T10:00:00Z", "title": "Panel"},
        {"id": "no-title", "start": "2026-03-16T09:30:00Z", "end": "2026-03-16T10:30:00Z"}
    ]"#;
    let records: Vec<EventRecord> = serde_json::from_str(json).unwrap();
    let positioned = layout_records(records, &window(), Zone::default());

    assert_eq!(positioned.len(), 1);
    assert_eq!(positioned[0].event.id, "ok");
    assert_eq!(positioned[0].column_count, 1);
}

#[test]
fn naive_timestamps_are_read_in_zone() {
    let paris: Zone = "Europe/Paris".parse().unwrap();
    let parsed = parse_timestamp("2026-03-16T14:00", paris).unwrap();
    assert_eq!(parsed, Utc.with_ymd_and_hms(2026, 3, 16, 13, 0, 0).unwrap());

    let explicit = parse_timestamp("2026-03-16T14:00:00+00:00", paris).unwrap();
    assert_eq!(explicit, Utc.with_ymd_and_hms(2026, 3, 16, 14, 0, 0).unwrap());
}

// ── Week ────────────────────────────────────────────────────────────────────

#[test]
fn week_layout_buckets_by_local_date() {
    let events = vec![
        event("mon-a", 16, (9, 0), (10, 0)),
        event("mon-b", 16, (9, 30), (10, 30)),
        event("wed", 18, (9, 0), (10, 0)),
        event("next-week", 23, (9, 0), (10, 0)),
    ];
    let monday = NaiveDate::from_ymd_opt(2026, 3, 16).unwrap();
    let week = layout_week(&events, monday, &window(), Zone::default());

    assert_eq!(week.len(), 7);
    assert_eq!(week[&monday].len(), 2);
    assert!(week[&monday].iter().all(|p| p.column_count == 2));

    let wednesday = NaiveDate::from_ymd_opt(2026, 3, 18).unwrap();
    assert_eq!(week[&wednesday].len(), 1);
    assert_eq!(week[&wednesday][0].column_count, 1);

    let total: usize = week.values().map(Vec::len).sum();
    assert_eq!(total, 3);
}

// ── DayWindow ───────────────────────────────────────────────────────────────

#[test]
fn day_window_validation() {
    assert!(window().validate().is_ok());
    assert_eq!(window().total_height(), 720.0);

    let inverted = DayWindow {
        start_hour: 18,
        end_hour: 8,
        ..DayWindow::default()
    };
    assert!(inverted.validate().is_err());

    let flat = DayWindow {
        px_per_hour: 0.0,
        ..DayWindow::default()
    };
    assert!(flat.validate().is_err());
}
