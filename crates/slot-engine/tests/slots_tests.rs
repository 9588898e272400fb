//! Tests for slot expansion, creation, removal and multi-day bulk creation.

use std::collections::BTreeMap;

use slot_engine::error::EngineError;
use slot_engine::slots::{
    apply_bulk_slots, clear_day, find_slot_conflicts, remove_slot, slot_count, SlotSource,
    WorkingHours,
};
use slot_engine::{
    add_slot, expand_slots, expand_working_hours, plan_bulk_slots, weekly_grid, BatchPolicy,
    BreakPeriod, BulkSlotRequest, DayOfWeek, SlotConfig, SlotConfiguration, TimeBoundary, TimeOfDay,
    TimeWindow,
};

// ── Helpers ─────────────────────────────────────────────────────────────────

fn t(s: &str) -> TimeOfDay {
    TimeOfDay::parse(s).unwrap()
}

fn until(s: &str) -> TimeBoundary {
    TimeBoundary::parse(s).unwrap()
}

fn slot(day: DayOfWeek, start: &str, duration: u32) -> SlotConfig {
    SlotConfig::new(day, t(start), duration).unwrap()
}

fn hours(start: &str, end: &str, slot_duration: u32) -> WorkingHours {
    WorkingHours {
        enabled: true,
        start: t(start),
        end: until(end),
        slot_duration,
    }
}

fn labels(slots: &[slot_engine::slots::DisplaySlot]) -> Vec<String> {
    slots.iter().map(|s| s.window.to_string()).collect()
}

fn bulk(days: &[DayOfWeek], start: &str, end: &str, duration: u32) -> BulkSlotRequest {
    BulkSlotRequest {
        days: days.to_vec(),
        start: t(start),
        end: until(end),
        duration,
    }
}

// ── SlotConfig ──────────────────────────────────────────────────────────────

#[test]
fn slot_rejects_zero_duration() {
    assert!(matches!(
        SlotConfig::new(DayOfWeek::Monday, t("09:00"), 0),
        Err(EngineError::Range(_))
    ));
}

#[test]
fn slot_rejects_running_past_midnight() {
    assert!(matches!(
        SlotConfig::new(DayOfWeek::Monday, t("23:30"), 45),
        Err(EngineError::Range(_))
    ));
    assert!(SlotConfig::new(DayOfWeek::Monday, t("23:30"), 30).is_ok());
}

#[test]
fn slots_get_distinct_ids() {
    let a = slot(DayOfWeek::Monday, "09:00", 30);
    let b = slot(DayOfWeek::Monday, "09:00", 30);
    assert_ne!(a.id(), b.id());
}

#[test]
fn slot_deserializes_without_id() {
    let json = r#"{"day":"Tuesday","start":"10:00","duration":45}"#;
    let parsed: SlotConfig = serde_json::from_str(json).unwrap();
    assert_eq!(parsed.day(), DayOfWeek::Tuesday);
    assert_eq!(parsed.window(), TimeWindow::parse("10:00", "10:45").unwrap());
}

#[test]
fn slot_deserialization_validates_duration() {
    let json = r#"{"day":"monday","start":"10:00","duration":0}"#;
    assert!(serde_json::from_str::<SlotConfig>(json).is_err());
}

#[test]
fn slot_rejects_duration_that_overflows() {
    assert!(matches!(
        SlotConfig::new(DayOfWeek::Monday, t("09:00"), u32::MAX),
        Err(EngineError::Range(_))
    ));
    let json = r#"{"day":"monday","start":"09:00","duration":4294967295}"#;
    assert!(serde_json::from_str::<SlotConfig>(json).is_err());
}

// ── Mode A ──────────────────────────────────────────────────────────────────

#[test]
fn explicit_slots_compute_end_times() {
    let slots = vec![
        slot(DayOfWeek::Monday, "09:00", 30),
        slot(DayOfWeek::Monday, "13:15", 60),
    ];
    let display = expand_slots(&slots);
    assert_eq!(labels(&display), vec!["09:00-09:30", "13:15-14:15"]);
    assert!(display.iter().all(|d| d.source == SlotSource::Explicit));
    assert_eq!(display[0].slot_id, Some(slots[0].id()));
}

// ── Mode B ──────────────────────────────────────────────────────────────────

#[test]
fn break_suppresses_whole_slot() {
    let breaks = vec![BreakPeriod {
        day: DayOfWeek::Monday,
        start: t("10:00"),
        end: until("11:00"),
    }];
    let display = expand_working_hours(DayOfWeek::Monday, &hours("09:00", "12:00", 60), &breaks);
    assert_eq!(labels(&display), vec!["09:00-10:00", "11:00-12:00"]);
    assert!(display.iter().all(|d| d.source == SlotSource::WorkingHours));
}

#[test]
fn partial_break_overlap_drops_slot() {
    // A 15-minute break at 09:45 removes the whole 09:30-10:00 slot.
    let breaks = vec![BreakPeriod {
        day: DayOfWeek::Monday,
        start: t("09:45"),
        end: until("10:00"),
    }];
    let display = expand_working_hours(DayOfWeek::Monday, &hours("09:00", "10:30", 30), &breaks);
    assert_eq!(labels(&display), vec!["09:00-09:30", "10:00-10:30"]);
}

#[test]
fn breaks_on_other_days_are_ignored() {
    let breaks = vec![BreakPeriod {
        day: DayOfWeek::Tuesday,
        start: t("09:00"),
        end: until("12:00"),
    }];
    let display = expand_working_hours(DayOfWeek::Monday, &hours("09:00", "11:00", 60), &breaks);
    assert_eq!(display.len(), 2);
}

#[test]
fn trailing_partial_slot_is_not_generated() {
    let display = expand_working_hours(DayOfWeek::Friday, &hours("09:00", "10:45", 30), &[]);
    assert_eq!(
        labels(&display),
        vec!["09:00-09:30", "09:30-10:00", "10:00-10:30"]
    );
}

#[test]
fn disabled_or_zero_duration_hours_generate_nothing() {
    let mut disabled = hours("09:00", "17:00", 30);
    disabled.enabled = false;
    assert!(expand_working_hours(DayOfWeek::Monday, &disabled, &[]).is_empty());
    assert!(expand_working_hours(DayOfWeek::Monday, &hours("09:00", "17:00", 0), &[]).is_empty());
}

#[test]
fn oversized_slot_duration_generates_nothing() {
    let display = expand_working_hours(DayOfWeek::Monday, &hours("09:00", "17:00", u32::MAX), &[]);
    assert!(display.is_empty());
}

#[test]
fn working_hours_may_run_until_midnight() {
    let display = expand_working_hours(DayOfWeek::Saturday, &hours("22:00", "24:00", 60), &[]);
    assert_eq!(labels(&display), vec!["22:00-23:00", "23:00-24:00"]);
}

#[test]
fn break_may_run_until_midnight() {
    let breaks = vec![BreakPeriod {
        day: DayOfWeek::Saturday,
        start: t("23:00"),
        end: TimeBoundary::END_OF_DAY,
    }];
    let display = expand_working_hours(DayOfWeek::Saturday, &hours("22:00", "24:00", 60), &breaks);
    assert_eq!(labels(&display), vec!["22:00-23:00"]);
}

// ── Weekly grid ─────────────────────────────────────────────────────────────

#[test]
fn grid_prefers_explicit_slots_and_never_merges_modes() {
    let mut working_hours = BTreeMap::new();
    working_hours.insert(DayOfWeek::Monday, hours("09:00", "12:00", 60));
    working_hours.insert(DayOfWeek::Tuesday, hours("09:00", "11:00", 60));

    let config = SlotConfiguration {
        slots: vec![
            slot(DayOfWeek::Monday, "14:00", 30),
            slot(DayOfWeek::Monday, "13:00", 30),
        ],
        breaks: vec![],
        working_hours,
    };

    let grid = weekly_grid(&config);
    assert_eq!(grid.len(), 7);

    // Monday has explicit slots, so its working hours are not used; sorted by start.
    assert_eq!(labels(&grid[&DayOfWeek::Monday]), vec!["13:00-13:30", "14:00-14:30"]);
    // Tuesday falls back to working hours.
    assert_eq!(labels(&grid[&DayOfWeek::Tuesday]), vec!["09:00-10:00", "10:00-11:00"]);
    assert!(grid[&DayOfWeek::Sunday].is_empty());
}

#[test]
fn configuration_parses_from_json() {
    let json = r#"{
        "slots": [{"day": "monday", "start": "09:00", "duration": 30}],
        "breaks": [{"day": "tuesday", "start": "12:00", "end": "13:00"}],
        "working_hours": {"tuesday": {"start": "09:00", "end": "17:00", "slot_duration": 60}}
    }"#;
    let config: SlotConfiguration = serde_json::from_str(json).unwrap();
    assert!(config.validate().is_ok());
    assert!(config.working_hours[&DayOfWeek::Tuesday].enabled);

    let grid = weekly_grid(&config);
    // 09:00-17:00 in hours, minus 12:00-13:00.
    assert_eq!(grid[&DayOfWeek::Tuesday].len(), 7);
}

#[test]
fn oversized_working_hours_duration_is_rejected() {
    let json = r#"{
        "working_hours": {"monday": {"start": "09:00", "end": "18:00", "slot_duration": 4294967295}}
    }"#;
    let config: SlotConfiguration = serde_json::from_str(json).unwrap();
    assert!(matches!(config.validate(), Err(EngineError::Range(_))));
    assert!(weekly_grid(&config)[&DayOfWeek::Monday].is_empty());

    let mut working_hours = BTreeMap::new();
    working_hours.insert(DayOfWeek::Monday, hours("09:00", "10:00", 24 * 60 + 1));
    let config = SlotConfiguration {
        working_hours,
        ..Default::default()
    };
    assert!(matches!(config.validate(), Err(EngineError::Range(_))));
}

#[test]
fn configuration_accepts_midnight_ends() {
    let json = r#"{
        "breaks": [{"day": "friday", "start": "23:30", "end": "24:00"}],
        "working_hours": {"friday": {"start": "21:00", "end": "24:00", "slot_duration": 30}}
    }"#;
    let config: SlotConfiguration = serde_json::from_str(json).unwrap();
    assert!(config.validate().is_ok());
    let friday = labels(&weekly_grid(&config)[&DayOfWeek::Friday]);
    assert_eq!(friday.len(), 5);
    assert_eq!(friday.last().map(String::as_str), Some("23:00-23:30"));
}

#[test]
fn validate_rejects_overlapping_explicit_slots() {
    let config = SlotConfiguration {
        slots: vec![
            slot(DayOfWeek::Monday, "09:00", 60),
            slot(DayOfWeek::Monday, "09:30", 30),
        ],
        ..Default::default()
    };
    assert!(matches!(
        config.validate(),
        Err(EngineError::Conflict { day: DayOfWeek::Monday, .. })
    ));
}

#[test]
fn validate_rejects_inverted_break() {
    let config = SlotConfiguration {
        breaks: vec![BreakPeriod {
            day: DayOfWeek::Monday,
            start: t("13:00"),
            end: until("12:00"),
        }],
        ..Default::default()
    };
    assert!(matches!(config.validate(), Err(EngineError::Range(_))));
}

// ── Single slot creation and removal ───────────────────────────────────────

#[test]
fn add_slot_rejects_overlap_on_same_day() {
    let existing = vec![slot(DayOfWeek::Monday, "09:00", 60)];
    match add_slot(&existing, DayOfWeek::Monday, t("09:30"), 30) {
        Err(EngineError::Conflict { day, conflicts }) => {
            assert_eq!(day, DayOfWeek::Monday);
            assert_eq!(conflicts.len(), 1);
            assert_eq!(conflicts[0].existing_id, existing[0].id());
            assert_eq!(conflicts[0].existing.to_string(), "09:00-10:00");
        }
        other => panic!("expected conflict, got {:?}", other),
    }
}

#[test]
fn add_slot_allows_touching_and_other_days() {
    let existing = vec![slot(DayOfWeek::Monday, "09:00", 60)];
    assert!(add_slot(&existing, DayOfWeek::Monday, t("10:00"), 30).is_ok());
    assert!(add_slot(&existing, DayOfWeek::Tuesday, t("09:00"), 60).is_ok());
}

#[test]
fn add_slot_rejects_duration_that_overflows() {
    assert!(matches!(
        add_slot(&[], DayOfWeek::Monday, t("09:00"), u32::MAX),
        Err(EngineError::Range(_))
    ));
}

#[test]
fn conflicts_compare_windows_not_ids() {
    let existing = vec![slot(DayOfWeek::Monday, "09:00", 30)];
    let same_window = TimeWindow::parse("09:00", "09:30").unwrap();
    assert_eq!(find_slot_conflicts(DayOfWeek::Monday, same_window, &existing).len(), 1);
}

#[test]
fn remove_and_clear() {
    let mut slots = vec![
        slot(DayOfWeek::Monday, "09:00", 30),
        slot(DayOfWeek::Monday, "10:00", 30),
        slot(DayOfWeek::Tuesday, "09:00", 30),
    ];
    let id = slots[1].id();
    let removed = remove_slot(&mut slots, id).unwrap();
    assert_eq!(removed.id(), id);
    assert!(remove_slot(&mut slots, id).is_none());

    assert_eq!(clear_day(&mut slots, DayOfWeek::Monday), 1);
    assert_eq!(slots.len(), 1);
    assert_eq!(slots[0].day(), DayOfWeek::Tuesday);
}

// ── Bulk creation ───────────────────────────────────────────────────────────

#[test]
fn bulk_creates_floor_of_range_over_duration_per_day() {
    let request = bulk(&[DayOfWeek::Monday, DayOfWeek::Wednesday], "09:00", "11:00", 30);
    let outcome = plan_bulk_slots(&request, &[], BatchPolicy::AbortBatch).unwrap();

    assert_eq!(outcome.created.len(), 8);
    for day in [DayOfWeek::Monday, DayOfWeek::Wednesday] {
        let starts: Vec<String> = outcome
            .created
            .iter()
            .filter(|s| s.day() == day)
            .map(|s| s.start().to_string())
            .collect();
        assert_eq!(starts, vec!["09:00", "09:30", "10:00", "10:30"]);
    }
    assert!(outcome.rejected.is_empty());
}

#[test]
fn bulk_rejects_range_shorter_than_duration() {
    let request = bulk(&[DayOfWeek::Monday], "09:00", "09:10", 30);
    assert!(matches!(
        plan_bulk_slots(&request, &[], BatchPolicy::AbortBatch),
        Err(EngineError::Range(_))
    ));
}

#[test]
fn bulk_rejects_inverted_range_and_zero_duration() {
    assert!(matches!(slot_count(t("11:00"), until("09:00"), 30), Err(EngineError::Range(_))));
    assert!(matches!(slot_count(t("09:00"), until("09:00"), 30), Err(EngineError::Range(_))));
    assert!(matches!(slot_count(t("09:00"), until("11:00"), 0), Err(EngineError::Range(_))));
    assert_eq!(slot_count(t("09:00"), until("11:10"), 30).unwrap(), 4);
}

#[test]
fn bulk_may_fill_the_last_hour_of_the_day() {
    let request = bulk(&[DayOfWeek::Monday, DayOfWeek::Friday], "23:00", "24:00", 60);
    let outcome = plan_bulk_slots(&request, &[], BatchPolicy::AbortBatch).unwrap();
    assert_eq!(outcome.created.len(), 2);
    assert!(outcome
        .created
        .iter()
        .all(|s| s.window().to_string() == "23:00-24:00"));

    let json = r#"{"days":["monday"],"start":"22:00","end":"24:00","duration":30}"#;
    let parsed: BulkSlotRequest = serde_json::from_str(json).unwrap();
    assert_eq!(parsed.end, TimeBoundary::END_OF_DAY);
    let outcome = plan_bulk_slots(&parsed, &[], BatchPolicy::AbortBatch).unwrap();
    assert_eq!(outcome.created.len(), 4);
}

#[test]
fn bulk_with_huge_duration_is_too_short() {
    let request = bulk(&[DayOfWeek::Monday], "09:00", "17:00", u32::MAX);
    assert!(matches!(
        plan_bulk_slots(&request, &[], BatchPolicy::AbortBatch),
        Err(EngineError::Range(_))
    ));
}

#[test]
fn bulk_rejects_empty_day_selection() {
    let request = bulk(&[], "09:00", "11:00", 30);
    assert!(matches!(
        plan_bulk_slots(&request, &[], BatchPolicy::AbortBatch),
        Err(EngineError::Range(_))
    ));
}

#[test]
fn bulk_ignores_duplicate_days() {
    let request = bulk(&[DayOfWeek::Friday, DayOfWeek::Friday], "09:00", "10:00", 30);
    let outcome = plan_bulk_slots(&request, &[], BatchPolicy::AbortBatch).unwrap();
    assert_eq!(outcome.created.len(), 2);
}

#[test]
fn bulk_aborts_whole_batch_on_first_conflicting_day() {
    let existing = vec![slot(DayOfWeek::Tuesday, "10:15", 30)];
    let mut slots = existing.clone();
    let request = bulk(
        &[DayOfWeek::Monday, DayOfWeek::Tuesday, DayOfWeek::Wednesday],
        "09:00",
        "11:00",
        30,
    );

    match apply_bulk_slots(&mut slots, &request, BatchPolicy::AbortBatch) {
        Err(EngineError::Conflict { day, conflicts }) => {
            assert_eq!(day, DayOfWeek::Tuesday);
            // 10:15-10:45 hits both 10:00-10:30 and 10:30-11:00.
            assert_eq!(conflicts.len(), 2);
            assert_eq!(conflicts[0].proposed.to_string(), "10:00-10:30");
            assert_eq!(conflicts[1].proposed.to_string(), "10:30-11:00");
        }
        other => panic!("expected conflict, got {:?}", other),
    }
    // Nothing was added, not even Monday.
    assert_eq!(slots, existing);
}

#[test]
fn per_day_policy_admits_clean_days() {
    let mut slots = vec![slot(DayOfWeek::Tuesday, "10:15", 30)];
    let request = bulk(
        &[DayOfWeek::Monday, DayOfWeek::Tuesday, DayOfWeek::Wednesday],
        "09:00",
        "11:00",
        30,
    );

    let outcome = apply_bulk_slots(&mut slots, &request, BatchPolicy::PerDay).unwrap();
    assert_eq!(outcome.created.len(), 8);
    assert!(outcome.created.iter().all(|s| s.day() != DayOfWeek::Tuesday));
    assert_eq!(outcome.rejected.len(), 1);
    assert_eq!(outcome.rejected[&DayOfWeek::Tuesday].len(), 2);
    assert_eq!(slots.len(), 9);
}

#[test]
fn batch_policy_from_flag() {
    assert_eq!(BatchPolicy::from_abort_flag(true), BatchPolicy::AbortBatch);
    assert_eq!(BatchPolicy::from_abort_flag(false), BatchPolicy::PerDay);
    assert_eq!(BatchPolicy::default(), BatchPolicy::AbortBatch);
}
