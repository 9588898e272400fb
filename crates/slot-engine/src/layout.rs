//! Calendar layout -- column packing for overlapping events on a day grid.
//!
//! Events are sorted by start and gathered into groups: each group is seeded
//! with the earliest ungrouped event, then a single scan over the remaining
//! ungrouped events pulls in every event that overlaps *any* member already
//! in the group. Chains (A overlaps B, B overlaps C) therefore share one
//! group even when A and C do not overlap, and every member of a group gets
//! the same column count. This is deliberately simpler than a minimum
//! interval-graph colouring.
//!
//! Vertical placement is independent of grouping: `top` comes from the
//! local start minute, `height` from the duration with a minimum so short
//! events stay legible.
//!
//! Everything here is a pure function of its inputs; nothing is cached.

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::warn;

use crate::error::{EngineError, Result};
use crate::overlap::windows_overlap;
use crate::time::Zone;

/// A dated interview instance shown on the calendar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalendarEvent {
    pub id: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub title: String,
    #[serde(default)]
    pub metadata: Map<String, Value>,
}

impl CalendarEvent {
    pub fn duration_minutes(&self) -> i64 {
        (self.end - self.start).num_minutes()
    }

    fn check(&self) -> Result<()> {
        if self.title.trim().is_empty() {
            return Err(EngineError::Format(format!(
                "event '{}' has no title",
                self.id
            )));
        }
        if self.end <= self.start {
            return Err(EngineError::Range(format!(
                "event '{}' ends before it starts",
                self.id
            )));
        }
        Ok(())
    }
}

/// Loosely-typed event as it arrives from the interview store or the UI.
///
/// Timestamps are RFC 3339, or naive `YYYY-MM-DDTHH:MM[:SS]` read in the
/// organisation zone.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EventRecord {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub start: Option<String>,
    #[serde(default)]
    pub end: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub metadata: Map<String, Value>,
}

impl EventRecord {
    /// # Errors
    /// Returns `EngineError::Format` for a missing or unparseable start/end
    /// or a missing title, and `EngineError::Range` if it does not end after
    /// it starts.
    pub fn into_event(self, zone: Zone) -> Result<CalendarEvent> {
        let id = self.id.unwrap_or_default();
        let start = match self.start.as_deref() {
            Some(s) => parse_timestamp(s, zone)?,
            None => {
                return Err(EngineError::Format(format!("event '{}' has no start", id)));
            }
        };
        let end = match self.end.as_deref() {
            Some(s) => parse_timestamp(s, zone)?,
            None => return Err(EngineError::Format(format!("event '{}' has no end", id))),
        };
        let event = CalendarEvent {
            id,
            start,
            end,
            title: self.title.unwrap_or_default(),
            metadata: self.metadata,
        };
        event.check()?;
        Ok(event)
    }
}

/// Parse an RFC 3339 timestamp, or a naive local one read in `zone`.
pub fn parse_timestamp(s: &str, zone: Zone) -> Result<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc));
    }
    let naive = NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S")
        .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M"))
        .map_err(|e| EngineError::Format(format!("invalid timestamp '{}': {}", s, e)))?;
    zone.tz()
        .from_local_datetime(&naive)
        .earliest()
        .map(|dt| dt.with_timezone(&Utc))
        .ok_or_else(|| {
            EngineError::Format(format!("'{}' does not exist in {}", s, zone.name()))
        })
}

/// The visible hours of a day column and its vertical scale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DayWindow {
    pub start_hour: u32,
    pub end_hour: u32,
    pub px_per_hour: f64,
    /// Floor on rendered event height.
    pub min_event_height_px: f64,
}

impl Default for DayWindow {
    fn default() -> Self {
        Self {
            start_hour: 8,
            end_hour: 20,
            px_per_hour: 60.0,
            min_event_height_px: 40.0,
        }
    }
}

impl DayWindow {
    pub fn px_per_minute(&self) -> f64 {
        self.px_per_hour / 60.0
    }

    /// Height of the whole day column in pixels.
    pub fn total_height(&self) -> f64 {
        f64::from(self.end_hour.saturating_sub(self.start_hour)) * self.px_per_hour
    }

    pub fn validate(&self) -> Result<()> {
        if self.end_hour > 24 || self.start_hour >= self.end_hour {
            return Err(EngineError::Config(format!(
                "day window {}h-{}h is not a valid range",
                self.start_hour, self.end_hour
            )));
        }
        if self.px_per_hour.is_nan() || self.px_per_hour <= 0.0 {
            return Err(EngineError::Config(
                "px_per_hour must be positive".to_string(),
            ));
        }
        if self.min_event_height_px < 0.0 {
            return Err(EngineError::Config(
                "min_event_height_px must not be negative".to_string(),
            ));
        }
        Ok(())
    }
}

/// An event with its computed on-screen geometry.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PositionedEvent {
    pub event: CalendarEvent,
    /// Pixels from the top of the day column.
    pub top: f64,
    pub height: f64,
    pub column_index: usize,
    pub column_count: usize,
    pub left_percent: f64,
    pub width_percent: f64,
}

/// Lay out the events of one day.
///
/// Events are expected to be filtered to the day already. Events without a
/// title or that do not end after they start are dropped with a warning and
/// take no column. Output is ordered by start time, then column.
pub fn layout_day(events: &[CalendarEvent], window: &DayWindow, zone: Zone) -> Vec<PositionedEvent> {
    let mut valid: Vec<&CalendarEvent> = events
        .iter()
        .filter(|e| match e.check() {
            Ok(()) => true,
            Err(err) => {
                warn!(event_id = %e.id, error = %err, "dropping event from layout");
                false
            }
        })
        .collect();
    valid.sort_by_key(|e| e.start);

    let groups = group_overlapping(&valid);

    let ppm = window.px_per_minute();
    let day_start = i64::from(window.start_hour) * 60;

    let mut positioned = Vec::with_capacity(valid.len());
    for group in groups {
        let column_count = group.len();
        let width = 100.0 / column_count as f64;
        for (column_index, &idx) in group.iter().enumerate() {
            let event = valid[idx];
            let start_minute = i64::from(zone.local_minute_of_day(event.start));
            let top = (start_minute - day_start) as f64 * ppm;
            let height = (event.duration_minutes() as f64 * ppm).max(window.min_event_height_px);
            positioned.push(PositionedEvent {
                event: event.clone(),
                top,
                height,
                column_index,
                column_count,
                left_percent: column_index as f64 * width,
                width_percent: width,
            });
        }
    }

    positioned.sort_by(|a, b| {
        a.event
            .start
            .cmp(&b.event.start)
            .then(a.column_index.cmp(&b.column_index))
    });
    positioned
}

/// Convert loosely-typed records and lay them out, dropping unusable ones
/// with a warning.
pub fn layout_records(
    records: Vec<EventRecord>,
    window: &DayWindow,
    zone: Zone,
) -> Vec<PositionedEvent> {
    let events: Vec<CalendarEvent> = records
        .into_iter()
        .filter_map(|record| {
            let id = record.id.clone().unwrap_or_default();
            match record.into_event(zone) {
                Ok(event) => Some(event),
                Err(err) => {
                    warn!(event_id = %id, error = %err, "dropping event from layout");
                    None
                }
            }
        })
        .collect();
    layout_day(&events, window, zone)
}

/// Lay out seven consecutive days starting at `week_start`.
///
/// Events are bucketed by the local date of their start; events outside the
/// week are ignored. Every day of the week has an entry.
pub fn layout_week(
    events: &[CalendarEvent],
    week_start: NaiveDate,
    window: &DayWindow,
    zone: Zone,
) -> BTreeMap<NaiveDate, Vec<PositionedEvent>> {
    let days: Vec<NaiveDate> = (0..7).map(|i| week_start + Duration::days(i)).collect();

    let mut buckets: BTreeMap<NaiveDate, Vec<CalendarEvent>> =
        days.iter().map(|d| (*d, Vec::new())).collect();
    for event in events {
        if let Some(bucket) = buckets.get_mut(&zone.local_date(event.start)) {
            bucket.push(event.clone());
        }
    }

    buckets
        .into_iter()
        .map(|(date, day_events)| (date, layout_day(&day_events, window, zone)))
        .collect()
}

/// Group indices of start-sorted events: seed each group with the first
/// ungrouped event, then one pass joins any ungrouped event overlapping any
/// current member. Members are listed in sort order.
fn group_overlapping(sorted: &[&CalendarEvent]) -> Vec<Vec<usize>> {
    let mut grouped = vec![false; sorted.len()];
    let mut groups = Vec::new();

    for seed in 0..sorted.len() {
        if grouped[seed] {
            continue;
        }
        grouped[seed] = true;
        let mut group = vec![seed];

        for candidate in seed + 1..sorted.len() {
            if grouped[candidate] {
                continue;
            }
            let c = sorted[candidate];
            let joins = group.iter().any(|&m| {
                let member = sorted[m];
                windows_overlap(member.start, member.end, c.start, c.end)
            });
            if joins {
                grouped[candidate] = true;
                group.push(candidate);
            }
        }

        groups.push(group);
    }

    groups
}
