//! Slot generation -- expands saved configuration into bookable windows.
//!
//! Two expansion modes exist per day of the week:
//!
//! - **Explicit slots** (Mode A): every [`SlotConfig`] becomes one window.
//! - **Working hours** (Mode B, legacy): a `{start, end, slot_duration}` range is
//!   stepped through, dropping every step that overlaps a [`BreakPeriod`].
//!
//! A day with any explicit slot is expanded from its explicit slots only; the
//! two modes are never merged within one day.
//!
//! Slot creation (single and multi-day bulk) validates ranges before building
//! anything and checks every new window against the day's existing slots, so
//! a rejected request never leaves configuration half-updated.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::{EngineError, Result};
use crate::time::{DayOfWeek, TimeBoundary, TimeOfDay, TimeWindow, MINUTES_PER_DAY};

/// Opaque identity of a configured slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SlotId(Uuid);

impl SlotId {
    pub fn new() -> Self {
        SlotId(Uuid::new_v4())
    }
}

impl Default for SlotId {
    fn default() -> Self {
        SlotId::new()
    }
}

impl fmt::Display for SlotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

// ---------------------------------------------------------------------------
// Configuration types
// ---------------------------------------------------------------------------

/// One individually removable bookable window on a day of the week.
///
/// Immutable once built: edits are a removal followed by a new slot.
/// Conflict checks compare day and window, never ids.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "SlotConfigRepr", into = "SlotConfigRepr")]
pub struct SlotConfig {
    id: SlotId,
    day: DayOfWeek,
    start: TimeOfDay,
    duration: u32,
}

impl SlotConfig {
    /// # Errors
    /// Returns `EngineError::Range` if `duration` is zero or the slot would
    /// run past midnight.
    pub fn new(day: DayOfWeek, start: TimeOfDay, duration: u32) -> Result<Self> {
        TimeWindow::from_start_duration(start, duration)?;
        Ok(SlotConfig {
            id: SlotId::new(),
            day,
            start,
            duration,
        })
    }

    pub fn id(&self) -> SlotId {
        self.id
    }

    pub fn day(&self) -> DayOfWeek {
        self.day
    }

    pub fn start(&self) -> TimeOfDay {
        self.start
    }

    /// Length of the slot in minutes.
    pub fn duration(&self) -> u32 {
        self.duration
    }

    pub fn window(&self) -> TimeWindow {
        TimeWindow::spanning(self.start.minutes(), self.duration)
    }
}

#[derive(Serialize, Deserialize)]
struct SlotConfigRepr {
    #[serde(default)]
    id: SlotId,
    day: DayOfWeek,
    start: TimeOfDay,
    duration: u32,
}

impl TryFrom<SlotConfigRepr> for SlotConfig {
    type Error = EngineError;

    fn try_from(repr: SlotConfigRepr) -> Result<Self> {
        let mut slot = SlotConfig::new(repr.day, repr.start, repr.duration)?;
        slot.id = repr.id;
        Ok(slot)
    }
}

impl From<SlotConfig> for SlotConfigRepr {
    fn from(slot: SlotConfig) -> Self {
        SlotConfigRepr {
            id: slot.id,
            day: slot.day,
            start: slot.start,
            duration: slot.duration,
        }
    }
}

/// A window excluded from working-hours expansion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BreakPeriod {
    pub day: DayOfWeek,
    pub start: TimeOfDay,
    pub end: TimeBoundary,
}

impl BreakPeriod {
    /// # Errors
    /// Returns `EngineError::Range` if `end <= start`.
    pub fn window(&self) -> Result<TimeWindow> {
        TimeWindow::new(self.start.minutes(), self.end.minutes())
    }
}

/// Working-hours range for one day (Mode B).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkingHours {
    #[serde(default = "enabled_by_default")]
    pub enabled: bool,
    pub start: TimeOfDay,
    pub end: TimeBoundary,
    /// Minutes per generated slot.
    pub slot_duration: u32,
}

fn enabled_by_default() -> bool {
    true
}

/// The full slot configuration of one scope (organisation default or job).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SlotConfiguration {
    #[serde(default)]
    pub slots: Vec<SlotConfig>,
    #[serde(default)]
    pub breaks: Vec<BreakPeriod>,
    #[serde(default)]
    pub working_hours: BTreeMap<DayOfWeek, WorkingHours>,
}

impl SlotConfiguration {
    /// Check that breaks and working hours are well-formed and that no two
    /// explicit slots on the same day overlap.
    pub fn validate(&self) -> Result<()> {
        for b in &self.breaks {
            b.window()?;
        }

        for (day, hours) in &self.working_hours {
            if !hours.enabled {
                continue;
            }
            if hours.slot_duration == 0 || hours.slot_duration > MINUTES_PER_DAY {
                return Err(EngineError::Range(format!(
                    "working hours on {} have an invalid slot duration of {} minutes",
                    day, hours.slot_duration
                )));
            }
            if hours.end.minutes() <= hours.start.minutes() {
                return Err(EngineError::Range(format!(
                    "working hours on {} end at {} before starting at {}",
                    day, hours.end, hours.start
                )));
            }
        }

        for (i, slot) in self.slots.iter().enumerate() {
            let conflicts = find_slot_conflicts(slot.day, slot.window(), &self.slots[i + 1..]);
            if !conflicts.is_empty() {
                return Err(EngineError::Conflict {
                    day: slot.day,
                    conflicts,
                });
            }
        }

        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Expansion
// ---------------------------------------------------------------------------

/// Which expansion mode produced a window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SlotSource {
    Explicit,
    WorkingHours,
}

/// A displayable bookable window.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DisplaySlot {
    pub day: DayOfWeek,
    #[serde(flatten)]
    pub window: TimeWindow,
    /// Set for explicit slots so the UI can offer removal.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub slot_id: Option<SlotId>,
    pub source: SlotSource,
}

/// Mode A: one display window per explicit slot, in input order.
pub fn expand_slots(slots: &[SlotConfig]) -> Vec<DisplaySlot> {
    slots
        .iter()
        .map(|slot| DisplaySlot {
            day: slot.day,
            window: slot.window(),
            slot_id: Some(slot.id),
            source: SlotSource::Explicit,
        })
        .collect()
}

/// Mode B: step through working hours, suppressing windows that overlap a
/// break on the same day.
///
/// Windows overlapping a break are dropped whole, never shortened. Stepping
/// stops at the last window that fits entirely before `end`.
pub fn expand_working_hours(
    day: DayOfWeek,
    hours: &WorkingHours,
    breaks: &[BreakPeriod],
) -> Vec<DisplaySlot> {
    if !hours.enabled {
        return Vec::new();
    }
    if hours.slot_duration == 0 || hours.slot_duration > MINUTES_PER_DAY {
        warn!(
            %day,
            slot_duration = hours.slot_duration,
            "working hours have an invalid slot duration, nothing generated"
        );
        return Vec::new();
    }

    let day_breaks: Vec<TimeWindow> = breaks
        .iter()
        .filter(|b| b.day == day)
        .filter_map(|b| match b.window() {
            Ok(w) => Some(w),
            Err(e) => {
                warn!(%day, error = %e, "ignoring malformed break");
                None
            }
        })
        .collect();

    let step = hours.slot_duration;
    let end = hours.end.minutes();
    let mut cursor = hours.start.minutes();
    let mut windows = Vec::new();

    while let Some(next) = cursor.checked_add(step).filter(|next| *next <= end) {
        let window = TimeWindow::spanning(cursor, step);
        if !day_breaks.iter().any(|b| window.overlaps(*b)) {
            windows.push(DisplaySlot {
                day,
                window,
                slot_id: None,
                source: SlotSource::WorkingHours,
            });
        }
        cursor = next;
    }

    windows
}

/// Expand a whole configuration into a seven-day grid, Monday first.
///
/// Each day uses its explicit slots if it has any, otherwise its working
/// hours (if configured). Every day is present in the map; days with nothing
/// configured map to an empty list. Windows within a day are sorted by start.
pub fn weekly_grid(config: &SlotConfiguration) -> BTreeMap<DayOfWeek, Vec<DisplaySlot>> {
    DayOfWeek::ALL
        .into_iter()
        .map(|day| {
            let explicit: Vec<SlotConfig> = config
                .slots
                .iter()
                .filter(|s| s.day == day)
                .cloned()
                .collect();

            let mut windows = if !explicit.is_empty() {
                expand_slots(&explicit)
            } else if let Some(hours) = config.working_hours.get(&day) {
                expand_working_hours(day, hours, &config.breaks)
            } else {
                Vec::new()
            };
            windows.sort_by_key(|w| w.window);

            (day, windows)
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Creation and removal
// ---------------------------------------------------------------------------

/// A proposed window that overlaps an already configured slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotConflict {
    pub day: DayOfWeek,
    pub proposed: TimeWindow,
    pub existing: TimeWindow,
    pub existing_id: SlotId,
}

impl fmt::Display for SlotConflict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} overlaps existing slot {}",
            self.day, self.proposed, self.existing
        )
    }
}

/// All existing slots on `day` that `proposed` overlaps.
pub fn find_slot_conflicts(
    day: DayOfWeek,
    proposed: TimeWindow,
    existing: &[SlotConfig],
) -> Vec<SlotConflict> {
    existing
        .iter()
        .filter(|s| s.day == day && proposed.overlaps(s.window()))
        .map(|s| SlotConflict {
            day,
            proposed,
            existing: s.window(),
            existing_id: s.id,
        })
        .collect()
}

/// Create one slot, rejecting it if it overlaps any existing slot that day.
///
/// # Errors
/// `EngineError::Range` for a zero duration or a slot past midnight,
/// `EngineError::Conflict` listing every overlapped slot.
pub fn add_slot(
    existing: &[SlotConfig],
    day: DayOfWeek,
    start: TimeOfDay,
    duration: u32,
) -> Result<SlotConfig> {
    let slot = SlotConfig::new(day, start, duration)?;
    let conflicts = find_slot_conflicts(day, slot.window(), existing);
    if !conflicts.is_empty() {
        return Err(EngineError::Conflict { day, conflicts });
    }
    Ok(slot)
}

/// Remove a single slot by id.
pub fn remove_slot(slots: &mut Vec<SlotConfig>, id: SlotId) -> Option<SlotConfig> {
    let index = slots.iter().position(|s| s.id == id)?;
    Some(slots.remove(index))
}

/// Remove every slot on `day`, returning how many were removed.
pub fn clear_day(slots: &mut Vec<SlotConfig>, day: DayOfWeek) -> usize {
    let before = slots.len();
    slots.retain(|s| s.day != day);
    before - slots.len()
}

/// A request to create the same run of slots on several days.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BulkSlotRequest {
    pub days: Vec<DayOfWeek>,
    pub start: TimeOfDay,
    pub end: TimeBoundary,
    /// Minutes per slot.
    pub duration: u32,
}

/// What to do when one day of a bulk request conflicts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchPolicy {
    /// Reject the whole multi-day request on the first conflicting day.
    #[default]
    AbortBatch,
    /// Reject only the conflicting days; the others are still created.
    PerDay,
}

impl BatchPolicy {
    pub fn from_abort_flag(abort_batch_on_first_conflict: bool) -> Self {
        if abort_batch_on_first_conflict {
            BatchPolicy::AbortBatch
        } else {
            BatchPolicy::PerDay
        }
    }
}

/// Result of a bulk creation plan.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BulkOutcome {
    /// Slots admitted, grouped by day in request order.
    pub created: Vec<SlotConfig>,
    /// Days refused under [`BatchPolicy::PerDay`], with their conflicts.
    pub rejected: BTreeMap<DayOfWeek, Vec<SlotConflict>>,
}

/// Number of whole slots of `duration` minutes between `start` and `end`.
///
/// # Errors
/// Returns `EngineError::Range` for a zero duration, `end <= start`, or a
/// range shorter than one slot.
pub fn slot_count(start: TimeOfDay, end: TimeBoundary, duration: u32) -> Result<u32> {
    if duration == 0 {
        return Err(EngineError::Range(
            "slot duration must be positive".to_string(),
        ));
    }
    if end.minutes() <= start.minutes() {
        return Err(EngineError::Range(format!(
            "end time {} must be after start time {}",
            end, start
        )));
    }
    let count = (end.minutes() - start.minutes()) / duration;
    if count == 0 {
        return Err(EngineError::Range(format!(
            "time range {}-{} too short for a {}-minute slot",
            start, end, duration
        )));
    }
    Ok(count)
}

/// Plan a multi-day bulk creation against the existing slots.
///
/// Every selected day (duplicates ignored) receives `slot_count` consecutive
/// slots starting at `request.start`. A day is admitted whole or not at all.
/// Under [`BatchPolicy::AbortBatch`] the first conflicting day fails the
/// entire request; under [`BatchPolicy::PerDay`] it is recorded in
/// [`BulkOutcome::rejected`] and the remaining days proceed.
///
/// Nothing is mutated: apply `created` only on success, or use
/// [`apply_bulk_slots`].
pub fn plan_bulk_slots(
    request: &BulkSlotRequest,
    existing: &[SlotConfig],
    policy: BatchPolicy,
) -> Result<BulkOutcome> {
    let count = slot_count(request.start, request.end, request.duration)?;

    let mut days: Vec<DayOfWeek> = Vec::with_capacity(request.days.len());
    for day in &request.days {
        if !days.contains(day) {
            days.push(*day);
        }
    }
    if days.is_empty() {
        return Err(EngineError::Range("no days selected".to_string()));
    }

    let mut outcome = BulkOutcome::default();

    for day in days {
        let mut day_slots = Vec::with_capacity(count as usize);
        for i in 0..count {
            let start = TimeOfDay::from_minutes(request.start.minutes() + i * request.duration)?;
            day_slots.push(SlotConfig::new(day, start, request.duration)?);
        }

        let conflicts: Vec<SlotConflict> = day_slots
            .iter()
            .flat_map(|s| find_slot_conflicts(day, s.window(), existing))
            .collect();

        if !conflicts.is_empty() {
            match policy {
                BatchPolicy::AbortBatch => {
                    warn!(%day, conflicts = conflicts.len(), "bulk slot creation aborted");
                    return Err(EngineError::Conflict { day, conflicts });
                }
                BatchPolicy::PerDay => {
                    warn!(%day, conflicts = conflicts.len(), "bulk slot creation skipped day");
                    outcome.rejected.insert(day, conflicts);
                    continue;
                }
            }
        }

        outcome.created.extend(day_slots);
    }

    debug!(
        created = outcome.created.len(),
        rejected_days = outcome.rejected.len(),
        "planned bulk slots"
    );
    Ok(outcome)
}

/// Plan a bulk creation and, on success, append the admitted slots.
pub fn apply_bulk_slots(
    slots: &mut Vec<SlotConfig>,
    request: &BulkSlotRequest,
    policy: BatchPolicy,
) -> Result<BulkOutcome> {
    let outcome = plan_bulk_slots(request, slots, policy)?;
    slots.extend(outcome.created.iter().cloned());
    Ok(outcome)
}
