//! Time arithmetic -- `"HH:MM"` strings, minutes since midnight, days of the week.
//!
//! Minutes since midnight is the canonical representation everywhere in the
//! engine. Values carry no offset of their own: they are read in the single
//! organisation [`Zone`], which is made explicit here so that timestamped
//! calendar data can be projected onto the same minute axis.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Datelike, NaiveDate, NaiveTime, TimeZone, Utc, Weekday};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::error::{EngineError, Result};

/// Number of minutes in a day; also the largest valid window end (`"24:00"`).
pub const MINUTES_PER_DAY: u32 = 24 * 60;

/// Parse a `"HH:MM"` string into minutes since midnight.
///
/// Hours and minutes are base-10 with one or two digits. Hours must be below
/// 24 and minutes below 60.
///
/// # Errors
/// Returns `EngineError::Format` on a missing colon, non-numeric components,
/// or out-of-range values.
pub fn time_to_minutes(s: &str) -> Result<u32> {
    let trimmed = s.trim();
    let (hour, minute) = trimmed
        .split_once(':')
        .ok_or_else(|| EngineError::Format(format!("missing ':' in time '{}'", s)))?;

    let hour = parse_component(hour, s)?;
    let minute = parse_component(minute, s)?;

    if hour >= 24 {
        return Err(EngineError::Format(format!("hour out of range in '{}'", s)));
    }
    if minute >= 60 {
        return Err(EngineError::Format(format!(
            "minute out of range in '{}'",
            s
        )));
    }

    Ok(hour * 60 + minute)
}

/// Format minutes since midnight as a zero-padded `"HH:MM"` string.
///
/// `1440` formats as `"24:00"`, which is how window ends at midnight print.
pub fn minutes_to_time(minutes: u32) -> String {
    format!("{:02}:{:02}", minutes / 60, minutes % 60)
}

fn parse_component(part: &str, whole: &str) -> Result<u32> {
    if part.is_empty() || part.len() > 2 || !part.bytes().all(|b| b.is_ascii_digit()) {
        return Err(EngineError::Format(format!(
            "expected HH:MM, got '{}'",
            whole
        )));
    }
    part.parse::<u32>()
        .map_err(|e| EngineError::Format(format!("'{}': {}", whole, e)))
}

/// Parse a window boundary, which may additionally be `"24:00"`.
fn boundary_to_minutes(s: &str) -> Result<u32> {
    if s.trim() == "24:00" {
        return Ok(MINUTES_PER_DAY);
    }
    time_to_minutes(s)
}

// ---------------------------------------------------------------------------
// TimeOfDay
// ---------------------------------------------------------------------------

/// A wall-clock time, stored as minutes since midnight (`0..1440`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TimeOfDay(u16);

impl TimeOfDay {
    pub const MIDNIGHT: TimeOfDay = TimeOfDay(0);

    /// Build from minutes since midnight.
    ///
    /// # Errors
    /// Returns `EngineError::Range` when `minutes >= 1440`.
    pub fn from_minutes(minutes: u32) -> Result<Self> {
        if minutes >= MINUTES_PER_DAY {
            return Err(EngineError::Range(format!(
                "{} minutes is past the end of the day",
                minutes
            )));
        }
        Ok(TimeOfDay(minutes as u16))
    }

    /// Build from hour and minute components.
    pub fn from_hm(hour: u32, minute: u32) -> Result<Self> {
        if hour >= 24 || minute >= 60 {
            return Err(EngineError::Format(format!(
                "{}:{} is not a valid time of day",
                hour, minute
            )));
        }
        Ok(TimeOfDay((hour * 60 + minute) as u16))
    }

    pub fn parse(s: &str) -> Result<Self> {
        time_to_minutes(s).map(|m| TimeOfDay(m as u16))
    }

    pub fn minutes(self) -> u32 {
        u32::from(self.0)
    }
}

impl fmt::Display for TimeOfDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&minutes_to_time(self.minutes()))
    }
}

impl FromStr for TimeOfDay {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self> {
        TimeOfDay::parse(s)
    }
}

impl TryFrom<String> for TimeOfDay {
    type Error = EngineError;

    fn try_from(s: String) -> Result<Self> {
        TimeOfDay::parse(&s)
    }
}

impl From<TimeOfDay> for String {
    fn from(t: TimeOfDay) -> Self {
        t.to_string()
    }
}

impl From<TimeOfDay> for NaiveTime {
    fn from(t: TimeOfDay) -> Self {
        NaiveTime::MIN + chrono::Duration::minutes(i64::from(t.0))
    }
}

// ---------------------------------------------------------------------------
// TimeBoundary
// ---------------------------------------------------------------------------

/// The end of a range within a day: any [`TimeOfDay`] or `"24:00"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TimeBoundary(u16);

impl TimeBoundary {
    pub const END_OF_DAY: TimeBoundary = TimeBoundary(MINUTES_PER_DAY as u16);

    /// # Errors
    /// Returns `EngineError::Range` when `minutes > 1440`.
    pub fn from_minutes(minutes: u32) -> Result<Self> {
        if minutes > MINUTES_PER_DAY {
            return Err(EngineError::Range(format!(
                "{} minutes is past the end of the day",
                minutes
            )));
        }
        Ok(TimeBoundary(minutes as u16))
    }

    pub fn parse(s: &str) -> Result<Self> {
        boundary_to_minutes(s).map(|m| TimeBoundary(m as u16))
    }

    pub fn minutes(self) -> u32 {
        u32::from(self.0)
    }
}

impl From<TimeOfDay> for TimeBoundary {
    fn from(t: TimeOfDay) -> Self {
        TimeBoundary(t.0)
    }
}

impl fmt::Display for TimeBoundary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&minutes_to_time(self.minutes()))
    }
}

impl FromStr for TimeBoundary {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self> {
        TimeBoundary::parse(s)
    }
}

impl TryFrom<String> for TimeBoundary {
    type Error = EngineError;

    fn try_from(s: String) -> Result<Self> {
        TimeBoundary::parse(&s)
    }
}

impl From<TimeBoundary> for String {
    fn from(t: TimeBoundary) -> Self {
        t.to_string()
    }
}

// ---------------------------------------------------------------------------
// DayOfWeek
// ---------------------------------------------------------------------------

/// A day of the week used for recurring slot configuration.
///
/// Canonical form is lower-case (`"monday"`); parsing is case-insensitive and
/// also accepts three-letter abbreviations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum DayOfWeek {
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
    Sunday,
}

impl DayOfWeek {
    /// All seven days, Monday first.
    pub const ALL: [DayOfWeek; 7] = [
        DayOfWeek::Monday,
        DayOfWeek::Tuesday,
        DayOfWeek::Wednesday,
        DayOfWeek::Thursday,
        DayOfWeek::Friday,
        DayOfWeek::Saturday,
        DayOfWeek::Sunday,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            DayOfWeek::Monday => "monday",
            DayOfWeek::Tuesday => "tuesday",
            DayOfWeek::Wednesday => "wednesday",
            DayOfWeek::Thursday => "thursday",
            DayOfWeek::Friday => "friday",
            DayOfWeek::Saturday => "saturday",
            DayOfWeek::Sunday => "sunday",
        }
    }

    /// The day of the week a calendar date falls on.
    pub fn of_date(date: NaiveDate) -> Self {
        date.weekday().into()
    }
}

impl fmt::Display for DayOfWeek {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DayOfWeek {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self> {
        let lower = s.trim().to_ascii_lowercase();
        DayOfWeek::ALL
            .into_iter()
            .find(|d| d.as_str() == lower || (lower.len() == 3 && d.as_str().starts_with(&lower)))
            .ok_or_else(|| EngineError::Format(format!("unknown day of week '{}'", s)))
    }
}

impl TryFrom<String> for DayOfWeek {
    type Error = EngineError;

    fn try_from(s: String) -> Result<Self> {
        s.parse()
    }
}

impl From<DayOfWeek> for String {
    fn from(d: DayOfWeek) -> Self {
        d.as_str().to_string()
    }
}

impl From<Weekday> for DayOfWeek {
    fn from(w: Weekday) -> Self {
        match w {
            Weekday::Mon => DayOfWeek::Monday,
            Weekday::Tue => DayOfWeek::Tuesday,
            Weekday::Wed => DayOfWeek::Wednesday,
            Weekday::Thu => DayOfWeek::Thursday,
            Weekday::Fri => DayOfWeek::Friday,
            Weekday::Sat => DayOfWeek::Saturday,
            Weekday::Sun => DayOfWeek::Sunday,
        }
    }
}

impl From<DayOfWeek> for Weekday {
    fn from(d: DayOfWeek) -> Self {
        match d {
            DayOfWeek::Monday => Weekday::Mon,
            DayOfWeek::Tuesday => Weekday::Tue,
            DayOfWeek::Wednesday => Weekday::Wed,
            DayOfWeek::Thursday => Weekday::Thu,
            DayOfWeek::Friday => Weekday::Fri,
            DayOfWeek::Saturday => Weekday::Sat,
            DayOfWeek::Sunday => Weekday::Sun,
        }
    }
}

// ---------------------------------------------------------------------------
// TimeWindow
// ---------------------------------------------------------------------------

/// A half-open window `[start, end)` in minutes since midnight.
///
/// `end` may be `1440` so that a window can run up to midnight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "WindowRepr", into = "WindowRepr")]
pub struct TimeWindow {
    start: u32,
    end: u32,
}

impl TimeWindow {
    /// # Errors
    /// Returns `EngineError::Range` if `end <= start` or `end > 1440`.
    pub fn new(start: u32, end: u32) -> Result<Self> {
        if end <= start {
            return Err(EngineError::Range(format!(
                "end time {} must be after start time {}",
                minutes_to_time(end),
                minutes_to_time(start)
            )));
        }
        if end > MINUTES_PER_DAY {
            return Err(EngineError::Range(format!(
                "window {}+{} runs past midnight",
                minutes_to_time(start),
                end - start
            )));
        }
        Ok(TimeWindow { start, end })
    }

    pub fn from_start_duration(start: TimeOfDay, duration: u32) -> Result<Self> {
        if duration == 0 {
            return Err(EngineError::Range("duration must be positive".to_string()));
        }
        let end = start.minutes().checked_add(duration).ok_or_else(|| {
            EngineError::Range(format!("{}-minute slot at {} runs past midnight", duration, start))
        })?;
        TimeWindow::new(start.minutes(), end)
    }

    /// Caller guarantees `duration > 0` and `start + duration <= 1440`.
    pub(crate) fn spanning(start: u32, duration: u32) -> Self {
        TimeWindow {
            start,
            end: start + duration,
        }
    }

    /// Parse `"HH:MM"` boundaries; `end` may be `"24:00"`.
    pub fn parse(start: &str, end: &str) -> Result<Self> {
        TimeWindow::new(time_to_minutes(start)?, boundary_to_minutes(end)?)
    }

    pub fn start(self) -> u32 {
        self.start
    }

    pub fn end(self) -> u32 {
        self.end
    }

    pub fn duration(self) -> u32 {
        self.end - self.start
    }

    pub fn overlaps(self, other: TimeWindow) -> bool {
        crate::overlap::overlaps(
            i64::from(self.start),
            i64::from(self.duration()),
            i64::from(other.start),
            i64::from(other.duration()),
        )
    }
}

impl fmt::Display for TimeWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}-{}",
            minutes_to_time(self.start),
            minutes_to_time(self.end)
        )
    }
}

#[derive(Serialize, Deserialize)]
struct WindowRepr {
    start: String,
    end: String,
}

impl TryFrom<WindowRepr> for TimeWindow {
    type Error = EngineError;

    fn try_from(repr: WindowRepr) -> Result<Self> {
        TimeWindow::parse(&repr.start, &repr.end)
    }
}

impl From<TimeWindow> for WindowRepr {
    fn from(w: TimeWindow) -> Self {
        WindowRepr {
            start: minutes_to_time(w.start),
            end: minutes_to_time(w.end),
        }
    }
}

// ---------------------------------------------------------------------------
// Zone
// ---------------------------------------------------------------------------

/// The organisation time zone every `TimeOfDay` is read in.
///
/// Only one zone is in use at a time; carrying it explicitly keeps the
/// conversion from stored UTC timestamps to wall-clock minutes in one place.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Zone(Tz);

impl Zone {
    pub fn new(tz: Tz) -> Self {
        Zone(tz)
    }

    pub fn tz(self) -> Tz {
        self.0
    }

    pub fn name(self) -> &'static str {
        self.0.name()
    }

    /// The local calendar date of an instant.
    pub fn local_date(self, instant: DateTime<Utc>) -> NaiveDate {
        instant.with_timezone(&self.0).date_naive()
    }

    /// Local wall-clock minutes since midnight of an instant.
    pub fn local_minute_of_day(self, instant: DateTime<Utc>) -> u32 {
        let local = instant.with_timezone(&self.0).time();
        (local - NaiveTime::MIN).num_minutes() as u32
    }

    /// Minutes between local midnight of `date` and `instant`.
    ///
    /// Negative for instants before that midnight, and `>= 1440` for
    /// instants on later days.
    pub fn minutes_from_local_midnight(self, instant: DateTime<Utc>, date: NaiveDate) -> i64 {
        let local = instant.with_timezone(&self.0).naive_local();
        (local - date.and_time(NaiveTime::MIN)).num_minutes()
    }

    /// Resolve a local wall-clock time on `date` to a UTC instant.
    ///
    /// Ambiguous times (DST fall-back) resolve to the earlier instant.
    ///
    /// # Errors
    /// Returns `EngineError::Format` when the local time does not exist
    /// (DST spring-forward gap).
    pub fn to_utc(self, date: NaiveDate, time: TimeOfDay) -> Result<DateTime<Utc>> {
        self.0
            .from_local_datetime(&date.and_time(time.into()))
            .earliest()
            .map(|dt| dt.with_timezone(&Utc))
            .ok_or_else(|| {
                EngineError::Format(format!(
                    "{} {} does not exist in {}",
                    date,
                    time,
                    self.name()
                ))
            })
    }
}

impl Default for Zone {
    fn default() -> Self {
        Zone(chrono_tz::UTC)
    }
}

impl fmt::Display for Zone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Zone {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self> {
        s.trim()
            .parse::<Tz>()
            .map(Zone)
            .map_err(|_| EngineError::Format(format!("unknown time zone '{}'", s)))
    }
}

/// Parse a `YYYY-MM-DD` calendar date.
///
/// # Errors
/// Returns `EngineError::Format` if the string is not a valid date.
pub fn parse_date(s: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
        .map_err(|e| EngineError::Format(format!("invalid date '{}': {}", s, e)))
}
