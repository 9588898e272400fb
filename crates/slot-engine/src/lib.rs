//! # slot-engine
//!
//! Interview time-slot management for a hiring back office.
//!
//! The engine turns saved slot configuration into bookable windows, refuses
//! slots that collide with existing ones, positions interviews side by side
//! on a calendar grid, and checks a panelist's existing commitments before a
//! booking is confirmed. All times are wall-clock minutes in one organisation
//! [`Zone`](time::Zone).
//!
//! ## Modules
//!
//! - [`time`]: `"HH:MM"` ⇄ minutes, days of the week, windows, zone
//! - [`overlap`]: Half-open window overlap predicate
//! - [`slots`]: Slot configuration, expansion, single and bulk creation
//! - [`layout`]: Column packing of overlapping calendar events
//! - [`availability`]: Panelist conflict checks and stale-response guard
//! - [`store`]: Boundary traits for commitments and slot configuration
//! - [`config`]: TOML configuration
//! - [`error`]: Error types

pub mod availability;
pub mod config;
pub mod error;
pub mod layout;
pub mod overlap;
pub mod slots;
pub mod store;
pub mod time;

pub use availability::{
    evaluate_availability, AvailabilityChecker, AvailabilityMonitor, AvailabilityResult,
    AvailabilityState, Commitment, ProposedInterview,
};
pub use config::EngineConfig;
pub use error::EngineError;
pub use layout::{layout_day, layout_week, CalendarEvent, DayWindow, PositionedEvent};
pub use overlap::overlaps;
pub use slots::{
    add_slot, expand_slots, expand_working_hours, plan_bulk_slots, weekly_grid, BatchPolicy,
    BreakPeriod, BulkSlotRequest, SlotConfig, SlotConfiguration,
};
pub use time::{
    minutes_to_time, time_to_minutes, DayOfWeek, TimeBoundary, TimeOfDay, TimeWindow, Zone,
};
