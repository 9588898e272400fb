//! WASM bindings for slot-engine.
//!
//! Exposes time arithmetic, slot generation, calendar layout and availability
//! evaluation to the scheduling UI via `wasm-bindgen`. All complex types are
//! passed as JSON strings.
//!
//! ## Build process
//!
//! ```sh
//! cargo build -p slot-engine-wasm --target wasm32-unknown-unknown --release
//! wasm-bindgen --target web --out-dir packages/slot-engine-js/wasm/ \
//!   target/wasm32-unknown-unknown/release/slot_engine_wasm.wasm
//! ```

use serde::{Deserialize, Serialize};
use slot_engine::layout::{layout_records, EventRecord};
use slot_engine::slots::SlotConflict;
use slot_engine::{
    evaluate_availability, AvailabilityState, BatchPolicy, BulkSlotRequest, Commitment, DayOfWeek,
    DayWindow, EngineError, ProposedInterview, SlotConfig, SlotConfiguration, Zone,
};
use wasm_bindgen::prelude::*;

// ---------------------------------------------------------------------------
// Serde-friendly DTOs for crossing the WASM boundary as JSON
// ---------------------------------------------------------------------------

/// Error payload for conflicts, so the UI can list the clashing windows.
#[derive(Serialize)]
struct ConflictErrorDto<'a> {
    error: &'static str,
    day: DayOfWeek,
    conflicts: &'a [SlotConflict],
}

/// Proposal as submitted by the scheduling form.
#[derive(Deserialize)]
struct ProposalInput {
    panelist_email: String,
    date: String,
    start_time: String,
    end_time: String,
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn to_js_error(e: EngineError) -> JsValue {
    if let EngineError::Conflict { day, conflicts } = &e {
        let dto = ConflictErrorDto {
            error: "conflict",
            day: *day,
            conflicts,
        };
        if let Ok(json) = serde_json::to_string(&dto) {
            return JsValue::from_str(&json);
        }
    }
    JsValue::from_str(&e.to_string())
}

fn parse_json<T: for<'de> Deserialize<'de>>(json: &str, what: &str) -> Result<T, JsValue> {
    serde_json::from_str(json).map_err(|e| JsValue::from_str(&format!("Invalid {} JSON: {}", what, e)))
}

fn to_json<T: Serialize>(value: &T) -> Result<String, JsValue> {
    serde_json::to_string(value)
        .map_err(|e| JsValue::from_str(&format!("Serialization error: {}", e)))
}

fn parse_zone(timezone: Option<String>) -> Result<Zone, JsValue> {
    match timezone {
        Some(tz) => tz.parse().map_err(to_js_error),
        None => Ok(Zone::default()),
    }
}

// ---------------------------------------------------------------------------
// WASM exports
// ---------------------------------------------------------------------------

/// Convert `"HH:MM"` to minutes since midnight.
#[wasm_bindgen(js_name = "timeToMinutes")]
pub fn time_to_minutes(time: &str) -> Result<u32, JsValue> {
    slot_engine::time_to_minutes(time).map_err(to_js_error)
}

/// Convert minutes since midnight to `"HH:MM"`.
#[wasm_bindgen(js_name = "minutesToTime")]
pub fn minutes_to_time(minutes: u32) -> String {
    slot_engine::minutes_to_time(minutes)
}

/// Whether two windows, given as `"HH:MM"` start plus minutes, overlap.
#[wasm_bindgen(js_name = "overlaps")]
pub fn overlaps(
    start_a: &str,
    duration_a: u32,
    start_b: &str,
    duration_b: u32,
) -> Result<bool, JsValue> {
    let a = slot_engine::time_to_minutes(start_a).map_err(to_js_error)?;
    let b = slot_engine::time_to_minutes(start_b).map_err(to_js_error)?;
    Ok(slot_engine::overlaps(
        i64::from(a),
        i64::from(duration_a),
        i64::from(b),
        i64::from(duration_b),
    ))
}

/// Expand a JSON array of slot configs into display windows.
#[wasm_bindgen(js_name = "expandSlots")]
pub fn expand_slots(slots_json: &str) -> Result<String, JsValue> {
    let slots: Vec<SlotConfig> = parse_json(slots_json, "slots")?;
    to_json(&slot_engine::expand_slots(&slots))
}

/// Validate a full slot configuration and expand it into a Monday-first
/// weekly grid.
#[wasm_bindgen(js_name = "weeklyGrid")]
pub fn weekly_grid(configuration_json: &str) -> Result<String, JsValue> {
    let configuration: SlotConfiguration = parse_json(configuration_json, "configuration")?;
    configuration.validate().map_err(to_js_error)?;
    to_json(&slot_engine::weekly_grid(&configuration))
}

/// Plan a multi-day bulk slot creation.
///
/// `request_json` is `{days, start, end, duration}`; `existing_json` is a JSON
/// array of the slots already configured. On conflict the error is a JSON
/// string `{"error":"conflict","day":...,"conflicts":[...]}`.
#[wasm_bindgen(js_name = "planBulkSlots")]
pub fn plan_bulk_slots(
    request_json: &str,
    existing_json: &str,
    abort_batch_on_first_conflict: bool,
) -> Result<String, JsValue> {
    let request: BulkSlotRequest = parse_json(request_json, "bulk request")?;
    let existing: Vec<SlotConfig> = parse_json(existing_json, "slots")?;
    let policy = BatchPolicy::from_abort_flag(abort_batch_on_first_conflict);

    let outcome =
        slot_engine::plan_bulk_slots(&request, &existing, policy).map_err(to_js_error)?;
    to_json(&outcome)
}

/// Lay out one day of events.
///
/// `events_json` is an array of `{id, start, end, title, metadata}`; events
/// missing a start or title are dropped. `window_json` optionally overrides
/// `{start_hour, end_hour, px_per_hour, min_event_height_px}`.
#[wasm_bindgen(js_name = "layoutDay")]
pub fn layout_day(
    events_json: &str,
    window_json: Option<String>,
    timezone: Option<String>,
) -> Result<String, JsValue> {
    let records: Vec<EventRecord> = parse_json(events_json, "events")?;
    let window: DayWindow = match window_json {
        Some(json) => parse_json(&json, "day window")?,
        None => DayWindow::default(),
    };
    window.validate().map_err(to_js_error)?;
    let zone = parse_zone(timezone)?;

    to_json(&layout_records(records, &window, zone))
}

/// Evaluate a proposed interview against the panelist's commitments.
///
/// Returns the availability state as JSON (`{"state":"available",...}` or
/// `{"state":"unavailable",...,"conflicts":[...]}`). The commitments query
/// itself happens in JavaScript; a failed query should be shown as unknown
/// rather than passed here.
#[wasm_bindgen(js_name = "checkAvailability")]
pub fn check_availability(
    proposal_json: &str,
    commitments_json: &str,
    timezone: Option<String>,
) -> Result<String, JsValue> {
    let input: ProposalInput = parse_json(proposal_json, "proposal")?;
    let commitments: Vec<Commitment> = parse_json(commitments_json, "commitments")?;
    let zone = parse_zone(timezone)?;

    let proposal = ProposedInterview::parse(
        &input.panelist_email,
        &input.date,
        &input.start_time,
        &input.end_time,
    )
    .map_err(to_js_error)?;

    let result = evaluate_availability(&proposal, &commitments, zone).map_err(to_js_error)?;
    to_json(&AvailabilityState::from_result(result))
}
