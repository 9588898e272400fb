//! Panelist availability -- checks a proposed interview against the
//! panelist's existing commitments.
//!
//! The check is advisory: it is a point-in-time read with no reservation.
//! Two schedulers can still book the same panelist into overlapping
//! windows; only the booking write in the persistence layer can prevent
//! that.
//!
//! A failed commitments query yields [`AvailabilityState::Error`], which is
//! distinct from [`AvailabilityState::Unavailable`]: an unchecked slot must
//! never be presented as free.

use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tracing::{debug, warn};

use crate::error::{EngineError, Result};
use crate::overlap::overlaps;
use crate::store::CommitmentSource;
use crate::time::{minutes_to_time, parse_date, TimeOfDay, Zone, MINUTES_PER_DAY};

/// Canonical form of a panelist email for comparisons.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_ascii_lowercase()
}

/// An interview a panelist is already committed to.
///
/// When it overlaps a proposal it is reported back as a conflict.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Commitment {
    pub job_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub job_title: Option<String>,
    pub candidate_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub candidate_name: Option<String>,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl Commitment {
    /// `"HH:MM-HH:MM"` in the organisation zone.
    ///
    /// The end is measured from the start's local midnight, so a commitment
    /// ending at the following midnight prints as `"24:00"`.
    pub fn window_label(&self, zone: Zone) -> String {
        let date = zone.local_date(self.start);
        let end = zone.minutes_from_local_midnight(self.end, date);
        let end = if end == i64::from(MINUTES_PER_DAY) {
            MINUTES_PER_DAY
        } else {
            zone.local_minute_of_day(self.end)
        };
        format!(
            "{}-{}",
            minutes_to_time(zone.local_minute_of_day(self.start)),
            minutes_to_time(end)
        )
    }
}

/// A proposed interview for one panelist.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProposedInterview {
    pub panelist_email: String,
    pub date: NaiveDate,
    pub start_time: TimeOfDay,
    pub end_time: TimeOfDay,
}

impl ProposedInterview {
    /// # Errors
    /// Returns `EngineError::Range` if `end_time <= start_time`.
    pub fn new(
        panelist_email: &str,
        date: NaiveDate,
        start_time: TimeOfDay,
        end_time: TimeOfDay,
    ) -> Result<Self> {
        let proposal = Self {
            panelist_email: normalize_email(panelist_email),
            date,
            start_time,
            end_time,
        };
        proposal.validate()?;
        Ok(proposal)
    }

    /// Build from the strings a scheduling form submits.
    ///
    /// # Errors
    /// `EngineError::Format` for a malformed date or time, then
    /// `EngineError::Range` as in [`ProposedInterview::new`].
    pub fn parse(panelist_email: &str, date: &str, start_time: &str, end_time: &str) -> Result<Self> {
        Self::new(
            panelist_email,
            parse_date(date)?,
            TimeOfDay::parse(start_time)?,
            TimeOfDay::parse(end_time)?,
        )
    }

    pub fn validate(&self) -> Result<()> {
        if self.panelist_email.trim().is_empty() {
            return Err(EngineError::Format("panelist email is empty".to_string()));
        }
        if self.end_time <= self.start_time {
            return Err(EngineError::Range(format!(
                "end time {} must be after start time {}",
                self.end_time, self.start_time
            )));
        }
        Ok(())
    }

    pub fn duration_minutes(&self) -> u32 {
        self.end_time.minutes() - self.start_time.minutes()
    }
}

/// Outcome of a completed availability check.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AvailabilityResult {
    pub panelist_email: String,
    pub is_available: bool,
    pub conflicts: Vec<Commitment>,
}

/// Evaluate a proposal against known commitments.
///
/// Every commitment is projected onto the proposal's local day in `zone` and
/// tested with the half-open overlap predicate, so a commitment ending
/// exactly when the proposal starts is not a conflict.
///
/// # Errors
/// Propagates [`ProposedInterview::validate`] failures.
pub fn evaluate_availability(
    proposal: &ProposedInterview,
    commitments: &[Commitment],
    zone: Zone,
) -> Result<AvailabilityResult> {
    proposal.validate()?;

    let start = i64::from(proposal.start_time.minutes());
    let duration = i64::from(proposal.duration_minutes());

    let conflicts: Vec<Commitment> = commitments
        .iter()
        .filter(|c| {
            let c_start = zone.minutes_from_local_midnight(c.start, proposal.date);
            let c_duration = (c.end - c.start).num_minutes();
            c_duration > 0 && overlaps(start, duration, c_start, c_duration)
        })
        .cloned()
        .collect();

    Ok(AvailabilityResult {
        panelist_email: normalize_email(&proposal.panelist_email),
        is_available: conflicts.is_empty(),
        conflicts,
    })
}

/// What a scheduling screen shows for a proposal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum AvailabilityState {
    /// Nothing proposed yet.
    Idle,
    /// A commitments query is in flight.
    Checking,
    Available(AvailabilityResult),
    Unavailable(AvailabilityResult),
    /// The query failed; availability is unknown.
    Error { message: String },
}

impl AvailabilityState {
    pub fn from_result(result: AvailabilityResult) -> Self {
        if result.is_available {
            AvailabilityState::Available(result)
        } else {
            AvailabilityState::Unavailable(result)
        }
    }

    /// Only a completed check with no conflicts counts as free.
    pub fn is_confirmed_available(&self) -> bool {
        matches!(self, AvailabilityState::Available(_))
    }
}

/// Runs availability checks against a [`CommitmentSource`].
#[derive(Debug)]
pub struct AvailabilityChecker<S> {
    source: S,
    zone: Zone,
}

impl<S: CommitmentSource> AvailabilityChecker<S> {
    pub fn new(source: S, zone: Zone) -> Self {
        Self { source, zone }
    }

    pub fn zone(&self) -> Zone {
        self.zone
    }

    /// Query the panelist's commitments and evaluate the proposal.
    ///
    /// # Errors
    /// Validation errors (`Format`, `Range`) are returned before any query
    /// is made. A failed query is not an error here: it is reported as
    /// [`AvailabilityState::Error`].
    pub async fn check(&self, proposal: &ProposedInterview) -> Result<AvailabilityState> {
        proposal.validate()?;

        let commitments = match self
            .source
            .fetch_panelist_commitments(
                &proposal.panelist_email,
                proposal.date,
                proposal.start_time,
                proposal.end_time,
            )
            .await
        {
            Ok(commitments) => commitments,
            Err(e) => {
                let err = match e {
                    EngineError::AvailabilityQuery(_) => e,
                    other => EngineError::AvailabilityQuery(other.to_string()),
                };
                warn!(panelist = %proposal.panelist_email, error = %err, "availability unverified");
                return Ok(AvailabilityState::Error {
                    message: err.to_string(),
                });
            }
        };

        let result = evaluate_availability(proposal, &commitments, self.zone)?;
        debug!(
            panelist = %result.panelist_email,
            conflicts = result.conflicts.len(),
            "availability checked"
        );
        Ok(AvailabilityState::from_result(result))
    }
}

/// Holds the availability state of the proposal currently being edited.
///
/// Each [`refresh`](AvailabilityMonitor::refresh) takes a new generation
/// number; a response is published only if no newer refresh has started
/// since, so a slow answer for an old proposal can never overwrite the state
/// of the current one.
#[derive(Debug)]
pub struct AvailabilityMonitor<S> {
    checker: AvailabilityChecker<S>,
    generation: AtomicU64,
    state: watch::Sender<AvailabilityState>,
}

impl<S: CommitmentSource> AvailabilityMonitor<S> {
    pub fn new(checker: AvailabilityChecker<S>) -> Self {
        let (state, _) = watch::channel(AvailabilityState::Idle);
        Self {
            checker,
            generation: AtomicU64::new(0),
            state,
        }
    }

    /// Current state snapshot.
    pub fn current(&self) -> AvailabilityState {
        self.state.borrow().clone()
    }

    /// Receive every published state change.
    pub fn subscribe(&self) -> watch::Receiver<AvailabilityState> {
        self.state.subscribe()
    }

    /// Generation of the most recent refresh.
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    /// Re-check after the proposal changed.
    ///
    /// Publishes `Checking`, awaits the check, then publishes the outcome
    /// unless superseded. Returns the published state, or `None` when the
    /// response was stale and discarded.
    ///
    /// # Errors
    /// Validation errors are returned and the state is reset to `Idle`
    /// (unless superseded).
    pub async fn refresh(&self, proposal: &ProposedInterview) -> Result<Option<AvailabilityState>> {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        self.state.send_replace(AvailabilityState::Checking);

        let outcome = self.checker.check(proposal).await;
        let next = match &outcome {
            Ok(state) => state.clone(),
            Err(_) => AvailabilityState::Idle,
        };

        let published = self.state.send_if_modified(|current| {
            if self.generation.load(Ordering::SeqCst) != generation {
                return false;
            }
            *current = next.clone();
            true
        });

        if !published {
            debug!(generation, "discarding stale availability response");
            return outcome.map(|_| None);
        }
        outcome.map(Some)
    }
}
