//! Boundary traits for the data the engine reads and writes, with in-memory
//! implementations.
//!
//! The engine never owns persistence: interview commitments and slot
//! configuration live in an external service reached through these traits.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::debug;

use crate::availability::{normalize_email, Commitment};
use crate::error::Result;
use crate::slots::SlotConfiguration;
use crate::time::{TimeOfDay, Zone};

/// Read access to panelists' existing interview commitments.
#[async_trait]
pub trait CommitmentSource: Send + Sync {
    /// Commitments of `panelist_email` on `date` that may overlap
    /// `[start, end)`.
    ///
    /// Implementations may return a superset; callers re-check every
    /// returned commitment for overlap.
    async fn fetch_panelist_commitments(
        &self,
        panelist_email: &str,
        date: NaiveDate,
        start: TimeOfDay,
        end: TimeOfDay,
    ) -> Result<Vec<Commitment>>;
}

#[async_trait]
impl<T: CommitmentSource + ?Sized> CommitmentSource for Arc<T> {
    async fn fetch_panelist_commitments(
        &self,
        panelist_email: &str,
        date: NaiveDate,
        start: TimeOfDay,
        end: TimeOfDay,
    ) -> Result<Vec<Commitment>> {
        (**self)
            .fetch_panelist_commitments(panelist_email, date, start, end)
            .await
    }
}

/// Which configuration a slot setup belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Scope {
    /// The organisation-wide default.
    Organization,
    /// A single job's override.
    Job(String),
}

impl std::fmt::Display for Scope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Scope::Organization => f.write_str("organization"),
            Scope::Job(id) => write!(f, "job:{}", id),
        }
    }
}

/// Read/write access to saved slot configuration.
#[async_trait]
pub trait SlotConfigStore: Send + Sync {
    /// The configuration saved for `scope`, if any.
    async fn fetch_slot_configuration(&self, scope: &Scope) -> Result<Option<SlotConfiguration>>;

    /// Replace the whole configuration of `scope`. Idempotent.
    async fn save_slot_configuration(
        &self,
        scope: &Scope,
        configuration: &SlotConfiguration,
    ) -> Result<()>;
}

/// Validate a configuration and only then hand it to the store.
pub async fn save_validated<S: SlotConfigStore + ?Sized>(
    store: &S,
    scope: &Scope,
    configuration: &SlotConfiguration,
) -> Result<()> {
    configuration.validate()?;
    store.save_slot_configuration(scope, configuration).await
}

/// The configuration in effect for a job: its own override if saved,
/// otherwise the organisation default, otherwise an empty configuration.
pub async fn resolve_slot_configuration<S: SlotConfigStore + ?Sized>(
    store: &S,
    job_id: Option<&str>,
) -> Result<SlotConfiguration> {
    if let Some(job_id) = job_id {
        let scope = Scope::Job(job_id.to_string());
        if let Some(configuration) = store.fetch_slot_configuration(&scope).await? {
            return Ok(configuration);
        }
        debug!(job_id, "no job override, using organization default");
    }
    Ok(store
        .fetch_slot_configuration(&Scope::Organization)
        .await?
        .unwrap_or_default())
}

// ---------------------------------------------------------------------------
// In-memory implementations
// ---------------------------------------------------------------------------

/// Commitments held in memory, keyed by normalised panelist email.
///
/// Returns every commitment starting on the requested local date and leaves
/// overlap filtering to the caller.
#[derive(Debug, Default)]
pub struct InMemoryCommitments {
    zone: Zone,
    entries: RwLock<HashMap<String, Vec<Commitment>>>,
}

impl InMemoryCommitments {
    pub fn new(zone: Zone) -> Self {
        Self {
            zone,
            entries: RwLock::new(HashMap::new()),
        }
    }

    pub fn with_commitments<I>(zone: Zone, commitments: I) -> Self
    where
        I: IntoIterator<Item = (String, Commitment)>,
    {
        let mut entries: HashMap<String, Vec<Commitment>> = HashMap::new();
        for (email, commitment) in commitments {
            entries
                .entry(normalize_email(&email))
                .or_default()
                .push(commitment);
        }
        Self {
            zone,
            entries: RwLock::new(entries),
        }
    }

    pub async fn insert(&self, panelist_email: &str, commitment: Commitment) {
        self.entries
            .write()
            .await
            .entry(normalize_email(panelist_email))
            .or_default()
            .push(commitment);
    }
}

#[async_trait]
impl CommitmentSource for InMemoryCommitments {
    async fn fetch_panelist_commitments(
        &self,
        panelist_email: &str,
        date: NaiveDate,
        _start: TimeOfDay,
        _end: TimeOfDay,
    ) -> Result<Vec<Commitment>> {
        let entries = self.entries.read().await;
        Ok(entries
            .get(&normalize_email(panelist_email))
            .map(|list| {
                list.iter()
                    .filter(|c| self.zone.local_date(c.start) == date)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }
}

/// Slot configurations held in memory.
#[derive(Debug, Default)]
pub struct InMemorySlotStore {
    scopes: RwLock<HashMap<Scope, SlotConfiguration>>,
}

impl InMemorySlotStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SlotConfigStore for InMemorySlotStore {
    async fn fetch_slot_configuration(&self, scope: &Scope) -> Result<Option<SlotConfiguration>> {
        Ok(self.scopes.read().await.get(scope).cloned())
    }

    async fn save_slot_configuration(
        &self,
        scope: &Scope,
        configuration: &SlotConfiguration,
    ) -> Result<()> {
        self.scopes
            .write()
            .await
            .insert(scope.clone(), configuration.clone());
        debug!(%scope, slots = configuration.slots.len(), "saved slot configuration");
        Ok(())
    }
}
