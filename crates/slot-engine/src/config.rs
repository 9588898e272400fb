//! Engine configuration, loaded from TOML with environment overrides.
//!
//! ```toml
//! timezone = "Europe/Paris"
//!
//! [layout]
//! start_hour = 8
//! end_hour = 20
//! px_per_hour = 60.0
//! min_event_height_px = 40.0
//!
//! [scheduling]
//! abort_batch_on_first_conflict = true
//! default_slot_duration = 30
//! ```
//!
//! Every key is optional. `SLOT_ENGINE_TIMEZONE` overrides `timezone`.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{EngineError, Result};
use crate::layout::DayWindow;
use crate::slots::BatchPolicy;
use crate::time::Zone;

/// Environment variable overriding the configured time zone.
pub const TIMEZONE_ENV: &str = "SLOT_ENGINE_TIMEZONE";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulingConfig {
    pub abort_batch_on_first_conflict: bool,
    /// Minutes, used when a bulk request gives no duration.
    pub default_slot_duration: u32,
}

impl Default for SchedulingConfig {
    fn default() -> Self {
        Self {
            abort_batch_on_first_conflict: true,
            default_slot_duration: 30,
        }
    }
}

impl SchedulingConfig {
    pub fn batch_policy(&self) -> BatchPolicy {
        BatchPolicy::from_abort_flag(self.abort_batch_on_first_conflict)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub timezone: Zone,
    pub layout: DayWindow,
    pub scheduling: SchedulingConfig,
}

impl EngineConfig {
    /// Parse and validate a TOML document.
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let config: EngineConfig =
            toml::from_str(s).map_err(|e| EngineError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load from an optional TOML file, then apply environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config = match path {
            Some(path) => {
                let text = std::fs::read_to_string(path).map_err(|e| {
                    EngineError::Config(format!("cannot read {}: {}", path.display(), e))
                })?;
                Self::from_toml_str(&text)?
            }
            None => Self::default(),
        };
        config.with_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from a key lookup (normally the process environment).
    pub fn with_overrides<F>(mut self, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(tz) = lookup(TIMEZONE_ENV) {
            self.timezone = tz
                .parse()
                .map_err(|e: EngineError| EngineError::Config(e.to_string()))?;
        }
        Ok(self)
    }

    pub fn validate(&self) -> Result<()> {
        self.layout.validate()?;
        if self.scheduling.default_slot_duration == 0 {
            return Err(EngineError::Config(
                "default_slot_duration must be positive".to_string(),
            ));
        }
        Ok(())
    }
}
