//! TOML Configuration
//!
//! Centralized configuration for the display daemon, loadable from a TOML
//! file with every field defaulted. Values cover the listener address,
//! scheduling/cancellation timing, the framer's defensive cap, and
//! per-state schedule overrides.
//!
//! # Example Configuration
//!
//! ```toml
//! bind_addr = "127.0.0.1:4321"
//! poll_interval_ms = 50
//! grace_period_ms = 200
//! read_timeout_ms = 100
//! frame_period_ms = 40
//! default_state = "draw"
//! reaccept = true
//!
//! [[schedule]]
//! state = "victory"
//! class = "one_shot"
//! duration_ms = 2000
//! frame_ms = 25
//! ```

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

use crate::animator::{AnimationPlan, HandlerClass, ScheduleTable};
use crate::protocol::StateKind;

/// Fixed duration used when a one-shot entry omits `duration_ms`.
const DEFAULT_ONE_SHOT_MS: u64 = 2000;

/// Errors that can occur when loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read the config file
    #[error("failed to read config file at {path}: {source}")]
    Read {
        /// The path that was attempted
        path: PathBuf,
        /// The underlying IO error
        source: std::io::Error,
    },

    /// Failed to parse TOML
    #[error("failed to parse TOML config: {0}")]
    Parse(#[from] toml::de::Error),
}

/// One per-state schedule override.
#[derive(Clone, Debug, Deserialize)]
pub struct ScheduleEntry {
    /// Which state this entry overrides
    pub state: StateKind,
    /// Handler class for the state
    pub class: ScheduleClass,
    /// One-shot duration; ignored for continuous entries
    pub duration_ms: Option<u64>,
    /// Frame period override for this state
    pub frame_ms: Option<u64>,
}

/// Handler class as spelled in the config file.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScheduleClass {
    /// Loops until superseded
    Continuous,
    /// Runs once for a fixed duration, then yields to idle
    OneShot,
}

/// Display daemon configuration.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    /// Address the listener binds
    pub bind_addr: SocketAddr,
    /// Animator scheduling tick interval
    pub poll_interval_ms: u64,
    /// Grace period for cooperative cancellation
    pub grace_period_ms: u64,
    /// Listener per-read timeout
    pub read_timeout_ms: u64,
    /// Base per-frame period for all handlers
    pub frame_period_ms: u64,
    /// Framer cap on accumulated unterminated bytes
    pub max_pending_bytes: usize,
    /// Visual rendered for `Unknown` and the idle fallback
    pub default_state: StateKind,
    /// Re-accept after the match process disconnects
    pub reaccept: bool,
    /// Per-state schedule overrides
    pub schedule: Vec<ScheduleEntry>,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 4321)),
            poll_interval_ms: 50,
            grace_period_ms: 200,
            read_timeout_ms: 100,
            frame_period_ms: 40,
            max_pending_bytes: crate::protocol::DEFAULT_MAX_PENDING_BYTES,
            default_state: StateKind::Draw,
            reaccept: true,
            schedule: Vec::new(),
        }
    }
}

impl DisplayConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(toml::from_str(&contents)?)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn grace_period(&self) -> Duration {
        Duration::from_millis(self.grace_period_ms)
    }

    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }

    pub fn frame_period(&self) -> Duration {
        Duration::from_millis(self.frame_period_ms)
    }

    /// Build the animator's schedule table from the base frame period and
    /// the per-state overrides.
    pub fn schedule_table(&self) -> ScheduleTable {
        let mut table = ScheduleTable::all_continuous().with_fallback_period(self.frame_period());

        for entry in &self.schedule {
            let frame_period = entry
                .frame_ms
                .map(Duration::from_millis)
                .unwrap_or_else(|| self.frame_period());
            let class = match entry.class {
                ScheduleClass::Continuous => HandlerClass::Continuous,
                ScheduleClass::OneShot => HandlerClass::OneShot(Duration::from_millis(
                    entry.duration_ms.unwrap_or(DEFAULT_ONE_SHOT_MS),
                )),
            };
            table.insert(
                entry.state,
                AnimationPlan {
                    class,
                    frame_period,
                },
            );
        }
        table
    }
}
