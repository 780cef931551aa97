//! Frame driver configuration.

use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Environment variable overriding [`TickConfig::time_step`].
pub const ENV_TIME_STEP: &str = "ENGINE_TIME_STEP";
/// Environment variable overriding [`TickConfig::tick_rate`].
pub const ENV_TICK_RATE: &str = "ENGINE_TICK_RATE";
/// Environment variable overriding [`TickConfig::max_ticks`].
pub const ENV_MAX_TICKS: &str = "ENGINE_MAX_TICKS";

/// Smallest positive fixed time step accepted, in seconds.
pub const MIN_TIME_STEP: f64 = 1e-6;

/// Configuration for the frame driver.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TickConfig {
    /// Simulated seconds per [`TimeStep`](engine_action::TimeStep). Zero or
    /// less means one variable-length step per update covering all
    /// accumulated time.
    pub time_step: f64,
    /// Target updates per second for [`TickLoop::run`](crate::TickLoop::run).
    pub tick_rate: f64,
    /// Maximum number of updates to run (0 = unlimited).
    pub max_ticks: u64,
}

impl Default for TickConfig {
    fn default() -> Self {
        Self {
            time_step: 1.0 / 60.0,
            tick_rate: 60.0,
            max_ticks: 0,
        }
    }
}

impl TickConfig {
    /// Override the simulated time step.
    #[must_use]
    pub fn with_time_step(mut self, seconds: f64) -> Self {
        self.time_step = seconds;
        self
    }

    /// Override the target update rate.
    #[must_use]
    pub fn with_tick_rate(mut self, rate: f64) -> Self {
        self.tick_rate = rate;
        self
    }

    /// Override the update limit.
    #[must_use]
    pub fn with_max_ticks(mut self, max_ticks: u64) -> Self {
        self.max_ticks = max_ticks;
        self
    }

    /// Defaults overridden by `ENGINE_*` environment variables.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if a variable is set but unparsable, or the
    /// result fails [`TickConfig::validate`].
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::default().with_overrides(|var| std::env::var(var).ok())
    }

    /// Apply overrides from `lookup`, which maps an `ENGINE_*` variable name
    /// to its value if set.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if a value is unparsable, or the result fails
    /// [`TickConfig::validate`].
    pub fn with_overrides<F>(mut self, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(time_step) = parse_var(&lookup, ENV_TIME_STEP)? {
            self.time_step = time_step;
        }
        if let Some(tick_rate) = parse_var(&lookup, ENV_TICK_RATE)? {
            self.tick_rate = tick_rate;
        }
        if let Some(max_ticks) = parse_var(&lookup, ENV_MAX_TICKS)? {
            self.max_ticks = max_ticks;
        }
        self.validate()?;
        Ok(self)
    }

    /// Check that the loop can run with these values.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] for a non-finite time step, a
    /// positive time step below [`MIN_TIME_STEP`], or a tick rate whose
    /// period isn't a representable [`Duration`].
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.time_step.is_finite() {
            return Err(ConfigError::InvalidValue {
                field: "time_step",
                reason: "must be finite",
            });
        }
        if self.time_step > 0.0 && self.time_step < MIN_TIME_STEP {
            return Err(ConfigError::InvalidValue {
                field: "time_step",
                reason: "must be zero, negative or at least one microsecond",
            });
        }
        self.tick_duration()?;
        Ok(())
    }

    /// Wall-clock budget of one update at [`tick_rate`](TickConfig::tick_rate).
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] unless the tick rate is a
    /// positive finite number with a representable period.
    pub fn tick_duration(&self) -> Result<Duration, ConfigError> {
        if !self.tick_rate.is_finite() || self.tick_rate <= 0.0 {
            return Err(ConfigError::InvalidValue {
                field: "tick_rate",
                reason: "must be a positive number",
            });
        }
        Duration::try_from_secs_f64(1.0 / self.tick_rate).map_err(|_| {
            ConfigError::InvalidValue {
                field: "tick_rate",
                reason: "period is too long",
            }
        })
    }

    /// Returns `true` if time is delivered in fixed-size steps.
    #[must_use]
    pub fn is_fixed_step(&self) -> bool {
        self.time_step > 0.0
    }
}

fn parse_var<T, F>(lookup: &F, var: &'static str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    let Some(value) = lookup(var) else {
        return Ok(None);
    };
    value
        .trim()
        .parse()
        .map(Some)
        .map_err(|_| ConfigError::InvalidEnv { var, value })
}
