//! # engine_scene
//!
//! Delivers actions to agents.
//!
//! This crate provides:
//!
//! - [`Scene`]: ordered agents, the pending action queue and the drain pass.
//! - [`TickLoop`]: frame driver turning clock time into [`TimeStep`]
//!   actions and watching for [`EndScene`].
//! - [`Clock`], [`MonotonicClock`], [`ManualClock`]: time sources.
//! - [`ActionSource`]: producers polled once per update.
//! - [`TickConfig`]: frame driver configuration with `ENGINE_*` overrides.
//!
//! [`TimeStep`]: engine_action::TimeStep
//! [`EndScene`]: engine_action::EndScene

pub mod clock;
pub mod config;
pub mod error;
pub mod scene;
pub mod source;
pub mod tick;

pub use clock::{Clock, ManualClock, MonotonicClock};
pub use config::{ENV_MAX_TICKS, ENV_TICK_RATE, ENV_TIME_STEP, MIN_TIME_STEP, TickConfig};
pub use error::{ConfigError, SceneError};
pub use scene::{DrainReport, Scene, ScenePhase};
pub use source::ActionSource;
pub use tick::{MAX_STEPS_PER_UPDATE, TickLoop};
