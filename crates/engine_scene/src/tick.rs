//! Frame driver.
//!
//! Each [`TickLoop::update`]:
//!
//! 1. Polls every [`ActionSource`] into the scene's queue, behind anything
//!    emitted during the previous update.
//! 2. Reads the clock and turns accumulated time into [`TimeStep`] actions.
//! 3. Drains the scene.
//!
//! The loop installs an [`EndSceneListener`] as the scene's first agent and
//! consults it to decide when to stop.

use std::fmt;
use std::time::Instant;

use engine_action::{ActionQueue, TimeStep};
use engine_agent::{Agent, AgentId, EndSceneListener};
use tracing::{debug, info, warn};

use crate::clock::{Clock, MonotonicClock};
use crate::config::TickConfig;
use crate::error::SceneError;
use crate::scene::{DrainReport, Scene};
use crate::source::ActionSource;

/// Most fixed steps one update hands out. Whole steps beyond this are
/// dropped so a stalled clock can't flood the scene.
pub const MAX_STEPS_PER_UPDATE: usize = 240;

/// Drives a [`Scene`] from a clock and a set of action sources.
pub struct TickLoop<C: Clock = MonotonicClock> {
    /// Current tick counter.
    tick_id: u64,
    config: TickConfig,
    scene: Scene,
    clock: C,
    /// Producers polled at the start of every update, in registration order.
    sources: Vec<Box<dyn ActionSource>>,
    /// The installed end listener.
    end_listener: AgentId,
    /// Time not yet handed out as a [`TimeStep`].
    accumulated: f64,
    /// Set by [`TickLoop::pause`]; the next clock reading is discarded.
    paused: bool,
}

impl TickLoop<MonotonicClock> {
    /// Create a tick loop driven by wall-clock time.
    ///
    /// # Errors
    ///
    /// Returns [`SceneError::Config`] if `config` fails
    /// [`TickConfig::validate`], or another [`SceneError`] if the end
    /// listener can't be installed.
    pub fn new(config: TickConfig) -> Result<Self, SceneError> {
        Self::with_clock(config, MonotonicClock::new())
    }
}

impl<C: Clock> TickLoop<C> {
    /// Create a tick loop driven by `clock`.
    ///
    /// # Errors
    ///
    /// Returns [`SceneError::Config`] if `config` fails
    /// [`TickConfig::validate`], or another [`SceneError`] if the end
    /// listener can't be installed.
    pub fn with_clock(config: TickConfig, clock: C) -> Result<Self, SceneError> {
        config.validate()?;
        let mut scene = Scene::new();
        let end_listener = scene.add_agent(Agent::from_behaviour(EndSceneListener::new())?)?;
        Ok(Self {
            tick_id: 0,
            config,
            scene,
            clock,
            sources: Vec::new(),
            end_listener,
            accumulated: 0.0,
            paused: false,
        })
    }

    /// Returns the current tick counter.
    #[must_use]
    pub fn tick_id(&self) -> u64 {
        self.tick_id
    }

    #[must_use]
    pub fn config(&self) -> &TickConfig {
        &self.config
    }

    #[must_use]
    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    pub fn scene_mut(&mut self) -> &mut Scene {
        &mut self.scene
    }

    pub fn clock_mut(&mut self) -> &mut C {
        &mut self.clock
    }

    /// Returns the ID of the installed [`EndSceneListener`].
    #[must_use]
    pub fn end_listener(&self) -> AgentId {
        self.end_listener
    }

    /// Add a producer polled at the start of every update.
    pub fn add_source<P: ActionSource + 'static>(&mut self, source: P) {
        self.sources.push(Box::new(source));
    }

    /// Run one update: collect, step time, drain.
    pub fn update(&mut self) -> DrainReport {
        self.tick_id += 1;

        let mut collected = ActionQueue::new();
        for source in &mut self.sources {
            source.collect(&mut collected);
        }
        let produced = collected.len();
        self.scene.enqueue_all(&mut collected);

        let elapsed = self.clock.elapsed_since_last();
        if self.paused {
            self.paused = false;
        } else {
            self.accumulated += elapsed.max(0.0);
        }
        let steps = self.enqueue_time_steps();

        let report = self.scene.drain();
        debug!(
            tick_id = self.tick_id,
            produced,
            steps,
            carried = self.accumulated,
            deliveries = report.deliveries,
            "update complete"
        );
        report
    }

    /// Turn accumulated time into [`TimeStep`] actions and return how many
    /// were queued.
    fn enqueue_time_steps(&mut self) -> usize {
        let time_step = self.config.time_step;
        if !self.config.is_fixed_step() {
            if self.accumulated <= 0.0 {
                return 0;
            }
            self.scene.enqueue(TimeStep::new(self.accumulated));
            self.accumulated = 0.0;
            return 1;
        }

        let whole = (self.accumulated / time_step).floor();
        if whole < 1.0 {
            return 0;
        }
        self.accumulated = (self.accumulated - whole * time_step).max(0.0);

        let steps = if whole > MAX_STEPS_PER_UPDATE as f64 {
            warn!(
                tick_id = self.tick_id,
                dropped = whole - MAX_STEPS_PER_UPDATE as f64,
                "too many time steps in one update"
            );
            MAX_STEPS_PER_UPDATE
        } else {
            whole as usize
        };
        for _ in 0..steps {
            self.scene.enqueue(TimeStep::new(time_step));
        }
        steps
    }

    /// Stop accumulating time until the next [`update`](TickLoop::update).
    ///
    /// Time up to this call still counts.
    pub fn pause(&mut self) {
        if !self.paused {
            self.accumulated += self.clock.elapsed_since_last().max(0.0);
            self.paused = true;
        }
    }

    /// Returns `true` once an [`EndScene`](engine_action::EndScene) has been
    /// delivered.
    #[must_use]
    pub fn has_ended(&self) -> bool {
        self.listener().is_some_and(EndSceneListener::scene_has_ended)
    }

    /// Returns the exit code of the ended scene.
    ///
    /// # Errors
    ///
    /// Returns [`SceneError::NotEnded`] if the scene is still running.
    pub fn exit_code(&self) -> Result<i32, SceneError> {
        match self.listener() {
            Some(listener) if listener.scene_has_ended() => Ok(listener.exit_code()),
            _ => Err(SceneError::NotEnded),
        }
    }

    fn listener(&self) -> Option<&EndSceneListener> {
        self.scene.agent::<EndSceneListener>(self.end_listener)
    }

    /// Update at the configured tick rate until the scene ends or
    /// `max_ticks` updates have run, and return the exit code.
    ///
    /// This is a blocking loop.
    ///
    /// # Errors
    ///
    /// Returns [`SceneError::NotEnded`] if the tick limit was reached first.
    pub fn run(&mut self) -> Result<i32, SceneError> {
        let tick_duration = self.config.tick_duration()?;
        let mut tick_count = 0u64;

        info!(
            tick_rate = self.config.tick_rate,
            time_step = self.config.time_step,
            max_ticks = self.config.max_ticks,
            "starting tick loop"
        );

        loop {
            let start = Instant::now();
            self.update();
            tick_count += 1;

            if self.has_ended() {
                info!(ticks = tick_count, "scene ended");
                break;
            }
            if self.config.max_ticks > 0 && tick_count >= self.config.max_ticks {
                info!(ticks = tick_count, "tick limit reached");
                break;
            }

            let elapsed = start.elapsed();
            if elapsed < tick_duration {
                std::thread::sleep(tick_duration - elapsed);
            } else {
                warn!(
                    tick_id = self.tick_id,
                    elapsed_ms = elapsed.as_millis() as u64,
                    budget_ms = tick_duration.as_millis() as u64,
                    "tick exceeded time budget"
                );
            }
        }

        self.exit_code()
    }
}

impl<C: Clock + fmt::Debug> fmt::Debug for TickLoop<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TickLoop")
            .field("tick_id", &self.tick_id)
            .field("config", &self.config)
            .field("scene", &self.scene)
            .field("clock", &self.clock)
            .field("sources", &self.sources.len())
            .field("end_listener", &self.end_listener)
            .field("accumulated", &self.accumulated)
            .field("paused", &self.paused)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use engine_action::EndScene;
    use engine_agent::ReactionContext;

    use super::*;
    use crate::clock::ManualClock;
    use crate::error::ConfigError;

    #[derive(Debug, Default)]
    struct Steps {
        seen: Vec<f64>,
    }

    fn manual_loop(time_step: f64) -> (TickLoop<ManualClock>, AgentId) {
        let config = TickConfig::default().with_time_step(time_step);
        let mut tick_loop = TickLoop::with_clock(config, ManualClock::new()).unwrap();
        let steps = Agent::new(Steps::default())
            .with_reaction(|steps: &mut Steps, step: &TimeStep| {
                steps.seen.push(step.elapsed_time());
            })
            .unwrap();
        let id = tick_loop.scene_mut().add_agent(steps).unwrap();
        (tick_loop, id)
    }

    fn seen(tick_loop: &TickLoop<ManualClock>, id: AgentId) -> Vec<f64> {
        tick_loop.scene().agent::<Steps>(id).unwrap().seen.clone()
    }

    #[test]
    fn test_update_advances_counter() {
        let (mut tick_loop, _) = manual_loop(0.25);
        assert_eq!(tick_loop.tick_id(), 0);
        tick_loop.update();
        tick_loop.update();
        assert_eq!(tick_loop.tick_id(), 2);
    }

    #[test]
    fn test_end_listener_installed_first() {
        let (tick_loop, id) = manual_loop(0.25);
        let ids: Vec<AgentId> = tick_loop.scene().agent_ids().collect();
        assert_eq!(ids, vec![tick_loop.end_listener(), id]);
    }

    #[test]
    fn test_fixed_step_carries_remainder() {
        let (mut tick_loop, id) = manual_loop(0.25);

        tick_loop.clock_mut().advance(0.625);
        tick_loop.update();
        assert_eq!(seen(&tick_loop, id), vec![0.25, 0.25]);

        // 0.125 carried + 0.125 new makes one more whole step.
        tick_loop.clock_mut().advance(0.125);
        tick_loop.update();
        assert_eq!(seen(&tick_loop, id), vec![0.25, 0.25, 0.25]);
    }

    #[test]
    fn test_fixed_step_with_decimal_step() {
        let (mut tick_loop, id) = manual_loop(0.1);
        tick_loop.clock_mut().advance(0.35);
        tick_loop.update();

        let steps = seen(&tick_loop, id);
        assert_eq!(steps.len(), 3);
        assert!(steps.iter().all(|&dt| (dt - 0.1).abs() < 1e-12));
        assert!((tick_loop.accumulated - 0.05).abs() < 1e-9);
    }

    #[test]
    fn test_fixed_steps_capped_per_update() {
        let (mut tick_loop, id) = manual_loop(1.0 / 1024.0);
        tick_loop.clock_mut().advance(1024.0);
        tick_loop.update();
        assert_eq!(seen(&tick_loop, id).len(), MAX_STEPS_PER_UPDATE);
        assert_eq!(tick_loop.accumulated, 0.0);

        // The dropped time doesn't come back on later updates.
        tick_loop.clock_mut().advance(0.0015);
        tick_loop.update();
        assert_eq!(seen(&tick_loop, id).len(), MAX_STEPS_PER_UPDATE + 1);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = TickConfig::default().with_tick_rate(0.0);
        let err = TickLoop::with_clock(config, ManualClock::new()).unwrap_err();
        assert!(matches!(
            err,
            SceneError::Config(ConfigError::InvalidValue { field: "tick_rate", .. })
        ));

        let config = TickConfig::default().with_time_step(1e-12);
        assert!(TickLoop::with_clock(config, ManualClock::new()).is_err());
    }

    #[test]
    fn test_variable_step_hands_out_everything() {
        let (mut tick_loop, id) = manual_loop(0.0);

        // Nothing elapsed, nothing delivered.
        tick_loop.update();
        assert!(seen(&tick_loop, id).is_empty());

        tick_loop.clock_mut().advance(0.375);
        tick_loop.update();
        assert_eq!(seen(&tick_loop, id), vec![0.375]);
        assert_eq!(tick_loop.accumulated, 0.0);
    }

    #[test]
    fn test_pause_discards_time_until_next_update() {
        let (mut tick_loop, id) = manual_loop(0.0);

        tick_loop.clock_mut().advance(0.5);
        tick_loop.pause();
        tick_loop.clock_mut().advance(4.0);
        tick_loop.update();
        assert_eq!(seen(&tick_loop, id), vec![0.5]);

        tick_loop.clock_mut().advance(0.25);
        tick_loop.update();
        assert_eq!(seen(&tick_loop, id), vec![0.5, 0.25]);
    }

    #[test]
    fn test_sources_polled_before_time_steps() {
        #[derive(Debug)]
        struct Ping;
        impl engine_action::Action for Ping {}

        let (mut tick_loop, _) = manual_loop(0.5);
        tick_loop.add_source(|queue: &mut ActionQueue| queue.push(Ping));

        let order = Agent::new(Vec::<&'static str>::new())
            .with_reaction(|log: &mut Vec<&'static str>, _: &Ping| log.push("ping"))
            .unwrap()
            .with_reaction(|log: &mut Vec<&'static str>, _: &TimeStep| log.push("step"))
            .unwrap();
        let id = tick_loop.scene_mut().add_agent(order).unwrap();

        tick_loop.clock_mut().advance(0.5);
        let report = tick_loop.update();
        assert_eq!(report.actions, 2);
        assert_eq!(
            tick_loop.scene().agent::<Vec<&'static str>>(id).unwrap(),
            &vec!["ping", "step"]
        );
    }

    #[test]
    fn test_exit_code_before_end_is_error() {
        let (mut tick_loop, _) = manual_loop(0.25);
        assert!(!tick_loop.has_ended());
        assert_eq!(tick_loop.exit_code(), Err(SceneError::NotEnded));

        tick_loop.scene_mut().enqueue(EndScene::new(4));
        tick_loop.update();
        assert!(tick_loop.has_ended());
        assert_eq!(tick_loop.exit_code(), Ok(4));
    }

    #[test]
    fn test_run_stops_when_scene_ends() {
        let config = TickConfig::default()
            .with_time_step(0.25)
            .with_tick_rate(1000.0)
            .with_max_ticks(100);
        let mut tick_loop = TickLoop::with_clock(config, ManualClock::with_step(0.25)).unwrap();
        let timer = Agent::new(0.0f64)
            .with_context_reaction(|total: &mut f64, step: &TimeStep, ctx: &mut ReactionContext| {
                *total += step.elapsed_time();
                if *total >= 1.0 {
                    ctx.emit(EndScene::new(3));
                }
            })
            .unwrap();
        tick_loop.scene_mut().add_agent(timer).unwrap();

        // Four steps to reach 1.0, one more update to deliver the emitted end.
        assert_eq!(tick_loop.run(), Ok(3));
        assert_eq!(tick_loop.tick_id(), 5);
    }

    #[test]
    fn test_run_limited_ticks() {
        let config = TickConfig::default()
            .with_tick_rate(1000.0)
            .with_max_ticks(5);
        let mut tick_loop = TickLoop::with_clock(config, ManualClock::new()).unwrap();
        assert_eq!(tick_loop.run(), Err(SceneError::NotEnded));
        assert_eq!(tick_loop.tick_id(), 5);
    }
}
