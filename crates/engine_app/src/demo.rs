//! Demo agents and producers.

use engine_action::{Action, ActionQueue, EndScene, TimeStep};
use engine_agent::{AgentError, Behaviour, ReactionContext, Reactions};
use tracing::{debug, info};

/// Produced by [`heartbeat_source`] every few ticks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Heartbeat {
    pub beat: u64,
}

impl Action for Heartbeat {}

/// Ends the scene once enough simulated time has passed.
#[derive(Debug, Clone, PartialEq)]
pub struct Stopwatch {
    elapsed: f64,
    run_for: f64,
    exit_code: i32,
    fired: bool,
}

impl Stopwatch {
    #[must_use]
    pub fn new(run_for: f64, exit_code: i32) -> Self {
        Self {
            elapsed: 0.0,
            run_for,
            exit_code,
            fired: false,
        }
    }

    #[must_use]
    pub fn elapsed(&self) -> f64 {
        self.elapsed
    }

    fn on_time_step(&mut self, step: &TimeStep, ctx: &mut ReactionContext) {
        self.elapsed += step.elapsed_time();
        if !self.fired && self.elapsed >= self.run_for {
            self.fired = true;
            info!(elapsed = self.elapsed, exit_code = self.exit_code, "stopwatch expired");
            ctx.emit(EndScene::new(self.exit_code));
        }
    }
}

impl Behaviour for Stopwatch {
    fn register_reactions(reactions: &mut Reactions<Self>) -> Result<(), AgentError> {
        reactions.register_with_context(Self::on_time_step)
    }
}

/// Counts heartbeats.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct BeatCounter {
    pub beats: u64,
}

impl BeatCounter {
    fn on_heartbeat(&mut self, heartbeat: &Heartbeat) {
        self.beats += 1;
        debug!(beat = heartbeat.beat, "heartbeat");
    }
}

impl Behaviour for BeatCounter {
    fn register_reactions(reactions: &mut Reactions<Self>) -> Result<(), AgentError> {
        reactions.register(Self::on_heartbeat)
    }
}

/// A source that emits a [`Heartbeat`] on every `every`-th poll.
pub fn heartbeat_source(every: u64) -> impl FnMut(&mut ActionQueue) {
    let every = every.max(1);
    let mut polls = 0u64;
    move |queue: &mut ActionQueue| {
        polls += 1;
        if polls % every == 0 {
            queue.push(Heartbeat { beat: polls / every });
        }
    }
}
