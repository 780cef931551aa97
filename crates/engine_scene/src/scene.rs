//! The scene: ordered agents, pending actions and the drain pass.
//!
//! A [`Scene`] owns every agent taking part in a simulation and the queue of
//! actions waiting to be delivered. Each tick moves through
//! `Idle -> Collecting -> Draining -> Idle`:
//!
//! 1. Producers [`enqueue`](Scene::enqueue) actions (Collecting).
//! 2. [`drain`](Scene::drain) delivers every pending action, in FIFO order,
//!    to every agent, in the order the agents were added. The outer loop is
//!    over actions: all agents see `a1` before any agent sees `a2`.
//! 3. Spawns, despawns and registry changes requested by reactions are
//!    applied after the last delivery, in request order. Actions emitted by
//!    reactions are queued for the next drain.

use engine_action::{Action, ActionQueue, AnyAction};
use engine_agent::{Agent, AgentId, AnyAgent, BoundAgent, Command, ReactionContext};
use tracing::{debug, info, trace, warn};
use uuid::Uuid;

use crate::error::SceneError;

/// Where the scene is in its tick cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScenePhase {
    /// Nothing pending.
    Idle,
    /// Actions are pending delivery.
    Collecting,
    /// A drain pass is delivering actions.
    Draining,
}

/// Summary of one drain pass.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct DrainReport {
    /// Sequence number of the pass, starting at 1.
    pub pass: u64,
    /// Actions delivered.
    pub actions: usize,
    /// (action, agent) pairs where a reaction ran.
    pub deliveries: usize,
    /// (action, agent) pairs where the agent had no matching reaction.
    pub misses: usize,
    /// Actions emitted by reactions, now pending for the next pass.
    pub emitted: usize,
    /// Deferred commands applied after the pass.
    pub applied_commands: usize,
    /// Deferred commands that could not be applied.
    pub failures: Vec<SceneError>,
}

/// An ordered collection of agents and the actions pending for them.
#[derive(Debug)]
pub struct Scene {
    /// Identifies this scene in logs.
    instance_id: Uuid,
    /// The ID the next added or spawned agent receives.
    next_agent: AgentId,
    /// Live agents in dispatch order. IDs are handed out in increasing order
    /// and agents are only appended, so this is also sorted by ID.
    agents: Vec<BoundAgent>,
    /// Actions waiting for the next drain, front first.
    pending: ActionQueue,
    phase: ScenePhase,
    /// Number of drain passes run so far.
    passes: u64,
}

impl Scene {
    /// Create a new empty scene.
    #[must_use]
    pub fn new() -> Self {
        let instance_id = Uuid::new_v4();
        debug!(scene = %instance_id, "scene created");
        Self {
            instance_id,
            next_agent: AgentId::FIRST,
            agents: Vec::new(),
            pending: ActionQueue::new(),
            phase: ScenePhase::Idle,
            passes: 0,
        }
    }

    /// Returns the unique instance ID of this scene.
    #[must_use]
    pub fn instance_id(&self) -> Uuid {
        self.instance_id
    }

    /// Returns the current phase.
    #[must_use]
    pub fn phase(&self) -> ScenePhase {
        self.phase
    }

    // -- Agents --

    /// Add an agent at the end of the dispatch order and return its new ID.
    ///
    /// # Errors
    ///
    /// Returns [`SceneError::AlreadyInScene`] if the agent is already bound
    /// to an ID.
    pub fn add_agent<S: 'static>(&mut self, agent: Agent<S>) -> Result<AgentId, SceneError> {
        self.add_boxed(Box::new(agent))
    }

    /// Add an already type-erased agent. See [`Scene::add_agent`].
    ///
    /// # Errors
    ///
    /// Returns [`SceneError::AlreadyInScene`] if the agent is already bound
    /// to an ID.
    pub fn add_boxed(&mut self, agent: Box<dyn AnyAgent>) -> Result<AgentId, SceneError> {
        let id = self.next_agent;
        self.insert(id, agent)?;
        Ok(id)
    }

    /// Bind `agent` to `id` and append it. `id` must not be below any live
    /// agent's ID.
    fn insert(&mut self, id: AgentId, agent: Box<dyn AnyAgent>) -> Result<(), SceneError> {
        if agent.id().is_valid() {
            return Err(SceneError::AlreadyInScene(agent.id()));
        }

        info!(
            scene = %self.instance_id,
            agent = %id,
            kind = agent.name(),
            reactions = agent.reaction_count(),
            "agent added"
        );
        self.agents.push(BoundAgent::bind(agent, id));
        self.next_agent = self.next_agent.max(id.next());
        Ok(())
    }

    /// Remove an agent, returning it unbound so it can join a scene again.
    ///
    /// The relative order of the remaining agents is unchanged.
    pub fn remove_agent(&mut self, id: AgentId) -> Option<Box<dyn AnyAgent>> {
        let index = self.index_of(id)?;
        let agent = self.agents.remove(index).unbind();
        info!(scene = %self.instance_id, agent = %id, "agent removed");
        Some(agent)
    }

    /// Returns `true` if an agent with this ID is in the scene.
    #[must_use]
    pub fn contains_agent(&self, id: AgentId) -> bool {
        self.index_of(id).is_some()
    }

    /// Returns the state of agent `id` if it is of type `S`.
    #[must_use]
    pub fn agent<S: 'static>(&self, id: AgentId) -> Option<&S> {
        let index = self.index_of(id)?;
        self.agents[index].agent().state::<S>()
    }

    /// Returns the state of agent `id` mutably if it is of type `S`.
    pub fn agent_mut<S: 'static>(&mut self, id: AgentId) -> Option<&mut S> {
        let index = self.index_of(id)?;
        self.agents[index].agent_mut().state_mut::<S>()
    }

    /// Returns the type-erased agent `id`.
    #[must_use]
    pub fn handle(&self, id: AgentId) -> Option<&dyn AnyAgent> {
        let index = self.index_of(id)?;
        Some(self.agents[index].agent())
    }

    /// Returns the IDs of all agents in dispatch order.
    pub fn agent_ids(&self) -> impl Iterator<Item = AgentId> + '_ {
        self.agents.iter().map(BoundAgent::id)
    }

    /// Returns the number of live agents.
    #[must_use]
    pub fn agent_count(&self) -> usize {
        self.agents.len()
    }

    fn index_of(&self, id: AgentId) -> Option<usize> {
        self.agents
            .binary_search_by_key(&id, BoundAgent::id)
            .ok()
    }

    // -- Actions --

    /// Queue an action for the next drain.
    pub fn enqueue<A: Action>(&mut self, action: A) {
        self.pending.push(action);
        self.phase = ScenePhase::Collecting;
    }

    /// Queue an already boxed action for the next drain.
    pub fn enqueue_boxed(&mut self, action: Box<dyn AnyAction>) {
        self.pending.push_boxed(action);
        self.phase = ScenePhase::Collecting;
    }

    /// Move every action from `actions` to the back of the pending queue.
    pub fn enqueue_all(&mut self, actions: &mut ActionQueue) {
        if actions.is_empty() {
            return;
        }
        self.pending.append(actions);
        self.phase = ScenePhase::Collecting;
    }

    /// Returns the number of actions waiting for the next drain.
    #[must_use]
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Deliver every pending action to every agent.
    ///
    /// Only the actions pending when the pass starts are delivered. Never
    /// fails: deferred commands that can't be applied are logged and
    /// returned in [`DrainReport::failures`].
    pub fn drain(&mut self) -> DrainReport {
        self.passes += 1;
        self.phase = ScenePhase::Draining;

        let mut report = DrainReport {
            pass: self.passes,
            ..DrainReport::default()
        };
        let mut batch = std::mem::take(&mut self.pending);
        let mut ctx = ReactionContext::for_pass(self.passes, self.next_agent);

        for action in batch.drain() {
            let action: &dyn AnyAction = action.as_ref();
            report.actions += 1;

            let mut hits = 0usize;
            for agent in &mut self.agents {
                if agent.try_dispatch(action, &mut ctx) {
                    hits += 1;
                }
            }
            report.deliveries += hits;
            report.misses += self.agents.len() - hits;
            trace!(
                pass = ctx.pass(),
                action = action.name(),
                key = action.identity().index(),
                hits,
                "action delivered"
            );
        }

        for command in ctx.take_commands() {
            match self.apply(command) {
                Ok(()) => report.applied_commands += 1,
                Err(err) => {
                    warn!(
                        scene = %self.instance_id,
                        pass = self.passes,
                        error = %err,
                        "deferred command failed"
                    );
                    report.failures.push(err);
                }
            }
        }

        // IDs reserved by spawns that failed are not handed out again.
        self.next_agent = self.next_agent.max(ctx.next_agent());

        let mut emitted = ctx.take_emitted();
        report.emitted = emitted.len();
        self.pending.append(&mut emitted);

        self.phase = if self.pending.is_empty() {
            ScenePhase::Idle
        } else {
            ScenePhase::Collecting
        };

        debug!(
            scene = %self.instance_id,
            pass = report.pass,
            actions = report.actions,
            deliveries = report.deliveries,
            emitted = report.emitted,
            commands = report.applied_commands,
            "drain pass complete"
        );
        report
    }

    fn apply(&mut self, command: Command) -> Result<(), SceneError> {
        match command {
            Command::Spawn { agent, spawned } => self.insert(agent, spawned),
            Command::Despawn(id) => self
                .remove_agent(id)
                .map(|_| ())
                .ok_or(SceneError::UnknownAgent(id)),
            Command::Configure { agent, apply } => {
                let index = self.index_of(agent).ok_or(SceneError::UnknownAgent(agent))?;
                self.agents[index].configure(apply).map_err(SceneError::from)
            }
        }
    }
}

impl Default for Scene {
    fn default() -> Self {
        Self::new()
    }
}
