//! Per-pass context handed to reactions.
//!
//! Reactions run while the scene is iterating its agents, so they can't
//! touch the agent collection or any registry directly. Instead they record
//! what they want in a [`ReactionContext`]; the scene applies the recorded
//! [`Command`]s and enqueues the emitted actions once the pass is over.

use std::any::type_name;
use std::fmt;

use engine_action::{Action, ActionQueue};

use crate::agent::{Agent, AnyAgent};
use crate::error::AgentError;
use crate::id::AgentId;

type Configure = Box<dyn FnOnce(AgentId, &mut dyn AnyAgent) -> Result<(), AgentError>>;

/// A scene change requested from inside a reaction.
pub enum Command {
    /// Add an agent at the end of the dispatch order under a reserved ID.
    Spawn {
        /// The ID reserved when the spawn was requested.
        agent: AgentId,
        /// The agent to add.
        spawned: Box<dyn AnyAgent>,
    },
    /// Remove an agent.
    Despawn(AgentId),
    /// Run a configuration step (usually a registry change) against an agent.
    Configure {
        /// The targeted agent.
        agent: AgentId,
        /// The step to run, given the agent's scene ID.
        apply: Configure,
    },
}

impl Command {
    /// Returns the agent this command creates, removes or changes.
    #[must_use]
    pub fn target(&self) -> AgentId {
        match self {
            Command::Spawn { agent, .. }
            | Command::Despawn(agent)
            | Command::Configure { agent, .. } => *agent,
        }
    }
}

impl fmt::Debug for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Command::Spawn { agent, spawned } => f
                .debug_struct("Spawn")
                .field("agent", agent)
                .field("kind", &spawned.name())
                .finish(),
            Command::Despawn(agent) => f.debug_tuple("Despawn").field(agent).finish(),
            Command::Configure { agent, .. } => f
                .debug_struct("Configure")
                .field("agent", agent)
                .finish_non_exhaustive(),
        }
    }
}

/// Context provided to a reaction while a drain pass is running.
///
/// Collects emitted actions and deferred commands from every reaction in
/// the pass. The scene drains both after the last agent has seen the last
/// action.
#[derive(Debug)]
pub struct ReactionContext {
    /// The drain pass this context belongs to.
    pass: u64,
    /// The agent whose reaction is currently running.
    agent: AgentId,
    /// The ID the next spawn will reserve.
    next_agent: AgentId,
    /// Actions emitted during the pass, for the next drain.
    emitted: ActionQueue,
    /// Deferred scene and registry changes, in request order.
    commands: Vec<Command>,
}

impl ReactionContext {
    /// Create a context outside of any pass.
    #[must_use]
    pub fn new() -> Self {
        Self::for_pass(0, AgentId::FIRST)
    }

    /// Create a context for drain pass `pass`. Spawns reserve IDs starting
    /// at `next_agent`.
    #[must_use]
    pub fn for_pass(pass: u64, next_agent: AgentId) -> Self {
        Self {
            pass,
            agent: AgentId::INVALID,
            next_agent,
            emitted: ActionQueue::new(),
            commands: Vec::new(),
        }
    }

    /// The drain pass this context belongs to.
    #[must_use]
    pub fn pass(&self) -> u64 {
        self.pass
    }

    /// The agent whose reaction is running.
    #[must_use]
    pub fn agent(&self) -> AgentId {
        self.agent
    }

    pub(crate) fn set_agent(&mut self, agent: AgentId) {
        self.agent = agent;
    }

    /// The ID the next spawn will reserve. Scenes resume allocation here
    /// after the pass.
    #[must_use]
    pub fn next_agent(&self) -> AgentId {
        self.next_agent
    }

    /// Emit an action. It is delivered by the next drain, not the current one.
    pub fn emit<A: Action>(&mut self, action: A) {
        self.emitted.push(action);
    }

    /// Add `agent` to the scene once the pass is over, returning the ID it
    /// will have. Later commands in the same pass may target that ID.
    pub fn spawn<S: 'static>(&mut self, agent: Agent<S>) -> AgentId {
        let id = self.next_agent;
        self.next_agent = id.next();
        self.commands.push(Command::Spawn {
            agent: id,
            spawned: Box::new(agent),
        });
        id
    }

    /// Remove `agent` from the scene once the pass is over.
    pub fn despawn(&mut self, agent: AgentId) {
        self.commands.push(Command::Despawn(agent));
    }

    /// Run `apply` against `agent` once the pass is over.
    ///
    /// The agent's state must be of type `S`; otherwise the command fails
    /// with [`AgentError::StateMismatch`] when applied.
    pub fn configure<S, F>(&mut self, agent: AgentId, apply: F)
    where
        S: 'static,
        F: FnOnce(&mut Agent<S>) -> Result<(), AgentError> + 'static,
    {
        let apply: Configure = Box::new(move |id: AgentId, target: &mut dyn AnyAgent| {
            match target.downcast_mut::<S>() {
                Some(agent) => apply(agent),
                None => Err(AgentError::StateMismatch {
                    agent: id,
                    expected: type_name::<S>(),
                }),
            }
        });
        self.commands.push(Command::Configure { agent, apply });
    }

    /// Take the actions emitted so far.
    pub fn take_emitted(&mut self) -> ActionQueue {
        std::mem::take(&mut self.emitted)
    }

    /// Take the deferred commands recorded so far, in request order.
    pub fn take_commands(&mut self) -> Vec<Command> {
        std::mem::take(&mut self.commands)
    }

    /// Returns `true` if nothing was emitted or requested.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.emitted.is_empty() && self.commands.is_empty()
    }
}

impl Default for ReactionContext {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use engine_action::{EndScene, TimeStep};

    use super::*;

    #[test]
    fn test_context_creation() {
        let ctx = ReactionContext::for_pass(3, AgentId::from_raw(10));
        assert_eq!(ctx.pass(), 3);
        assert_eq!(ctx.next_agent(), AgentId::from_raw(10));
        assert_eq!(ctx.agent(), AgentId::INVALID);
        assert!(ctx.is_empty());
    }

    #[test]
    fn test_commands_keep_request_order() {
        let mut ctx = ReactionContext::for_pass(1, AgentId::from_raw(5));
        ctx.despawn(AgentId::from_raw(4));
        let spawned = ctx.spawn(Agent::new(0u32));
        ctx.configure::<u32, _>(spawned, |_| Ok(()));

        let commands = ctx.take_commands();
        let targets: Vec<AgentId> = commands.iter().map(Command::target).collect();
        assert_eq!(
            targets,
            vec![AgentId::from_raw(4), AgentId::from_raw(5), AgentId::from_raw(5)]
        );
        assert!(ctx.is_empty());
    }

    #[test]
    fn test_spawn_reserves_increasing_ids() {
        let mut ctx = ReactionContext::for_pass(1, AgentId::from_raw(3));
        let first = ctx.spawn(Agent::new(()));
        let second = ctx.spawn(Agent::new(()));
        assert_eq!(first, AgentId::from_raw(3));
        assert_eq!(second, AgentId::from_raw(4));
        assert_eq!(ctx.next_agent(), AgentId::from_raw(5));
    }

    #[test]
    fn test_configure_checks_state_type() {
        let mut ctx = ReactionContext::new();
        ctx.configure::<String, _>(AgentId::from_raw(1), |agent| {
            agent.register(|_: &mut String, _: &TimeStep| {})
        });

        let mut agent: Box<dyn AnyAgent> = Box::new(Agent::new(5u8));
        let Some(Command::Configure { apply, .. }) = ctx.take_commands().pop() else {
            panic!("expected a configure command");
        };
        let err = apply(AgentId::from_raw(1), agent.as_mut()).unwrap_err();
        assert!(matches!(err, AgentError::StateMismatch { expected, .. } if expected.contains("String")));
    }

    #[test]
    fn test_take_emitted() {
        let mut ctx = ReactionContext::new();
        ctx.emit(TimeStep::new(0.5));
        ctx.emit(EndScene::new(1));

        let emitted = ctx.take_emitted();
        assert_eq!(emitted.len(), 2);
        assert!(emitted.front().unwrap().is::<TimeStep>());
        assert!(ctx.take_emitted().is_empty());
    }
}
