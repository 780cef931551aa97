//! Agents: domain state composed with a reaction registry.
//!
//! An [`Agent<S>`] pairs arbitrary state `S` with the [`Reactions<S>`] that
//! act on it. Keeping the two side by side (rather than the registry living
//! inside `S`) lets a dispatch borrow the registry and the state at the same
//! time. The scene stores agents behind the object-safe [`AnyAgent`] so
//! agents with different state types share one ordered collection.
//!
//! # Examples
//!
//! ```rust
//! use engine_action::TimeStep;
//! use engine_agent::{Agent, AnyAgent, ReactionContext};
//!
//! #[derive(Debug, Default)]
//! struct Clock {
//!     seconds: f64,
//! }
//!
//! impl Clock {
//!     fn advance(&mut self, step: &TimeStep) {
//!         self.seconds += step.elapsed_time();
//!     }
//! }
//!
//! let mut agent = Agent::new(Clock::default())
//!     .with_reaction(Clock::advance)
//!     .unwrap();
//!
//! let mut ctx = ReactionContext::new();
//! assert!(agent.try_dispatch(&TimeStep::new(0.5), &mut ctx));
//! assert_eq!(agent.state().seconds, 0.5);
//! ```

use std::any::{Any, type_name};
use std::fmt;

use engine_action::{Action, AnyAction, TypeKey};

use crate::context::ReactionContext;
use crate::error::AgentError;
use crate::id::AgentId;
use crate::reaction::Reactions;

/// State types that bind their own reactions when they become agents.
///
/// The counterpart of registering handlers in a constructor: see
/// [`Agent::from_behaviour`].
pub trait Behaviour: Sized + 'static {
    /// Register this type's reactions.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::DuplicateReaction`] if two reactions target the
    /// same action kind.
    fn register_reactions(reactions: &mut Reactions<Self>) -> Result<(), AgentError>;
}

/// An agent: domain state plus the reactions bound to it.
#[derive(Debug)]
pub struct Agent<S> {
    /// Scene-assigned identifier, [`AgentId::INVALID`] until added to a scene.
    id: AgentId,
    /// Domain state the reactions operate on.
    state: S,
    /// Reactions keyed by action kind.
    reactions: Reactions<S>,
}

impl<S: 'static> Agent<S> {
    /// Create an agent with no reactions.
    #[must_use]
    pub fn new(state: S) -> Self {
        Self {
            id: AgentId::INVALID,
            state,
            reactions: Reactions::new(),
        }
    }

    /// Returns the agent's identifier.
    #[must_use]
    pub fn id(&self) -> AgentId {
        self.id
    }

    /// Returns the agent's state.
    #[must_use]
    pub fn state(&self) -> &S {
        &self.state
    }

    /// Returns the agent's state mutably.
    pub fn state_mut(&mut self) -> &mut S {
        &mut self.state
    }

    /// Returns the agent's reaction registry.
    #[must_use]
    pub fn reactions(&self) -> &Reactions<S> {
        &self.reactions
    }

    /// Register a reaction to actions of kind `A`.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::DuplicateReaction`] if the agent already reacts
    /// to `A`.
    pub fn register<A, F>(&mut self, handler: F) -> Result<(), AgentError>
    where
        A: Action,
        F: FnMut(&mut S, &A) + 'static,
    {
        self.reactions.register(handler)
    }

    /// Register a reaction that also receives the [`ReactionContext`].
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::DuplicateReaction`] if the agent already reacts
    /// to `A`.
    pub fn register_with_context<A, F>(&mut self, handler: F) -> Result<(), AgentError>
    where
        A: Action,
        F: FnMut(&mut S, &A, &mut ReactionContext) + 'static,
    {
        self.reactions.register_with_context(handler)
    }

    /// Builder form of [`Agent::register`].
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::DuplicateReaction`] if the agent already reacts
    /// to `A`.
    pub fn with_reaction<A, F>(mut self, handler: F) -> Result<Self, AgentError>
    where
        A: Action,
        F: FnMut(&mut S, &A) + 'static,
    {
        self.register(handler)?;
        Ok(self)
    }

    /// Builder form of [`Agent::register_with_context`].
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::DuplicateReaction`] if the agent already reacts
    /// to `A`.
    pub fn with_context_reaction<A, F>(mut self, handler: F) -> Result<Self, AgentError>
    where
        A: Action,
        F: FnMut(&mut S, &A, &mut ReactionContext) + 'static,
    {
        self.register_with_context(handler)?;
        Ok(self)
    }

    /// Remove the reaction for `key`. Returns `true` if one was removed.
    pub fn unregister(&mut self, key: TypeKey) -> bool {
        self.reactions.unregister(key)
    }

    /// Remove the reaction for action kind `A`. Returns `true` if one was
    /// removed.
    pub fn unregister_action<A: Action>(&mut self) -> bool {
        self.reactions.unregister_action::<A>()
    }
}

impl<S: Behaviour> Agent<S> {
    /// Create an agent whose reactions are registered by `S` itself.
    ///
    /// # Errors
    ///
    /// Propagates any registration error from
    /// [`Behaviour::register_reactions`].
    pub fn from_behaviour(state: S) -> Result<Self, AgentError> {
        let mut agent = Self::new(state);
        S::register_reactions(&mut agent.reactions)?;
        Ok(agent)
    }
}

/// Object-safe view of an agent, as held by a scene.
pub trait AnyAgent {
    /// Returns the agent's identifier.
    fn id(&self) -> AgentId;

    /// Record the identifier the owning scene assigned. Only reachable
    /// through [`BoundAgent`], which holds the token.
    fn bind(&mut self, id: AgentId, token: BindToken);

    /// Type name of the agent's state.
    fn name(&self) -> &'static str;

    /// Deliver `action` to the matching reaction, if any.
    ///
    /// Returns `true` if a reaction ran, `false` on a miss.
    fn try_dispatch(&mut self, action: &dyn AnyAction, ctx: &mut ReactionContext) -> bool;

    /// Returns `true` if the agent reacts to `key`.
    fn reacts_to(&self, key: TypeKey) -> bool;

    /// Returns the number of registered reactions.
    fn reaction_count(&self) -> usize;

    /// Upcast for downcasting.
    fn as_any(&self) -> &dyn Any;

    /// Upcast for mutable downcasting.
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<S: 'static> AnyAgent for Agent<S> {
    fn id(&self) -> AgentId {
        self.id
    }

    fn bind(&mut self, id: AgentId, _: BindToken) {
        self.id = id;
        self.reactions.set_owner(id);
    }

    fn name(&self) -> &'static str {
        type_name::<S>()
    }

    fn try_dispatch(&mut self, action: &dyn AnyAction, ctx: &mut ReactionContext) -> bool {
        self.reactions.try_dispatch(&mut self.state, action, ctx)
    }

    fn reacts_to(&self, key: TypeKey) -> bool {
        self.reactions.contains(key)
    }

    fn reaction_count(&self) -> usize {
        self.reactions.len()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

impl dyn AnyAgent + '_ {
    /// Returns the agent if its state is of type `S`.
    #[must_use]
    pub fn downcast_ref<S: 'static>(&self) -> Option<&Agent<S>> {
        self.as_any().downcast_ref::<Agent<S>>()
    }

    /// Returns the agent mutably if its state is of type `S`.
    #[must_use]
    pub fn downcast_mut<S: 'static>(&mut self) -> Option<&mut Agent<S>> {
        self.as_any_mut().downcast_mut::<Agent<S>>()
    }

    /// Returns the agent's state if it is of type `S`.
    #[must_use]
    pub fn state<S: 'static>(&self) -> Option<&S> {
        self.downcast_ref::<S>().map(Agent::state)
    }

    /// Returns the agent's state mutably if it is of type `S`.
    #[must_use]
    pub fn state_mut<S: 'static>(&mut self) -> Option<&mut S> {
        self.downcast_mut::<S>().map(Agent::state_mut)
    }
}

impl fmt::Debug for dyn AnyAgent + '_ {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AnyAgent")
            .field("id", &self.id())
            .field("name", &self.name())
            .field("reactions", &self.reaction_count())
            .finish()
    }
}

/// Permission to call [`AnyAgent::bind`]. Only this crate can create one.
#[derive(Debug)]
pub struct BindToken(());

/// An agent together with the ID its scene assigned.
///
/// The scene looks agents up by the ID stored here, never by what the agent
/// reports about itself.
#[derive(Debug)]
pub struct BoundAgent {
    id: AgentId,
    agent: Box<dyn AnyAgent>,
}

impl BoundAgent {
    /// Bind `agent` to `id`.
    #[must_use]
    pub fn bind(mut agent: Box<dyn AnyAgent>, id: AgentId) -> Self {
        agent.bind(id, BindToken(()));
        Self { id, agent }
    }

    #[must_use]
    pub fn id(&self) -> AgentId {
        self.id
    }

    #[must_use]
    pub fn agent(&self) -> &dyn AnyAgent {
        self.agent.as_ref()
    }

    pub fn agent_mut(&mut self) -> &mut dyn AnyAgent {
        self.agent.as_mut()
    }

    /// Deliver `action` with the context pointing at this agent.
    pub fn try_dispatch(&mut self, action: &dyn AnyAction, ctx: &mut ReactionContext) -> bool {
        ctx.set_agent(self.id);
        self.agent.try_dispatch(action, ctx)
    }

    /// Run `apply` against the agent. The agent stays bound to this ID even
    /// if `apply` swaps it for another one.
    pub fn configure<F>(&mut self, apply: F) -> Result<(), AgentError>
    where
        F: FnOnce(AgentId, &mut dyn AnyAgent) -> Result<(), AgentError>,
    {
        let result = apply(self.id, self.agent.as_mut());
        self.agent.bind(self.id, BindToken(()));
        result
    }

    /// Release the agent, unbound, so it can join a scene again.
    #[must_use]
    pub fn unbind(mut self) -> Box<dyn AnyAgent> {
        self.agent.bind(AgentId::INVALID, BindToken(()));
        self.agent
    }
}

#[cfg(test)]
mod tests {
    use engine_action::{EndScene, TimeStep};

    use super::*;

    #[derive(Debug, Default)]
    struct Odometer {
        distance: f64,
        resets: u32,
    }

    impl Odometer {
        fn advance(&mut self, step: &TimeStep) {
            self.distance += step.elapsed_time() * 10.0;
        }

        fn reset(&mut self, _: &EndScene) {
            self.distance = 0.0;
            self.resets += 1;
        }
    }

    impl Behaviour for Odometer {
        fn register_reactions(reactions: &mut Reactions<Self>) -> Result<(), AgentError> {
            reactions.register(Self::advance)?;
            reactions.register(Self::reset)
        }
    }

    #[test]
    fn test_from_behaviour_binds_reactions() {
        let mut agent = Agent::from_behaviour(Odometer::default()).unwrap();
        assert_eq!(agent.reactions().len(), 2);

        let mut ctx = ReactionContext::new();
        assert!(agent.try_dispatch(&TimeStep::new(0.5), &mut ctx));
        assert!((agent.state().distance - 5.0).abs() < f64::EPSILON);

        assert!(agent.try_dispatch(&EndScene::new(0), &mut ctx));
        assert_eq!(agent.state().resets, 1);
        assert_eq!(agent.state().distance, 0.0);
    }

    #[test]
    fn test_with_reaction_rejects_duplicate() {
        let result = Agent::new(Odometer::default())
            .with_reaction(Odometer::advance)
            .and_then(|agent| agent.with_reaction(Odometer::advance));
        assert!(matches!(result, Err(AgentError::DuplicateReaction { .. })));
    }

    #[test]
    fn test_bind_sets_owner() {
        let agent = Agent::new(Odometer::default())
            .with_reaction(Odometer::reset)
            .unwrap();
        assert_eq!(agent.id(), AgentId::INVALID);

        let mut bound = BoundAgent::bind(Box::new(agent), AgentId::from_raw(3));
        assert_eq!(bound.id(), AgentId::from_raw(3));
        assert_eq!(bound.agent().id(), AgentId::from_raw(3));

        let agent = bound.agent_mut().downcast_mut::<Odometer>().unwrap();
        assert_eq!(agent.reactions().owner(), AgentId::from_raw(3));
        let err = agent.register(Odometer::reset).unwrap_err();
        assert!(err.to_string().starts_with("Agent(3) already has a reaction"));
    }

    #[test]
    fn test_unbind_resets_id() {
        let bound = BoundAgent::bind(Box::new(Agent::new(0u8)), AgentId::from_raw(5));
        let agent = bound.unbind();
        assert_eq!(agent.id(), AgentId::INVALID);
        assert_eq!(agent.downcast_ref::<u8>().unwrap().reactions().owner(), AgentId::INVALID);
    }

    #[test]
    fn test_configure_keeps_binding_after_swap() {
        let mut bound = BoundAgent::bind(Box::new(Agent::new(1u8)), AgentId::from_raw(6));
        let mut taken = None;
        bound
            .configure(|_, agent| {
                let agent = agent.downcast_mut::<u8>().unwrap();
                taken = Some(std::mem::replace(agent, Agent::new(2u8)));
                Ok(())
            })
            .unwrap();

        assert_eq!(bound.agent().id(), AgentId::from_raw(6));
        assert_eq!(bound.agent().state::<u8>(), Some(&2));
        // The swapped-out agent keeps the binding it had.
        assert_eq!(taken.unwrap().id(), AgentId::from_raw(6));
    }

    #[test]
    fn test_dispatch_sets_context_agent() {
        let agent = Agent::new(0u32)
            .with_context_reaction(|_: &mut u32, _: &TimeStep, ctx: &mut ReactionContext| {
                ctx.despawn(ctx.agent());
            })
            .unwrap();
        let mut bound = BoundAgent::bind(Box::new(agent), AgentId::from_raw(8));

        let mut ctx = ReactionContext::new();
        assert!(bound.try_dispatch(&TimeStep::new(0.1), &mut ctx));
        assert_eq!(ctx.agent(), AgentId::from_raw(8));
        let commands = ctx.take_commands();
        assert_eq!(commands[0].target(), AgentId::from_raw(8));
    }

    #[test]
    fn test_downcast_through_any_agent() {
        let mut boxed: Box<dyn AnyAgent> = Box::new(Agent::from_behaviour(Odometer::default()).unwrap());
        assert!(boxed.reacts_to(TimeStep::type_key()));
        assert_eq!(boxed.reaction_count(), 2);
        assert!(boxed.name().ends_with("Odometer"));

        assert!(boxed.state::<u32>().is_none());
        boxed.state_mut::<Odometer>().unwrap().resets = 4;
        assert_eq!(boxed.state::<Odometer>().map(|o| o.resets), Some(4));
    }

    #[test]
    fn test_unregister_stops_delivery() {
        let mut agent = Agent::from_behaviour(Odometer::default()).unwrap();
        assert!(agent.unregister_action::<TimeStep>());
        assert!(!agent.unregister(TimeStep::type_key()));

        let mut ctx = ReactionContext::new();
        assert!(!agent.try_dispatch(&TimeStep::new(1.0), &mut ctx));
        assert_eq!(agent.state().distance, 0.0);
    }
}
