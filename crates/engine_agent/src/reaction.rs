//! Reaction registry mapping action kinds to an agent's handlers.
//!
//! Each agent owns one [`Reactions`] table. A handler is registered for a
//! concrete action type `A`; its parameter type fixes the [`TypeKey`] it is
//! stored under, so a stored handler is only ever reached with an action of
//! the kind it was written for.
//!
//! Dispatch is a single ordered-map lookup on the action's key. A miss is the
//! common case (most agents react to a handful of kinds) and has no effect.

use std::any::type_name;
use std::collections::BTreeMap;
use std::collections::btree_map::Entry;
use std::fmt;

use engine_action::{Action, AnyAction, TypeKey};
use tracing::trace;

use crate::context::ReactionContext;
use crate::error::AgentError;
use crate::id::AgentId;

type Handler<S> = Box<dyn FnMut(&mut S, &dyn AnyAction, &mut ReactionContext)>;

/// A handler bound to one action kind on one agent.
pub struct Reaction<S> {
    key: TypeKey,
    action: &'static str,
    invoke: Handler<S>,
}

impl<S> fmt::Debug for Reaction<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Reaction")
            .field("key", &self.key)
            .field("action", &self.action)
            .finish_non_exhaustive()
    }
}

/// The per-agent registry of reactions, keyed by action kind.
///
/// Holds at most one reaction per kind. `S` is the state type of the owning
/// agent; handlers receive it mutably alongside the action.
pub struct Reactions<S> {
    /// The agent that owns this registry.
    owner: AgentId,
    /// Reactions keyed by the action kind they handle.
    reactions: BTreeMap<TypeKey, Reaction<S>>,
}

impl<S> Reactions<S> {
    /// Create a new empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            owner: AgentId::INVALID,
            reactions: BTreeMap::new(),
        }
    }

    /// Returns the owning agent.
    #[must_use]
    pub fn owner(&self) -> AgentId {
        self.owner
    }

    pub(crate) fn set_owner(&mut self, owner: AgentId) {
        self.owner = owner;
    }

    /// Register `handler` as the reaction to actions of kind `A`.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::DuplicateReaction`] if a reaction for `A` is
    /// already registered. The existing reaction is kept.
    pub fn register<A, F>(&mut self, mut handler: F) -> Result<(), AgentError>
    where
        S: 'static,
        A: Action,
        F: FnMut(&mut S, &A) + 'static,
    {
        self.register_with_context(move |state: &mut S, action: &A, _: &mut ReactionContext| {
            handler(state, action);
        })
    }

    /// Register a reaction that also receives the [`ReactionContext`], for
    /// handlers that emit actions or request scene changes.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::DuplicateReaction`] if a reaction for `A` is
    /// already registered. The existing reaction is kept.
    pub fn register_with_context<A, F>(&mut self, mut handler: F) -> Result<(), AgentError>
    where
        S: 'static,
        A: Action,
        F: FnMut(&mut S, &A, &mut ReactionContext) + 'static,
    {
        let key = TypeKey::of::<A>();
        let action = type_name::<A>();

        match self.reactions.entry(key) {
            Entry::Occupied(_) => Err(AgentError::DuplicateReaction {
                agent: self.owner,
                action,
            }),
            Entry::Vacant(slot) => {
                let invoke: Handler<S> = Box::new(
                    move |state: &mut S, erased: &dyn AnyAction, ctx: &mut ReactionContext| {
                        // Only reachable through the entry for `key`, so a
                        // mismatch means two kinds share a key.
                        let Some(concrete) = erased.downcast_ref::<A>() else {
                            panic!(
                                "type key collision: reaction for {action} received {}",
                                erased.name()
                            );
                        };
                        handler(state, concrete, ctx);
                    },
                );
                slot.insert(Reaction {
                    key,
                    action,
                    invoke,
                });
                trace!(agent = %self.owner, action, "registered reaction");
                Ok(())
            }
        }
    }

    /// Remove the reaction for `key`.
    ///
    /// Returns `true` if a reaction was found and removed. Removing an absent
    /// reaction is not an error.
    pub fn unregister(&mut self, key: TypeKey) -> bool {
        self.reactions.remove(&key).is_some()
    }

    /// Remove the reaction for action kind `A`.
    pub fn unregister_action<A: Action>(&mut self) -> bool {
        self.unregister(TypeKey::of::<A>())
    }

    /// Deliver `action` to the matching reaction, if any.
    ///
    /// Returns `true` if a reaction ran and `false` on a miss. A miss has no
    /// observable effect.
    pub fn try_dispatch(
        &mut self,
        state: &mut S,
        action: &dyn AnyAction,
        ctx: &mut ReactionContext,
    ) -> bool {
        match self.reactions.get_mut(&action.identity()) {
            Some(reaction) => {
                (reaction.invoke)(state, action, ctx);
                true
            }
            None => false,
        }
    }

    /// Returns `true` if a reaction is registered for `key`.
    #[must_use]
    pub fn contains(&self, key: TypeKey) -> bool {
        self.reactions.contains_key(&key)
    }

    /// Returns the registered action kinds in key order.
    pub fn keys(&self) -> impl Iterator<Item = TypeKey> + '_ {
        self.reactions.keys().copied()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.reactions.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.reactions.is_empty()
    }
}

impl<S> Default for Reactions<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S> fmt::Debug for Reactions<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Reactions")
            .field("owner", &self.owner)
            .field("reactions", &self.reactions.values().collect::<Vec<_>>())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use engine_action::{EndScene, TimeStep};

    use super::*;

    #[derive(Debug, Default)]
    struct Tally {
        steps: Vec<f64>,
        ended: Option<i32>,
    }

    #[test]
    fn test_dispatch_hits_registered_kind() {
        let mut reactions = Reactions::<Tally>::new();
        reactions
            .register(|tally: &mut Tally, step: &TimeStep| tally.steps.push(step.elapsed_time()))
            .unwrap();

        let mut tally = Tally::default();
        let mut ctx = ReactionContext::new();
        assert!(reactions.try_dispatch(&mut tally, &TimeStep::new(0.25), &mut ctx));
        assert_eq!(tally.steps, vec![0.25]);
    }

    #[test]
    fn test_dispatch_miss_is_noop() {
        let mut reactions = Reactions::<Tally>::new();
        reactions
            .register(|tally: &mut Tally, step: &TimeStep| tally.steps.push(step.elapsed_time()))
            .unwrap();

        let mut tally = Tally::default();
        let mut ctx = ReactionContext::new();
        assert!(!reactions.try_dispatch(&mut tally, &EndScene::new(1), &mut ctx));
        assert!(tally.steps.is_empty());
        assert!(tally.ended.is_none());
        assert!(ctx.is_empty());
    }

    #[test]
    fn test_duplicate_registration_rejected() {
        let mut reactions = Reactions::<Tally>::new();
        reactions
            .register(|tally: &mut Tally, end: &EndScene| tally.ended = Some(end.exit_code()))
            .unwrap();

        let err = reactions
            .register(|tally: &mut Tally, _: &EndScene| tally.ended = Some(-1))
            .unwrap_err();
        assert!(matches!(err, AgentError::DuplicateReaction { action, .. } if action.ends_with("EndScene")));
        assert_eq!(reactions.len(), 1);

        // The first registration still runs.
        let mut tally = Tally::default();
        reactions.try_dispatch(&mut tally, &EndScene::new(9), &mut ReactionContext::new());
        assert_eq!(tally.ended, Some(9));
    }

    #[test]
    fn test_unregister() {
        let mut reactions = Reactions::<Tally>::new();
        reactions
            .register(|tally: &mut Tally, step: &TimeStep| tally.steps.push(step.elapsed_time()))
            .unwrap();
        assert!(reactions.contains(TimeStep::type_key()));

        assert!(reactions.unregister(TimeStep::type_key()));
        assert!(!reactions.unregister(TimeStep::type_key()));
        assert!(reactions.is_empty());

        let mut tally = Tally::default();
        assert!(!reactions.try_dispatch(&mut tally, &TimeStep::new(1.0), &mut ReactionContext::new()));
    }

    #[test]
    fn test_reregister_after_unregister() {
        let mut reactions = Reactions::<Tally>::new();
        reactions.register(|_: &mut Tally, _: &EndScene| {}).unwrap();
        assert!(reactions.unregister_action::<EndScene>());
        reactions
            .register(|tally: &mut Tally, end: &EndScene| tally.ended = Some(end.exit_code()))
            .unwrap();

        let mut tally = Tally::default();
        reactions.try_dispatch(&mut tally, &EndScene::new(2), &mut ReactionContext::new());
        assert_eq!(tally.ended, Some(2));
    }

    #[test]
    fn test_keys_ordered() {
        let mut reactions = Reactions::<Tally>::new();
        reactions.register(|_: &mut Tally, _: &EndScene| {}).unwrap();
        reactions.register(|_: &mut Tally, _: &TimeStep| {}).unwrap();

        let keys: Vec<TypeKey> = reactions.keys().collect();
        assert_eq!(keys.len(), 2);
        assert!(keys[0] < keys[1]);
        assert_eq!(keys[0], EndScene::type_key().min(TimeStep::type_key()));
    }

    #[test]
    fn test_contextual_reaction_can_emit() {
        let mut reactions = Reactions::<Tally>::new();
        reactions
            .register_with_context(|_: &mut Tally, step: &TimeStep, ctx: &mut ReactionContext| {
                if step.elapsed_time() > 1.0 {
                    ctx.emit(EndScene::new(5));
                }
            })
            .unwrap();

        let mut tally = Tally::default();
        let mut ctx = ReactionContext::new();
        reactions.try_dispatch(&mut tally, &TimeStep::new(0.5), &mut ctx);
        assert!(ctx.is_empty());
        reactions.try_dispatch(&mut tally, &TimeStep::new(1.5), &mut ctx);
        let emitted = ctx.take_emitted();
        assert_eq!(emitted.len(), 1);
        assert!(emitted.front().unwrap().is::<EndScene>());
    }
}
