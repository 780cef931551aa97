//! Agent-level error types.

use crate::id::AgentId;

/// Errors raised while configuring an agent's reactions.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AgentError {
    /// The agent already reacts to this action kind. The existing reaction
    /// is left in place.
    #[error("{agent} already has a reaction registered for {action}")]
    DuplicateReaction {
        /// The agent that owns the registry.
        agent: AgentId,
        /// Type name of the action kind.
        action: &'static str,
    },

    /// A deferred configuration targeted an agent whose state is of another
    /// type.
    #[error("{agent} does not hold state of type {expected}")]
    StateMismatch {
        /// The targeted agent.
        agent: AgentId,
        /// Type name the configuration expected.
        expected: &'static str,
    },
}
