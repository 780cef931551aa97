//! Scene-level error types.

use engine_agent::{AgentError, AgentId};

/// Errors raised while managing a scene, driving it or querying its end state.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SceneError {
    /// An agent failed to configure its reactions.
    #[error(transparent)]
    Agent(#[from] AgentError),

    /// The agent is already bound to an ID and can't be added again.
    #[error("{0} is already part of a scene")]
    AlreadyInScene(AgentId),

    /// No agent with this ID lives in the scene.
    #[error("{0} is not in the scene")]
    UnknownAgent(AgentId),

    /// The tick loop was given a configuration it can't run with.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The exit code was requested before the scene ended.
    #[error("the scene has not ended yet")]
    NotEnded,
}

/// Errors raised while building a [`TickConfig`](crate::TickConfig).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    /// An environment override could not be parsed.
    #[error("invalid value {value:?} for {var}")]
    InvalidEnv {
        /// The environment variable name.
        var: &'static str,
        /// The raw value found.
        value: String,
    },

    /// A field holds a value the tick loop can't run with.
    #[error("invalid {field}: {reason}")]
    InvalidValue {
        /// The offending field.
        field: &'static str,
        /// Why it was rejected.
        reason: &'static str,
    },
}
