//! # engine_agent
//!
//! The "who reacts" half of the dispatch core.
//!
//! This crate provides:
//!
//! - [`Agent`]: domain state composed with its [`Reactions`] registry.
//! - [`AnyAgent`]: the object-safe view a scene stores.
//! - [`Behaviour`]: state types that register their own reactions.
//! - [`ReactionContext`]: emitted actions and deferred [`Command`]s
//!   collected during a drain pass.
//! - [`EndSceneListener`]: built-in agent recording scene termination.
//! - [`BoundAgent`]: an agent paired with the ID its scene assigned.
//! - [`AgentId`]: scene-assigned agent identifiers.

pub mod agent;
pub mod context;
pub mod end_scene;
pub mod error;
pub mod id;
pub mod reaction;

pub use agent::{Agent, AnyAgent, Behaviour, BindToken, BoundAgent};
pub use context::{Command, ReactionContext};
pub use end_scene::EndSceneListener;
pub use error::AgentError;
pub use id::AgentId;
pub use reaction::{Reaction, Reactions};
