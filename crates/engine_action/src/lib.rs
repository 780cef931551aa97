//! # engine_action
//!
//! The "what happened" half of the dispatch core: defines what an action
//! is and how its kind is identified.
//!
//! This crate provides:
//!
//! - [`TypeKey`]: process-stable, totally ordered identity per action kind.
//! - [`Action`] trait: opt-in marker for concrete action kinds.
//! - [`AnyAction`]: the type-erased view the dispatcher works with.
//! - [`TimeStep`] and [`EndScene`]: the built-in kinds.
//! - [`ActionQueue`]: FIFO storage for pending actions of mixed kinds.

pub mod action;
pub mod queue;
pub mod type_key;

pub use action::{Action, AnyAction, EndScene, TimeStep};
pub use queue::ActionQueue;
pub use type_key::{TypeKey, identity_of};
