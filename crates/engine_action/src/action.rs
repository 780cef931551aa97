//! The [`Action`] capability and the built-in action kinds.
//!
//! Actions are immutable event values. Concrete kinds opt in with an empty
//! `impl Action for T {}`; the object-safe [`AnyAction`] view used by the
//! dispatcher is provided for every such type, so a kind can never report an
//! identity other than its own.
//!
//! ```rust
//! use engine_action::{Action, AnyAction, TypeKey};
//!
//! #[derive(Debug)]
//! struct Jump {
//!     height: f32,
//! }
//!
//! impl Action for Jump {}
//!
//! let jump = Jump { height: 2.0 };
//! let erased: &dyn AnyAction = &jump;
//! assert_eq!(erased.identity(), TypeKey::of::<Jump>());
//! assert_eq!(erased.downcast_ref::<Jump>().map(|j| j.height), Some(2.0));
//! ```

use std::any::Any;
use std::fmt;

use crate::type_key::TypeKey;

/// Marker trait for concrete action kinds.
///
/// Implementors must be `'static` so they can be identified, and `Debug` so
/// dispatch can be traced.
pub trait Action: fmt::Debug + 'static {
    /// Returns the [`TypeKey`] of this kind.
    fn type_key() -> TypeKey
    where
        Self: Sized,
    {
        TypeKey::of::<Self>()
    }
}

/// Type-erased view of an [`Action`].
///
/// Implemented for every `A: Action`. Boxes and references are not actions
/// themselves, so calling [`AnyAction::identity`] through a `Box<dyn
/// AnyAction>` always reaches the concrete kind.
pub trait AnyAction: fmt::Debug {
    /// Returns the [`TypeKey`] of the concrete kind behind this value.
    fn identity(&self) -> TypeKey;

    /// Returns the concrete kind's type name.
    fn name(&self) -> &'static str;

    /// Upcast for downcasting.
    fn as_any(&self) -> &dyn Any;
}

impl<A: Action> AnyAction for A {
    fn identity(&self) -> TypeKey {
        TypeKey::of::<A>()
    }

    fn name(&self) -> &'static str {
        std::any::type_name::<A>()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl dyn AnyAction + '_ {
    /// Returns `true` if the concrete kind is `A`.
    #[must_use]
    pub fn is<A: Action>(&self) -> bool {
        self.as_any().is::<A>()
    }

    /// Returns the concrete value if it is of kind `A`.
    #[must_use]
    pub fn downcast_ref<A: Action>(&self) -> Option<&A> {
        self.as_any().downcast_ref::<A>()
    }
}

/// Simulated time has advanced by `elapsed_time` seconds.
///
/// Produced by the frame driver once per simulated step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimeStep {
    elapsed_time: f64,
}

impl TimeStep {
    #[must_use]
    pub const fn new(elapsed_time: f64) -> Self {
        Self { elapsed_time }
    }

    /// Seconds of simulated time covered by this step.
    #[must_use]
    pub const fn elapsed_time(&self) -> f64 {
        self.elapsed_time
    }
}

impl Action for TimeStep {}

/// The scene should stop, reporting `exit_code`.
///
/// Exit code values are application specific.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EndScene {
    exit_code: i32,
}

impl EndScene {
    #[must_use]
    pub const fn new(exit_code: i32) -> Self {
        Self { exit_code }
    }

    #[must_use]
    pub const fn exit_code(&self) -> i32 {
        self.exit_code
    }
}

impl Action for EndScene {}
