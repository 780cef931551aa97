//! FIFO storage for pending actions of mixed kinds.

use std::collections::VecDeque;
use std::collections::vec_deque::Drain;

use crate::action::{Action, AnyAction};

/// An owned first-in, first-out queue of boxed actions.
///
/// Actions of any kind can share one queue; each keeps its own
/// [`TypeKey`](crate::TypeKey) through the [`AnyAction`] view.
#[derive(Debug, Default)]
pub struct ActionQueue {
    actions: VecDeque<Box<dyn AnyAction>>,
}

impl ActionQueue {
    /// Create a new empty queue.
    #[must_use]
    pub fn new() -> Self {
        Self {
            actions: VecDeque::new(),
        }
    }

    /// Append an action to the back of the queue.
    pub fn push<A: Action>(&mut self, action: A) {
        self.actions.push_back(Box::new(action));
    }

    /// Append an already boxed action.
    pub fn push_boxed(&mut self, action: Box<dyn AnyAction>) {
        self.actions.push_back(action);
    }

    /// Remove and return the action at the front of the queue.
    pub fn pop(&mut self) -> Option<Box<dyn AnyAction>> {
        self.actions.pop_front()
    }

    /// Returns the action at the front of the queue.
    #[must_use]
    pub fn front(&self) -> Option<&dyn AnyAction> {
        self.actions.front().map(|action| &**action)
    }

    /// Move every action from `other` to the back of this queue, keeping
    /// their order. `other` is left empty.
    pub fn append(&mut self, other: &mut ActionQueue) {
        self.actions.append(&mut other.actions);
    }

    /// Remove all actions, front first.
    pub fn drain(&mut self) -> Drain<'_, Box<dyn AnyAction>> {
        self.actions.drain(..)
    }

    /// Iterate over the queued actions, front first.
    pub fn iter(&self) -> impl Iterator<Item = &dyn AnyAction> {
        self.actions.iter().map(|action| &**action)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.actions.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }
}

impl<A: Action> Extend<A> for ActionQueue {
    fn extend<I: IntoIterator<Item = A>>(&mut self, iter: I) {
        for action in iter {
            self.push(action);
        }
    }
}
