//! Process-stable identity for concrete action kinds.
//!
//! A [`TypeKey`] is a small sequence number handed out the first time a
//! concrete [`Action`](crate::Action) kind asks for its identity. Every later
//! request for the same kind returns the same key, for the whole lifetime of
//! the process. Keys are totally ordered by assignment, so they can key a
//! `BTreeMap` as well as a `HashMap`.
//!
//! ## Assignment
//!
//! The table maps a Rust [`TypeId`] to its key. Lookups take a read lock and
//! only the first use of a kind takes the write lock. The order in which
//! kinds first appear decides their relative order; it is stable within one
//! process but is not meant to be persisted or sent anywhere.

use std::any::TypeId;
use std::collections::HashMap;
use std::fmt;
use std::sync::{OnceLock, PoisonError, RwLock};

use tracing::trace;

use crate::action::Action;

/// Identity of one concrete action kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TypeKey(u32);

impl TypeKey {
    /// Returns the [`TypeKey`] for the action kind `A`, assigning one on
    /// first use.
    #[must_use]
    pub fn of<A: Action>() -> Self {
        table().key_for(TypeId::of::<A>(), std::any::type_name::<A>())
    }

    /// Returns the raw assignment sequence number.
    #[must_use]
    pub const fn index(self) -> u32 {
        self.0
    }

    /// Returns the type name recorded when this key was assigned.
    #[must_use]
    pub fn name(self) -> &'static str {
        table().name_of(self)
    }
}

impl fmt::Display for TypeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TypeKey({}:{})", self.0, self.name())
    }
}

/// Returns the [`TypeKey`] for the action kind `A`.
///
/// Shorthand for [`TypeKey::of`].
#[must_use]
pub fn identity_of<A: Action>() -> TypeKey {
    TypeKey::of::<A>()
}

#[derive(Default)]
struct KeyTable {
    inner: RwLock<Assignments>,
}

#[derive(Default)]
struct Assignments {
    by_type: HashMap<TypeId, TypeKey>,
    /// `names[key.0]` is the name of the kind holding `key`.
    names: Vec<&'static str>,
}

fn table() -> &'static KeyTable {
    static TABLE: OnceLock<KeyTable> = OnceLock::new();
    TABLE.get_or_init(KeyTable::default)
}

impl KeyTable {
    fn key_for(&self, type_id: TypeId, name: &'static str) -> TypeKey {
        {
            let assignments = self.inner.read().unwrap_or_else(PoisonError::into_inner);
            if let Some(&key) = assignments.by_type.get(&type_id) {
                return key;
            }
        }

        let mut assignments = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        // Another caller may have assigned it between the two locks.
        if let Some(&key) = assignments.by_type.get(&type_id) {
            return key;
        }

        let index = u32::try_from(assignments.names.len())
            .unwrap_or_else(|_| panic!("action kind table exhausted while assigning {name}"));
        let key = TypeKey(index);
        assignments.names.push(name);
        let previous = assignments.by_type.insert(type_id, key);
        assert!(previous.is_none(), "action kind {name} was assigned twice");

        trace!(key = index, kind = name, "assigned action type key");
        key
    }

    fn name_of(&self, key: TypeKey) -> &'static str {
        let assignments = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        assignments
            .names
            .get(key.0 as usize)
            .copied()
            .unwrap_or("<unassigned>")
    }
}
