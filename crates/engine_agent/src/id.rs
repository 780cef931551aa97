//! Agent identifiers.
//!
//! IDs are handed out by the scene an agent joins, in increasing order, and
//! never reused. An agent built outside a scene reports [`AgentId::INVALID`].

use std::fmt;

/// Identifies an agent within one scene.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AgentId(u64);

impl AgentId {
    /// Not bound to any scene.
    pub const INVALID: AgentId = AgentId(0);

    /// The first ID a scene hands out.
    pub const FIRST: AgentId = AgentId(1);

    #[must_use]
    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    #[must_use]
    pub const fn raw(self) -> u64 {
        self.0
    }

    #[must_use]
    pub const fn is_valid(self) -> bool {
        self.0 != 0
    }

    /// The ID handed out after this one.
    #[must_use]
    pub const fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

impl fmt::Display for AgentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Agent({})", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_agent_id_invalid() {
        assert!(!AgentId::INVALID.is_valid());
        assert!(AgentId::FIRST.is_valid());
        assert_eq!(AgentId::from_raw(7).to_string(), "Agent(7)");
    }

    #[test]
    fn test_next_is_ordered() {
        let first = AgentId::FIRST;
        let second = first.next();
        assert!(first < second);
        assert_eq!(second.raw(), 2);
    }
}
