//! Capability registry: typed handles for abilities and bonus-reaction pools.
//!
//! Content modules register their abilities and pools by name once, when the
//! session is assembled, and carry the returned handles from then on. Nothing
//! on the reaction hot path looks anything up by string.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Handle to a registered reaction ability (Aid, Parry, ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AbilityId(u32);

/// Handle to a registered bonus-reaction pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PoolId(u32);

impl fmt::Display for AbilityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ability#{}", self.0)
    }
}

impl fmt::Display for PoolId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "pool#{}", self.0)
    }
}

/// Registry of named abilities and bonus pools.
///
/// Owned by the session and passed by reference; there is no global table.
#[derive(Debug, Clone, Default)]
pub struct CapabilityRegistry {
    abilities: Vec<String>,
    pools: Vec<String>,
}

impl CapabilityRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an ability, returning its handle.
    ///
    /// Registering the same name twice returns the existing handle.
    pub fn register_ability(&mut self, name: impl Into<String>) -> AbilityId {
        let name = name.into();
        if let Some(existing) = self.resolve_ability(&name) {
            return existing;
        }
        self.abilities.push(name);
        AbilityId((self.abilities.len() - 1) as u32)
    }

    /// Register a bonus-reaction pool, returning its handle.
    pub fn register_pool(&mut self, name: impl Into<String>) -> PoolId {
        let name = name.into();
        if let Some(existing) = self.resolve_pool(&name) {
            return existing;
        }
        self.pools.push(name);
        PoolId((self.pools.len() - 1) as u32)
    }

    /// Load-time lookup of an ability handle by name.
    pub fn resolve_ability(&self, name: &str) -> Option<AbilityId> {
        self.abilities
            .iter()
            .position(|n| n == name)
            .map(|idx| AbilityId(idx as u32))
    }

    /// Load-time lookup of a pool handle by name.
    pub fn resolve_pool(&self, name: &str) -> Option<PoolId> {
        self.pools
            .iter()
            .position(|n| n == name)
            .map(|idx| PoolId(idx as u32))
    }

    /// Display name of an ability. Unknown handles get a placeholder.
    pub fn ability_name(&self, id: AbilityId) -> &str {
        self.abilities
            .get(id.0 as usize)
            .map(String::as_str)
            .unwrap_or("unknown ability")
    }

    pub fn pool_name(&self, id: PoolId) -> &str {
        self.pools
            .get(id.0 as usize)
            .map(String::as_str)
            .unwrap_or("unknown pool")
    }

    pub fn ability_count(&self) -> usize {
        self.abilities.len()
    }
}
