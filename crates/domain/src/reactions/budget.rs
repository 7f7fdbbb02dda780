//! Per-actor reaction budgets: one standard reaction plus named bonus pools.
//!
//! The standard reaction and every bonus pool are independent counters.
//! Consuming or refunding one never touches another.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::capabilities::PoolId;
use crate::ids::ActorId;
use crate::value_objects::{PayloadFilter, ReactionPayload};

/// Which counter a reaction draws from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BudgetClass {
    Standard,
    Bonus(PoolId),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BonusPool {
    pub id: PoolId,
    pub permits: PayloadFilter,
    pub used_this_turn: bool,
}

/// One actor's counters for the current round.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReactionBudget {
    standard_used: bool,
    pools: Vec<BonusPool>,
}

impl ReactionBudget {
    pub fn standard_used(&self) -> bool {
        self.standard_used
    }

    pub fn pool(&self, id: PoolId) -> Option<&BonusPool> {
        self.pools.iter().find(|p| p.id == id)
    }

    pub fn pools(&self) -> &[BonusPool] {
        &self.pools
    }

    fn pool_mut(&mut self, id: PoolId) -> Option<&mut BonusPool> {
        self.pools.iter_mut().find(|p| p.id == id)
    }

    fn bonus_available(&self, id: PoolId, payload: &ReactionPayload) -> bool {
        self.pool(id)
            .is_some_and(|p| !p.used_this_turn && p.permits.permits(payload))
    }
}

/// Budgets for every actor in the encounter.
///
/// Created at combat start, reset per turn, dropped at combat end. All
/// mutation happens inside the single-threaded turn loop, so a check and
/// consume on the same `&mut self` cannot interleave with another consumer.
#[derive(Debug, Clone, Default)]
pub struct ReactionBudgets {
    actors: HashMap<ActorId, ReactionBudget>,
}

impl ReactionBudgets {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fresh budgets for every participant.
    pub fn begin_encounter(&mut self, actors: impl IntoIterator<Item = ActorId>) {
        self.actors = actors
            .into_iter()
            .map(|actor| (actor, ReactionBudget::default()))
            .collect();
    }

    pub fn end_encounter(&mut self) {
        self.actors.clear();
    }

    /// Add a late joiner. Existing budgets are left alone.
    pub fn join(&mut self, actor: ActorId) {
        self.actors.entry(actor).or_default();
    }

    pub fn get(&self, actor: ActorId) -> Option<&ReactionBudget> {
        self.actors.get(&actor)
    }

    /// Grant (or re-grant) a bonus pool. Re-granting updates the permission
    /// but keeps the pool's used flag for this turn.
    ///
    /// Returns `false` for an actor outside the encounter.
    pub fn grant_pool(&mut self, actor: ActorId, pool: PoolId, permits: PayloadFilter) -> bool {
        let Some(budget) = self.actors.get_mut(&actor) else {
            return false;
        };
        match budget.pool_mut(pool) {
            Some(existing) => existing.permits = permits,
            None => budget.pools.push(BonusPool {
                id: pool,
                permits,
                used_this_turn: false,
            }),
        }
        true
    }

    pub fn revoke_pool(&mut self, actor: ActorId, pool: PoolId) {
        if let Some(budget) = self.actors.get_mut(&actor) {
            budget.pools.retain(|p| p.id != pool);
        }
    }

    pub fn try_consume_standard(&mut self, actor: ActorId) -> bool {
        match self.actors.get_mut(&actor) {
            Some(budget) if !budget.standard_used => {
                budget.standard_used = true;
                true
            }
            _ => false,
        }
    }

    /// Consume a bonus pool if it exists, is unused this turn, and permits the payload.
    pub fn try_consume_bonus(
        &mut self,
        actor: ActorId,
        pool: PoolId,
        payload: &ReactionPayload,
    ) -> bool {
        let Some(budget) = self.actors.get_mut(&actor) else {
            return false;
        };
        if !budget.bonus_available(pool, payload) {
            return false;
        }
        match budget.pool_mut(pool) {
            Some(p) => {
                p.used_this_turn = true;
                true
            }
            None => false,
        }
    }

    /// Whether `try_consume` would succeed, without consuming.
    pub fn can_consume(&self, actor: ActorId, class: BudgetClass, payload: &ReactionPayload) -> bool {
        let Some(budget) = self.actors.get(&actor) else {
            return false;
        };
        match class {
            BudgetClass::Standard => !budget.standard_used,
            BudgetClass::Bonus(pool) => budget.bonus_available(pool, payload),
        }
    }

    pub fn try_consume(&mut self, actor: ActorId, class: BudgetClass, payload: &ReactionPayload) -> bool {
        match class {
            BudgetClass::Standard => self.try_consume_standard(actor),
            BudgetClass::Bonus(pool) => self.try_consume_bonus(actor, pool, payload),
        }
    }

    /// Give the standard reaction back. Bonus pools are untouched.
    pub fn refund_standard(&mut self, actor: ActorId) {
        if let Some(budget) = self.actors.get_mut(&actor) {
            budget.standard_used = false;
        }
    }

    pub fn reset_at_turn_start(&mut self, actor: ActorId) {
        if let Some(budget) = self.actors.get_mut(&actor) {
            budget.standard_used = false;
            for pool in &mut budget.pools {
                pool.used_this_turn = false;
            }
        }
    }
}
