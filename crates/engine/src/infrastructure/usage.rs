//! In-memory per-encounter usage flags.

use std::collections::HashSet;

use async_trait::async_trait;
use tactica_domain::{AbilityId, ActorId};
use tokio::sync::RwLock;

use crate::infrastructure::ports::{AbilityUsagePort, UsageError};

#[derive(Debug, Default)]
pub struct InMemoryUsageLedger {
    used: RwLock<HashSet<(ActorId, AbilityId)>>,
}

impl InMemoryUsageLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// New encounter: every flag clears.
    pub async fn reset(&self) {
        self.used.write().await.clear();
    }
}

#[async_trait]
impl AbilityUsagePort for InMemoryUsageLedger {
    async fn is_used(&self, actor: ActorId, ability: AbilityId) -> Result<bool, UsageError> {
        Ok(self.used.read().await.contains(&(actor, ability)))
    }

    async fn mark_used(&self, actor: ActorId, ability: AbilityId) -> Result<(), UsageError> {
        self.used.write().await.insert((actor, ability));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tactica_domain::CapabilityRegistry;

    #[tokio::test]
    async fn flags_are_per_actor_and_ability_until_reset() {
        let mut caps = CapabilityRegistry::new();
        let shield = caps.register_ability("Reactive Shield");
        let parry = caps.register_ability("Parry");
        let actor = ActorId::new();
        let ledger = InMemoryUsageLedger::new();

        ledger.mark_used(actor, shield).await.expect("mark");
        assert!(ledger.is_used(actor, shield).await.expect("read"));
        assert!(!ledger.is_used(actor, parry).await.expect("read"));
        assert!(!ledger.is_used(ActorId::new(), shield).await.expect("read"));

        ledger.reset().await;
        assert!(!ledger.is_used(actor, shield).await.expect("read"));
    }
}
