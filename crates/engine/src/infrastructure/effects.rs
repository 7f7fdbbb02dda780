//! In-memory timed-effect ledger.

use std::sync::Arc;

use async_trait::async_trait;
use tactica_domain::{ActionInstanceId, ActorId, BattlefieldView, ModifierKind};
use tokio::sync::RwLock;

use crate::infrastructure::ports::{EffectError, EffectExpiry, EffectPort, TimedEffect};

/// Holds attached effects until their instance resolves (or the turn ends).
pub struct EffectLedger {
    view: Arc<dyn BattlefieldView>,
    effects: RwLock<Vec<TimedEffect>>,
}

impl EffectLedger {
    pub fn new(view: Arc<dyn BattlefieldView>) -> Self {
        Self {
            view,
            effects: RwLock::new(Vec::new()),
        }
    }

    pub async fn active_for(&self, actor: ActorId, instance: ActionInstanceId) -> Vec<TimedEffect> {
        self.effects
            .read()
            .await
            .iter()
            .filter(|e| e.applies_to == actor && e.instance == instance)
            .cloned()
            .collect()
    }

    /// Sum of modifiers of one kind applying to an actor's instance.
    pub async fn total(&self, actor: ActorId, instance: ActionInstanceId, kind: ModifierKind) -> i32 {
        self.active_for(actor, instance)
            .await
            .iter()
            .filter(|e| e.modifier.kind == kind)
            .map(|e| e.modifier.value)
            .sum()
    }

    /// The instance resolved; drop its effects. Returns how many were removed.
    pub async fn instance_resolved(&self, instance: ActionInstanceId) -> usize {
        let mut effects = self.effects.write().await;
        let before = effects.len();
        effects.retain(|e| e.instance != instance);
        before - effects.len()
    }

    /// Fallback sweep at end of turn.
    pub async fn end_of_turn(&self) -> usize {
        let mut effects = self.effects.write().await;
        let before = effects.len();
        effects.retain(|e| e.expiry != EffectExpiry::AfterInstanceOrEndOfTurn);
        let removed = before - effects.len();
        if removed > 0 {
            tracing::debug!(removed = removed, "Expired timed effects at end of turn");
        }
        removed
    }

    pub async fn len(&self) -> usize {
        self.effects.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.effects.read().await.is_empty()
    }
}

#[async_trait]
impl EffectPort for EffectLedger {
    async fn attach(&self, effect: TimedEffect) -> Result<(), EffectError> {
        if !self.view.exists(effect.applies_to) {
            return Err(EffectError::TargetGone(effect.applies_to.to_string()));
        }
        tracing::debug!(
            applies_to = %effect.applies_to,
            instance = %effect.instance,
            modifier = effect.modifier.value,
            kind = ?effect.modifier.kind,
            "Timed effect attached"
        );
        self.effects.write().await.push(effect);
        Ok(())
    }
}
