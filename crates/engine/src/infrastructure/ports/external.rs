//! Host-engine port traits (decision-maker, dice checks, timed effects,
//! per-encounter usage flags).

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tactica_domain::{
    AbilityId, ActionInstanceId, ActorId, DegreeOfSuccess, ItemId, Modifier, OptionKind,
    ReactionId, SecondaryAction,
};

use super::error::{CheckError, DecisionError, EffectError, UsageError};

// =============================================================================
// Decision-maker
// =============================================================================

/// Question put to a reaction's owner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReactionPrompt {
    pub reaction: ReactionId,
    pub owner: ActorId,
    pub ability: AbilityId,
    pub ability_name: String,
    /// The actor whose action triggered the reaction.
    pub trigger_actor: ActorId,
    /// Short description of the triggering action.
    pub trigger: String,
    /// Named secondary options. Empty for a plain yes/no question.
    pub choices: Vec<String>,
}

impl ReactionPrompt {
    pub fn is_multiple_choice(&self) -> bool {
        !self.choices.is_empty()
    }

    /// Human-readable question text.
    pub fn question(&self) -> String {
        if self.choices.is_empty() {
            format!("Use {}? ({} is {})", self.ability_name, self.trigger_actor, self.trigger)
        } else {
            format!(
                "Use {}? ({} is {}) Choose: {}",
                self.ability_name,
                self.trigger_actor,
                self.trigger,
                self.choices.join(", ")
            )
        }
    }
}

/// The decision-maker's answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "answer")]
pub enum Decision {
    /// Spend the reaction. `choice` indexes `ReactionPrompt::choices`.
    Accept { choice: Option<usize> },
    Decline,
}

impl Decision {
    pub fn accept() -> Self {
        Self::Accept { choice: None }
    }

    pub fn accept_choice(index: usize) -> Self {
        Self::Accept {
            choice: Some(index),
        }
    }
}

/// Human UI or AI policy. Blocks until answered; there is no timeout.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DecisionPort: Send + Sync {
    async fn decide(&self, prompt: ReactionPrompt) -> Result<Decision, DecisionError>;
}

// =============================================================================
// Secondary checks
// =============================================================================

/// One item the owner could use for the secondary action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecondaryOption {
    pub item: ItemId,
    pub name: String,
}

/// What the host is asked to roll or execute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecondaryRequest {
    pub reaction: ReactionId,
    pub owner: ActorId,
    pub action: SecondaryAction,
    /// The actor the triggering action belongs to.
    pub against: ActorId,
    pub instance: ActionInstanceId,
    pub option: Option<SecondaryOption>,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CheckPort: Send + Sync {
    /// Items of the given kind the owner could use right now.
    async fn secondary_options(
        &self,
        owner: ActorId,
        kind: OptionKind,
    ) -> Result<Vec<SecondaryOption>, CheckError>;

    /// Roll the secondary check (or execute the strike) and report its degree.
    async fn resolve_secondary(
        &self,
        request: SecondaryRequest,
    ) -> Result<DegreeOfSuccess, CheckError>;
}

// =============================================================================
// Timed effects
// =============================================================================

/// When the host must remove an attached effect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EffectExpiry {
    /// Once the scoped action instance resolves.
    AfterInstance,
    /// Once the instance resolves, or at the end of the current turn,
    /// whichever comes first.
    AfterInstanceOrEndOfTurn,
}

/// A short-lived modifier scoped to one action instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimedEffect {
    pub source: ReactionId,
    pub ability: AbilityId,
    pub granted_by: ActorId,
    /// Actor whose roll or defence the modifier applies to.
    pub applies_to: ActorId,
    pub instance: ActionInstanceId,
    pub modifier: Modifier,
    pub expiry: EffectExpiry,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait EffectPort: Send + Sync {
    async fn attach(&self, effect: TimedEffect) -> Result<(), EffectError>;
}

// =============================================================================
// Per-encounter usage flags
// =============================================================================

/// The host's persistent "used this encounter" flags.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AbilityUsagePort: Send + Sync {
    async fn is_used(&self, actor: ActorId, ability: AbilityId) -> Result<bool, UsageError>;
    async fn mark_used(&self, actor: ActorId, ability: AbilityId) -> Result<(), UsageError>;
}
