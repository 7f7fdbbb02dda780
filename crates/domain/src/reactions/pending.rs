//! The pending (armed, not yet resolved) conditional reaction.

use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::budget::BudgetClass;
use super::event::TurnBoundary;
use super::expiration::ExpirationPolicy;
use super::trigger::{MatchScope, TriggerPredicate};
use crate::capabilities::AbilityId;
use crate::error::DomainError;
use crate::ids::{ActionInstanceId, ActorId, ReactionId};
use crate::value_objects::ReactionPayload;

/// How many times a record may resolve before it is spent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UsageLimit {
    /// Goes back to `Armed` after each resolution (still budget-gated).
    Repeatable,
    /// Spent by its first resolution.
    OneShot,
    /// Spent by its first resolution, and the owner's per-encounter usage
    /// flag is set so it cannot be re-armed this encounter.
    OncePerEncounter,
}

impl UsageLimit {
    pub fn is_limited(&self) -> bool {
        !matches!(self, UsageLimit::Repeatable)
    }
}

/// Whether declining the prompt burns a limited-use record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeclinePolicy {
    ConsumeOnAcceptOnly,
    ConsumeOnDecline,
}

/// Confirmation state machine position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReactionPhase {
    Armed,
    Offered,
    Accepted,
    Resolving,
    Consumed,
    Expired,
}

impl fmt::Display for ReactionPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ReactionPhase::Armed => "Armed",
            ReactionPhase::Offered => "Offered",
            ReactionPhase::Accepted => "Accepted",
            ReactionPhase::Resolving => "Resolving",
            ReactionPhase::Consumed => "Consumed",
            ReactionPhase::Expired => "Expired",
        };
        f.write_str(name)
    }
}

/// At most one live record per identity; arming the same identity replaces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ReactionIdentity {
    pub owner: ActorId,
    pub budget_class: BudgetClass,
    pub ability: AbilityId,
}

/// Result of a decline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeclineOutcome {
    /// Still armed; blocked only for the declined instance.
    Retained,
    /// The decline spent the record.
    Consumed,
}

/// An armed conditional reaction, exclusively owned by `owner`.
#[derive(Debug, Clone)]
pub struct PendingReaction {
    id: ReactionId,
    owner: ActorId,
    subject: Option<ActorId>,
    trigger: TriggerPredicate,
    payload: ReactionPayload,
    expiration: ExpirationPolicy,
    budget_class: BudgetClass,
    usage: UsageLimit,
    decline_policy: DeclinePolicy,
    consumed_once: bool,
    phase: ReactionPhase,
    declined_instances: HashSet<ActionInstanceId>,
    resolved_instances: HashSet<ActionInstanceId>,
    armed_seq: u64,
}

impl PendingReaction {
    /// A one-shot standard reaction that lasts until the owner's next turn.
    pub fn new(owner: ActorId, trigger: TriggerPredicate, payload: ReactionPayload) -> Self {
        Self {
            id: ReactionId::new(),
            owner,
            subject: None,
            trigger,
            payload,
            expiration: ExpirationPolicy::AtStartOfOwnersNextTurn,
            budget_class: BudgetClass::Standard,
            usage: UsageLimit::OneShot,
            decline_policy: DeclinePolicy::ConsumeOnAcceptOnly,
            consumed_once: false,
            phase: ReactionPhase::Armed,
            declined_instances: HashSet::new(),
            resolved_instances: HashSet::new(),
            armed_seq: 0,
        }
    }

    // Builder-style methods

    pub fn with_subject(mut self, subject: ActorId) -> Self {
        self.subject = Some(subject);
        self
    }

    pub fn with_expiration(mut self, expiration: ExpirationPolicy) -> Self {
        self.expiration = expiration;
        self
    }

    pub fn with_budget_class(mut self, class: BudgetClass) -> Self {
        self.budget_class = class;
        self
    }

    pub fn with_usage(mut self, usage: UsageLimit) -> Self {
        self.usage = usage;
        self
    }

    pub fn with_decline_policy(mut self, policy: DeclinePolicy) -> Self {
        self.decline_policy = policy;
        self
    }

    // Read-only accessors

    pub fn id(&self) -> ReactionId {
        self.id
    }

    pub fn owner(&self) -> ActorId {
        self.owner
    }

    pub fn subject(&self) -> Option<ActorId> {
        self.subject
    }

    pub fn ability(&self) -> AbilityId {
        self.payload.ability
    }

    pub fn trigger(&self) -> &TriggerPredicate {
        &self.trigger
    }

    pub fn payload(&self) -> &ReactionPayload {
        &self.payload
    }

    pub fn expiration(&self) -> ExpirationPolicy {
        self.expiration
    }

    pub fn budget_class(&self) -> BudgetClass {
        self.budget_class
    }

    pub fn usage(&self) -> UsageLimit {
        self.usage
    }

    pub fn decline_policy(&self) -> DeclinePolicy {
        self.decline_policy
    }

    pub fn consumed_once(&self) -> bool {
        self.consumed_once
    }

    pub fn phase(&self) -> ReactionPhase {
        self.phase
    }

    pub fn armed_seq(&self) -> u64 {
        self.armed_seq
    }

    pub fn identity(&self) -> ReactionIdentity {
        ReactionIdentity {
            owner: self.owner,
            budget_class: self.budget_class,
            ability: self.payload.ability,
        }
    }

    pub fn scope(&self) -> MatchScope {
        MatchScope {
            owner: self.owner,
            subject: self.subject,
        }
    }

    /// Not consumed and not expired.
    pub fn is_live(&self) -> bool {
        !self.consumed_once && !self.expiration.is_immediate()
    }

    /// Whether this record may be offered for the given triggering instance.
    pub fn can_fire_for(&self, instance: ActionInstanceId) -> bool {
        self.is_live()
            && self.phase == ReactionPhase::Armed
            && !self.declined_instances.contains(&instance)
            && !self.resolved_instances.contains(&instance)
    }

    pub(crate) fn set_armed_seq(&mut self, seq: u64) {
        self.armed_seq = seq;
    }

    // State transitions

    fn transition(&mut self, from: ReactionPhase, to: ReactionPhase) -> Result<(), DomainError> {
        if self.phase != from {
            return Err(DomainError::invalid_state_transition(format!(
                "{} -> {} (reaction {} is {})",
                from, to, self.id, self.phase
            )));
        }
        self.phase = to;
        Ok(())
    }

    /// `Armed -> Offered` for a specific triggering instance.
    pub fn offer(&mut self, instance: ActionInstanceId) -> Result<(), DomainError> {
        if !self.can_fire_for(instance) {
            return Err(DomainError::invalid_state_transition(format!(
                "reaction {} cannot be offered for instance {}",
                self.id, instance
            )));
        }
        self.transition(ReactionPhase::Armed, ReactionPhase::Offered)
    }

    /// `Offered -> Armed` without recording a decline (offer abandoned before
    /// the decision-maker answered, e.g. budget gone).
    pub fn withdraw_offer(&mut self) -> Result<(), DomainError> {
        self.transition(ReactionPhase::Offered, ReactionPhase::Armed)
    }

    pub fn accept(&mut self) -> Result<(), DomainError> {
        self.transition(ReactionPhase::Offered, ReactionPhase::Accepted)
    }

    pub fn begin_resolving(&mut self) -> Result<(), DomainError> {
        self.transition(ReactionPhase::Accepted, ReactionPhase::Resolving)
    }

    /// `Resolving -> Consumed`, or back to `Armed` for repeatable reactions.
    pub fn finish(&mut self, instance: ActionInstanceId) -> Result<(), DomainError> {
        if self.usage.is_limited() {
            self.transition(ReactionPhase::Resolving, ReactionPhase::Consumed)?;
            self.consume();
        } else {
            self.transition(ReactionPhase::Resolving, ReactionPhase::Armed)?;
            self.resolved_instances.insert(instance);
        }
        Ok(())
    }

    /// `Offered -> Armed` (blocked for this instance) or `Offered -> Consumed`
    /// when the decline policy burns limited-use records.
    pub fn decline(&mut self, instance: ActionInstanceId) -> Result<DeclineOutcome, DomainError> {
        if self.usage.is_limited() && self.decline_policy == DeclinePolicy::ConsumeOnDecline {
            self.transition(ReactionPhase::Offered, ReactionPhase::Consumed)?;
            self.consume();
            return Ok(DeclineOutcome::Consumed);
        }
        self.transition(ReactionPhase::Offered, ReactionPhase::Armed)?;
        self.declined_instances.insert(instance);
        Ok(DeclineOutcome::Retained)
    }

    fn consume(&mut self) {
        self.consumed_once = true;
        self.expiration.expire();
    }

    /// Apply a turn boundary to the expiration policy.
    pub fn on_boundary(&mut self, boundary: TurnBoundary) -> bool {
        let expired = self.expiration.on_boundary(boundary, self.owner, self.subject);
        if expired && self.phase != ReactionPhase::Consumed {
            self.phase = ReactionPhase::Expired;
        }
        expired
    }

    /// Manual dismissal.
    pub fn dismiss(&mut self) {
        self.expiration.expire();
        if self.phase != ReactionPhase::Consumed {
            self.phase = ReactionPhase::Expired;
        }
    }
}
