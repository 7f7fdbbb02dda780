//! Confirmation & resolution protocol.
//!
//! Drives one armed reaction through
//! `Armed -> Offered -> Accepted -> Resolving -> Consumed` (or back to
//! `Armed` on decline/withdrawal). Never fails outward: every problem ends in
//! a [`ResolutionStatus`] explaining why the reaction did not fire.

use std::sync::Arc;

use tactica_domain::{
    AbilityId, ActionInstanceId, ActorId, BattlefieldView, CapabilityRegistry, DeclineOutcome,
    DegreeOfSuccess, DomainError, EffectTarget, Modifier, ReactionBudgets, ReactionEvent,
    ReactionId, ReactionPhase, ReactionRegistry, PendingReaction, SecondaryAction, UsageLimit,
};

use crate::infrastructure::ports::{
    AbilityUsagePort, CheckPort, Decision, DecisionError, DecisionPort, EffectExpiry, EffectPort,
    ReactionPrompt, SecondaryOption, SecondaryRequest, TimedEffect,
};

/// Why a matched reaction was never offered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// Already consumed, expired, mid-offer, or blocked for this instance.
    NotArmed,
    /// Trigger no longer holds against the current battlefield.
    NoLongerMatches,
    BudgetExhausted,
    /// The payload needs a choice and the owner has nothing to choose.
    NoValidOption,
    /// A state transition was refused; the record was put back.
    InvalidState,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureStage {
    SecondaryCheck,
    Effect,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolutionStatus {
    Skipped(SkipReason),
    /// Owner said no (or could not answer). `consumed` when the decline
    /// spent a limited-use record.
    Declined { consumed: bool, cancelled: bool },
    /// Accepted, but the trigger or budget stopped holding before the budget
    /// was spent. Nothing was consumed.
    Withdrawn,
    Resolved {
        degree: DegreeOfSuccess,
        modifier: Option<Modifier>,
        option: Option<String>,
    },
    /// Budget was spent and the record consumed, but the host could not
    /// finish the secondary action or attach its effect.
    Failed { stage: FailureStage, message: String },
}

/// What happened to one candidate for one event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolutionOutcome {
    pub reaction: ReactionId,
    pub owner: ActorId,
    pub ability: AbilityId,
    pub instance: ActionInstanceId,
    pub status: ResolutionStatus,
}

impl ResolutionOutcome {
    /// The reaction fired: budget spent, resolution attempted.
    pub fn fired(&self) -> bool {
        matches!(
            self.status,
            ResolutionStatus::Resolved { .. } | ResolutionStatus::Failed { .. }
        )
    }
}

/// Mutable scheduler state lent to the protocol for one resolution.
pub struct ResolutionContext<'a> {
    pub registry: &'a mut ReactionRegistry,
    pub budgets: &'a mut ReactionBudgets,
    pub view: &'a dyn BattlefieldView,
    pub capabilities: &'a CapabilityRegistry,
}

pub struct ResolutionProtocol {
    decisions: Arc<dyn DecisionPort>,
    checks: Arc<dyn CheckPort>,
    effects: Arc<dyn EffectPort>,
    usage: Arc<dyn AbilityUsagePort>,
    attach_fallback_expiry: bool,
}

fn record_mut(
    registry: &mut ReactionRegistry,
    id: ReactionId,
) -> Result<&mut PendingReaction, DomainError> {
    registry
        .get_mut(id)
        .ok_or_else(|| DomainError::not_found("PendingReaction", id.to_string()))
}

/// Map the decision-maker's answer onto the offered options.
fn select_option(
    options: &[SecondaryOption],
    choice: Option<usize>,
) -> Result<Option<SecondaryOption>, DecisionError> {
    if options.is_empty() {
        return Ok(None);
    }
    match choice {
        Some(index) => options
            .get(index)
            .cloned()
            .map(Some)
            .ok_or_else(|| DecisionError::invalid_answer(format!("choice {} out of range", index))),
        None if options.len() == 1 => Ok(options.first().cloned()),
        None => Err(DecisionError::invalid_answer("no choice given")),
    }
}

impl ResolutionProtocol {
    pub fn new(
        decisions: Arc<dyn DecisionPort>,
        checks: Arc<dyn CheckPort>,
        effects: Arc<dyn EffectPort>,
        usage: Arc<dyn AbilityUsagePort>,
    ) -> Self {
        Self {
            decisions,
            checks,
            effects,
            usage,
            attach_fallback_expiry: true,
        }
    }

    pub fn with_fallback_expiry(mut self, attach: bool) -> Self {
        self.attach_fallback_expiry = attach;
        self
    }

    /// Run one candidate against one event. `None` if the id is unknown.
    pub async fn resolve(
        &self,
        ctx: &mut ResolutionContext<'_>,
        id: ReactionId,
        event: &ReactionEvent,
    ) -> Option<ResolutionOutcome> {
        let (owner, ability) = {
            let record = ctx.registry.get(id)?;
            (record.owner(), record.ability())
        };
        let instance = event.instance();

        let status = match self.drive(ctx, id, event).await {
            Ok(status) => status,
            Err(e) => {
                tracing::warn!(
                    reaction = %id,
                    owner = %owner,
                    error = %e,
                    "Reaction resolution hit an invalid transition"
                );
                self.recover(ctx, id, instance);
                ResolutionStatus::Skipped(SkipReason::InvalidState)
            }
        };

        Some(ResolutionOutcome {
            reaction: id,
            owner,
            ability,
            instance,
            status,
        })
    }

    async fn drive(
        &self,
        ctx: &mut ResolutionContext<'_>,
        id: ReactionId,
        event: &ReactionEvent,
    ) -> Result<ResolutionStatus, DomainError> {
        let instance = event.instance();
        let record = ctx
            .registry
            .get(id)
            .ok_or_else(|| DomainError::not_found("PendingReaction", id.to_string()))?;

        // Double-fire guard: a second hook for the same event lands here.
        if !record.can_fire_for(instance) {
            return Ok(ResolutionStatus::Skipped(SkipReason::NotArmed));
        }
        let scope = record.scope();
        let trigger = record.trigger().clone();
        if !trigger.matches(&scope, event, ctx.view) {
            return Ok(ResolutionStatus::Skipped(SkipReason::NoLongerMatches));
        }

        let owner = record.owner();
        let class = record.budget_class();
        let payload = record.payload().clone();
        let usage = record.usage();

        if !ctx.budgets.can_consume(owner, class, &payload) {
            tracing::debug!(reaction = %id, owner = %owner, "Budget exhausted, not offering");
            return Ok(ResolutionStatus::Skipped(SkipReason::BudgetExhausted));
        }

        let options = match payload.choices {
            None => Vec::new(),
            Some(kind) => match self.checks.secondary_options(owner, kind).await {
                Ok(options) if !options.is_empty() => options,
                Ok(_) => return Ok(ResolutionStatus::Skipped(SkipReason::NoValidOption)),
                Err(e) => {
                    tracing::warn!(owner = %owner, error = %e, "Could not list secondary options");
                    return Ok(ResolutionStatus::Skipped(SkipReason::NoValidOption));
                }
            },
        };

        record_mut(ctx.registry, id)?.offer(instance)?;

        let ability_name = ctx.capabilities.ability_name(payload.ability).to_string();
        let trigger_actor = event.instigator().unwrap_or_else(|| event.principal());
        let prompt = ReactionPrompt {
            reaction: id,
            owner,
            ability: payload.ability,
            ability_name: ability_name.clone(),
            trigger_actor,
            trigger: event.describe(),
            choices: options.iter().map(|o| o.name.clone()).collect(),
        };
        tracing::debug!(reaction = %id, owner = %owner, ability = %ability_name, "Offering reaction");

        let answer = self
            .decisions
            .decide(prompt)
            .await
            .and_then(|decision| match decision {
                Decision::Accept { choice } => select_option(&options, choice).map(Some),
                Decision::Decline => Ok(None),
            });
        let option = match answer {
            Ok(Some(option)) => option,
            Ok(None) => return self.decline(ctx, id, instance, false).await,
            Err(e) => {
                tracing::warn!(reaction = %id, owner = %owner, error = %e, "Decision failed, treating as declined");
                return self.decline(ctx, id, instance, true).await;
            }
        };

        // Nothing else runs while the prompt is out, but the battlefield is
        // host-owned; re-check before spending.
        if !trigger.matches(&scope, event, ctx.view) || !ctx.budgets.try_consume(owner, class, &payload) {
            record_mut(ctx.registry, id)?.withdraw_offer()?;
            tracing::debug!(reaction = %id, owner = %owner, "Offer withdrawn after decision");
            return Ok(ResolutionStatus::Withdrawn);
        }
        record_mut(ctx.registry, id)?.accept()?;
        if usage == UsageLimit::OncePerEncounter {
            self.mark_used(owner, payload.ability).await;
        }
        record_mut(ctx.registry, id)?.begin_resolving()?;

        let against = trigger_actor;
        let rolled = match &payload.secondary {
            SecondaryAction::Automatic => DegreeOfSuccess::Success,
            action => {
                let request = SecondaryRequest {
                    reaction: id,
                    owner,
                    action: action.clone(),
                    against,
                    instance,
                    option: option.clone(),
                };
                match self.checks.resolve_secondary(request).await {
                    Ok(degree) => degree,
                    Err(e) => {
                        tracing::warn!(reaction = %id, owner = %owner, error = %e, "Secondary check failed");
                        record_mut(ctx.registry, id)?.finish(instance)?;
                        return Ok(ResolutionStatus::Failed {
                            stage: FailureStage::SecondaryCheck,
                            message: e.to_string(),
                        });
                    }
                }
            }
        };

        let degree = payload.ladder.effective_degree(rolled);
        let modifier = payload.ladder.magnitude(rolled);
        if let Some(modifier) = modifier {
            let applies_to = match payload.effect_target {
                EffectTarget::TriggeringInstance => against,
                EffectTarget::OwnerForInstance => owner,
            };
            let effect = TimedEffect {
                source: id,
                ability: payload.ability,
                granted_by: owner,
                applies_to,
                instance,
                modifier,
                expiry: if self.attach_fallback_expiry {
                    EffectExpiry::AfterInstanceOrEndOfTurn
                } else {
                    EffectExpiry::AfterInstance
                },
            };
            if let Err(e) = self.effects.attach(effect).await {
                tracing::warn!(reaction = %id, owner = %owner, error = %e, "Timed effect rejected");
                record_mut(ctx.registry, id)?.finish(instance)?;
                return Ok(ResolutionStatus::Failed {
                    stage: FailureStage::Effect,
                    message: e.to_string(),
                });
            }
        }

        record_mut(ctx.registry, id)?.finish(instance)?;
        tracing::info!(
            reaction = %id,
            owner = %owner,
            ability = %ability_name,
            degree = ?degree,
            modifier = ?modifier,
            "Reaction resolved"
        );
        Ok(ResolutionStatus::Resolved {
            degree,
            modifier,
            option: option.map(|o| o.name),
        })
    }

    async fn decline(
        &self,
        ctx: &mut ResolutionContext<'_>,
        id: ReactionId,
        instance: ActionInstanceId,
        cancelled: bool,
    ) -> Result<ResolutionStatus, DomainError> {
        let record = record_mut(ctx.registry, id)?;
        let consumed = record.decline(instance)? == DeclineOutcome::Consumed;
        let (owner, ability, usage) = (record.owner(), record.ability(), record.usage());
        if consumed && usage == UsageLimit::OncePerEncounter {
            self.mark_used(owner, ability).await;
        }
        tracing::debug!(reaction = %id, owner = %owner, consumed = consumed, "Reaction declined");
        Ok(ResolutionStatus::Declined {
            consumed,
            cancelled,
        })
    }

    async fn mark_used(&self, owner: ActorId, ability: AbilityId) {
        if let Err(e) = self.usage.mark_used(owner, ability).await {
            tracing::warn!(owner = %owner, ability = %ability, error = %e, "Could not record encounter usage");
        }
    }

    /// Put a record that errored mid-flight back into a consistent phase.
    fn recover(&self, ctx: &mut ResolutionContext<'_>, id: ReactionId, instance: ActionInstanceId) {
        let Some(record) = ctx.registry.get_mut(id) else {
            return;
        };
        let result = match record.phase() {
            ReactionPhase::Offered => record.withdraw_offer(),
            ReactionPhase::Accepted => record.begin_resolving().and_then(|_| record.finish(instance)),
            ReactionPhase::Resolving => record.finish(instance),
            _ => Ok(()),
        };
        if let Err(e) = result {
            tracing::warn!(reaction = %id, error = %e, "Could not recover reaction state");
        }
    }
}
