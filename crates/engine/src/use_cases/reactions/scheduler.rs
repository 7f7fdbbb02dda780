//! Reaction scheduler: the hook wiring between the host turn loop and the
//! reaction core.
//!
//! The host calls one hook per point in its own loop. Each hook turns the
//! call into registry queries plus the confirmation protocol, and returns a
//! [`HookReport`]. Hooks never fail; everything that goes wrong becomes an
//! outcome on the report.
//!
//! Every method takes `&mut self`, so a hook cannot be re-entered while a
//! prompt is outstanding.

use std::sync::Arc;

use tactica_domain::{
    AbilityId, ActionInstanceId, ActorId, BattlefieldView, BudgetClass, CapabilityRegistry,
    DeclinePolicy, DegreeLadder, DomainError, ExpirationPolicy, MovementInterruptDetector,
    MovementSegment, PayloadFilter, PayloadKind, PendingReaction, PoolId, ReactionBudgets,
    ReactionEvent, ReactionId, ReactionPayload, ReactionRegistry, SecondaryAction,
    TriggerPredicate, TurnBoundary, UsageLimit, ZoneDirection,
};

use super::hooks::{HookObserver, HookObservers, HookPoint, HookReport};
use super::resolution::{ResolutionContext, ResolutionProtocol};
use crate::infrastructure::ports::{
    AbilityUsagePort, CheckPort, DecisionPort, EffectPort, UsageError,
};
use crate::infrastructure::settings::SchedulerSettings;

/// Arming refused.
#[derive(Debug, thiserror::Error)]
pub enum SchedulerError {
    #[error("Actor {0} is not part of the encounter")]
    UnknownActor(ActorId),

    #[error("Subject {0} no longer exists")]
    SubjectGone(ActorId),

    #[error("{ability} was already used this encounter by {actor}")]
    AlreadyUsedThisEncounter { actor: ActorId, ability: String },

    #[error("Usage ledger unavailable: {0}")]
    Usage(#[from] UsageError),

    #[error(transparent)]
    Domain(#[from] DomainError),
}

/// Everything needed to arm one reaction.
#[derive(Debug, Clone)]
pub struct ArmRequest {
    pub owner: ActorId,
    pub subject: Option<ActorId>,
    pub trigger: TriggerPredicate,
    pub payload: ReactionPayload,
    pub expiration: ExpirationPolicy,
    pub budget_class: BudgetClass,
    pub usage: UsageLimit,
    /// `None` falls back to the scheduler's default.
    pub decline_policy: Option<DeclinePolicy>,
}

impl ArmRequest {
    pub fn new(owner: ActorId, trigger: TriggerPredicate, payload: ReactionPayload) -> Self {
        Self {
            owner,
            subject: None,
            trigger,
            payload,
            expiration: ExpirationPolicy::AtStartOfOwnersNextTurn,
            budget_class: BudgetClass::Standard,
            usage: UsageLimit::OneShot,
            decline_policy: None,
        }
    }

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
        self.decline_policy = Some(policy);
        self
    }

    fn into_pending(self, default_policy: DeclinePolicy) -> PendingReaction {
        let mut record = PendingReaction::new(self.owner, self.trigger, self.payload)
            .with_expiration(self.expiration)
            .with_budget_class(self.budget_class)
            .with_usage(self.usage)
            .with_decline_policy(self.decline_policy.unwrap_or(default_policy));
        if let Some(subject) = self.subject {
            record = record.with_subject(subject);
        }
        record
    }
}

/// The host-side collaborators the scheduler talks to.
#[derive(Clone)]
pub struct ReactionPorts {
    pub decisions: Arc<dyn DecisionPort>,
    pub checks: Arc<dyn CheckPort>,
    pub effects: Arc<dyn EffectPort>,
    pub usage: Arc<dyn AbilityUsagePort>,
}

pub struct ReactionScheduler {
    capabilities: Arc<CapabilityRegistry>,
    view: Arc<dyn BattlefieldView>,
    usage: Arc<dyn AbilityUsagePort>,
    protocol: ResolutionProtocol,
    settings: SchedulerSettings,
    registry: ReactionRegistry,
    budgets: ReactionBudgets,
    detector: MovementInterruptDetector,
    observers: HookObservers,
}

impl ReactionScheduler {
    pub fn new(
        capabilities: Arc<CapabilityRegistry>,
        view: Arc<dyn BattlefieldView>,
        ports: ReactionPorts,
        settings: SchedulerSettings,
    ) -> Self {
        let protocol = ResolutionProtocol::new(
            ports.decisions,
            ports.checks,
            ports.effects,
            ports.usage.clone(),
        )
        .with_fallback_expiry(settings.attach_fallback_expiry);
        Self {
            capabilities,
            view,
            usage: ports.usage,
            protocol,
            detector: MovementInterruptDetector::new(settings.fire_on_stabilize),
            settings,
            registry: ReactionRegistry::new(),
            budgets: ReactionBudgets::new(),
            observers: HookObservers::new(),
        }
    }

    pub fn settings(&self) -> &SchedulerSettings {
        &self.settings
    }

    pub fn capabilities(&self) -> &CapabilityRegistry {
        &self.capabilities
    }

    pub fn registry(&self) -> &ReactionRegistry {
        &self.registry
    }

    pub fn budgets(&self) -> &ReactionBudgets {
        &self.budgets
    }

    pub fn detector(&self) -> &MovementInterruptDetector {
        &self.detector
    }

    pub fn observe(&mut self, point: HookPoint, observer: Arc<dyn HookObserver>) {
        self.observers.register(point, observer);
    }

    pub fn observe_all(&mut self, observer: Arc<dyn HookObserver>) {
        self.observers.register_all(observer);
    }

    // =========================================================================
    // Encounter lifecycle
    // =========================================================================

    pub fn begin_encounter(&mut self, actors: impl IntoIterator<Item = ActorId>) {
        self.registry.clear();
        self.detector.clear();
        self.budgets.begin_encounter(actors);
        tracing::info!("Encounter started");
    }

    /// Drop every budget, record and movement trace.
    pub fn end_encounter(&mut self) {
        let dropped = self.registry.len();
        self.registry.clear();
        self.detector.clear();
        self.budgets.end_encounter();
        tracing::info!(dropped_reactions = dropped, "Encounter ended");
    }

    pub fn join_encounter(&mut self, actor: ActorId) {
        self.budgets.join(actor);
        tracing::debug!(actor = %actor, "Actor joined encounter");
    }

    // =========================================================================
    // Budgets
    // =========================================================================

    pub fn grant_pool(
        &mut self,
        actor: ActorId,
        pool: PoolId,
        permits: PayloadFilter,
    ) -> Result<(), SchedulerError> {
        if !self.budgets.grant_pool(actor, pool, permits) {
            return Err(SchedulerError::UnknownActor(actor));
        }
        tracing::debug!(
            actor = %actor,
            pool = %self.capabilities.pool_name(pool),
            "Bonus pool granted"
        );
        Ok(())
    }

    pub fn revoke_pool(&mut self, actor: ActorId, pool: PoolId) {
        self.budgets.revoke_pool(actor, pool);
    }

    pub fn try_consume_standard(&mut self, actor: ActorId) -> bool {
        self.budgets.try_consume_standard(actor)
    }

    pub fn try_consume_bonus(
        &mut self,
        actor: ActorId,
        pool: PoolId,
        payload: &ReactionPayload,
    ) -> bool {
        self.budgets.try_consume_bonus(actor, pool, payload)
    }

    pub fn refund_standard(&mut self, actor: ActorId) {
        self.budgets.refund_standard(actor);
    }

    /// Spend a bonus pool that permits extra reactions to give back an
    /// already-used standard reaction. Consumed records stay consumed.
    pub fn grant_extra_reaction(&mut self, actor: ActorId, pool: PoolId, ability: AbilityId) -> bool {
        let standard_used = self
            .budgets
            .get(actor)
            .is_some_and(|budget| budget.standard_used());
        if !standard_used {
            return false;
        }
        let payload = ReactionPayload::new(
            ability,
            PayloadKind::ExtraReaction,
            SecondaryAction::Automatic,
            DegreeLadder::none(),
        );
        if !self.budgets.try_consume_bonus(actor, pool, &payload) {
            return false;
        }
        self.budgets.refund_standard(actor);
        tracing::info!(
            actor = %actor,
            pool = %self.capabilities.pool_name(pool),
            "Extra reaction granted"
        );
        true
    }

    // =========================================================================
    // Arming
    // =========================================================================

    /// Arm a reaction, replacing any live record with the same identity.
    pub async fn arm(&mut self, request: ArmRequest) -> Result<ReactionId, SchedulerError> {
        let owner = request.owner;
        if !self.view.exists(owner) || self.budgets.get(owner).is_none() {
            return Err(SchedulerError::UnknownActor(owner));
        }
        if let Some(subject) = request.subject {
            if !self.view.exists(subject) {
                return Err(SchedulerError::SubjectGone(subject));
            }
        }
        let ability = request.payload.ability;
        if request.usage == UsageLimit::OncePerEncounter && self.usage.is_used(owner, ability).await? {
            return Err(SchedulerError::AlreadyUsedThisEncounter {
                actor: owner,
                ability: self.capabilities.ability_name(ability).to_string(),
            });
        }

        let record = request.into_pending(self.settings.default_decline_policy);
        let id = record.id();
        let replaced = self.registry.arm(record);
        tracing::debug!(
            reaction = %id,
            owner = %owner,
            ability = %self.capabilities.ability_name(ability),
            replaced = ?replaced.as_ref().map(PendingReaction::id),
            "Reaction armed"
        );
        Ok(id)
    }

    /// Live records that would be offered for this event, earliest first.
    pub fn query_matches(&self, event: &ReactionEvent) -> Vec<&PendingReaction> {
        self.registry.query_matches(event, self.view.as_ref())
    }

    /// Manual dismissal. The record is purged on the next tick.
    pub fn dismiss(&mut self, reaction: ReactionId) -> bool {
        let dismissed = self.registry.dismiss(reaction);
        if dismissed {
            tracing::debug!(reaction = %reaction, "Reaction dismissed");
        }
        dismissed
    }

    pub fn armed_for(&self, owner: ActorId) -> Vec<&PendingReaction> {
        self.registry.armed_for(owner).collect()
    }

    // =========================================================================
    // Hooks
    // =========================================================================

    pub async fn on_turn_start(&mut self, actor: ActorId) -> HookReport {
        let mut report = HookReport::new(HookPoint::TurnStart);
        report.expired = self.registry.on_boundary(TurnBoundary::Start(actor));
        report.purged = self.purge();
        self.budgets.reset_at_turn_start(actor);
        self.detector.reset_turn();
        self.finish(report)
    }

    pub async fn on_turn_end(&mut self, actor: ActorId) -> HookReport {
        let mut report = HookReport::new(HookPoint::TurnEnd);
        report.expired = self.registry.on_boundary(TurnBoundary::End(actor));
        report.purged = self.purge();
        self.finish(report)
    }

    /// A check is about to be attempted, or an actor is about to be targeted.
    pub async fn before_roll(&mut self, event: ReactionEvent) -> HookReport {
        let mut report = HookReport::new(HookPoint::BeforeRoll);
        self.dispatch(&event, &mut report).await;
        self.finish(report)
    }

    pub async fn on_damage_about_to_apply(&mut self, event: ReactionEvent) -> HookReport {
        let mut report = HookReport::new(HookPoint::DamageIncoming);
        self.dispatch(&event, &mut report).await;
        self.finish(report)
    }

    /// Periodic tick: purge, rescan zones, fire crossings for movers at rest.
    pub async fn on_state_check_tick(&mut self) -> HookReport {
        let mut report = HookReport::new(HookPoint::StateCheckTick);
        report.purged = self.purge();
        let watches = self.registry.spatial_watches();
        let events = self.detector.scan(&watches, self.view.as_ref());
        for event in events {
            self.dispatch(&event, &mut report).await;
        }
        self.finish(report)
    }

    /// The mover's animation advanced. Every step since the last scan is
    /// checked for crossings on the next tick or at completion.
    pub async fn on_movement_step(&mut self, segment: MovementSegment) -> HookReport {
        tracing::trace!(
            mover = %segment.mover(),
            position = %segment.current_position(),
            "Movement step"
        );
        self.detector.update_segment(segment);
        self.finish(HookReport::new(HookPoint::MovementStep))
    }

    pub async fn on_action_completed(
        &mut self,
        actor: ActorId,
        action: ActionInstanceId,
    ) -> HookReport {
        let mut report = HookReport::new(HookPoint::ActionCompleted);
        let watches = self.registry.spatial_watches();
        let events = self
            .detector
            .complete_action(actor, action, &watches, self.view.as_ref());
        for event in events {
            self.dispatch(&event, &mut report).await;
        }
        self.finish(report)
    }

    /// The action itself reports a crossing it made in one atomic step.
    pub async fn notify_provoked(
        &mut self,
        watcher: ActorId,
        mover: ActorId,
        action: ActionInstanceId,
        direction: ZoneDirection,
    ) -> HookReport {
        let mut report = HookReport::new(HookPoint::MovementStep);
        if let Some(event) = self.detector.notify_provoked(watcher, mover, action, direction) {
            self.dispatch(&event, &mut report).await;
        }
        self.finish(report)
    }

    async fn dispatch(&mut self, event: &ReactionEvent, report: &mut HookReport) {
        let candidates = self.registry.matching_ids(event, self.view.as_ref());
        if candidates.is_empty() {
            return;
        }
        let limit = self.settings.max_offers_per_event;
        if candidates.len() > limit {
            tracing::warn!(
                candidates = candidates.len(),
                limit = limit,
                "Too many candidates for one event, extra reactions skipped"
            );
        }
        tracing::debug!(
            event = %event.describe(),
            instance = %event.instance(),
            candidates = candidates.len(),
            "Dispatching reaction candidates"
        );

        for id in candidates.into_iter().take(limit) {
            let mut ctx = ResolutionContext {
                registry: &mut self.registry,
                budgets: &mut self.budgets,
                view: self.view.as_ref(),
                capabilities: &self.capabilities,
            };
            if let Some(outcome) = self.protocol.resolve(&mut ctx, id, event).await {
                report.outcomes.push(outcome);
            }
        }
    }

    fn purge(&mut self) -> usize {
        let purged = self.registry.purge_expired();
        for record in &purged {
            tracing::debug!(
                reaction = %record.id(),
                owner = %record.owner(),
                consumed = record.consumed_once(),
                "Reaction purged"
            );
        }
        purged.len()
    }

    fn finish(&self, report: HookReport) -> HookReport {
        self.observers.notify(&report);
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::battlefield::{Combatant, InMemoryBattlefield};
    use crate::infrastructure::ports::{
        Decision, DecisionError, EffectExpiry, MockAbilityUsagePort, MockCheckPort,
        MockDecisionPort, MockEffectPort, TimedEffect,
    };
    use crate::use_cases::reactions::abilities::StandardAbilities;
    use crate::use_cases::reactions::resolution::{ResolutionStatus, SkipReason};
    use std::sync::Mutex;
    use tactica_domain::{
        CheckTag, DegreeOfSuccess, GridPosition, Modifier, ReactionPhase, RollKind,
    };

    struct Harness {
        field: Arc<InMemoryBattlefield>,
        abilities: StandardAbilities,
        scheduler: ReactionScheduler,
        attached: Arc<Mutex<Vec<TimedEffect>>>,
    }

    fn usage_free() -> MockAbilityUsagePort {
        let mut usage = MockAbilityUsagePort::new();
        usage.expect_is_used().returning(|_, _| Ok(false));
        usage.expect_mark_used().returning(|_, _| Ok(()));
        usage
    }

    fn recording_effects(attached: Arc<Mutex<Vec<TimedEffect>>>) -> MockEffectPort {
        let mut effects = MockEffectPort::new();
        effects.expect_attach().returning(move |effect| {
            attached.lock().expect("lock").push(effect);
            Ok(())
        });
        effects
    }

    fn harness(
        field: InMemoryBattlefield,
        decisions: MockDecisionPort,
        checks: MockCheckPort,
        usage: MockAbilityUsagePort,
        settings: SchedulerSettings,
    ) -> Harness {
        let field = Arc::new(field);
        let mut caps = CapabilityRegistry::new();
        let abilities = StandardAbilities::register(&mut caps);
        let attached = Arc::new(Mutex::new(Vec::new()));
        let ports = ReactionPorts {
            decisions: Arc::new(decisions),
            checks: Arc::new(checks),
            effects: Arc::new(recording_effects(attached.clone())),
            usage: Arc::new(usage),
        };
        let mut scheduler = ReactionScheduler::new(Arc::new(caps), field.clone(), ports, settings);
        scheduler.begin_encounter(field.actors());
        Harness {
            field,
            abilities,
            scheduler,
            attached,
        }
    }

    fn accepting() -> MockDecisionPort {
        let mut decisions = MockDecisionPort::new();
        decisions.expect_decide().returning(|prompt| {
            Ok(if prompt.choices.is_empty() {
                Decision::accept()
            } else {
                Decision::accept_choice(0)
            })
        });
        decisions
    }

    fn rolling(degree: DegreeOfSuccess) -> MockCheckPort {
        let mut checks = MockCheckPort::new();
        checks.expect_resolve_secondary().returning(move |_| Ok(degree));
        checks
            .expect_secondary_options()
            .returning(|_, _| Ok(Vec::new()));
        checks
    }

    fn check_event(actor: ActorId, check: &str) -> ReactionEvent {
        ReactionEvent::CheckAttempt {
            actor,
            check: CheckTag::new(check),
            target: None,
            instance: ActionInstanceId::new(),
        }
    }

    #[tokio::test]
    async fn aid_critical_success_boosts_ally_once_per_round() {
        let field = InMemoryBattlefield::new();
        let a = field.add(Combatant::new("A", GridPosition::new(0, 0), 1));
        let b = field.add(Combatant::new("B", GridPosition::new(1, 0), 1));
        let mut h = harness(
            field,
            accepting(),
            rolling(DegreeOfSuccess::CriticalSuccess),
            usage_free(),
            SchedulerSettings::default(),
        );

        let request = h.abilities.aid(a, b, CheckTag::new("athletics"), 15);
        let id = h.scheduler.arm(request).await.expect("armed");

        let first = h.scheduler.before_roll(check_event(b, "athletics")).await;
        assert_eq!(first.fired_count(), 1);
        assert_eq!(
            h.scheduler.registry().get(id).expect("stored").phase(),
            ReactionPhase::Consumed
        );
        {
            let attached = h.attached.lock().expect("lock");
            assert_eq!(attached.len(), 1);
            assert_eq!(attached[0].applies_to, b);
            assert_eq!(attached[0].modifier, Modifier::circumstance(2));
            assert_eq!(attached[0].expiry, EffectExpiry::AfterInstanceOrEndOfTurn);
        }

        let second = h.scheduler.before_roll(check_event(b, "athletics")).await;
        assert!(second.outcomes.is_empty());
        assert!(h.scheduler.query_matches(&check_event(b, "athletics")).is_empty());
    }

    #[tokio::test]
    async fn same_event_through_two_hooks_resolves_once() {
        let field = InMemoryBattlefield::new();
        let a = field.add(Combatant::new("A", GridPosition::new(0, 0), 1));
        let b = field.add(Combatant::new("B", GridPosition::new(1, 0), 1));
        let mut decisions = MockDecisionPort::new();
        decisions
            .expect_decide()
            .times(1)
            .returning(|_| Ok(Decision::accept()));
        let mut h = harness(
            field,
            decisions,
            rolling(DegreeOfSuccess::Success),
            usage_free(),
            SchedulerSettings::default(),
        );
        let request = h.abilities.aid(a, b, CheckTag::new("athletics"), 15);
        h.scheduler.arm(request).await.expect("armed");

        let event = check_event(b, "athletics");
        let first = h.scheduler.before_roll(event.clone()).await;
        let second = h.scheduler.before_roll(event).await;
        assert_eq!(first.fired_count(), 1);
        assert_eq!(second.fired_count(), 0);
        assert_eq!(h.attached.lock().expect("lock").len(), 1);
    }

    #[tokio::test]
    async fn brace_fires_once_when_a_multi_tile_move_completes() {
        let field = InMemoryBattlefield::new();
        let c = field.add(Combatant::new("C", GridPosition::new(0, 0), 1).with_weapon("Glaive", 2));
        let d = field.add(Combatant::new("D", GridPosition::new(6, 0), 2));
        let mut decisions = MockDecisionPort::new();
        decisions
            .expect_decide()
            .times(1)
            .returning(|_| Ok(Decision::accept_choice(0)));
        let mut checks = MockCheckPort::new();
        checks.expect_secondary_options().returning(|_, _| {
            Ok(vec![crate::infrastructure::ports::SecondaryOption {
                item: tactica_domain::ItemId::new(),
                name: "Glaive".into(),
            }])
        });
        checks
            .expect_resolve_secondary()
            .times(1)
            .withf(move |r| r.against == d && r.action == SecondaryAction::Strike)
            .returning(|_| Ok(DegreeOfSuccess::Success));
        let settings = SchedulerSettings {
            fire_on_stabilize: false,
            ..SchedulerSettings::default()
        };
        let mut h = harness(field, decisions, checks, usage_free(), settings);

        let request = h.abilities.brace(c);
        h.scheduler.arm(request).await.expect("armed");
        h.scheduler.on_state_check_tick().await;

        let action = ActionInstanceId::new();
        let path: Vec<GridPosition> = (1..=6).rev().map(|x| GridPosition::new(x, 0)).collect();
        let mut segment = MovementSegment::new(d, action, path).expect("path");
        let mut fired = 0;
        for step in 1..6 {
            segment.advance_to(step);
            h.field.move_to(d, segment.current_position());
            h.scheduler.on_movement_step(segment.clone()).await;
            fired += h.scheduler.on_state_check_tick().await.fired_count();
        }
        assert_eq!(fired, 0);

        let done = h.scheduler.on_action_completed(d, action).await;
        assert_eq!(done.fired_count(), 1);

        let again = h.scheduler.on_action_completed(d, action).await;
        assert_eq!(again.fired_count(), 0);
        assert_eq!(
            h.scheduler
                .notify_provoked(c, d, action, ZoneDirection::Entered)
                .await
                .fired_count(),
            0
        );
    }

    fn glaive_options() -> MockCheckPort {
        let mut checks = MockCheckPort::new();
        checks.expect_secondary_options().returning(|_, _| {
            Ok(vec![crate::infrastructure::ports::SecondaryOption {
                item: tactica_domain::ItemId::new(),
                name: "Glaive".into(),
            }])
        });
        checks
            .expect_resolve_secondary()
            .times(1)
            .returning(|_| Ok(DegreeOfSuccess::Success));
        checks
    }

    fn accept_once() -> MockDecisionPort {
        let mut decisions = MockDecisionPort::new();
        decisions
            .expect_decide()
            .times(1)
            .returning(|_| Ok(Decision::accept_choice(0)));
        decisions
    }

    #[tokio::test]
    async fn brace_catches_steps_reported_between_ticks() {
        let field = InMemoryBattlefield::new();
        let c = field.add(Combatant::new("C", GridPosition::new(0, 0), 1).with_weapon("Glaive", 2));
        let d = field.add(Combatant::new("D", GridPosition::new(4, 0), 2));
        let settings = SchedulerSettings {
            fire_on_stabilize: false,
            ..SchedulerSettings::default()
        };
        let mut h = harness(field, accept_once(), glaive_options(), usage_free(), settings);
        h.scheduler.arm(h.abilities.brace(c)).await.expect("armed");

        let action = ActionInstanceId::new();
        let path: Vec<GridPosition> = (1..=4).rev().map(|x| GridPosition::new(x, 0)).collect();
        let mut segment = MovementSegment::new(d, action, path).expect("path");
        for step in 1..=3 {
            segment.advance_to(step);
            h.field.move_to(d, segment.current_position());
            h.scheduler.on_movement_step(segment.clone()).await;
        }

        let tick = h.scheduler.on_state_check_tick().await;
        assert_eq!(tick.fired_count(), 0);
        let done = h.scheduler.on_action_completed(d, action).await;
        assert_eq!(done.fired_count(), 1);
    }

    #[tokio::test]
    async fn brace_ignores_a_mover_passing_through_reach() {
        let field = InMemoryBattlefield::new();
        let c = field.add(Combatant::new("C", GridPosition::new(0, 0), 1).with_weapon("Spear", 1));
        let d = field.add(Combatant::new("D", GridPosition::new(3, 1), 2));
        // No decision or check expectations: any offer would panic.
        let mut h = harness(
            field,
            MockDecisionPort::new(),
            MockCheckPort::new(),
            usage_free(),
            SchedulerSettings::default(),
        );
        h.scheduler.arm(h.abilities.brace(c)).await.expect("armed");

        let action = ActionInstanceId::new();
        let path: Vec<GridPosition> = (-3..=3).rev().map(|x| GridPosition::new(x, 1)).collect();
        let mut segment = MovementSegment::new(d, action, path).expect("path");
        let mut fired = 0;
        for step in 1..=6 {
            segment.advance_to(step);
            h.field.move_to(d, segment.current_position());
            h.scheduler.on_movement_step(segment.clone()).await;
            fired += h.scheduler.on_state_check_tick().await.fired_count();
        }
        fired += h.scheduler.on_action_completed(d, action).await.fired_count();
        assert_eq!(fired, 0);

        // An explicit report of the entry is re-checked against the final position.
        let late = h
            .scheduler
            .notify_provoked(c, d, action, ZoneDirection::Entered)
            .await;
        assert_eq!(late.fired_count(), 0);
        assert_eq!(h.scheduler.registry().len(), 1);
    }

    #[tokio::test]
    async fn explicit_report_before_the_tick_fires_once() {
        let field = InMemoryBattlefield::new();
        let c = field.add(Combatant::new("C", GridPosition::new(0, 0), 1).with_weapon("Glaive", 2));
        let d = field.add(Combatant::new("D", GridPosition::new(4, 0), 2));
        let mut h = harness(
            field,
            accept_once(),
            glaive_options(),
            usage_free(),
            SchedulerSettings::default(),
        );
        h.scheduler.arm(h.abilities.brace(c)).await.expect("armed");

        let action = ActionInstanceId::new();
        let path: Vec<GridPosition> = (1..=4).rev().map(|x| GridPosition::new(x, 0)).collect();
        let mut segment = MovementSegment::new(d, action, path).expect("path");
        segment.advance_to(2);
        h.field.move_to(d, segment.current_position());
        h.scheduler.on_movement_step(segment.clone()).await;

        let explicit = h
            .scheduler
            .notify_provoked(c, d, action, ZoneDirection::Entered)
            .await;
        assert_eq!(explicit.fired_count(), 1);

        segment.advance_to(3);
        h.field.move_to(d, segment.current_position());
        h.scheduler.on_movement_step(segment.clone()).await;
        let mut later = h.scheduler.on_state_check_tick().await.fired_count();
        later += h.scheduler.on_action_completed(d, action).await.fired_count();
        assert_eq!(later, 0);
    }

    #[tokio::test]
    async fn shield_block_draws_from_bonus_pool_only() {
        let field = InMemoryBattlefield::new();
        let e = field.add(Combatant::new("E", GridPosition::new(0, 0), 1).with_shield("Steel Shield"));
        let f = field.add(Combatant::new("F", GridPosition::new(1, 0), 2));
        let mut h = harness(
            field,
            accepting(),
            rolling(DegreeOfSuccess::Success),
            usage_free(),
            SchedulerSettings::default(),
        );
        let pool = h.abilities.shield_block_pool;
        h.scheduler
            .grant_pool(e, pool, StandardAbilities::shield_block_permits())
            .expect("granted");
        assert!(h.scheduler.try_consume_standard(e));

        let request = h.abilities.shield_block(e, 5);
        let id = h.scheduler.arm(request).await.expect("armed");

        let report = h
            .scheduler
            .on_damage_about_to_apply(ReactionEvent::DamageIncoming {
                source: Some(f),
                target: e,
                amount: 8,
                instance: ActionInstanceId::new(),
            })
            .await;
        assert_eq!(report.fired_count(), 1);

        let budget = h.scheduler.budgets().get(e).expect("budget");
        assert!(budget.standard_used());
        assert!(budget.pool(pool).expect("pool").used_this_turn);
        assert_eq!(
            h.attached.lock().expect("lock")[0].modifier,
            Modifier::damage_reduction(5)
        );

        // Repeatable: back to armed, but the pool is spent for this turn.
        let next = h
            .scheduler
            .on_damage_about_to_apply(ReactionEvent::DamageIncoming {
                source: Some(f),
                target: e,
                amount: 3,
                instance: ActionInstanceId::new(),
            })
            .await;
        assert_eq!(
            next.outcomes[0].status,
            ResolutionStatus::Skipped(SkipReason::BudgetExhausted)
        );
        assert!(h.scheduler.registry().get(id).expect("stored").is_live());
    }

    #[tokio::test]
    async fn expiry_without_matches_leaves_budgets_untouched() {
        let field = InMemoryBattlefield::new();
        let a = field.add(Combatant::new("A", GridPosition::new(0, 0), 1));
        let b = field.add(Combatant::new("B", GridPosition::new(1, 0), 1));
        let mut h = harness(
            field,
            MockDecisionPort::new(),
            MockCheckPort::new(),
            usage_free(),
            SchedulerSettings::default(),
        );
        let before = h.scheduler.budgets().clone();
        let request = h.abilities.aid(a, b, CheckTag::new("athletics"), 15);
        let id = h.scheduler.arm(request).await.expect("armed");

        let report = h.scheduler.on_turn_start(a).await;
        assert_eq!(report.expired, vec![id]);
        assert_eq!(report.purged, 1);
        assert!(h.scheduler.registry().is_empty());
        assert_eq!(h.scheduler.budgets().get(a), before.get(a));
        assert_eq!(h.scheduler.budgets().get(b), before.get(b));
    }

    #[tokio::test]
    async fn expired_record_is_not_offered_before_purge() {
        let field = InMemoryBattlefield::new();
        let a = field.add(Combatant::new("A", GridPosition::new(0, 0), 1));
        let b = field.add(Combatant::new("B", GridPosition::new(1, 0), 1));
        let mut decisions = MockDecisionPort::new();
        decisions.expect_decide().times(0);
        let mut h = harness(
            field,
            decisions,
            MockCheckPort::new(),
            usage_free(),
            SchedulerSettings::default(),
        );
        let request = h.abilities.aid(a, b, CheckTag::new("athletics"), 15);
        let id = h.scheduler.arm(request).await.expect("armed");

        assert!(h.scheduler.dismiss(id));
        assert_eq!(h.scheduler.registry().len(), 1);
        let report = h.scheduler.before_roll(check_event(b, "athletics")).await;
        assert!(report.outcomes.is_empty());
        assert!(h.scheduler.armed_for(a).is_empty());
    }

    #[tokio::test]
    async fn declined_reactive_shield_keeps_encounter_use_by_default() {
        let field = InMemoryBattlefield::new();
        let e = field.add(Combatant::new("E", GridPosition::new(0, 0), 1).with_shield("Buckler"));
        let f = field.add(Combatant::new("F", GridPosition::new(1, 0), 2));
        let mut decisions = MockDecisionPort::new();
        decisions.expect_decide().returning(|_| Ok(Decision::Decline));
        let mut checks = MockCheckPort::new();
        checks.expect_secondary_options().returning(|_, _| {
            Ok(vec![crate::infrastructure::ports::SecondaryOption {
                item: tactica_domain::ItemId::new(),
                name: "Buckler".into(),
            }])
        });
        let mut usage = MockAbilityUsagePort::new();
        usage.expect_is_used().returning(|_, _| Ok(false));
        usage.expect_mark_used().times(0);
        let mut h = harness(field, decisions, checks, usage, SchedulerSettings::default());

        let request = h.abilities.reactive_shield(e);
        let id = h.scheduler.arm(request).await.expect("armed");
        let report = h
            .scheduler
            .before_roll(ReactionEvent::TargetedByRoll {
                attacker: f,
                target: e,
                roll: RollKind::Strike,
                instance: ActionInstanceId::new(),
            })
            .await;

        assert_eq!(
            report.outcomes[0].status,
            ResolutionStatus::Declined {
                consumed: false,
                cancelled: false,
            }
        );
        assert!(h.scheduler.registry().get(id).expect("stored").is_live());
    }

    #[tokio::test]
    async fn consume_on_decline_burns_the_encounter_use() {
        let field = InMemoryBattlefield::new();
        let e = field.add(Combatant::new("E", GridPosition::new(0, 0), 1).with_shield("Buckler"));
        let f = field.add(Combatant::new("F", GridPosition::new(1, 0), 2));
        let mut decisions = MockDecisionPort::new();
        decisions
            .expect_decide()
            .returning(|_| Err(DecisionError::unavailable("E")));
        let mut checks = MockCheckPort::new();
        checks.expect_secondary_options().returning(|_, _| {
            Ok(vec![crate::infrastructure::ports::SecondaryOption {
                item: tactica_domain::ItemId::new(),
                name: "Buckler".into(),
            }])
        });
        let mut usage = MockAbilityUsagePort::new();
        usage.expect_is_used().returning(|_, _| Ok(false));
        usage.expect_mark_used().times(1).returning(|_, _| Ok(()));
        let mut h = harness(field, decisions, checks, usage, SchedulerSettings::default());

        let request = h
            .abilities
            .reactive_shield(e)
            .with_decline_policy(DeclinePolicy::ConsumeOnDecline);
        let id = h.scheduler.arm(request).await.expect("armed");
        let report = h
            .scheduler
            .before_roll(ReactionEvent::TargetedByRoll {
                attacker: f,
                target: e,
                roll: RollKind::Strike,
                instance: ActionInstanceId::new(),
            })
            .await;

        assert_eq!(
            report.outcomes[0].status,
            ResolutionStatus::Declined {
                consumed: true,
                cancelled: true,
            }
        );
        assert!(!h.scheduler.registry().get(id).expect("stored").is_live());
    }

    #[tokio::test]
    async fn once_per_encounter_ability_cannot_be_rearmed_after_use() {
        let field = InMemoryBattlefield::new();
        let e = field.add(Combatant::new("E", GridPosition::new(0, 0), 1).with_shield("Buckler"));
        let mut usage = MockAbilityUsagePort::new();
        usage.expect_is_used().returning(|_, _| Ok(true));
        let mut h = harness(
            field,
            MockDecisionPort::new(),
            MockCheckPort::new(),
            usage,
            SchedulerSettings::default(),
        );

        let request = h.abilities.reactive_shield(e);
        let err = h.scheduler.arm(request).await.expect_err("already used");
        assert!(matches!(err, SchedulerError::AlreadyUsedThisEncounter { .. }));
    }

    #[tokio::test]
    async fn arming_for_unknown_actor_is_refused() {
        let field = InMemoryBattlefield::new();
        let a = field.add(Combatant::new("A", GridPosition::new(0, 0), 1));
        let mut h = harness(
            field,
            MockDecisionPort::new(),
            MockCheckPort::new(),
            usage_free(),
            SchedulerSettings::default(),
        );
        let ghost = ActorId::new();
        let err = h
            .scheduler
            .arm(h.abilities.aid(ghost, a, CheckTag::new("athletics"), 15))
            .await
            .expect_err("unknown owner");
        assert!(matches!(err, SchedulerError::UnknownActor(_)));

        let err = h
            .scheduler
            .arm(h.abilities.aid(a, ghost, CheckTag::new("athletics"), 15))
            .await
            .expect_err("missing subject");
        assert!(matches!(err, SchedulerError::SubjectGone(_)));

        let pool = h.abilities.shield_block_pool;
        let err = h
            .scheduler
            .grant_pool(ghost, pool, StandardAbilities::shield_block_permits())
            .expect_err("not in encounter");
        assert!(matches!(err, SchedulerError::UnknownActor(_)));
        let err = h
            .scheduler
            .arm(h.abilities.shield_block(ghost, 5))
            .await
            .expect_err("still unknown");
        assert!(matches!(err, SchedulerError::UnknownActor(_)));
    }

    #[tokio::test]
    async fn extra_reaction_refunds_standard_through_pool() {
        let field = InMemoryBattlefield::new();
        let a = field.add(Combatant::new("A", GridPosition::new(0, 0), 1));
        let mut h = harness(
            field,
            MockDecisionPort::new(),
            MockCheckPort::new(),
            usage_free(),
            SchedulerSettings::default(),
        );
        let pool = h.abilities.extra_reaction_pool;
        let ability = h.abilities.extra_reaction;
        h.scheduler
            .grant_pool(a, pool, StandardAbilities::extra_reaction_permits())
            .expect("granted");

        assert!(!h.scheduler.grant_extra_reaction(a, pool, ability));
        assert!(h.scheduler.try_consume_standard(a));
        assert!(h.scheduler.grant_extra_reaction(a, pool, ability));
        assert!(!h.scheduler.budgets().get(a).expect("budget").standard_used());
        assert!(h.scheduler.try_consume_standard(a));
        assert!(!h.scheduler.grant_extra_reaction(a, pool, ability));
    }

    #[tokio::test]
    async fn offers_per_event_are_capped_in_arming_order() {
        let field = InMemoryBattlefield::new();
        let b = field.add(Combatant::new("B", GridPosition::new(1, 1), 1));
        let first = field.add(Combatant::new("A1", GridPosition::new(0, 0), 1));
        let second = field.add(Combatant::new("A2", GridPosition::new(2, 2), 1));
        let settings = SchedulerSettings {
            max_offers_per_event: 1,
            ..SchedulerSettings::default()
        };
        let mut h = harness(
            field,
            accepting(),
            rolling(DegreeOfSuccess::Success),
            usage_free(),
            settings,
        );
        let early = h
            .scheduler
            .arm(h.abilities.aid(first, b, CheckTag::new("athletics"), 15))
            .await
            .expect("armed");
        h.scheduler
            .arm(h.abilities.aid(second, b, CheckTag::new("athletics"), 15))
            .await
            .expect("armed");

        let report = h.scheduler.before_roll(check_event(b, "athletics")).await;
        assert_eq!(report.outcomes.len(), 1);
        assert_eq!(report.outcomes[0].reaction, early);
    }

    #[tokio::test]
    async fn observers_receive_hook_reports() {
        let field = InMemoryBattlefield::new();
        let a = field.add(Combatant::new("A", GridPosition::new(0, 0), 1));
        let mut h = harness(
            field,
            MockDecisionPort::new(),
            MockCheckPort::new(),
            usage_free(),
            SchedulerSettings::default(),
        );
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        h.scheduler.observe(
            HookPoint::TurnStart,
            Arc::new(move |r: &HookReport| sink.lock().expect("lock").push(r.point)),
        );

        h.scheduler.on_turn_start(a).await;
        h.scheduler.on_turn_end(a).await;
        assert_eq!(*seen.lock().expect("lock"), vec![HookPoint::TurnStart]);
    }

    #[tokio::test]
    async fn end_encounter_drops_everything() {
        let field = InMemoryBattlefield::new();
        let a = field.add(Combatant::new("A", GridPosition::new(0, 0), 1));
        let b = field.add(Combatant::new("B", GridPosition::new(1, 0), 1));
        let mut h = harness(
            field,
            MockDecisionPort::new(),
            MockCheckPort::new(),
            usage_free(),
            SchedulerSettings::default(),
        );
        let request = h.abilities.aid(a, b, CheckTag::new("athletics"), 15);
        h.scheduler.arm(request).await.expect("armed");
        assert_eq!(h.scheduler.armed_for(a).len(), 1);

        h.scheduler.end_encounter();
        assert!(h.scheduler.registry().is_empty());
        assert!(h.scheduler.budgets().get(a).is_none());
    }
}
