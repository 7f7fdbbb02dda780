//! Application state and composition.

use std::sync::Arc;

use tactica_domain::{
    determine_success, ActionInstanceId, ActorId, BattlefieldView, CapabilityRegistry, CheckTag,
    DegreeOfSuccess, DomainError, GridPosition, ModifierKind, MovementSegment, ReactionEvent,
    RollKind,
};

use crate::infrastructure::{
    battlefield::InMemoryBattlefield,
    checks::DiceCheckResolver,
    decision::AiDecisionPolicy,
    effects::EffectLedger,
    ports::{DecisionPort, RandomPort},
    settings::SchedulerSettings,
    usage::InMemoryUsageLedger,
};
use crate::use_cases::reactions::{HookReport, ReactionPorts, ReactionScheduler, StandardAbilities};

/// What a host-side roll produced, plus the reactions it provoked.
#[derive(Debug, Clone)]
pub struct RollResult {
    pub instance: ActionInstanceId,
    pub degree: DegreeOfSuccess,
    pub reactions: HookReport,
}

/// What a damage application produced.
#[derive(Debug, Clone)]
pub struct DamageResult {
    pub instance: ActionInstanceId,
    pub prevented: i32,
    pub dealt: i32,
    pub remaining_hp: Option<i32>,
    pub reactions: HookReport,
}

/// Main application state.
///
/// A minimal host turn loop over the in-memory adapters, wired to the
/// reaction scheduler the way a real game engine would call it.
pub struct App {
    pub battlefield: Arc<InMemoryBattlefield>,
    pub effects: Arc<EffectLedger>,
    pub usage: Arc<InMemoryUsageLedger>,
    pub random: Arc<dyn RandomPort>,
    pub abilities: StandardAbilities,
    pub scheduler: ReactionScheduler,
}

impl App {
    /// Create a new App with all dependencies wired up.
    pub fn new(
        battlefield: Arc<InMemoryBattlefield>,
        decisions: Arc<dyn DecisionPort>,
        random: Arc<dyn RandomPort>,
        settings: SchedulerSettings,
    ) -> Self {
        let mut capabilities = CapabilityRegistry::new();
        let abilities = StandardAbilities::register(&mut capabilities);

        let view: Arc<dyn BattlefieldView> = battlefield.clone();
        let effects = Arc::new(EffectLedger::new(view.clone()));
        let usage = Arc::new(InMemoryUsageLedger::new());
        let checks = Arc::new(DiceCheckResolver::new(battlefield.clone(), random.clone()));

        let ports = ReactionPorts {
            decisions,
            checks,
            effects: effects.clone(),
            usage: usage.clone(),
        };
        let scheduler = ReactionScheduler::new(Arc::new(capabilities), view, ports, settings);

        Self {
            battlefield,
            effects,
            usage,
            random,
            abilities,
            scheduler,
        }
    }

    /// In-memory battlefield with every actor run by the AI policy.
    pub fn in_memory(settings: SchedulerSettings, random: Arc<dyn RandomPort>) -> Self {
        Self::new(
            Arc::new(InMemoryBattlefield::new()),
            Arc::new(AiDecisionPolicy::new()),
            random,
            settings,
        )
    }

    pub async fn begin_encounter(&mut self) {
        self.usage.reset().await;
        self.scheduler.begin_encounter(self.battlefield.actors());
    }

    pub async fn start_turn(&mut self, actor: ActorId) -> HookReport {
        tracing::info!(actor = %self.battlefield.name(actor), "Turn started");
        self.scheduler.on_turn_start(actor).await
    }

    pub async fn end_turn(&mut self, actor: ActorId) -> HookReport {
        let report = self.scheduler.on_turn_end(actor).await;
        self.effects.end_of_turn().await;
        report
    }

    /// Walk `mover` along `path` (origin first), ticking the scheduler at
    /// every step and completing the action at the end.
    pub async fn move_along(
        &mut self,
        mover: ActorId,
        path: Vec<GridPosition>,
    ) -> Result<Vec<HookReport>, DomainError> {
        let action = ActionInstanceId::new();
        let mut segment = MovementSegment::new(mover, action, path)?;
        let mut reports = Vec::new();
        let mut step = 0;
        while !segment.is_at_destination() {
            if !self.battlefield.exists(mover) {
                break;
            }
            step += 1;
            segment.advance_to(step);
            self.battlefield.move_to(mover, segment.current_position());
            reports.push(self.scheduler.on_movement_step(segment.clone()).await);
            reports.push(self.scheduler.on_state_check_tick().await);
        }
        reports.push(self.scheduler.on_action_completed(mover, action).await);
        Ok(reports)
    }

    /// `actor` attempts a tagged check. Reactions resolve before the roll and
    /// their circumstance modifiers apply to it.
    pub async fn attempt_check(
        &mut self,
        actor: ActorId,
        check: CheckTag,
        dc: i32,
    ) -> Result<RollResult, DomainError> {
        let combatant = self
            .battlefield
            .combatant(actor)
            .ok_or_else(|| DomainError::not_found("Actor", actor.to_string()))?;
        let instance = ActionInstanceId::new();
        let reactions = self
            .scheduler
            .before_roll(ReactionEvent::CheckAttempt {
                actor,
                check: check.clone(),
                target: None,
                instance,
            })
            .await;

        let circumstance = self
            .effects
            .total(actor, instance, ModifierKind::Circumstance)
            .await;
        let roll = self.random.gen_range(1, 20);
        let modifier = combatant.check_bonus + circumstance;
        let degree = determine_success(roll, modifier, dc, roll == 20, roll == 1);
        self.effects.instance_resolved(instance).await;

        tracing::info!(
            actor = %combatant.name,
            check = %check,
            roll = roll,
            modifier = modifier,
            dc = dc,
            degree = ?degree,
            "Check attempted"
        );
        Ok(RollResult {
            instance,
            degree,
            reactions,
        })
    }

    /// `attacker` strikes `target`. Reactions to being targeted raise the
    /// target's AC for this strike only.
    pub async fn strike(
        &mut self,
        attacker: ActorId,
        target: ActorId,
    ) -> Result<RollResult, DomainError> {
        let striker = self
            .battlefield
            .combatant(attacker)
            .ok_or_else(|| DomainError::not_found("Actor", attacker.to_string()))?;
        let instance = ActionInstanceId::new();
        let reactions = self
            .scheduler
            .before_roll(ReactionEvent::TargetedByRoll {
                attacker,
                target,
                roll: RollKind::Strike,
                instance,
            })
            .await;

        let defender = self
            .battlefield
            .combatant(target)
            .ok_or_else(|| DomainError::not_found("Actor", target.to_string()))?;
        let circumstance = self
            .effects
            .total(target, instance, ModifierKind::Circumstance)
            .await;
        let armor_class = defender.armor_class + circumstance;
        let roll = self.random.gen_range(1, 20);
        let degree = determine_success(roll, striker.check_bonus, armor_class, roll == 20, roll == 1);
        self.effects.instance_resolved(instance).await;

        tracing::info!(
            attacker = %striker.name,
            target = %defender.name,
            roll = roll,
            armor_class = armor_class,
            degree = ?degree,
            "Strike rolled"
        );
        Ok(RollResult {
            instance,
            degree,
            reactions,
        })
    }

    /// Apply damage after damage reactions (shield block) had their chance.
    pub async fn apply_damage(
        &mut self,
        source: Option<ActorId>,
        target: ActorId,
        amount: u32,
    ) -> DamageResult {
        let instance = ActionInstanceId::new();
        let reactions = self
            .scheduler
            .on_damage_about_to_apply(ReactionEvent::DamageIncoming {
                source,
                target,
                amount,
                instance,
            })
            .await;

        let raw = i32::try_from(amount).unwrap_or(i32::MAX);
        let prevented = self
            .effects
            .total(target, instance, ModifierKind::DamageReduction)
            .await
            .clamp(0, raw);
        let dealt = raw - prevented;
        let remaining_hp = self.battlefield.apply_damage(target, dealt);
        self.effects.instance_resolved(instance).await;

        tracing::info!(
            target = %target,
            amount = amount,
            prevented = prevented,
            dealt = dealt,
            remaining_hp = ?remaining_hp,
            "Damage applied"
        );
        DamageResult {
            instance,
            prevented,
            dealt,
            remaining_hp,
            reactions,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::battlefield::Combatant;
    use crate::infrastructure::random::FixedRandom;

    #[tokio::test]
    async fn aided_check_gets_the_bonus_for_that_roll_only() {
        let mut app = App::in_memory(SchedulerSettings::default(), Arc::new(FixedRandom(10)));
        let a = app
            .battlefield
            .add(Combatant::new("A", GridPosition::new(0, 0), 1).with_check_bonus(5));
        let b = app
            .battlefield
            .add(Combatant::new("B", GridPosition::new(1, 0), 1).with_check_bonus(4));
        app.begin_encounter().await;

        // Aid check: 10 + 5 vs 15 = success, +1.
        let request = app.abilities.aid(a, b, CheckTag::new("athletics"), 15);
        app.scheduler.arm(request).await.expect("armed");

        // 10 + 4 + 1 = 15 meets DC 15.
        let aided = app
            .attempt_check(b, CheckTag::new("athletics"), 15)
            .await
            .expect("check");
        assert_eq!(aided.reactions.fired_count(), 1);
        assert_eq!(aided.degree, DegreeOfSuccess::Success);
        assert!(app.effects.is_empty().await);

        let unaided = app
            .attempt_check(b, CheckTag::new("athletics"), 15)
            .await
            .expect("check");
        assert_eq!(unaided.reactions.fired_count(), 0);
        assert_eq!(unaided.degree, DegreeOfSuccess::Failure);
    }

    #[tokio::test]
    async fn shield_block_reduces_damage_through_bonus_pool() {
        let mut app = App::in_memory(SchedulerSettings::default(), Arc::new(FixedRandom(10)));
        let e = app.battlefield.add(
            Combatant::new("E", GridPosition::new(0, 0), 1)
                .with_shield("Steel Shield")
                .with_hp(20),
        );
        let f = app.battlefield.add(Combatant::new("F", GridPosition::new(1, 0), 2));
        app.begin_encounter().await;
        app.scheduler.grant_pool(
            e,
            app.abilities.shield_block_pool,
            StandardAbilities::shield_block_permits(),
        )
        .expect("granted");
        let request = app.abilities.shield_block(e, 5);
        app.scheduler.arm(request).await.expect("armed");

        let hit = app.apply_damage(Some(f), e, 8).await;
        assert_eq!(hit.prevented, 5);
        assert_eq!(hit.dealt, 3);
        assert_eq!(hit.remaining_hp, Some(17));
        assert!(!app.scheduler.budgets().get(e).expect("budget").standard_used());

        let second = app.apply_damage(Some(f), e, 4).await;
        assert_eq!(second.prevented, 0);
        assert_eq!(second.remaining_hp, Some(13));
    }

    #[tokio::test]
    async fn brace_strikes_the_approaching_enemy() {
        let mut app = App::in_memory(SchedulerSettings::default(), Arc::new(FixedRandom(15)));
        let c = app.battlefield.add(
            Combatant::new("C", GridPosition::new(0, 0), 1)
                .with_weapon("Glaive", 2)
                .with_check_bonus(6),
        );
        let d = app.battlefield.add(
            Combatant::new("D", GridPosition::new(5, 0), 2)
                .with_hp(30)
                .with_armor_class(15),
        );
        app.begin_encounter().await;
        app.scheduler.arm(app.abilities.brace(c)).await.expect("armed");

        let path = (1..=5).rev().map(|x| GridPosition::new(x, 0)).collect();
        let reports = app.move_along(d, path).await.expect("moved");
        let fired: usize = reports.iter().map(HookReport::fired_count).sum();
        assert_eq!(fired, 1);
        // 15 + 6 = 21 vs AC 15: a plain hit for 6.
        assert_eq!(app.battlefield.combatant(d).expect("alive").hp, 24);
    }

    #[tokio::test]
    async fn reactive_shield_raises_armor_class_for_one_strike() {
        let mut app = App::in_memory(SchedulerSettings::default(), Arc::new(FixedRandom(11)));
        let e = app.battlefield.add(
            Combatant::new("E", GridPosition::new(0, 0), 1)
                .with_shield("Buckler")
                .with_armor_class(15),
        );
        let f = app
            .battlefield
            .add(Combatant::new("F", GridPosition::new(1, 0), 2).with_check_bonus(5));
        app.begin_encounter().await;
        app.scheduler
            .arm(app.abilities.reactive_shield(e))
            .await
            .expect("armed");

        // 11 + 5 = 16 would hit AC 15, misses AC 17.
        let shielded = app.strike(f, e).await.expect("strike");
        assert_eq!(shielded.reactions.fired_count(), 1);
        assert_eq!(shielded.degree, DegreeOfSuccess::Failure);

        let bare = app.strike(f, e).await.expect("strike");
        assert_eq!(bare.reactions.fired_count(), 0);
        assert_eq!(bare.degree, DegreeOfSuccess::Success);

        let err = app
            .scheduler
            .arm(app.abilities.reactive_shield(e))
            .await
            .expect_err("once per encounter");
        assert!(matches!(
            err,
            crate::use_cases::reactions::SchedulerError::AlreadyUsedThisEncounter { .. }
        ));
    }
}
