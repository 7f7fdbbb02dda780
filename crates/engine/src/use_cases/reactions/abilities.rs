//! Reactions as thin configurations of the generic scheduler.
//!
//! Each constructor returns an [`ArmRequest`]; magnitudes live here and
//! nowhere else.

use tactica_domain::{
    AbilityId, ActorId, BudgetClass, CapabilityRegistry, CheckTag, DeclinePolicy, DegreeLadder,
    EffectTarget, ExpirationPolicy, ItemTag, Modifier, OptionKind, PayloadFilter, PayloadKind,
    PoolId, ReactionEvent, ReactionPayload, Requirement, RollKind, SecondaryAction,
    TriggerPredicate, UsageLimit, Zone, ZoneDirection,
};

use super::scheduler::ArmRequest;

/// Typed handles for the built-in reactions, resolved once at startup.
#[derive(Debug, Clone, Copy)]
pub struct StandardAbilities {
    pub aid: AbilityId,
    pub brace: AbilityId,
    pub parry: AbilityId,
    pub reactive_shield: AbilityId,
    pub shield_block: AbilityId,
    pub extra_reaction: AbilityId,
    pub shield_block_pool: PoolId,
    pub extra_reaction_pool: PoolId,
}

fn targeted_by_strike(event: &ReactionEvent) -> bool {
    matches!(
        event,
        ReactionEvent::TargetedByRoll {
            roll: RollKind::Strike,
            ..
        }
    )
}

impl StandardAbilities {
    pub fn register(capabilities: &mut CapabilityRegistry) -> Self {
        Self {
            aid: capabilities.register_ability("Aid"),
            brace: capabilities.register_ability("Brace"),
            parry: capabilities.register_ability("Parry"),
            reactive_shield: capabilities.register_ability("Reactive Shield"),
            shield_block: capabilities.register_ability("Shield Block"),
            extra_reaction: capabilities.register_ability("Extra Reaction"),
            shield_block_pool: capabilities.register_pool("Shield Block"),
            extra_reaction_pool: capabilities.register_pool("Extra Reaction"),
        }
    }

    /// What the shield block pool may be spent on.
    pub fn shield_block_permits() -> PayloadFilter {
        PayloadFilter::Kinds(vec![PayloadKind::ShieldBlock])
    }

    pub fn extra_reaction_permits() -> PayloadFilter {
        PayloadFilter::Kinds(vec![PayloadKind::ExtraReaction])
    }

    /// Help an adjacent ally with one tagged check.
    pub fn aid(&self, owner: ActorId, ally: ActorId, check: CheckTag, dc: i32) -> ArmRequest {
        let ladder = DegreeLadder {
            critical_success: Some(Modifier::circumstance(2)),
            success: Some(Modifier::circumstance(1)),
            failure: None,
            critical_failure: Some(Modifier::circumstance(-1)),
            degree_shift: 0,
        };
        let trigger = TriggerPredicate::on_check([check.clone()])
            .require(Requirement::PrincipalIsAlly)
            .require(Requirement::PrincipalWithin(1));
        let payload = ReactionPayload::new(
            self.aid,
            PayloadKind::Aid,
            SecondaryAction::Check { check, dc },
            ladder,
        );
        ArmRequest::new(owner, trigger, payload).with_subject(ally)
    }

    /// Strike the first enemy that steps into weapon reach and is still
    /// there when the reaction fires.
    pub fn brace(&self, owner: ActorId) -> ArmRequest {
        let trigger = TriggerPredicate::on_zone_crossing(Zone::WeaponReach, ZoneDirection::Entered)
            .require(Requirement::OwnerHolds(ItemTag::Weapon))
            .require(Requirement::InstigatorIsEnemy)
            .require(Requirement::PrincipalInZone(Zone::WeaponReach));
        let payload = ReactionPayload::new(
            self.brace,
            PayloadKind::Strike,
            SecondaryAction::Strike,
            DegreeLadder::none(),
        )
        .with_choices(OptionKind::Weapons);
        ArmRequest::new(owner, trigger, payload)
    }

    /// Turn a strike aside with a held weapon.
    pub fn parry(&self, owner: ActorId) -> ArmRequest {
        let trigger = TriggerPredicate::on_targeted()
            .require(Requirement::OwnerHolds(ItemTag::Weapon))
            .require(Requirement::InstigatorIsEnemy)
            .with_filter(targeted_by_strike);
        let payload = ReactionPayload::new(
            self.parry,
            PayloadKind::Parry,
            SecondaryAction::Automatic,
            DegreeLadder::flat(Modifier::circumstance(1)),
        )
        .with_effect_target(EffectTarget::OwnerForInstance);
        ArmRequest::new(owner, trigger, payload)
            .with_subject(owner)
            .with_usage(UsageLimit::Repeatable)
    }

    /// Raise one of the held shields against an incoming strike.
    pub fn reactive_shield(&self, owner: ActorId) -> ArmRequest {
        let trigger = TriggerPredicate::on_targeted()
            .require(Requirement::OwnerHolds(ItemTag::Shield))
            .require(Requirement::InstigatorIsEnemy)
            .with_filter(targeted_by_strike);
        let payload = ReactionPayload::new(
            self.reactive_shield,
            PayloadKind::RaiseShield,
            SecondaryAction::Automatic,
            DegreeLadder::flat(Modifier::circumstance(2)),
        )
        .with_choices(OptionKind::Shields)
        .with_effect_target(EffectTarget::OwnerForInstance);
        ArmRequest::new(owner, trigger, payload)
            .with_subject(owner)
            .with_expiration(ExpirationPolicy::Never)
            .with_usage(UsageLimit::OncePerEncounter)
            .with_decline_policy(DeclinePolicy::ConsumeOnAcceptOnly)
    }

    /// Soak incoming damage with a shield, paid from the shield block pool.
    pub fn shield_block(&self, owner: ActorId, hardness: i32) -> ArmRequest {
        let trigger = TriggerPredicate::on_damage().require(Requirement::OwnerHolds(ItemTag::Shield));
        let payload = ReactionPayload::new(
            self.shield_block,
            PayloadKind::ShieldBlock,
            SecondaryAction::Automatic,
            DegreeLadder::flat(Modifier::damage_reduction(hardness)),
        )
        .with_effect_target(EffectTarget::OwnerForInstance);
        ArmRequest::new(owner, trigger, payload)
            .with_subject(owner)
            .with_expiration(ExpirationPolicy::Never)
            .with_budget_class(BudgetClass::Bonus(self.shield_block_pool))
            .with_usage(UsageLimit::Repeatable)
    }
}
