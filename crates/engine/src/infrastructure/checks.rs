//! d20 secondary-check resolver backed by the in-memory battlefield.

use std::sync::Arc;

use async_trait::async_trait;
use tactica_domain::{determine_success, ActorId, DegreeOfSuccess, ItemTag, OptionKind, SecondaryAction};

use crate::infrastructure::battlefield::InMemoryBattlefield;
use crate::infrastructure::ports::{
    CheckError, CheckPort, RandomPort, SecondaryOption, SecondaryRequest,
};

/// Damage a hitting reaction strike deals. Doubled on a critical hit.
const DEFAULT_STRIKE_DAMAGE: i32 = 6;

pub struct DiceCheckResolver {
    battlefield: Arc<InMemoryBattlefield>,
    random: Arc<dyn RandomPort>,
    strike_damage: i32,
}

impl DiceCheckResolver {
    pub fn new(battlefield: Arc<InMemoryBattlefield>, random: Arc<dyn RandomPort>) -> Self {
        Self {
            battlefield,
            random,
            strike_damage: DEFAULT_STRIKE_DAMAGE,
        }
    }

    pub fn with_strike_damage(mut self, damage: i32) -> Self {
        self.strike_damage = damage;
        self
    }

    fn roll_against(&self, owner: ActorId, dc: i32) -> Result<DegreeOfSuccess, CheckError> {
        let bonus = self
            .battlefield
            .combatant(owner)
            .ok_or_else(|| CheckError::not_found("Actor", owner))?
            .check_bonus;
        let roll = self.random.gen_range(1, 20);
        let degree = determine_success(roll, bonus, dc, roll == 20, roll == 1);
        tracing::debug!(
            owner = %owner,
            roll = roll,
            bonus = bonus,
            dc = dc,
            degree = ?degree,
            "Secondary check rolled"
        );
        Ok(degree)
    }
}

#[async_trait]
impl CheckPort for DiceCheckResolver {
    async fn secondary_options(
        &self,
        owner: ActorId,
        kind: OptionKind,
    ) -> Result<Vec<SecondaryOption>, CheckError> {
        if self.battlefield.combatant(owner).is_none() {
            return Err(CheckError::not_found("Actor", owner));
        }
        let tag = match kind {
            OptionKind::Weapons => ItemTag::Weapon,
            OptionKind::Shields => ItemTag::Shield,
        };
        Ok(self
            .battlefield
            .items_of(owner, &tag)
            .into_iter()
            .map(|item| SecondaryOption {
                item: item.id,
                name: item.name,
            })
            .collect())
    }

    async fn resolve_secondary(
        &self,
        request: SecondaryRequest,
    ) -> Result<DegreeOfSuccess, CheckError> {
        match request.action {
            SecondaryAction::Automatic => Ok(DegreeOfSuccess::Success),
            SecondaryAction::Check { dc, .. } => self.roll_against(request.owner, dc),
            SecondaryAction::Strike => {
                let armor_class = self
                    .battlefield
                    .combatant(request.against)
                    .ok_or_else(|| CheckError::not_found("Actor", request.against))?
                    .armor_class;
                let degree = self.roll_against(request.owner, armor_class)?;
                let damage = match degree {
                    DegreeOfSuccess::CriticalSuccess => self.strike_damage * 2,
                    DegreeOfSuccess::Success => self.strike_damage,
                    _ => 0,
                };
                if damage > 0 {
                    let remaining = self.battlefield.apply_damage(request.against, damage);
                    tracing::info!(
                        attacker = %request.owner,
                        target = %request.against,
                        damage = damage,
                        remaining_hp = ?remaining,
                        "Reaction strike hit"
                    );
                }
                Ok(degree)
            }
        }
    }
}
