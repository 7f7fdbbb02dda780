//! What an armed reaction does once it fires.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::degree::DegreeLadder;
use crate::capabilities::AbilityId;

/// Kind of check being attempted (a skill name, a save, an attack).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CheckTag(String);

impl CheckTag {
    pub fn new(tag: impl Into<String>) -> Self {
        Self(tag.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CheckTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Equipment category a reaction may require its owner to hold.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemTag {
    Weapon,
    Shield,
    Named(String),
}

/// Broad category of a reaction's secondary action.
///
/// Bonus pools grant permission by kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PayloadKind {
    Aid,
    Strike,
    Parry,
    RaiseShield,
    ShieldBlock,
    /// Spending a pool to get the standard reaction back.
    ExtraReaction,
}

/// The secondary check/action performed when the reaction resolves.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "type")]
pub enum SecondaryAction {
    /// Roll a tagged check against a DC.
    Check { check: CheckTag, dc: i32 },
    /// Strike the triggering actor with a wielded weapon.
    Strike,
    /// No roll; the ladder is read at `Success`.
    Automatic,
}

/// Source of named choices offered alongside the prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OptionKind {
    Weapons,
    Shields,
}

/// Who the resulting timed effect attaches to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EffectTarget {
    /// The triggering action instance only (Aid on an ally's check).
    TriggeringInstance,
    /// The reaction's owner, for the triggering instance (Parry, Shield Block).
    OwnerForInstance,
}

/// Description of the secondary check/action and its effect table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReactionPayload {
    pub ability: AbilityId,
    pub kind: PayloadKind,
    pub secondary: SecondaryAction,
    /// When set, the decision-maker picks one of the owner's matching items.
    pub choices: Option<OptionKind>,
    pub ladder: DegreeLadder,
    pub effect_target: EffectTarget,
}

impl ReactionPayload {
    pub fn new(
        ability: AbilityId,
        kind: PayloadKind,
        secondary: SecondaryAction,
        ladder: DegreeLadder,
    ) -> Self {
        Self {
            ability,
            kind,
            secondary,
            choices: None,
            ladder,
            effect_target: EffectTarget::TriggeringInstance,
        }
    }

    pub fn with_choices(mut self, kind: OptionKind) -> Self {
        self.choices = Some(kind);
        self
    }

    pub fn with_effect_target(mut self, target: EffectTarget) -> Self {
        self.effect_target = target;
        self
    }
}

/// Permission predicate for a bonus-reaction pool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PayloadFilter {
    Any,
    Kinds(Vec<PayloadKind>),
    Abilities(Vec<AbilityId>),
}

impl PayloadFilter {
    pub fn permits(&self, payload: &ReactionPayload) -> bool {
        match self {
            PayloadFilter::Any => true,
            PayloadFilter::Kinds(kinds) => kinds.contains(&payload.kind),
            PayloadFilter::Abilities(abilities) => abilities.contains(&payload.ability),
        }
    }
}
