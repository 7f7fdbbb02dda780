//! Value objects shared by the reaction rules.

mod degree;
mod geometry;
mod payload;

pub use degree::{determine_success, DegreeLadder, DegreeOfSuccess, Modifier, ModifierKind};
pub use geometry::{GridPosition, ResolvedZone, Zone};
pub use payload::{
    CheckTag, EffectTarget, ItemTag, OptionKind, PayloadFilter, PayloadKind, ReactionPayload,
    SecondaryAction,
};
