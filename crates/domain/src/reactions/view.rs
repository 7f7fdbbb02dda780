//! Read-only battlefield queries the host engine provides.

use crate::ids::ActorId;
use crate::value_objects::{GridPosition, ItemTag};

/// Synchronous view of current battlefield state.
///
/// Everything here must be cheap: trigger predicates call into it for every
/// candidate at every hook point.
pub trait BattlefieldView: Send + Sync {
    /// Actors currently in the encounter.
    fn actors(&self) -> Vec<ActorId>;

    /// Whether the actor still exists (not removed, not dead).
    fn exists(&self, actor: ActorId) -> bool;

    fn position(&self, actor: ActorId) -> Option<GridPosition>;

    /// Whether the actor holds (wields, has raised access to) an item of this tag.
    fn holds(&self, actor: ActorId, item: &ItemTag) -> bool;

    /// Reach in tiles of the actor's wielded melee weapon, if any.
    fn weapon_reach(&self, actor: ActorId) -> Option<u32>;

    fn are_allies(&self, a: ActorId, b: ActorId) -> bool;

    /// Whether the actor can currently take reactions (not stunned, etc.).
    fn can_act(&self, actor: ActorId) -> bool;
}
