//! Tactica domain: the rules of conditional reactions.
//!
//! Pure and synchronous. The engine crate owns prompting, dice and effect
//! application, and drives everything here from its turn loop.

pub mod capabilities;
pub mod error;
pub mod ids;
pub mod reactions;
pub mod value_objects;

pub use capabilities::{AbilityId, CapabilityRegistry, PoolId};
pub use error::DomainError;
pub use ids::{ActionInstanceId, ActorId, ItemId, ReactionId};
pub use reactions::{
    BattlefieldView, BonusPool, BudgetClass, DeclineOutcome, DeclinePolicy, EventKind,
    ExpirationPolicy, MatchScope, MovementInterruptDetector, MovementSegment, PendingReaction,
    ProvokeKey, ReactionBudget, ReactionBudgets, ReactionEvent, ReactionIdentity, ReactionPhase,
    ReactionRegistry, Requirement, RollKind, SpatialWatch, TriggerPredicate, TurnBoundary,
    UsageLimit, ZoneDirection, ZoneSnapshot,
};
pub use value_objects::{
    determine_success, CheckTag, DegreeLadder, DegreeOfSuccess, EffectTarget, GridPosition,
    ItemTag, Modifier, ModifierKind, OptionKind, PayloadFilter, PayloadKind, ReactionPayload,
    ResolvedZone, SecondaryAction, Zone,
};
