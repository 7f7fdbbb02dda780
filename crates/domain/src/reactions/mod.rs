//! Conditional reactions: armed records, triggers, budgets and the
//! movement interrupt detector.
//!
//! Everything here is synchronous and side-effect free apart from mutating
//! its own state. Prompting, rolling and effect application live in the
//! engine crate.

mod budget;
mod event;
mod expiration;
mod movement;
mod pending;
mod registry;
mod trigger;
mod view;

#[cfg(test)]
mod testing;

pub use budget::{BonusPool, BudgetClass, ReactionBudget, ReactionBudgets};
pub use event::{EventKind, ReactionEvent, RollKind, TurnBoundary, ZoneDirection};
pub use expiration::ExpirationPolicy;
pub use movement::{MovementInterruptDetector, MovementSegment, ProvokeKey, ZoneSnapshot};
pub use pending::{
    DeclineOutcome, DeclinePolicy, PendingReaction, ReactionIdentity, ReactionPhase, UsageLimit,
};
pub use registry::{ReactionRegistry, SpatialWatch};
pub use trigger::{resolve_zone, EventFilter, MatchScope, Requirement, TriggerPredicate};
pub use view::BattlefieldView;
