//! Port traits for infrastructure boundaries.
//!
//! These are the ONLY abstractions in the engine. Everything else is concrete types.
//! Ports exist for:
//! - The owner's decision-maker (human UI or AI policy)
//! - Secondary checks and strikes (host dice resolution)
//! - Timed-effect attachment
//! - Per-encounter usage flags
//! - Random (for testing)
//!
//! Battlefield queries go through `tactica_domain::BattlefieldView`, which is
//! synchronous so trigger predicates can stay pure.

mod error;
mod external;
mod testing;

// =============================================================================
// Errors
// =============================================================================
pub use error::{CheckError, DecisionError, EffectError, UsageError};

// =============================================================================
// External Service Ports
// =============================================================================
pub use external::{
    AbilityUsagePort, CheckPort, Decision, DecisionPort, EffectExpiry, EffectPort,
    ReactionPrompt, SecondaryOption, SecondaryRequest, TimedEffect,
};

#[cfg(test)]
pub use external::{MockAbilityUsagePort, MockCheckPort, MockDecisionPort, MockEffectPort};

// =============================================================================
// Testing Ports
// =============================================================================
pub use testing::RandomPort;

#[cfg(test)]
pub use testing::MockRandomPort;
