//! Use cases - turn-loop orchestration.
//!
//! Use cases drive the pure domain rules through the infrastructure ports.

pub mod reactions;

pub use reactions::{ArmRequest, ReactionScheduler, StandardAbilities};
