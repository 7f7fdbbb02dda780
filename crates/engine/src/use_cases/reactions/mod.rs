//! Conditional reactions: arming, hook wiring and the confirmation protocol.

pub mod abilities;
pub mod hooks;
pub mod resolution;
pub mod scheduler;

pub use abilities::StandardAbilities;
pub use hooks::{HookObserver, HookObservers, HookPoint, HookReport, TracingObserver};
pub use resolution::{
    FailureStage, ResolutionContext, ResolutionOutcome, ResolutionProtocol, ResolutionStatus,
    SkipReason,
};
pub use scheduler::{ArmRequest, ReactionPorts, ReactionScheduler, SchedulerError};
