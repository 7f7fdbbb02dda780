//! Events the host engine reports, and the turn boundaries that drive expiry.

use serde::{Deserialize, Serialize};

use crate::ids::{ActionInstanceId, ActorId};
use crate::value_objects::CheckTag;

/// What an actor is being targeted with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RollKind {
    Strike,
    Spell,
    Skill(CheckTag),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ZoneDirection {
    Entered,
    Left,
}

/// Category of event, used to pre-filter triggers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    CheckAttempt,
    TargetedByRoll,
    DamageIncoming,
    ZoneCrossing,
}

/// A future event an armed reaction may respond to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "event")]
pub enum ReactionEvent {
    /// `actor` is about to attempt a tagged check.
    CheckAttempt {
        actor: ActorId,
        check: CheckTag,
        target: Option<ActorId>,
        instance: ActionInstanceId,
    },
    /// `target` is about to be the target of a roll-based action.
    TargetedByRoll {
        attacker: ActorId,
        target: ActorId,
        roll: RollKind,
        instance: ActionInstanceId,
    },
    /// `target` is about to take damage.
    DamageIncoming {
        source: Option<ActorId>,
        target: ActorId,
        amount: u32,
        instance: ActionInstanceId,
    },
    /// `mover` crossed the zone watched by `watcher`.
    ZoneCrossing {
        watcher: ActorId,
        mover: ActorId,
        direction: ZoneDirection,
        instance: ActionInstanceId,
    },
}

impl ReactionEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            ReactionEvent::CheckAttempt { .. } => EventKind::CheckAttempt,
            ReactionEvent::TargetedByRoll { .. } => EventKind::TargetedByRoll,
            ReactionEvent::DamageIncoming { .. } => EventKind::DamageIncoming,
            ReactionEvent::ZoneCrossing { .. } => EventKind::ZoneCrossing,
        }
    }

    /// The actor the event happens to: who checks, who is targeted, who is
    /// hurt, who moves. Subject-scoped reactions compare against this.
    pub fn principal(&self) -> ActorId {
        match self {
            ReactionEvent::CheckAttempt { actor, .. } => *actor,
            ReactionEvent::TargetedByRoll { target, .. } => *target,
            ReactionEvent::DamageIncoming { target, .. } => *target,
            ReactionEvent::ZoneCrossing { mover, .. } => *mover,
        }
    }

    /// The actor whose action caused the event, if any.
    pub fn instigator(&self) -> Option<ActorId> {
        match self {
            ReactionEvent::CheckAttempt { actor, .. } => Some(*actor),
            ReactionEvent::TargetedByRoll { attacker, .. } => Some(*attacker),
            ReactionEvent::DamageIncoming { source, .. } => *source,
            ReactionEvent::ZoneCrossing { mover, .. } => Some(*mover),
        }
    }

    /// The triggering action instance.
    pub fn instance(&self) -> ActionInstanceId {
        match self {
            ReactionEvent::CheckAttempt { instance, .. }
            | ReactionEvent::TargetedByRoll { instance, .. }
            | ReactionEvent::DamageIncoming { instance, .. }
            | ReactionEvent::ZoneCrossing { instance, .. } => *instance,
        }
    }

    /// Short human-readable description for prompts and logs.
    pub fn describe(&self) -> String {
        match self {
            ReactionEvent::CheckAttempt { check, .. } => format!("attempting a {} check", check),
            ReactionEvent::TargetedByRoll { roll, .. } => match roll {
                RollKind::Strike => "making a strike".to_string(),
                RollKind::Spell => "casting a spell".to_string(),
                RollKind::Skill(check) => format!("using {}", check),
            },
            ReactionEvent::DamageIncoming { amount, .. } => format!("dealing {} damage", amount),
            ReactionEvent::ZoneCrossing { direction, .. } => match direction {
                ZoneDirection::Entered => "moving into reach".to_string(),
                ZoneDirection::Left => "moving out of reach".to_string(),
            },
        }
    }
}

/// A turn-boundary tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnBoundary {
    Start(ActorId),
    End(ActorId),
}
