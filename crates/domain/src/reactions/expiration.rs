//! When an armed reaction stops being valid.

use serde::{Deserialize, Serialize};

use super::event::TurnBoundary;
use crate::ids::ActorId;

/// Exactly one variant is active at a time. Policies are re-evaluated at
/// every turn-boundary tick and collapse to `Immediate` once satisfied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExpirationPolicy {
    AtStartOfOwnersNextTurn,
    /// Falls back to the owner when the reaction has no subject.
    AtStartOfSubjectsNextTurn,
    /// Expires when the turn in progress ends, whoever's it is.
    EndOfCurrentTurn,
    /// Only manual dismissal or consumption removes it.
    Never,
    /// Already invalid; purge.
    Immediate,
}

impl ExpirationPolicy {
    pub fn is_immediate(&self) -> bool {
        matches!(self, ExpirationPolicy::Immediate)
    }

    /// Apply a turn boundary. Returns `true` if this call expired the policy.
    pub fn on_boundary(
        &mut self,
        boundary: TurnBoundary,
        owner: ActorId,
        subject: Option<ActorId>,
    ) -> bool {
        let expires = match (*self, boundary) {
            (ExpirationPolicy::AtStartOfOwnersNextTurn, TurnBoundary::Start(actor)) => {
                actor == owner
            }
            (ExpirationPolicy::AtStartOfSubjectsNextTurn, TurnBoundary::Start(actor)) => {
                actor == subject.unwrap_or(owner)
            }
            (ExpirationPolicy::EndOfCurrentTurn, TurnBoundary::End(_)) => true,
            _ => false,
        };
        if expires {
            *self = ExpirationPolicy::Immediate;
        }
        expires
    }

    /// Force expiry (consumption, dismissal).
    pub fn expire(&mut self) {
        *self = ExpirationPolicy::Immediate;
    }
}
