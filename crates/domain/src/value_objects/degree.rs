//! Four-step degree-of-success ladder and per-ability magnitude tables.

use serde::{Deserialize, Serialize};

/// Four degrees of success.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DegreeOfSuccess {
    /// Beat DC by 10+ OR natural 20 that succeeds
    CriticalSuccess,
    /// Meet or beat DC
    Success,
    /// Below DC
    Failure,
    /// Miss DC by 10+ OR natural 1 that fails
    CriticalFailure,
}

impl DegreeOfSuccess {
    /// Upgrade the degree by one step (e.g., nat 20).
    pub fn upgrade(self) -> Self {
        match self {
            DegreeOfSuccess::CriticalFailure => DegreeOfSuccess::Failure,
            DegreeOfSuccess::Failure => DegreeOfSuccess::Success,
            DegreeOfSuccess::Success => DegreeOfSuccess::CriticalSuccess,
            DegreeOfSuccess::CriticalSuccess => DegreeOfSuccess::CriticalSuccess,
        }
    }

    /// Downgrade the degree by one step (e.g., nat 1).
    pub fn downgrade(self) -> Self {
        match self {
            DegreeOfSuccess::CriticalSuccess => DegreeOfSuccess::Success,
            DegreeOfSuccess::Success => DegreeOfSuccess::Failure,
            DegreeOfSuccess::Failure => DegreeOfSuccess::CriticalFailure,
            DegreeOfSuccess::CriticalFailure => DegreeOfSuccess::CriticalFailure,
        }
    }

    /// Shift by `steps` (positive upgrades). Clamps at both ends of the ladder.
    pub fn shift(self, steps: i8) -> Self {
        let mut degree = self;
        if steps >= 0 {
            for _ in 0..steps {
                degree = degree.upgrade();
            }
        } else {
            for _ in 0..steps.unsigned_abs() {
                degree = degree.downgrade();
            }
        }
        degree
    }

    pub fn is_success(self) -> bool {
        matches!(
            self,
            DegreeOfSuccess::Success | DegreeOfSuccess::CriticalSuccess
        )
    }
}

/// Determine success level for a d20 roll against a DC.
pub fn determine_success(
    roll: i32,
    modifier: i32,
    dc: i32,
    is_nat_20: bool,
    is_nat_1: bool,
) -> DegreeOfSuccess {
    let total = roll + modifier;
    let diff = total - dc;

    let base = if diff >= 0 {
        DegreeOfSuccess::Success
    } else {
        DegreeOfSuccess::Failure
    };

    // +/- 10 rule
    let adjusted = if diff >= 10 {
        base.upgrade()
    } else if diff <= -10 {
        base.downgrade()
    } else {
        base
    };

    if is_nat_20 {
        adjusted.upgrade()
    } else if is_nat_1 {
        adjusted.downgrade()
    } else {
        adjusted
    }
}

/// Bonus type, for stacking purposes on the host side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModifierKind {
    Circumstance,
    Status,
    Item,
    /// Damage prevented outright (shield block style).
    DamageReduction,
}

/// A signed modifier of a given kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Modifier {
    pub kind: ModifierKind,
    pub value: i32,
}

impl Modifier {
    pub fn circumstance(value: i32) -> Self {
        Self {
            kind: ModifierKind::Circumstance,
            value,
        }
    }

    pub fn damage_reduction(value: i32) -> Self {
        Self {
            kind: ModifierKind::DamageReduction,
            value,
        }
    }
}

/// Maps each degree of the secondary check to an effect magnitude.
///
/// `None` means "no effect" for that rung.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DegreeLadder {
    pub critical_success: Option<Modifier>,
    pub success: Option<Modifier>,
    pub failure: Option<Modifier>,
    pub critical_failure: Option<Modifier>,
    /// Applied to the rolled degree before lookup (e.g. +1 for abilities that
    /// grant an extra degree of success). Clamped, never wrapped.
    #[serde(default)]
    pub degree_shift: i8,
}

impl DegreeLadder {
    /// The same modifier regardless of the roll (automatic reactions).
    pub fn flat(modifier: Modifier) -> Self {
        Self {
            critical_success: Some(modifier),
            success: Some(modifier),
            failure: Some(modifier),
            critical_failure: Some(modifier),
            degree_shift: 0,
        }
    }

    /// No effect on any rung (budget-only payloads).
    pub fn none() -> Self {
        Self {
            critical_success: None,
            success: None,
            failure: None,
            critical_failure: None,
            degree_shift: 0,
        }
    }

    pub fn with_degree_shift(mut self, shift: i8) -> Self {
        self.degree_shift = shift;
        self
    }

    /// Effective degree after the ladder's shift.
    pub fn effective_degree(&self, rolled: DegreeOfSuccess) -> DegreeOfSuccess {
        rolled.shift(self.degree_shift)
    }

    /// Magnitude for a rolled degree.
    pub fn magnitude(&self, rolled: DegreeOfSuccess) -> Option<Modifier> {
        match self.effective_degree(rolled) {
            DegreeOfSuccess::CriticalSuccess => self.critical_success,
            DegreeOfSuccess::Success => self.success,
            DegreeOfSuccess::Failure => self.failure,
            DegreeOfSuccess::CriticalFailure => self.critical_failure,
        }
    }
}
