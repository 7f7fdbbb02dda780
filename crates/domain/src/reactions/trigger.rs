//! Trigger predicates: does this event match this armed reaction?
//!
//! Predicates are pure. Every requirement is evaluated against the live
//! battlefield view at match time, so a reaction armed while its owner was
//! adjacent, armed, or alive stops matching the moment that is no longer true.

use std::fmt;
use std::sync::Arc;

use super::event::{EventKind, ReactionEvent, ZoneDirection};
use super::view::BattlefieldView;
use crate::ids::ActorId;
use crate::value_objects::{CheckTag, ItemTag, ResolvedZone, Zone};

/// Extra event filter supplied by ability content.
pub type EventFilter = Arc<dyn Fn(&ReactionEvent) -> bool + Send + Sync>;

/// Conditions re-checked every time the trigger is evaluated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Requirement {
    /// Owner can take reactions right now.
    OwnerCanAct,
    /// Owner holds an item of this tag.
    OwnerHolds(ItemTag),
    /// The event's principal is within this many tiles of the owner.
    PrincipalWithin(u32),
    /// The event's principal is inside the owner's zone.
    PrincipalInZone(Zone),
    /// The event's principal is an ally of the owner (and not the owner).
    PrincipalIsAlly,
    /// The event's instigator exists and is not an ally of the owner.
    InstigatorIsEnemy,
}

/// Who the predicate is being evaluated for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MatchScope {
    pub owner: ActorId,
    pub subject: Option<ActorId>,
}

/// Resolve a zone for a watcher against the current view.
pub fn resolve_zone(zone: Zone, watcher: ActorId, view: &dyn BattlefieldView) -> Option<ResolvedZone> {
    let centre = view.position(watcher)?;
    let radius = match zone {
        Zone::Radius(radius) => radius,
        Zone::WeaponReach => view.weapon_reach(watcher)?,
    };
    Some(ResolvedZone { centre, radius })
}

/// Matches future events to an armed reaction.
#[derive(Clone)]
pub struct TriggerPredicate {
    kind: EventKind,
    checks: Option<Vec<CheckTag>>,
    zone: Option<Zone>,
    directions: Vec<ZoneDirection>,
    requirements: Vec<Requirement>,
    filter: Option<EventFilter>,
}

impl fmt::Debug for TriggerPredicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TriggerPredicate")
            .field("kind", &self.kind)
            .field("checks", &self.checks)
            .field("zone", &self.zone)
            .field("directions", &self.directions)
            .field("requirements", &self.requirements)
            .field("filter", &self.filter.as_ref().map(|_| "<fn>"))
            .finish()
    }
}

impl TriggerPredicate {
    fn of_kind(kind: EventKind) -> Self {
        Self {
            kind,
            checks: None,
            zone: None,
            directions: Vec::new(),
            requirements: vec![Requirement::OwnerCanAct],
            filter: None,
        }
    }

    /// Someone is about to attempt one of the given checks.
    pub fn on_check(checks: impl IntoIterator<Item = CheckTag>) -> Self {
        let mut trigger = Self::of_kind(EventKind::CheckAttempt);
        trigger.checks = Some(checks.into_iter().collect());
        trigger
    }

    /// Someone is about to attempt any tagged check.
    pub fn on_any_check() -> Self {
        Self::of_kind(EventKind::CheckAttempt)
    }

    /// Someone is about to be targeted by a roll.
    pub fn on_targeted() -> Self {
        Self::of_kind(EventKind::TargetedByRoll)
    }

    /// Someone is about to take damage.
    pub fn on_damage() -> Self {
        Self::of_kind(EventKind::DamageIncoming)
    }

    /// Someone crossed the owner's zone in the given direction.
    pub fn on_zone_crossing(zone: Zone, direction: ZoneDirection) -> Self {
        let mut trigger = Self::of_kind(EventKind::ZoneCrossing);
        trigger.zone = Some(zone);
        trigger.directions = vec![direction];
        trigger
    }

    pub fn require(mut self, requirement: Requirement) -> Self {
        if !self.requirements.contains(&requirement) {
            self.requirements.push(requirement);
        }
        self
    }

    pub fn with_filter(
        mut self,
        filter: impl Fn(&ReactionEvent) -> bool + Send + Sync + 'static,
    ) -> Self {
        self.filter = Some(Arc::new(filter));
        self
    }

    pub fn kind(&self) -> EventKind {
        self.kind
    }

    /// The watched zone, for spatial triggers.
    pub fn zone(&self) -> Option<Zone> {
        self.zone
    }

    pub fn is_spatial(&self) -> bool {
        self.kind == EventKind::ZoneCrossing
    }

    pub fn watches_direction(&self, direction: ZoneDirection) -> bool {
        self.directions.contains(&direction)
    }

    /// Evaluate against an event. Pure; safe to call on every candidate.
    pub fn matches(
        &self,
        scope: &MatchScope,
        event: &ReactionEvent,
        view: &dyn BattlefieldView,
    ) -> bool {
        if event.kind() != self.kind {
            return false;
        }
        if !view.exists(scope.owner) {
            return false;
        }
        let principal = event.principal();
        if let Some(subject) = scope.subject {
            if principal != subject || !view.exists(subject) {
                return false;
            }
        }

        match event {
            ReactionEvent::CheckAttempt { check, .. } => {
                if let Some(checks) = &self.checks {
                    if !checks.contains(check) {
                        return false;
                    }
                }
            }
            ReactionEvent::ZoneCrossing {
                watcher, direction, ..
            } => {
                if *watcher != scope.owner || !self.watches_direction(*direction) {
                    return false;
                }
            }
            ReactionEvent::TargetedByRoll { .. } | ReactionEvent::DamageIncoming { .. } => {}
        }

        if !self
            .requirements
            .iter()
            .all(|req| requirement_holds(req, scope, event, view))
        {
            return false;
        }

        self.filter.as_ref().map_or(true, |filter| filter(event))
    }
}

fn requirement_holds(
    requirement: &Requirement,
    scope: &MatchScope,
    event: &ReactionEvent,
    view: &dyn BattlefieldView,
) -> bool {
    let owner = scope.owner;
    let principal = event.principal();
    match requirement {
        Requirement::OwnerCanAct => view.can_act(owner),
        Requirement::OwnerHolds(item) => view.holds(owner, item),
        Requirement::PrincipalWithin(tiles) => {
            match (view.position(owner), view.position(principal)) {
                (Some(a), Some(b)) => a.distance_to(&b) <= *tiles,
                _ => false,
            }
        }
        Requirement::PrincipalInZone(zone) => {
            match (resolve_zone(*zone, owner, view), view.position(principal)) {
                (Some(resolved), Some(position)) => resolved.contains(&position),
                _ => false,
            }
        }
        Requirement::PrincipalIsAlly => principal != owner && view.are_allies(owner, principal),
        Requirement::InstigatorIsEnemy => match event.instigator() {
            Some(instigator) => {
                instigator != owner && view.exists(instigator) && !view.are_allies(owner, instigator)
            }
            None => false,
        },
    }
}
