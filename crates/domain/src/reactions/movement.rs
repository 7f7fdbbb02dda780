//! Movement interrupt detection.
//!
//! Movement is animated over several ticks. A watcher whose zone is crossed
//! mid-stride must react once per discrete movement action, not once per
//! tile and not zero times because the tick that would have seen the mover
//! at rest never came.
//!
//! Two paths feed the same dedup set, keyed by
//! `(watcher, mover, movement action, direction)`:
//! - the tick scan, which walks every step reported since the last scan,
//!   queues crossings and fires them when the action completes (or the
//!   mover comes to rest at its destination);
//! - the explicit `notify_provoked` callback, for actions that cross in a
//!   single atomic step the tick scan cannot observe.

use std::collections::HashSet;

use super::event::{ReactionEvent, ZoneDirection};
use super::registry::SpatialWatch;
use super::trigger::resolve_zone;
use super::view::BattlefieldView;
use crate::error::DomainError;
use crate::ids::{ActionInstanceId, ActorId};
use crate::value_objects::GridPosition;

/// The in-progress path of an animating actor. Read-only input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MovementSegment {
    mover: ActorId,
    action: ActionInstanceId,
    path: Vec<GridPosition>,
    current: usize,
    provokes: bool,
}

impl MovementSegment {
    /// `path[0]` is the origin. Starts at the origin.
    pub fn new(
        mover: ActorId,
        action: ActionInstanceId,
        path: Vec<GridPosition>,
    ) -> Result<Self, DomainError> {
        if path.is_empty() {
            return Err(DomainError::validation("movement path cannot be empty"));
        }
        Ok(Self {
            mover,
            action,
            path,
            current: 0,
            provokes: true,
        })
    }

    /// Movement that never provokes (a careful step).
    pub fn non_provoking(mut self) -> Self {
        self.provokes = false;
        self
    }

    /// Move the animation cursor. Clamped to the path.
    pub fn advance_to(&mut self, step: usize) {
        self.current = step.min(self.path.len() - 1);
    }

    pub fn with_step(mut self, step: usize) -> Self {
        self.advance_to(step);
        self
    }

    pub fn mover(&self) -> ActorId {
        self.mover
    }

    pub fn action(&self) -> ActionInstanceId {
        self.action
    }

    pub fn provokes(&self) -> bool {
        self.provokes
    }

    pub fn origin(&self) -> GridPosition {
        self.path[0]
    }

    pub fn current_position(&self) -> GridPosition {
        self.path[self.current]
    }

    /// Position at the immediately-preceding step, if past the origin.
    pub fn previous_position(&self) -> Option<GridPosition> {
        self.current.checked_sub(1).map(|idx| self.path[idx])
    }

    pub fn destination(&self) -> GridPosition {
        self.path[self.path.len() - 1]
    }

    pub fn is_at_destination(&self) -> bool {
        self.current == self.path.len() - 1
    }

    pub fn current_step(&self) -> usize {
        self.current
    }
}

/// A segment plus how far along its path crossings were already checked.
#[derive(Debug, Clone)]
struct TrackedSegment {
    segment: MovementSegment,
    scanned: usize,
}

impl TrackedSegment {
    fn new(segment: MovementSegment) -> Self {
        Self {
            segment,
            scanned: 0,
        }
    }
}

/// Dedup key shared by both detection paths.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ProvokeKey {
    pub watcher: ActorId,
    pub mover: ActorId,
    pub action: ActionInstanceId,
    pub direction: ZoneDirection,
}

impl ProvokeKey {
    fn into_event(self) -> ReactionEvent {
        ReactionEvent::ZoneCrossing {
            watcher: self.watcher,
            mover: self.mover,
            direction: self.direction,
            instance: self.action,
        }
    }
}

/// Actors a watcher currently sees inside its zone(s).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ZoneSnapshot {
    pub watcher: ActorId,
    pub members: Vec<ActorId>,
}

/// Converts continuous movement into discrete zone-crossing events.
#[derive(Debug, Default)]
pub struct MovementInterruptDetector {
    segments: Vec<TrackedSegment>,
    queue: Vec<ProvokeKey>,
    fired: HashSet<ProvokeKey>,
    completed: HashSet<ActionInstanceId>,
    snapshots: Vec<ZoneSnapshot>,
    fire_on_stabilize: bool,
}

impl MovementInterruptDetector {
    pub fn new(fire_on_stabilize: bool) -> Self {
        Self {
            fire_on_stabilize,
            ..Self::default()
        }
    }

    /// Record the latest animation state for a mover.
    ///
    /// Steps skipped between two updates are still scanned. Updates for
    /// actions that already completed are ignored. A new action by the same
    /// mover abandons the old one along with its queued crossings.
    pub fn update_segment(&mut self, segment: MovementSegment) {
        if self.completed.contains(&segment.action()) {
            return;
        }
        let mover = segment.mover();
        match self.segments.iter_mut().find(|t| t.segment.mover() == mover) {
            Some(existing) if existing.segment.action() == segment.action() => {
                existing.segment = segment;
            }
            Some(existing) => {
                let abandoned = existing.segment.action();
                *existing = TrackedSegment::new(segment);
                self.queue
                    .retain(|k| !(k.mover == mover && k.action == abandoned));
            }
            None => self.segments.push(TrackedSegment::new(segment)),
        }
    }

    pub fn segment(&self, mover: ActorId) -> Option<&MovementSegment> {
        self.segments
            .iter()
            .find(|t| t.segment.mover() == mover)
            .map(|t| &t.segment)
    }

    /// Queued, not yet fired crossings for a watcher.
    pub fn queued_for(&self, watcher: ActorId) -> Vec<ProvokeKey> {
        self.queue
            .iter()
            .filter(|k| k.watcher == watcher)
            .copied()
            .collect()
    }

    pub fn snapshot(&self, watcher: ActorId) -> Option<&ZoneSnapshot> {
        self.snapshots.iter().find(|s| s.watcher == watcher)
    }

    /// One state-check tick: rebuild zone snapshots, queue new crossings,
    /// and fire queued crossings whose mover has come to rest.
    pub fn scan(&mut self, watches: &[SpatialWatch], view: &dyn BattlefieldView) -> Vec<ReactionEvent> {
        self.rebuild_snapshots(watches, view);

        let movers: Vec<ActorId> = self.segments.iter().map(|t| t.segment.mover()).collect();
        for mover in movers {
            self.queue_crossings(mover, watches, view);
        }

        if !self.fire_on_stabilize {
            return Vec::new();
        }
        let resting: Vec<(ActorId, ActionInstanceId)> = self
            .segments
            .iter()
            .map(|t| &t.segment)
            .filter(|s| s.is_at_destination())
            .map(|s| (s.mover(), s.action()))
            .collect();
        resting
            .into_iter()
            .flat_map(|(mover, action)| self.drain(mover, action))
            .collect()
    }

    /// The mover's movement action finished. Evaluates the steps not yet
    /// scanned, then fires everything queued for it and forgets the segment.
    pub fn complete_action(
        &mut self,
        mover: ActorId,
        action: ActionInstanceId,
        watches: &[SpatialWatch],
        view: &dyn BattlefieldView,
    ) -> Vec<ReactionEvent> {
        let tracked = self
            .segment(mover)
            .is_some_and(|s| s.action() == action);
        if tracked {
            self.queue_crossings(mover, watches, view);
            self.segments.retain(|t| t.segment.mover() != mover);
        }
        self.completed.insert(action);
        self.drain(mover, action)
    }

    /// Synchronous path: the action itself reports that it crossed a zone.
    ///
    /// Returns the event to dispatch, or `None` if this crossing already
    /// fired through the tick path or the movement does not provoke.
    pub fn notify_provoked(
        &mut self,
        watcher: ActorId,
        mover: ActorId,
        action: ActionInstanceId,
        direction: ZoneDirection,
    ) -> Option<ReactionEvent> {
        if watcher == mover {
            return None;
        }
        let non_provoking = self
            .segment(mover)
            .is_some_and(|s| s.action() == action && !s.provokes());
        if non_provoking {
            return None;
        }
        let key = ProvokeKey {
            watcher,
            mover,
            action,
            direction,
        };
        self.queue.retain(|k| *k != key);
        self.fired.insert(key).then(|| key.into_event())
    }

    /// Forget per-action dedup state. Called at turn boundaries, when no
    /// movement action from the previous turn can still be in flight.
    pub fn reset_turn(&mut self) {
        self.fired.clear();
        self.completed.clear();
        self.queue.clear();
        self.segments.clear();
    }

    pub fn clear(&mut self) {
        self.reset_turn();
        self.snapshots.clear();
    }

    fn rebuild_snapshots(&mut self, watches: &[SpatialWatch], view: &dyn BattlefieldView) {
        let actors = view.actors();
        let mut snapshots: Vec<ZoneSnapshot> = Vec::new();
        for watch in watches {
            let Some(zone) = resolve_zone(watch.zone, watch.watcher, view) else {
                continue;
            };
            let members = actors
                .iter()
                .copied()
                .filter(|a| *a != watch.watcher)
                .filter(|a| view.position(*a).is_some_and(|p| zone.contains(&p)));
            match snapshots.iter_mut().find(|s| s.watcher == watch.watcher) {
                Some(existing) => {
                    for member in members {
                        if !existing.members.contains(&member) {
                            existing.members.push(member);
                        }
                    }
                }
                None => snapshots.push(ZoneSnapshot {
                    watcher: watch.watcher,
                    members: members.collect(),
                }),
            }
        }
        self.snapshots = snapshots;
    }

    fn queue_crossings(&mut self, mover: ActorId, watches: &[SpatialWatch], view: &dyn BattlefieldView) {
        let Some(tracked) = self.segments.iter_mut().find(|t| t.segment.mover() == mover) else {
            return;
        };
        let from = tracked.scanned;
        let to = tracked.segment.current_step();
        if to <= from {
            return;
        }
        tracked.scanned = to;
        let segment = tracked.segment.clone();
        if !segment.provokes() {
            return;
        }

        for step in from + 1..=to {
            let previous = segment.path[step - 1];
            let current = segment.path[step];
            for watch in watches {
                if watch.watcher == mover {
                    continue;
                }
                // Watchers without a resolvable zone (no reach weapon, gone) are skipped.
                let Some(zone) = resolve_zone(watch.zone, watch.watcher, view) else {
                    continue;
                };
                let direction = match (zone.contains(&previous), zone.contains(&current)) {
                    (false, true) => ZoneDirection::Entered,
                    (true, false) => ZoneDirection::Left,
                    _ => continue,
                };
                self.enqueue(ProvokeKey {
                    watcher: watch.watcher,
                    mover,
                    action: segment.action(),
                    direction,
                });
            }
        }
    }

    /// A mover that leaves before its entry fired has passed through: the
    /// pending entry is dropped and only the exit remains.
    fn enqueue(&mut self, key: ProvokeKey) {
        if key.direction == ZoneDirection::Left {
            let entry = ProvokeKey {
                direction: ZoneDirection::Entered,
                ..key
            };
            self.queue.retain(|k| *k != entry);
        }
        if !self.fired.contains(&key) && !self.queue.contains(&key) {
            self.queue.push(key);
        }
    }

    fn drain(&mut self, mover: ActorId, action: ActionInstanceId) -> Vec<ReactionEvent> {
        let (ready, rest): (Vec<_>, Vec<_>) = std::mem::take(&mut self.queue)
            .into_iter()
            .partition(|k| k.mover == mover && k.action == action);
        self.queue = rest;
        ready
            .into_iter()
            .filter(|key| self.fired.insert(*key))
            .map(ProvokeKey::into_event)
            .collect()
    }
}
