//! Registry of every armed reaction in the encounter.

use super::event::{ReactionEvent, TurnBoundary};
use super::pending::PendingReaction;
use super::view::BattlefieldView;
use crate::ids::{ActorId, ReactionId};
use crate::value_objects::Zone;

/// A live spatial reaction, as seen by the movement detector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpatialWatch {
    pub reaction: ReactionId,
    pub watcher: ActorId,
    pub zone: Zone,
}

/// Holds all pending reactions, kept in arming order.
#[derive(Debug, Default)]
pub struct ReactionRegistry {
    records: Vec<PendingReaction>,
    next_seq: u64,
}

impl ReactionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Arm a reaction, replacing any record with the same identity.
    ///
    /// Returns the replaced record, if there was one. The new record is
    /// stamped with a fresh arming sequence number.
    pub fn arm(&mut self, mut record: PendingReaction) -> Option<PendingReaction> {
        let identity = record.identity();
        let replaced = self
            .records
            .iter()
            .position(|r| r.identity() == identity)
            .map(|idx| self.records.remove(idx));

        self.next_seq += 1;
        record.set_armed_seq(self.next_seq);
        self.records.push(record);
        replaced
    }

    /// All records that could fire for this event, earliest-armed first.
    ///
    /// Never returns a consumed or expired record, even before
    /// [`purge_expired`](Self::purge_expired) has run, and never returns a
    /// record twice.
    pub fn query_matches(
        &self,
        event: &ReactionEvent,
        view: &dyn BattlefieldView,
    ) -> Vec<&PendingReaction> {
        let instance = event.instance();
        // Records are stored in arming order, so no sort is needed.
        self.records
            .iter()
            .filter(|r| r.can_fire_for(instance))
            .filter(|r| r.trigger().matches(&r.scope(), event, view))
            .collect()
    }

    /// Ids of matching records, for callers that need to mutate afterwards.
    pub fn matching_ids(&self, event: &ReactionEvent, view: &dyn BattlefieldView) -> Vec<ReactionId> {
        self.query_matches(event, view)
            .into_iter()
            .map(PendingReaction::id)
            .collect()
    }

    /// Apply a turn boundary to every record. Returns the ids that expired.
    pub fn on_boundary(&mut self, boundary: TurnBoundary) -> Vec<ReactionId> {
        self.records
            .iter_mut()
            .filter_map(|r| r.on_boundary(boundary).then(|| r.id()))
            .collect()
    }

    /// Remove every record whose policy has collapsed to `Immediate`.
    pub fn purge_expired(&mut self) -> Vec<PendingReaction> {
        let (dead, live): (Vec<_>, Vec<_>) = std::mem::take(&mut self.records)
            .into_iter()
            .partition(|r| !r.is_live());
        self.records = live;
        dead
    }

    pub fn get(&self, id: ReactionId) -> Option<&PendingReaction> {
        self.records.iter().find(|r| r.id() == id)
    }

    pub fn get_mut(&mut self, id: ReactionId) -> Option<&mut PendingReaction> {
        self.records.iter_mut().find(|r| r.id() == id)
    }

    /// Manually dismiss a record. It is dropped on the next purge.
    pub fn dismiss(&mut self, id: ReactionId) -> bool {
        match self.get_mut(id) {
            Some(record) => {
                record.dismiss();
                true
            }
            None => false,
        }
    }

    /// Live records armed by `owner`.
    pub fn armed_for(&self, owner: ActorId) -> impl Iterator<Item = &PendingReaction> {
        self.records
            .iter()
            .filter(move |r| r.owner() == owner && r.is_live())
    }

    /// Live spatial records, for the movement detector.
    pub fn spatial_watches(&self) -> Vec<SpatialWatch> {
        self.records
            .iter()
            .filter(|r| r.is_live())
            .filter_map(|r| {
                r.trigger().zone().map(|zone| SpatialWatch {
                    reaction: r.id(),
                    watcher: r.owner(),
                    zone,
                })
            })
            .collect()
    }

    pub fn clear(&mut self) {
        self.records.clear();
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
