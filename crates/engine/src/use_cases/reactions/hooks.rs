//! Hook points the host turn loop calls, and observers of what they did.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use tactica_domain::ReactionId;

use super::resolution::{ResolutionOutcome, ResolutionStatus};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HookPoint {
    TurnStart,
    TurnEnd,
    BeforeRoll,
    DamageIncoming,
    StateCheckTick,
    MovementStep,
    ActionCompleted,
}

impl fmt::Display for HookPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            HookPoint::TurnStart => "turn_start",
            HookPoint::TurnEnd => "turn_end",
            HookPoint::BeforeRoll => "before_roll",
            HookPoint::DamageIncoming => "damage_incoming",
            HookPoint::StateCheckTick => "state_check_tick",
            HookPoint::MovementStep => "movement_step",
            HookPoint::ActionCompleted => "action_completed",
        };
        f.write_str(name)
    }
}

/// Everything one hook invocation did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HookReport {
    pub point: HookPoint,
    /// One entry per candidate considered, in arming order.
    pub outcomes: Vec<ResolutionOutcome>,
    /// Records that expired at this hook's turn boundary.
    pub expired: Vec<ReactionId>,
    /// Records removed from storage by this hook's purge.
    pub purged: usize,
}

impl HookReport {
    pub fn new(point: HookPoint) -> Self {
        Self {
            point,
            outcomes: Vec::new(),
            expired: Vec::new(),
            purged: 0,
        }
    }

    pub fn fired(&self) -> impl Iterator<Item = &ResolutionOutcome> {
        self.outcomes.iter().filter(|o| o.fired())
    }

    pub fn fired_count(&self) -> usize {
        self.fired().count()
    }

    pub fn is_quiet(&self) -> bool {
        self.outcomes.is_empty() && self.expired.is_empty() && self.purged == 0
    }
}

/// Something that wants to hear about hook activity (combat log, UI, replay).
pub trait HookObserver: Send + Sync {
    fn observe(&self, report: &HookReport);
}

impl<F> HookObserver for F
where
    F: Fn(&HookReport) + Send + Sync,
{
    fn observe(&self, report: &HookReport) {
        self(report)
    }
}

/// Observers registered per hook point, notified in registration order.
#[derive(Default)]
pub struct HookObservers {
    by_point: HashMap<HookPoint, Vec<Arc<dyn HookObserver>>>,
}

impl HookObservers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, point: HookPoint, observer: Arc<dyn HookObserver>) {
        self.by_point.entry(point).or_default().push(observer);
    }

    /// Register one observer for every hook point.
    pub fn register_all(&mut self, observer: Arc<dyn HookObserver>) {
        for point in [
            HookPoint::TurnStart,
            HookPoint::TurnEnd,
            HookPoint::BeforeRoll,
            HookPoint::DamageIncoming,
            HookPoint::StateCheckTick,
            HookPoint::MovementStep,
            HookPoint::ActionCompleted,
        ] {
            self.register(point, observer.clone());
        }
    }

    pub fn count(&self, point: HookPoint) -> usize {
        self.by_point.get(&point).map_or(0, Vec::len)
    }

    pub fn notify(&self, report: &HookReport) {
        if let Some(observers) = self.by_point.get(&report.point) {
            for observer in observers {
                observer.observe(report);
            }
        }
    }
}

/// Writes every non-quiet report to the tracing log.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl HookObserver for TracingObserver {
    fn observe(&self, report: &HookReport) {
        if report.is_quiet() {
            return;
        }
        for outcome in &report.outcomes {
            match &outcome.status {
                ResolutionStatus::Resolved { degree, modifier, .. } => tracing::info!(
                    hook = %report.point,
                    reaction = %outcome.reaction,
                    owner = %outcome.owner,
                    degree = ?degree,
                    modifier = ?modifier,
                    "Reaction fired"
                ),
                ResolutionStatus::Failed { stage, message } => tracing::warn!(
                    hook = %report.point,
                    reaction = %outcome.reaction,
                    stage = ?stage,
                    error = %message,
                    "Reaction fired but did not resolve"
                ),
                status => tracing::debug!(
                    hook = %report.point,
                    reaction = %outcome.reaction,
                    status = ?status,
                    "Reaction did not fire"
                ),
            }
        }
        if !report.expired.is_empty() || report.purged > 0 {
            tracing::debug!(
                hook = %report.point,
                expired = report.expired.len(),
                purged = report.purged,
                "Reactions expired"
            );
        }
    }
}
