use crate::crd::RouteMonitor;

/// Lifecycle phase of a RouteMonitor. Never stored; always re-derived.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    /// No probe target resolved yet.
    Provisioning,
    /// Target known, finalizer not yet persisted.
    Ensuring,
    /// Target known and finalizer persisted; dependents may be created.
    Active,
    /// Deletion requested.
    Retracting,
}

pub fn phase_of(rm: &RouteMonitor) -> Phase {
    if rm.was_delete_requested() {
        Phase::Retracting
    } else if rm.target_url().is_none() {
        Phase::Provisioning
    } else if !rm.has_finalizer() {
        Phase::Ensuring
    } else {
        Phase::Active
    }
}
