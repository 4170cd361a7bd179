use kube::Resource;
use kube::runtime::events::{Event, EventType, Recorder, Reporter};
use tracing::debug;

use crate::crd::RouteMonitor;

pub const REPORTER: &str = "route-monitor-operator";

pub const REASON_FINALIZER_ADDED: &str = "FinalizerAdded";
pub const REASON_RETRACTED: &str = "DependenciesRetracted";
pub const REASON_RECONCILE_FAILED: &str = "ReconcileFailed";

pub fn reporter() -> Reporter {
    Reporter {
        controller: REPORTER.into(),
        instance: std::env::var("HOSTNAME").ok(),
    }
}

/// Publish an event on `rm`. Failures are logged and otherwise ignored.
pub async fn emit_event(
    recorder: &Recorder,
    rm: &RouteMonitor,
    type_: EventType,
    reason: &str,
    action: &str,
    note: Option<String>,
) {
    let res = recorder
        .publish(
            &Event {
                type_,
                reason: reason.into(),
                note,
                action: action.into(),
                secondary: None,
            },
            &rm.object_ref(&()),
        )
        .await;
    if let Err(e) = res {
        debug!(error = %e, reason, "failed to publish event");
    }
}
