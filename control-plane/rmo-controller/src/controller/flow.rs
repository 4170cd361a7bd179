use std::time::Duration;

use kube::runtime::controller::Action;

/// Directive returned by every reconcile step. Hard failures travel in the
/// `Err` arm of `Result<Flow, ReconcileErr>` instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    /// Carry on with the next step of the pass.
    Continue,
    /// The pass is over; wait for the next watch event.
    Stop,
    /// The pass is over; redeliver after the given delay (zero = promptly).
    Requeue(Duration),
}

impl Flow {
    pub fn requeue_now() -> Self {
        Flow::Requeue(Duration::ZERO)
    }

    pub fn into_action(self) -> Action {
        match self {
            Flow::Continue | Flow::Stop => Action::await_change(),
            Flow::Requeue(after) => Action::requeue(after),
        }
    }
}
