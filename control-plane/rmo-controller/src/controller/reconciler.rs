use std::sync::Arc;

use tracing::{debug, info};

use super::ReconcileErr;
use super::dependents::Dependent;
use super::finalizer::{FinalizerGuard, FinalizerUpdate};
use super::flow::Flow;
use super::phase::{Phase, phase_of};
use super::shared::{Retention, SharedDependency};
use super::target::TargetResolver;
use crate::crd::RouteMonitor;
use crate::store::ObjectKey;

/// A persisted finalizer change made during a pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    FinalizerAdded,
    FinalizerRemoved,
}

/// Result of one pass: the directive for the scheduler and the finalizer
/// change it made, if any.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Outcome {
    pub flow: Flow,
    pub transition: Option<Transition>,
}

impl From<Flow> for Outcome {
    fn from(flow: Flow) -> Self {
        Self {
            flow,
            transition: None,
        }
    }
}

impl Outcome {
    fn finalizer(update: FinalizerUpdate, on_persist: Transition) -> Self {
        Self {
            flow: update.flow(),
            transition: (update == FinalizerUpdate::Persisted).then_some(on_persist),
        }
    }
}

/// Drives one RouteMonitor towards its desired state.
///
/// A pass runs its steps strictly in order and stops at the first step that
/// fails or asks to stop. Nothing is retried here; the caller requeues.
pub struct RouteMonitorReconciler {
    finalizer: Arc<dyn FinalizerGuard>,
    shared: Arc<dyn SharedDependency>,
    dependents: Vec<Arc<dyn Dependent>>,
    targets: Arc<dyn TargetResolver>,
}

impl RouteMonitorReconciler {
    pub fn new(
        finalizer: Arc<dyn FinalizerGuard>,
        shared: Arc<dyn SharedDependency>,
        targets: Arc<dyn TargetResolver>,
    ) -> Self {
        Self {
            finalizer,
            shared,
            dependents: Vec::new(),
            targets,
        }
    }

    /// Register a per-RouteMonitor dependent. Dependents are ensured and
    /// retracted in registration order.
    pub fn with_dependent(mut self, dependent: Arc<dyn Dependent>) -> Self {
        self.dependents.push(dependent);
        self
    }

    pub async fn reconcile(&self, rm: &RouteMonitor) -> Result<Outcome, ReconcileErr> {
        let phase = phase_of(rm);
        debug!(route_monitor = %ObjectKey::of(rm), ?phase, "reconciling");
        match phase {
            Phase::Retracting => self.ensure_dependencies_absent(rm).await,
            Phase::Provisioning => Ok(self.targets.ensure_target(rm).await?.into()),
            Phase::Ensuring | Phase::Active => {
                let update = self.finalizer.ensure_present(rm).await?;
                if update == FinalizerUpdate::Persisted {
                    return Ok(Outcome::finalizer(update, Transition::FinalizerAdded));
                }
                Ok(self.ensure_dependencies_present(rm).await?.into())
            }
        }
    }

    /// Shared exporter first, then every dependent.
    pub async fn ensure_dependencies_present(
        &self,
        rm: &RouteMonitor,
    ) -> Result<Flow, ReconcileErr> {
        let Some(target) = rm.target_url() else {
            return Err(ReconcileErr::Internal(format!(
                "{} has no probe target",
                ObjectKey::of(rm)
            )));
        };
        self.shared.ensure_resources().await?;
        for dep in &self.dependents {
            dep.ensure(rm, target).await?;
        }
        Ok(Flow::Stop)
    }

    /// Release the shared exporter if nothing else needs it, retract every
    /// dependent, and only then drop the finalizer.
    pub async fn ensure_dependencies_absent(
        &self,
        rm: &RouteMonitor,
    ) -> Result<Outcome, ReconcileErr> {
        let key = ObjectKey::of(rm);
        match self.shared.should_retain().await? {
            Retention::Remove => {
                info!(route_monitor = %key, "last live RouteMonitor; removing blackbox exporter");
                self.shared.retract_resources().await?;
            }
            Retention::Retain => {
                debug!(route_monitor = %key, "blackbox exporter still in use");
            }
        }
        for dep in &self.dependents {
            dep.retract(rm).await?;
            debug!(route_monitor = %key, kind = dep.kind(), "dependent retracted");
        }
        if !rm.has_finalizer() {
            return Ok(Flow::Stop.into());
        }
        // the pass ends here even if another writer already dropped the token
        let update = self.finalizer.ensure_absent(rm).await?;
        Ok(Outcome {
            flow: Flow::Stop,
            ..Outcome::finalizer(update, Transition::FinalizerRemoved)
        })
    }
}
