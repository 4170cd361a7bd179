use std::sync::Arc;

use futures_util::StreamExt;
use k8s_openapi::api::{apps::v1::Deployment, core::v1::Service};
use kube::{
    Client, ResourceExt,
    api::Api,
    runtime::{Controller, controller::Action, events::EventType, events::Recorder, watcher},
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use crate::config::RmoConfig;
use crate::crd::{RouteMonitor, ServiceMonitor};
use crate::store::{KubeObjectStore, ObjectStore, StoreError};

pub mod dependents;
pub mod events;
pub mod finalizer;
pub mod flow;
pub mod phase;
pub mod reconciler;
pub mod resources;
pub mod shared;
pub mod target;

pub use dependents::{Dependent, ServiceMonitorDependent};
pub use finalizer::{FinalizerGuard, FinalizerUpdate, StoreFinalizerGuard};
pub use flow::Flow;
pub use phase::{Phase, phase_of};
pub use reconciler::{Outcome, RouteMonitorReconciler, Transition};
pub use shared::{BlackboxExporter, Retention, SharedDependency};
pub use target::{RouteTargetResolver, TargetResolver};

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ReconcileErr {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("internal error: {0}")]
    Internal(String),
}

pub struct ControllerContext {
    pub cfg: RmoConfig,
    pub reconciler: RouteMonitorReconciler,
    pub recorder: Recorder,
}

impl ControllerContext {
    /// Wire every collaborator against the API server.
    pub fn new(client: Client, cfg: RmoConfig, cancel: CancellationToken) -> Self {
        let monitors: Arc<dyn ObjectStore<RouteMonitor>> =
            Arc::new(KubeObjectStore::new(client.clone(), cancel.clone()));
        let deployments: Arc<dyn ObjectStore<Deployment>> =
            Arc::new(KubeObjectStore::new(client.clone(), cancel.clone()));
        let services: Arc<dyn ObjectStore<Service>> =
            Arc::new(KubeObjectStore::new(client.clone(), cancel.clone()));
        let service_monitors: Arc<dyn ObjectStore<ServiceMonitor>> =
            Arc::new(KubeObjectStore::new(client.clone(), cancel.clone()));

        let reconciler = RouteMonitorReconciler::new(
            Arc::new(StoreFinalizerGuard::new(monitors.clone())),
            Arc::new(BlackboxExporter::new(monitors, deployments, services, cfg.clone())),
            Arc::new(RouteTargetResolver::new(
                client.clone(),
                cancel,
                cfg.no_target_requeue(),
            )),
        )
        .with_dependent(Arc::new(ServiceMonitorDependent::new(
            service_monitors,
            cfg.clone(),
        )));

        Self {
            recorder: Recorder::new(client, events::reporter()),
            cfg,
            reconciler,
        }
    }
}

pub async fn run_controller(
    client: Client,
    cfg: RmoConfig,
    cancel: CancellationToken,
) -> anyhow::Result<()> {
    let api: Api<RouteMonitor> = Api::all(client.clone());
    let ctx = Arc::new(ControllerContext::new(client, cfg, cancel.clone()));

    info!("starting RouteMonitor controller");
    Controller::new(api, watcher::Config::default())
        .graceful_shutdown_on(cancel.cancelled_owned())
        .run(reconcile, error_policy, ctx)
        .for_each(|res| async move {
            match res {
                Ok((obj_ref, action)) => {
                    debug!(object = %obj_ref, ?action, "reconciled")
                }
                Err(e) => warn!(error = %e, "reconcile error"),
            }
        })
        .await;
    info!("RouteMonitor controller stopped");
    Ok(())
}

#[instrument(skip_all, fields(ns = %obj.namespace().unwrap_or_default(), name = %obj.name_any()))]
async fn reconcile(
    obj: Arc<RouteMonitor>,
    ctx: Arc<ControllerContext>,
) -> Result<Action, ReconcileErr> {
    let phase = phase_of(&obj);
    let outcome = match ctx.reconciler.reconcile(&obj).await {
        Ok(outcome) => outcome,
        Err(e) => {
            events::emit_event(
                &ctx.recorder,
                &obj,
                EventType::Warning,
                events::REASON_RECONCILE_FAILED,
                "Reconcile",
                Some(e.to_string()),
            )
            .await;
            return Err(e);
        }
    };

    match outcome.transition {
        Some(Transition::FinalizerAdded) => {
            events::emit_event(
                &ctx.recorder,
                &obj,
                EventType::Normal,
                events::REASON_FINALIZER_ADDED,
                "AddFinalizer",
                None,
            )
            .await
        }
        Some(Transition::FinalizerRemoved) => {
            events::emit_event(
                &ctx.recorder,
                &obj,
                EventType::Normal,
                events::REASON_RETRACTED,
                "RemoveFinalizer",
                Some("ServiceMonitor removed".into()),
            )
            .await
        }
        None => {}
    }

    debug!(?phase, flow = ?outcome.flow, transition = ?outcome.transition, "pass finished");
    Ok(outcome.flow.into_action())
}

fn error_policy(
    obj: Arc<RouteMonitor>,
    err: &ReconcileErr,
    ctx: Arc<ControllerContext>,
) -> Action {
    warn!(
        ns = %obj.namespace().unwrap_or_default(),
        name = %obj.name_any(),
        error = %err,
        "reconcile failed; requeueing"
    );
    Action::requeue(ctx.cfg.error_requeue())
}
