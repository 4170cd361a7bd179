//! Lifecycle of the cluster-wide blackbox exporter.
//!
//! The exporter has no owner. Whether it is still needed is re-derived on
//! every call by listing RouteMonitors; no reference count is stored.

use std::sync::Arc;

use async_trait::async_trait;
use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::core::v1::Service;
use tracing::{debug, info};

use super::ReconcileErr;
use super::resources::{self, Ensured, Retracted};
use crate::config::RmoConfig;
use crate::crd::RouteMonitor;
use crate::store::{ObjectKey, ObjectStore};
use crate::templates::{blackbox_key, render_deployment, render_service};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Retention {
    Retain,
    Remove,
}

/// RouteMonitors that still need probing: everything not being deleted.
pub fn live_count(monitors: &[RouteMonitor]) -> usize {
    monitors.iter().filter(|m| !m.was_delete_requested()).count()
}

pub fn retention(monitors: &[RouteMonitor]) -> Retention {
    if live_count(monitors) == 0 {
        Retention::Remove
    } else {
        Retention::Retain
    }
}

#[async_trait]
pub trait SharedDependency: Send + Sync {
    async fn should_retain(&self) -> Result<Retention, ReconcileErr>;

    /// Deployment first, then the Service in front of it.
    async fn ensure_resources(&self) -> Result<(), ReconcileErr>;

    /// Service first, so it never outlives the Deployment it targets.
    async fn retract_resources(&self) -> Result<(), ReconcileErr>;
}

pub struct BlackboxExporter {
    monitors: Arc<dyn ObjectStore<RouteMonitor>>,
    deployments: Arc<dyn ObjectStore<Deployment>>,
    services: Arc<dyn ObjectStore<Service>>,
    cfg: RmoConfig,
}

impl BlackboxExporter {
    pub fn new(
        monitors: Arc<dyn ObjectStore<RouteMonitor>>,
        deployments: Arc<dyn ObjectStore<Deployment>>,
        services: Arc<dyn ObjectStore<Service>>,
        cfg: RmoConfig,
    ) -> Self {
        Self {
            monitors,
            deployments,
            services,
            cfg,
        }
    }

    fn key(&self) -> ObjectKey {
        blackbox_key(&self.cfg.monitoring_namespace, &self.cfg.blackbox)
    }
}

#[async_trait]
impl SharedDependency for BlackboxExporter {
    async fn should_retain(&self) -> Result<Retention, ReconcileErr> {
        let monitors = self.monitors.list().await?;
        let decision = retention(&monitors);
        debug!(
            total = monitors.len(),
            live = live_count(&monitors),
            ?decision,
            "blackbox exporter retention"
        );
        Ok(decision)
    }

    async fn ensure_resources(&self) -> Result<(), ReconcileErr> {
        let key = self.key();
        let ns = &self.cfg.monitoring_namespace;
        let dep = resources::ensure(self.deployments.as_ref(), &key, || {
            render_deployment(ns, &self.cfg.blackbox)
        })
        .await?;
        let svc = resources::ensure(self.services.as_ref(), &key, || {
            render_service(ns, &self.cfg.blackbox)
        })
        .await?;
        if dep == Ensured::Created || svc == Ensured::Created {
            info!(exporter = %key, ?dep, ?svc, "blackbox exporter ensured");
        }
        Ok(())
    }

    async fn retract_resources(&self) -> Result<(), ReconcileErr> {
        let key = self.key();
        let svc = resources::retract(self.services.as_ref(), &key).await?;
        let dep = resources::retract(self.deployments.as_ref(), &key).await?;
        if svc == Retracted::Deleted || dep == Retracted::Deleted {
            info!(exporter = %key, ?svc, ?dep, "blackbox exporter retracted");
        }
        Ok(())
    }
}
