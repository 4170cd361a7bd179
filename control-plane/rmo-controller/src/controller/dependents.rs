use std::sync::Arc;

use async_trait::async_trait;
use kube::ResourceExt;
use tracing::info;

use super::ReconcileErr;
use super::resources::{self, Ensured, Retracted};
use crate::config::RmoConfig;
use crate::crd::{RouteMonitor, ServiceMonitor};
use crate::store::{ObjectKey, ObjectStore};
use crate::templates::{ServiceMonitorParams, render_service_monitor};

/// A per-RouteMonitor resource whose lifetime is bound to its owner's
/// finalizer handshake.
#[async_trait]
pub trait Dependent: Send + Sync {
    fn kind(&self) -> &'static str;

    /// Create the resource for `rm` probing `target` if it does not exist.
    async fn ensure(
        &self,
        rm: &RouteMonitor,
        target: &str,
    ) -> Result<(), ReconcileErr>;

    /// Remove the resource for `rm` if it exists.
    async fn retract(&self, rm: &RouteMonitor) -> Result<(), ReconcileErr>;
}

pub struct ServiceMonitorDependent {
    store: Arc<dyn ObjectStore<ServiceMonitor>>,
    cfg: RmoConfig,
}

impl ServiceMonitorDependent {
    pub fn new(
        store: Arc<dyn ObjectStore<ServiceMonitor>>,
        cfg: RmoConfig,
    ) -> Self {
        Self { store, cfg }
    }

    fn key_for(&self, rm: &RouteMonitor) -> ObjectKey {
        rm.service_monitor_key(&self.cfg.monitoring_namespace)
    }
}

#[async_trait]
impl Dependent for ServiceMonitorDependent {
    fn kind(&self) -> &'static str {
        "ServiceMonitor"
    }

    async fn ensure(
        &self,
        rm: &RouteMonitor,
        target: &str,
    ) -> Result<(), ReconcileErr> {
        let key = self.key_for(rm);
        let owner = ObjectKey::of(rm);
        let outcome = resources::ensure(self.store.as_ref(), &key, || {
            render_service_monitor(ServiceMonitorParams {
                key: &key,
                owner: &owner,
                url: target,
                probe: &self.cfg.probe,
                blackbox: &self.cfg.blackbox,
            })
        })
        .await?;
        if outcome == Ensured::Created {
            info!(owner = %owner, service_monitor = %key, %target, "created ServiceMonitor");
        }
        Ok(())
    }

    async fn retract(&self, rm: &RouteMonitor) -> Result<(), ReconcileErr> {
        let key = self.key_for(rm);
        if resources::retract(self.store.as_ref(), &key).await?
            == Retracted::Deleted
        {
            info!(owner = %rm.name_any(), service_monitor = %key, "deleted ServiceMonitor");
        }
        Ok(())
    }
}
