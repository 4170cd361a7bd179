//! Populates `status.routeURL` from the referenced OpenShift Route.

use std::time::Duration;

use async_trait::async_trait;
use kube::{
    Client, ResourceExt,
    api::{Api, ApiResource, Patch, PatchParams},
    core::{DynamicObject, GroupVersionKind},
};
use serde_json::json;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use super::ReconcileErr;
use super::flow::Flow;
use crate::crd::RouteMonitor;
use crate::store::cluster::{cancellable, classify};
use crate::store::{ObjectKey, Op};

#[async_trait]
pub trait TargetResolver: Send + Sync {
    /// Try to fill in the probe target of a RouteMonitor that has none.
    ///
    /// Never fails just because the Route is missing or has no host yet;
    /// that is a soft [`Flow::Requeue`].
    async fn ensure_target(&self, rm: &RouteMonitor) -> Result<Flow, ReconcileErr>;
}

fn route_resource() -> ApiResource {
    ApiResource::from_gvk(&GroupVersionKind::gvk("route.openshift.io", "v1", "Route"))
}

/// The URL a Route is reachable at, if it has been admitted with a host.
pub fn route_url(route: &DynamicObject) -> Option<String> {
    let spec = route.data.get("spec");
    let host = spec
        .and_then(|s| s.get("host"))
        .and_then(|h| h.as_str())
        .filter(|h| !h.is_empty())
        .or_else(|| {
            route
                .data
                .pointer("/status/ingress/0/host")
                .and_then(|h| h.as_str())
                .filter(|h| !h.is_empty())
        })?;
    let tls = spec
        .and_then(|s| s.get("tls"))
        .is_some_and(|t| !t.is_null());
    let scheme = if tls { "https" } else { "http" };
    Some(format!("{scheme}://{host}"))
}

pub struct RouteTargetResolver {
    client: Client,
    cancel: CancellationToken,
    retry_after: Duration,
}

impl RouteTargetResolver {
    pub fn new(client: Client, cancel: CancellationToken, retry_after: Duration) -> Self {
        Self {
            client,
            cancel,
            retry_after,
        }
    }
}

#[async_trait]
impl TargetResolver for RouteTargetResolver {
    async fn ensure_target(&self, rm: &RouteMonitor) -> Result<Flow, ReconcileErr> {
        let route_key = rm.route_key();
        if route_key.name.is_empty() {
            debug!(route_monitor = %ObjectKey::of(rm), "no route referenced");
            return Ok(Flow::Requeue(self.retry_after));
        }

        let ar = route_resource();
        let routes: Api<DynamicObject> =
            Api::namespaced_with(self.client.clone(), &route_key.namespace, &ar);
        let route = cancellable(&self.cancel, async {
            routes
                .get_opt(&route_key.name)
                .await
                .map_err(|e| classify(e, Op::Get, format!("Route {route_key}")))
        })
        .await?;

        let Some(url) = route.as_ref().and_then(route_url) else {
            debug!(route = %route_key, "route missing or not admitted yet");
            return Ok(Flow::Requeue(self.retry_after));
        };

        let key = ObjectKey::of(rm);
        let monitors: Api<RouteMonitor> =
            Api::namespaced(self.client.clone(), &key.namespace);
        let patch = json!({ "status": { "routeURL": url } });
        cancellable(&self.cancel, async {
            monitors
                .patch_status(&rm.name_any(), &PatchParams::default(), &Patch::Merge(&patch))
                .await
                .map_err(|e| classify(e, Op::Replace, format!("RouteMonitor {key}")))
        })
        .await?;
        info!(route_monitor = %key, %url, "probe target resolved");
        Ok(Flow::requeue_now())
    }
}
