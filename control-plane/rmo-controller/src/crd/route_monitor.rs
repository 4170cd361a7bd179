use kube::{CustomResource, ResourceExt};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::store::ObjectKey;

/// Finalizer that blocks deletion until the ServiceMonitor (and, when this
/// is the last RouteMonitor, the blackbox exporter) has been removed.
pub const FINALIZER_KEY: &str =
    "routemonitor.routemonitoroperator.monitoring.openshift.io/finalizer";

#[derive(CustomResource, Deserialize, Serialize, Clone, Debug, JsonSchema, Default)]
#[kube(
    group = "monitoring.openshift.io",
    version = "v1alpha1",
    kind = "RouteMonitor",
    plural = "routemonitors",
    shortname = "rm",
    namespaced,
    status = "RouteMonitorStatus"
)]
pub struct RouteMonitorSpec {
    /// The OpenShift Route whose host is probed
    #[serde(default)]
    pub route: RouteMonitorRouteSpec,
}

#[derive(Deserialize, Serialize, Clone, Debug, JsonSchema, Default, PartialEq, Eq)]
pub struct RouteMonitorRouteSpec {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub namespace: String,
}

#[derive(Deserialize, Serialize, Clone, Debug, JsonSchema, Default, PartialEq, Eq)]
pub struct RouteMonitorStatus {
    /// Resolved probe target; written once the Route has a host
    #[serde(rename = "routeURL", default, skip_serializing_if = "Option::is_none")]
    pub route_url: Option<String>,
}

impl RouteMonitor {
    pub fn has_finalizer(&self) -> bool {
        self.finalizers().iter().any(|f| f == FINALIZER_KEY)
    }

    pub fn was_delete_requested(&self) -> bool {
        self.metadata.deletion_timestamp.is_some()
    }

    /// The probe target, if the route has been resolved. Empty strings count as unset.
    pub fn target_url(&self) -> Option<&str> {
        self.status
            .as_ref()
            .and_then(|s| s.route_url.as_deref())
            .filter(|u| !u.is_empty())
    }

    /// Where this RouteMonitor's ServiceMonitor lives.
    pub fn service_monitor_key(&self, monitoring_namespace: &str) -> ObjectKey {
        ObjectKey::new(
            monitoring_namespace,
            format!(
                "{}-{}",
                self.name_any(),
                self.namespace().unwrap_or_default()
            ),
        )
    }

    /// The Route named in `spec.route`; defaults to the RouteMonitor's own namespace.
    pub fn route_key(&self) -> ObjectKey {
        let ns = if self.spec.route.namespace.is_empty() {
            self.namespace().unwrap_or_else(|| "default".into())
        } else {
            self.spec.route.namespace.clone()
        };
        ObjectKey::new(ns, self.spec.route.name.clone())
    }
}
