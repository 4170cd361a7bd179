// Integration tests require a running Kubernetes cluster with the RouteMonitor
// and ServiceMonitor CRDs installed. These tests are ignored by default.

use k8s_openapi::api::{apps::v1::Deployment, core::v1::Service};
use kube::{
    Client, ResourceExt,
    api::{Api, Patch, PatchParams, PostParams},
};
use rmo_controller::crd::{
    FINALIZER_KEY, RouteMonitor, RouteMonitorRouteSpec, RouteMonitorSpec,
    ServiceMonitor,
};
use serde_json::json;
mod common;
use common::{ControllerGuard, eventually, test_config, uniq};

fn new_route_monitor(name: &str) -> RouteMonitor {
    RouteMonitor::new(
        name,
        RouteMonitorSpec {
            route: RouteMonitorRouteSpec {
                name: name.to_string(),
                namespace: String::new(),
            },
        },
    )
}

#[test_log::test(tokio::test)]
#[ignore]
async fn unresolved_route_creates_nothing() {
    let client = Client::try_default().await.expect("kube client");
    let ns = "default";
    let name = uniq("rmo-it-pending");
    let _guard =
        ControllerGuard::start(ns, &name, client.clone(), test_config(ns));

    let api: Api<RouteMonitor> = Api::namespaced(client.clone(), ns);
    api.create(&PostParams::default(), &new_route_monitor(&name))
        .await
        .expect("create RouteMonitor");

    tokio::time::sleep(std::time::Duration::from_secs(5)).await;

    let rm = api.get(&name).await.expect("RouteMonitor still present");
    assert!(!rm.finalizers().iter().any(|f| f == FINALIZER_KEY));
    let sms: Api<ServiceMonitor> = Api::namespaced(client.clone(), ns);
    assert!(
        sms.get_opt(&format!("{name}-{ns}"))
            .await
            .expect("get ServiceMonitor")
            .is_none()
    );
}

#[test_log::test(tokio::test)]
#[ignore]
async fn resolved_route_monitor_is_provisioned_and_retracted() {
    let client = Client::try_default().await.expect("kube client");
    let ns = "default";
    let name = uniq("rmo-it-active");
    let cfg = test_config(ns);
    let exporter = cfg.blackbox.name.clone();
    let _guard = ControllerGuard::start(ns, &name, client.clone(), cfg);

    let api: Api<RouteMonitor> = Api::namespaced(client.clone(), ns);
    api.create(&PostParams::default(), &new_route_monitor(&name))
        .await
        .expect("create RouteMonitor");
    // stand in for the Route lookup, which needs an OpenShift cluster
    api.patch_status(
        &name,
        &PatchParams::default(),
        &Patch::Merge(json!({ "status": { "routeURL": "http://example.com" } })),
    )
    .await
    .expect("patch status");

    let sms: Api<ServiceMonitor> = Api::namespaced(client.clone(), ns);
    let deps: Api<Deployment> = Api::namespaced(client.clone(), ns);
    let svcs: Api<Service> = Api::namespaced(client.clone(), ns);
    let sm_name = format!("{name}-{ns}");
    let (api, sms, name, sm_name) = (&api, &sms, name.as_str(), sm_name.as_str());

    eventually(30, "finalizer", || async move {
        api.get(name)
            .await
            .map(|rm| rm.finalizers().iter().any(|f| f == FINALIZER_KEY))
            .unwrap_or(false)
    })
    .await;
    eventually(30, "ServiceMonitor", || async move {
        sms.get_opt(sm_name).await.ok().flatten().is_some()
    })
    .await;
    assert!(deps.get_opt(&exporter).await.expect("get").is_some());
    assert!(svcs.get_opt(&exporter).await.expect("get").is_some());

    api.delete(name, &Default::default())
        .await
        .expect("delete RouteMonitor");

    eventually(30, "RouteMonitor removal", || async move {
        api.get_opt(name).await.ok().flatten().is_none()
    })
    .await;
    assert!(sms.get_opt(sm_name).await.expect("get").is_none());
}
