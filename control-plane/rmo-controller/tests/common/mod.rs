#![allow(dead_code)]

use std::time::Duration;

use kube::{Client, api::Api};
use rmo_controller::config::RmoConfig;
use rmo_controller::crd::RouteMonitor;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

// DNS-1123 safe numeric suffix for unique names
pub const DIGITS: [char; 10] =
    ['0', '1', '2', '3', '4', '5', '6', '7', '8', '9'];
pub fn uniq(prefix: &str) -> String {
    format!("{prefix}-{}", nanoid::nanoid!(6, &DIGITS))
}

/// Keeps everything in one namespace so the tests run on a plain kind cluster.
pub fn test_config(ns: &str) -> RmoConfig {
    RmoConfig {
        monitoring_namespace: ns.to_string(),
        no_target_requeue_secs: 2,
        error_requeue_secs: 2,
        ..Default::default()
    }
}

/// Poll `check` once a second until it holds or `secs` elapse.
pub async fn eventually<F, Fut>(secs: u64, what: &str, mut check: F)
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = bool>,
{
    for _ in 0..secs {
        if check().await {
            return;
        }
        tokio::time::sleep(Duration::from_millis(1000)).await;
    }
    panic!("timed out waiting for {what}");
}

// RAII guard to ensure controller shutdown + cleanup
pub struct ControllerGuard {
    ns: String,
    name: String,
    client: Client,
    cancel: CancellationToken,
    ctrl: Option<JoinHandle<()>>,
}

impl ControllerGuard {
    pub fn start(ns: &str, name: &str, client: Client, cfg: RmoConfig) -> Self {
        let cancel = CancellationToken::new();
        let ctrl_client = client.clone();
        let ctrl_cancel = cancel.clone();
        let ctrl = tokio::spawn(async move {
            let _ = rmo_controller::controller::run_controller(
                ctrl_client,
                cfg,
                ctrl_cancel,
            )
            .await;
        });
        Self {
            ns: ns.to_string(),
            name: name.to_string(),
            client,
            cancel,
            ctrl: Some(ctrl),
        }
    }
}

impl Drop for ControllerGuard {
    fn drop(&mut self) {
        self.cancel.cancel();
        if let Some(h) = self.ctrl.take() {
            h.abort();
        }
        let api: Api<RouteMonitor> = Api::namespaced(self.client.clone(), &self.ns);
        let name = self.name.clone();
        // finalizer may still be set if the controller stopped mid-handshake
        tokio::spawn(async move {
            let patch = serde_json::json!({ "metadata": { "finalizers": null } });
            let _ = api
                .patch(
                    &name,
                    &kube::api::PatchParams::default(),
                    &kube::api::Patch::Merge(&patch),
                )
                .await;
            let _ = api.delete(&name, &Default::default()).await;
        });
    }
}
