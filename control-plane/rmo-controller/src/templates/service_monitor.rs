use std::collections::BTreeMap;

use kube::api::ObjectMeta;

use crate::config::{BlackboxConfig, ProbeConfig};
use crate::crd::service_monitor::{
    Endpoint, LabelSelector, NamespaceSelector, RelabelConfig, ServiceMonitor,
    ServiceMonitorSpec,
};
use crate::store::ObjectKey;

pub const OWNER_NAME_LABEL: &str = "routemonitor.openshift.io/name";
pub const OWNER_NAMESPACE_LABEL: &str = "routemonitor.openshift.io/namespace";
/// Metric label carrying the probed URL on every scraped series.
pub const URL_METRIC_LABEL: &str = "RouteMonitorUrl";

pub struct ServiceMonitorParams<'a> {
    pub key: &'a ObjectKey,
    pub owner: &'a ObjectKey,
    pub url: &'a str,
    pub probe: &'a ProbeConfig,
    pub blackbox: &'a BlackboxConfig,
}

/// Scrape the shared blackbox exporter's `/probe` endpoint with `target=<url>`.
pub fn render_service_monitor(p: ServiceMonitorParams<'_>) -> ServiceMonitor {
    let params = BTreeMap::from([
        ("module".to_string(), vec![p.probe.module.clone()]),
        ("target".to_string(), vec![p.url.to_string()]),
    ]);
    let labels = BTreeMap::from([
        (OWNER_NAME_LABEL.to_string(), p.owner.name.clone()),
        (OWNER_NAMESPACE_LABEL.to_string(), p.owner.namespace.clone()),
    ]);
    let mut sm = ServiceMonitor::new(
        &p.key.name,
        ServiceMonitorSpec {
            endpoints: vec![Endpoint {
                port: Some(super::BLACKBOX_PORT_NAME.to_string()),
                path: Some("/probe".into()),
                scheme: Some("http".into()),
                interval: Some(p.probe.interval.clone()),
                params,
                metric_relabelings: vec![RelabelConfig {
                    replacement: Some(p.url.to_string()),
                    target_label: Some(URL_METRIC_LABEL.to_string()),
                }],
            }],
            selector: LabelSelector {
                match_labels: BTreeMap::from([(
                    "app".to_string(),
                    p.blackbox.name.clone(),
                )]),
            },
            namespace_selector: Some(NamespaceSelector {
                match_names: vec![p.key.namespace.clone()],
            }),
        },
    );
    sm.metadata = ObjectMeta {
        name: Some(p.key.name.clone()),
        namespace: Some(p.key.namespace.clone()),
        labels: Some(labels),
        ..Default::default()
    };
    sm
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn probes_the_target_through_the_blackbox_service() {
        let key = ObjectKey::new("openshift-monitoring", "web-team");
        let owner = ObjectKey::new("team", "web");
        let probe = ProbeConfig::default();
        let blackbox = BlackboxConfig::default();
        let sm = render_service_monitor(ServiceMonitorParams {
            key: &key,
            owner: &owner,
            url: "http://web.apps.example.com",
            probe: &probe,
            blackbox: &blackbox,
        });

        assert_eq!(ObjectKey::of(&sm), key);
        let ep = &sm.spec.endpoints[0];
        assert_eq!(ep.port.as_deref(), Some("blackbox"));
        assert_eq!(ep.path.as_deref(), Some("/probe"));
        assert_eq!(ep.params["module"], vec!["http_2xx".to_string()]);
        assert_eq!(
            ep.params["target"],
            vec!["http://web.apps.example.com".to_string()]
        );
        assert_eq!(
            ep.metric_relabelings[0].target_label.as_deref(),
            Some(URL_METRIC_LABEL)
        );
        assert_eq!(sm.spec.selector.match_labels["app"], "blackbox-exporter");
        assert_eq!(
            sm.spec.namespace_selector.as_ref().unwrap().match_names,
            vec!["openshift-monitoring".to_string()]
        );
        let labels = sm.metadata.labels.unwrap();
        assert_eq!(labels[OWNER_NAME_LABEL], "web");
        assert_eq!(labels[OWNER_NAMESPACE_LABEL], "team");
    }

    #[test]
    fn wire_format_uses_prometheus_operator_field_names() {
        let key = ObjectKey::new("mon", "a-b");
        let owner = ObjectKey::new("b", "a");
        let probe = ProbeConfig::default();
        let blackbox = BlackboxConfig::default();
        let sm = render_service_monitor(ServiceMonitorParams {
            key: &key,
            owner: &owner,
            url: "http://x",
            probe: &probe,
            blackbox: &blackbox,
        });
        let v = serde_json::to_value(&sm).unwrap();
        assert_eq!(v["apiVersion"], "monitoring.coreos.com/v1");
        assert_eq!(v["kind"], "ServiceMonitor");
        assert!(v["spec"]["namespaceSelector"]["matchNames"].is_array());
        assert!(v["spec"]["selector"]["matchLabels"].is_object());
        assert_eq!(
            v["spec"]["endpoints"][0]["metricRelabelings"][0]["targetLabel"],
            URL_METRIC_LABEL
        );
    }
}
