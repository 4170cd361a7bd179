use std::collections::BTreeMap;

use k8s_openapi::api::apps::v1::{Deployment, DeploymentSpec};
use k8s_openapi::api::core::v1::{
    Container, ContainerPort, PodSpec, PodTemplateSpec, Service, ServicePort,
    ServiceSpec,
};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::LabelSelector;
use k8s_openapi::apimachinery::pkg::util::intstr::IntOrString;
use kube::api::ObjectMeta;

use crate::config::BlackboxConfig;
use crate::store::ObjectKey;

/// Port name shared by the container, the Service and every ServiceMonitor endpoint.
pub const BLACKBOX_PORT_NAME: &str = "blackbox";

pub fn blackbox_labels(cfg: &BlackboxConfig) -> BTreeMap<String, String> {
    BTreeMap::from([
        ("app".to_string(), cfg.name.clone()),
        (
            "app.kubernetes.io/managed-by".to_string(),
            "route-monitor-operator".to_string(),
        ),
    ])
}

fn selector_labels(cfg: &BlackboxConfig) -> BTreeMap<String, String> {
    BTreeMap::from([("app".to_string(), cfg.name.clone())])
}

pub fn blackbox_key(namespace: &str, cfg: &BlackboxConfig) -> ObjectKey {
    ObjectKey::new(namespace, cfg.name.clone())
}

pub fn render_deployment(namespace: &str, cfg: &BlackboxConfig) -> Deployment {
    let labels = blackbox_labels(cfg);
    Deployment {
        metadata: ObjectMeta {
            name: Some(cfg.name.clone()),
            namespace: Some(namespace.to_string()),
            labels: Some(labels.clone()),
            ..Default::default()
        },
        spec: Some(DeploymentSpec {
            replicas: Some(1),
            selector: LabelSelector {
                match_labels: Some(selector_labels(cfg)),
                ..Default::default()
            },
            template: PodTemplateSpec {
                metadata: Some(ObjectMeta {
                    labels: Some(labels),
                    ..Default::default()
                }),
                spec: Some(PodSpec {
                    containers: vec![Container {
                        name: cfg.name.clone(),
                        image: Some(cfg.image.clone()),
                        ports: Some(vec![ContainerPort {
                            name: Some(BLACKBOX_PORT_NAME.to_string()),
                            container_port: cfg.port,
                            ..Default::default()
                        }]),
                        ..Default::default()
                    }],
                    ..Default::default()
                }),
            },
            ..Default::default()
        }),
        ..Default::default()
    }
}

pub fn render_service(namespace: &str, cfg: &BlackboxConfig) -> Service {
    Service {
        metadata: ObjectMeta {
            name: Some(cfg.name.clone()),
            namespace: Some(namespace.to_string()),
            labels: Some(blackbox_labels(cfg)),
            ..Default::default()
        },
        spec: Some(ServiceSpec {
            selector: Some(selector_labels(cfg)),
            ports: Some(vec![ServicePort {
                name: Some(BLACKBOX_PORT_NAME.to_string()),
                port: cfg.port,
                target_port: Some(IntOrString::Int(cfg.port)),
                ..Default::default()
            }]),
            ..Default::default()
        }),
        ..Default::default()
    }
}
