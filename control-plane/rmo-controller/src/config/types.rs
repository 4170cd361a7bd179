use std::time::Duration;

use envconfig::Envconfig;

#[derive(Envconfig, Clone, Debug)]
pub struct RmoConfig {
    #[envconfig(from = "HTTP_PORT", default = "8080")]
    pub http_port: u16,

    /// Namespace holding every ServiceMonitor and the shared blackbox exporter.
    /// Env: RMO_MONITORING_NAMESPACE
    #[envconfig(
        from = "RMO_MONITORING_NAMESPACE",
        default = "openshift-monitoring"
    )]
    pub monitoring_namespace: String,

    /// Delay before re-checking a RouteMonitor whose target is not resolvable yet.
    #[envconfig(from = "RMO_NO_TARGET_REQUEUE_SECS", default = "30")]
    pub no_target_requeue_secs: u64,

    /// Backoff applied by the error policy after a failed pass.
    #[envconfig(from = "RMO_ERROR_REQUEUE_SECS", default = "60")]
    pub error_requeue_secs: u64,

    #[envconfig(nested)]
    pub probe: ProbeConfig,

    #[envconfig(nested)]
    pub blackbox: BlackboxConfig,
}

/// Scrape settings written into every ServiceMonitor endpoint.
#[derive(Envconfig, Clone, Debug)]
pub struct ProbeConfig {
    /// blackbox-exporter module name (e.g. http_2xx)
    #[envconfig(from = "RMO_PROBE_MODULE", default = "http_2xx")]
    pub module: String,
    /// Prometheus duration string, passed through verbatim
    #[envconfig(from = "RMO_PROBE_INTERVAL", default = "30s")]
    pub interval: String,
}

#[derive(Envconfig, Clone, Debug)]
pub struct BlackboxConfig {
    /// Name shared by the exporter Deployment and its Service
    #[envconfig(from = "RMO_BLACKBOX_NAME", default = "blackbox-exporter")]
    pub name: String,
    #[envconfig(
        from = "RMO_BLACKBOX_IMAGE",
        default = "prom/blackbox-exporter:master"
    )]
    pub image: String,
    #[envconfig(from = "RMO_BLACKBOX_PORT", default = "9115")]
    pub port: i32,
}

impl RmoConfig {
    pub fn no_target_requeue(&self) -> Duration {
        Duration::from_secs(self.no_target_requeue_secs)
    }

    pub fn error_requeue(&self) -> Duration {
        Duration::from_secs(self.error_requeue_secs)
    }
}

impl Default for RmoConfig {
    fn default() -> Self {
        Self {
            http_port: 8080,
            monitoring_namespace: "openshift-monitoring".into(),
            no_target_requeue_secs: 30,
            error_requeue_secs: 60,
            probe: ProbeConfig::default(),
            blackbox: BlackboxConfig::default(),
        }
    }
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            module: "http_2xx".into(),
            interval: "30s".into(),
        }
    }
}

impl Default for BlackboxConfig {
    fn default() -> Self {
        Self {
            name: "blackbox-exporter".into(),
            image: "prom/blackbox-exporter:master".into(),
            port: 9115,
        }
    }
}
