pub mod route_monitor;
pub mod service_monitor;

pub use route_monitor::{
    FINALIZER_KEY, RouteMonitor, RouteMonitorRouteSpec, RouteMonitorSpec,
    RouteMonitorStatus,
};
pub use service_monitor::ServiceMonitor;
