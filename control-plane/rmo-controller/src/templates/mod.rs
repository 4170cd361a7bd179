pub mod blackbox;
pub mod service_monitor;

pub use blackbox::*;
pub use service_monitor::*;
