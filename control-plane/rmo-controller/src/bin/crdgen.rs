use kube::core::CustomResourceExt;
use rmo_controller::crd::RouteMonitor;

fn main() -> anyhow::Result<()> {
    let yaml = serde_yaml::to_string(&RouteMonitor::crd())?;
    println!("{}", yaml);
    Ok(())
}
