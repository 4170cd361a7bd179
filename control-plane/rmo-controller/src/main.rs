use envconfig::Envconfig;
use kube::Client;
use rmo_controller::{config::RmoConfig, init_tracing, runtime};
use tracing::info;

#[tokio::main(flavor = "multi_thread")]
async fn main() -> anyhow::Result<()> {
    init_tracing("info");

    let cfg = RmoConfig::init_from_env()?;
    info!(?cfg, "Starting route monitor controller");

    let client = Client::try_default().await?;
    runtime::run_all(client, cfg).await
}
