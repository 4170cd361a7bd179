use std::net::SocketAddr;

use kube::Client;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::{config::RmoConfig, controller::run_controller, web::run_http_server};

/// Compute the HTTP bind address based on config.
pub fn compute_http_addr(cfg: &RmoConfig) -> SocketAddr {
    ([0, 0, 0, 0], cfg.http_port).into()
}

/// Spawn the Kubernetes controller loop.
pub fn spawn_controller(
    client: Client,
    cfg: RmoConfig,
    cancel: CancellationToken,
) -> JoinHandle<anyhow::Result<()>> {
    tokio::spawn(async move { run_controller(client, cfg, cancel).await })
}

/// Spawn the health endpoint on the provided address.
pub fn spawn_http(
    addr: SocketAddr,
    cancel: CancellationToken,
) -> JoinHandle<anyhow::Result<()>> {
    tokio::spawn(async move { run_http_server(addr, cancel).await })
}

/// Run the controller and the health endpoint until ctrl-c, or until either
/// of them returns. The first to return cancels the other; its error wins.
pub async fn run_all(client: Client, cfg: RmoConfig) -> anyhow::Result<()> {
    let cancel = CancellationToken::new();
    let http_addr = compute_http_addr(&cfg);

    let shutdown = cancel.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("shutdown signal received");
                shutdown.cancel();
            }
            Err(e) => warn!(error = %e, "cannot listen for ctrl-c; running until a task exits"),
        }
    });

    let controller = spawn_controller(client, cfg, cancel.clone());
    let http = spawn_http(http_addr, cancel.clone());
    supervise(controller, http, cancel).await
}

/// Wait for the first task to return, cancel `cancel`, then drain the other.
pub async fn supervise(
    mut first: JoinHandle<anyhow::Result<()>>,
    mut second: JoinHandle<anyhow::Result<()>>,
    cancel: CancellationToken,
) -> anyhow::Result<()> {
    let (done, rest) = tokio::select! {
        res = &mut first => (res, second),
        res = &mut second => (res, first),
    };
    cancel.cancel();
    let rest = rest.await;
    done??;
    rest??;
    Ok(())
}
