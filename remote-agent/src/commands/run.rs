use std::time::Duration;

use anyhow::{Context, Result};
#[cfg(target_os = "linux")]
use sd_notify::NotifyState;
use tokio::signal::unix::{signal, SignalKind};
use tracing::{error, info};

use remote_agent_core::Coordinator;
use remote_agent_discovery::DiscoveryAdvertiser;
use remote_agent_http::AgentHttpServer;

use crate::config::load_config;

pub(crate) async fn command(cli: &crate::Cli) -> Result<()> {
    let version = env!("CARGO_PKG_VERSION");
    info!(%version, "remote-agent starting");

    let config = load_config(&cli.config)?;
    let coordinator = Coordinator::new(config.clone()).await?;

    let instance_name = std::env::var("HOSTNAME").unwrap_or_else(|_| "remote-agent".to_string());
    let discovery = match DiscoveryAdvertiser::start(&config, &instance_name, config.listen_address.port()) {
        Ok(advertiser) => Some(advertiser),
        Err(error) => {
            error!(?error, "mDNS advertising unavailable, continuing without it");
            None
        }
    };

    #[cfg(target_os = "linux")]
    if let Ok(true) = sd_notify::booted() {
        tokio::spawn(async {
            if let Err(error) = async {
                sd_notify::notify(false, &[NotifyState::Ready])?;
                loop {
                    sd_notify::notify(false, &[NotifyState::Watchdog])?;
                    tokio::time::sleep(Duration::from_secs(15)).await;
                }
                #[allow(unreachable_code)]
                Ok::<(), anyhow::Error>(())
            }
            .await
            {
                error!(?error, "failed to communicate with systemd");
            }
        });
    }

    info!(address = %config.listen_address, "accepting connections");

    let address = config.listen_address;
    let server = tokio::spawn(AgentHttpServer::new(coordinator.clone()).run(address));

    let mut sigterm = signal(SignalKind::terminate()).context("installing SIGTERM handler")?;

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            info!("received ctrl-c, shutting down");
        }
        _ = sigterm.recv() => {
            info!("received SIGTERM, shutting down");
        }
        result = server => {
            match result {
                Ok(Ok(())) => info!("HTTP server exited"),
                Ok(Err(error)) => error!(?error, "HTTP server error"),
                Err(error) => error!(?error, "HTTP server task panicked"),
            }
        }
    }

    if let Some(discovery) = discovery {
        discovery.stop();
    }
    coordinator.shutdown().await;

    info!("exiting");
    Ok(())
}
