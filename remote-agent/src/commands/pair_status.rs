use anyhow::Result;
use remote_agent_core::pairing::PairingManager;

use crate::config::load_config;

pub(crate) async fn command(cli: &crate::Cli) -> Result<()> {
    let config = load_config(&cli.config)?;
    let pairing = PairingManager::load(
        &config.credential_store_dir,
        config.pairing_challenge_ttl_secs,
        config.lan_mode,
        config.lan_mode_allow_signature_bypass,
    )
    .await?;

    let clients = pairing.list_paired().await;
    if clients.is_empty() {
        println!("No paired clients.");
        return Ok(());
    }

    for client in clients {
        println!(
            "{}\t{}\tpaired at {}",
            client.client_id, client.client_name, client.paired_at
        );
    }
    Ok(())
}
