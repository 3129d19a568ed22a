use anyhow::Result;
use remote_agent_common::model::AuditEvent;
use remote_agent_core::audit::AuditSink;
use remote_agent_core::pairing::PairingManager;
use tracing::info;

use crate::config::load_config;

pub(crate) async fn command(cli: &crate::Cli, client_id: &str) -> Result<()> {
    let config = load_config(&cli.config)?;
    let pairing = PairingManager::load(
        &config.credential_store_dir,
        config.pairing_challenge_ttl_secs,
        config.lan_mode,
        config.lan_mode_allow_signature_bypass,
    )
    .await?;

    if pairing.unpair(client_id).await? {
        let audit = AuditSink::new(&config.audit_log.directory, "audit", config.audit_log.max_backups)?;
        audit
            .emit(&AuditEvent::Unpaired {
                client_id: client_id.to_string(),
                timestamp: chrono::Utc::now(),
            })
            .await;
        info!(%client_id, "client unpaired");
    } else {
        println!("No such paired client: {client_id}");
    }
    Ok(())
}
