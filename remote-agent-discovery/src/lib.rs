//! mDNS advertiser. Discovery internals are out of scope in detail, so
//! this stays a thin collaborator: register one service on start, unregister
//! it on stop, with failures logged and swallowed rather than bubbled up
//! (the agent is fully usable over a pinned address even if mDNS is
//! unavailable on the host network). Grounded on `mdns-sd`'s own
//! `ServiceDaemon`/`ServiceInfo` registration example and on
//! `original_source/agent/discovery/mdns.py`'s service name and TXT record
//! shape (`version`, `auto_approve`).

use std::collections::HashMap;

use anyhow::{Context, Result};
use mdns_sd::{ServiceDaemon, ServiceInfo};
use remote_agent_common::config::RemoteAgentConfig;
use tracing::{info, warn};

pub struct DiscoveryAdvertiser {
    daemon: ServiceDaemon,
    fullname: String,
}

impl DiscoveryAdvertiser {
    /// Registers the agent's mDNS service and returns the handle used to
    /// unregister it again. `instance_name` is typically the hostname.
    pub fn start(config: &RemoteAgentConfig, instance_name: &str, port: u16) -> Result<Self> {
        let daemon = ServiceDaemon::new().context("starting mDNS daemon")?;

        let properties = build_properties(env!("CARGO_PKG_VERSION"), config.lan_mode);
        let host_name = format!("{instance_name}.local.");

        let service_info = ServiceInfo::new(
            &config.mdns_service_name,
            instance_name,
            &host_name,
            "",
            port,
            Some(properties),
        )
        .context("building mDNS service info")?
        .enable_addr_auto();

        let fullname = service_info.get_fullname().to_string();
        daemon
            .register(service_info)
            .context("registering mDNS service")?;

        info!(service = %config.mdns_service_name, %instance_name, port, "mDNS advertising started");
        Ok(Self { daemon, fullname })
    }

    /// Unregisters the service and shuts the daemon down. Best-effort: a
    /// failure here never blocks process shutdown.
    pub fn stop(self) {
        if let Err(error) = self.daemon.unregister(&self.fullname) {
            warn!(?error, "failed to unregister mDNS service");
        }
        if let Err(error) = self.daemon.shutdown() {
            warn!(?error, "failed to shut down mDNS daemon");
        }
    }
}

fn build_properties(version: &str, auto_approve: bool) -> HashMap<String, String> {
    let mut properties = HashMap::new();
    properties.insert("version".to_string(), version.to_string());
    properties.insert("auto_approve".to_string(), auto_approve.to_string());
    properties
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn properties_carry_version_and_auto_approve() {
        let properties = build_properties("1.2.3", true);
        assert_eq!(properties.get("version").map(String::as_str), Some("1.2.3"));
        assert_eq!(properties.get("auto_approve").map(String::as_str), Some("true"));
    }
}
