//! Config loading. Grounded on `warpgate/src/config.rs`: a YAML file layered
//! with environment overrides via the `config` crate.

use std::path::Path;

use anyhow::{Context, Result};
use config::{Config, Environment, File, FileFormat};
use remote_agent_common::config::RemoteAgentConfig;
use tracing::info;

pub fn load_config(path: &Path) -> Result<RemoteAgentConfig> {
    let mut builder = Config::builder().add_source(Config::try_from(&RemoteAgentConfig::default())?);

    if path.exists() {
        builder = builder.add_source(File::new(
            path.to_str().context("config path is not valid UTF-8")?,
            FileFormat::Yaml,
        ));
    }

    let config: RemoteAgentConfig = builder
        .add_source(Environment::with_prefix("REMOTE_AGENT").separator("__"))
        .build()
        .context("building configuration")?
        .try_deserialize()
        .context("deserializing configuration")?;

    info!(path = %path.display(), "using configuration");
    Ok(config)
}
