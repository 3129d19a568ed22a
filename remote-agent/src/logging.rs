//! Tracing setup. Grounded on `warpgate/src/logging.rs`: local-time
//! `OffsetTime` formatting layer plus `EnvFilter`, with `cli.debug` escalating
//! the default filter the same way. The JSON/text format toggle and the
//! database/socket logger layers are warpgate's reverse-proxy admin-log
//! machinery and have no counterpart here.

use anyhow::{Context, Result};
use time::{format_description, UtcOffset};
use tracing_subscriber::fmt::time::OffsetTime;
use tracing_subscriber::EnvFilter;

use crate::Cli;

pub fn init_logging(cli: &Cli) -> Result<()> {
    if std::env::var("RUST_LOG").is_err() {
        match cli.debug {
            0 => std::env::set_var("RUST_LOG", "remote_agent=info"),
            1 => std::env::set_var("RUST_LOG", "remote_agent=debug"),
            _ => std::env::set_var("RUST_LOG", "debug"),
        }
    }

    let offset = UtcOffset::current_local_offset().unwrap_or(UtcOffset::UTC);
    let timer = OffsetTime::new(
        offset,
        format_description::parse("[day].[month].[year] [hour]:[minute]:[second]")
            .context("invalid time format description")?,
    );

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_timer(timer)
        .init();

    Ok(())
}
