//! Structured logging setup
//!
//! `RUST_LOG` still wins over the configured level when it is set.

use anyhow::{anyhow, Result};
use tracing::Level;
use tracing_subscriber::EnvFilter;

use crate::config::Config;

/// Filter with `level` as the default directive
pub fn env_filter(level: Level) -> EnvFilter {
    EnvFilter::builder()
        .with_default_directive(level.into())
        .from_env_lossy()
}

/// Level to run at: `--verbose` forces DEBUG
pub fn effective_level(config: &Config, verbose: bool) -> Result<Level> {
    if verbose {
        Ok(Level::DEBUG)
    } else {
        config.log_level()
    }
}

/// Install the global subscriber in the configured format
pub fn init(config: &Config, verbose: bool) -> Result<()> {
    let filter = env_filter(effective_level(config, verbose)?);
    let builder = tracing_subscriber::fmt().with_env_filter(filter);

    let installed = match config.logging.format.to_lowercase().as_str() {
        "json" => builder.json().try_init(),
        "pretty" => builder.pretty().try_init(),
        _ => builder.compact().try_init(),
    };
    installed.map_err(|e| anyhow!("Failed to initialize logging: {}", e))
}
