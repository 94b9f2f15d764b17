//! Logging setup
//!
//! Events go to stderr through `tracing-subscriber`, so statement results on
//! stdout stay clean. `RUST_LOG` takes precedence over the configured level.

use tracing_subscriber::EnvFilter;

use crate::error::{Error, Result};

/// Build the filter from `RUST_LOG`, falling back to `level`
fn build_env_filter(level: &str) -> Result<EnvFilter> {
    match EnvFilter::try_from_default_env() {
        Ok(filter) => Ok(filter),
        Err(_) => EnvFilter::try_new(level).map_err(|e| {
            Error::ExecutionError(format!("invalid log filter '{}': {}", level, e))
        }),
    }
}

/// Install the global subscriber. Calling it again is a no-op.
pub fn init_logging(level: &str) -> Result<()> {
    let filter = build_env_filter(level)?;
    // Fails only when a subscriber is already installed
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .compact()
        .try_init();

    tracing::trace!(level, "logging initialized");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_logging_twice() {
        assert!(init_logging("warn").is_ok());
        assert!(init_logging("primerdb=debug").is_ok());
    }

    #[test]
    fn test_bad_filter_is_rejected() {
        if std::env::var_os("RUST_LOG").is_none() {
            assert!(build_env_filter("primerdb=loud").is_err());
        }
    }
}
