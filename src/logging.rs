use tracing_subscriber::{fmt, EnvFilter};

use crate::types::{GraphError, Result};

/// Installs the global `tracing` subscriber, writing to stderr.
///
/// `level` is an `EnvFilter` directive such as `info` or
/// `shardgraph::db=debug`.
pub fn init_logging(level: &str) -> Result<()> {
    fmt()
        .with_env_filter(
            EnvFilter::try_new(level)
                .map_err(|e| GraphError::Config(format!("invalid log level: {e}")))?,
        )
        .with_target(true)
        .with_thread_ids(true)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|_| GraphError::Config("logging already initialized".into()))
}
