use anyhow::{anyhow, Context, Result};
use std::path::Path;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initialize logging system
///
/// `RUST_LOG` wins over `level` when set. A log file is only honored with
/// JSON output.
pub fn init_logger(level: &str, json_output: bool, log_file: Option<&Path>) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let registry = tracing_subscriber::registry().with(filter);

    let installed = if json_output {
        // JSON formatting for batch runs
        if let Some(file) = log_file {
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(file)
                .with_context(|| format!("Failed to open log file {}", file.display()))?;

            registry
                .with(fmt::layer().json().with_writer(file))
                .try_init()
        } else {
            registry.with(fmt::layer().json()).try_init()
        }
    } else {
        // Pretty formatting for interactive use
        registry.with(fmt::layer().pretty()).try_init()
    };

    installed.map_err(|e| anyhow!("Failed to install tracing subscriber: {}", e))
}

/// Initialize logger from config
pub fn init_from_config(config: &crate::utils::config::LoggingConfig) -> Result<()> {
    let json = config.output == "json";
    let log_file = if !config.file_path.is_empty() {
        Some(Path::new(&config.file_path))
    } else {
        None
    };

    init_logger(&config.level, json, log_file)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unwritable_log_file() {
        let result = init_logger("info", true, Some(Path::new("/nonexistent-dir/pulse.log")));
        assert!(result.is_err());
    }
}
