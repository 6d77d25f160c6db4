/*!
 * Logging and tracing initialization
 */

use std::fs::File;
use std::path::Path;
use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter,
};

use crate::config::GatewayConfig;
use crate::error::{GatewayError, Result};

/// Initialize structured logging based on configuration
pub fn init_logging(config: &GatewayConfig) -> Result<()> {
    let env_filter = build_filter(config)?;

    if let Some(ref log_path) = config.log_file {
        init_file_logging(log_path, env_filter)?;
    } else {
        init_stderr_logging(env_filter);
    }

    Ok(())
}

/// `RUST_LOG` wins; otherwise only this crate's events at the configured level
fn build_filter(config: &GatewayConfig) -> Result<EnvFilter> {
    let level = config.effective_log_level();
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(format!("report_gateway={}", level)))
        .map_err(|e| GatewayError::Config(format!("Failed to create log filter: {}", e)))
}

/// Human-readable logs on stderr, keeping stdout for results
fn init_stderr_logging(env_filter: EnvFilter) {
    let fmt_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_span_events(FmtSpan::NONE)
        .compact();

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .init();
}

/// JSON lines appended to a file
fn init_file_logging(log_path: &Path, env_filter: EnvFilter) -> Result<()> {
    if let Some(parent) = log_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .map_err(|e| GatewayError::Config(format!("Failed to create log directory: {}", e)))?;
    }
    let file = File::options()
        .create(true)
        .append(true)
        .open(log_path)
        .map_err(|e| GatewayError::Config(format!("Failed to open log file: {}", e)))?;

    let fmt_layer = fmt::layer()
        .with_writer(file)
        .with_target(true)
        .with_file(true)
        .with_line_number(true)
        .with_ansi(false)
        .json();

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .init();

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LogLevel;

    #[test]
    fn test_filter_builds_for_every_level() {
        for level in [
            LogLevel::Error,
            LogLevel::Warn,
            LogLevel::Info,
            LogLevel::Debug,
            LogLevel::Trace,
        ] {
            let config = GatewayConfig {
                log_level: level,
                ..Default::default()
            };
            assert!(build_filter(&config).is_ok());
        }
    }
}
