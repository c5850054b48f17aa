pub mod capability;
pub mod commands;
pub mod config;
pub mod errors;
pub mod locale;
pub mod panel;
pub mod sink;
pub mod tasks;

use crate::capability::registry::ProviderRegistry;
use crate::config::AppConfig;
use crate::errors::TextLensResult;

pub fn run() -> TextLensResult<()> {
    // Logs go to stderr so they never interleave with panel output.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    // Load .env file if present (ignore error if not found)
    let _ = dotenvy::dotenv();

    let config = match config::load_config() {
        Ok(cfg) => cfg,
        Err(e) => {
            tracing::error!(error = %e, "Failed to load config; using defaults");
            AppConfig::default()
        }
    };
    let registry = ProviderRegistry::from_config(&config);
    tracing::info!(active = registry.active_name(), "provider registry ready");

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    runtime.block_on(commands::console_loop(registry, config))
}
