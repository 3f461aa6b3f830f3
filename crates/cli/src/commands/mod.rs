pub mod chat;
pub mod collect;
pub mod doctor;
pub mod guide;
pub mod init_config;
pub mod migrate;
pub mod role;
pub mod serve;

use gongbu_config::AppConfig;
use gongbu_core::provider::Provider;
use gongbu_store::SqliteStore;
use std::sync::Arc;
use tracing::debug;

/// Load the config, mapping failures to a readable message.
pub(crate) fn load_config() -> Result<AppConfig, Box<dyn std::error::Error>> {
    Ok(AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?)
}

/// Fail early with setup instructions when no key is configured.
pub(crate) fn require_api_key(config: &AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    if config.has_api_key() {
        return Ok(());
    }
    eprintln!();
    eprintln!("  ERROR: No API key configured!");
    eprintln!();
    eprintln!("  Set one of these environment variables:");
    eprintln!("    GONGBU_API_KEY = 'sk-...'   (recommended)");
    eprintln!("    OPENAI_API_KEY = 'sk-...'");
    eprintln!();
    eprintln!("  Or add it to your config file:");
    eprintln!("    {}", AppConfig::config_dir().join("config.toml").display());
    eprintln!();
    Err("No API key found. See above for setup instructions.".into())
}

pub(crate) fn default_provider(config: &AppConfig) -> Result<Arc<dyn Provider>, Box<dyn std::error::Error>> {
    let router = gongbu_providers::router::build_from_config(config);
    Ok(router.default().ok_or("No default provider configured")?)
}

/// Open the configured database, creating its directory for file URLs.
pub(crate) async fn open_store(
    config: &AppConfig,
    database_url: Option<String>,
) -> Result<SqliteStore, Box<dyn std::error::Error>> {
    let url = database_url.unwrap_or_else(|| config.database_url());
    debug!(url = %url, "Opening store");
    if let Some(path) = url.strip_prefix("sqlite://")
        && !path.starts_with(':')
        && let Some(parent) = std::path::Path::new(path).parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)?;
    }
    Ok(SqliteStore::new(&url, config.database.max_connections).await?)
}
