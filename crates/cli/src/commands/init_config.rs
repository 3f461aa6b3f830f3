//! `gongbu init-config` — Write a default config file.

use gongbu_config::AppConfig;

pub async fn run(force: bool) -> Result<(), Box<dyn std::error::Error>> {
    let config_dir = AppConfig::config_dir();
    let config_path = config_dir.join("config.toml");

    println!("📚 Gongbu — First-Time Setup");
    println!("============================\n");

    if !config_dir.exists() {
        std::fs::create_dir_all(&config_dir)?;
        println!("✅ Created config directory: {}", config_dir.display());
    } else {
        println!("  Config directory exists: {}", config_dir.display());
    }

    if config_path.exists() && !force {
        println!("  Config file exists: {} (use --force to overwrite)", config_path.display());
    } else {
        std::fs::write(&config_path, AppConfig::default_toml())?;
        println!("✅ Wrote config file: {}", config_path.display());
    }

    println!();
    println!("  Next steps:");
    println!("    1. Set GONGBU_API_KEY or add api_key to config.toml");
    println!("    2. gongbu migrate");
    println!("    3. gongbu serve");

    Ok(())
}
