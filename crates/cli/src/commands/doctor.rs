//! `gongbu doctor` — Diagnose configuration and connectivity.

use gongbu_config::AppConfig;
use gongbu_core::store::{ConceptFilter, Store};

pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    println!("🩺 Gongbu Doctor — System Diagnostics");
    println!("=====================================\n");

    let mut issues = 0;

    let config_path = AppConfig::config_dir().join("config.toml");
    if !config_path.exists() {
        println!("  ⚠️  No config file — run `gongbu init-config` (using defaults)");
        issues += 1;
    }

    let config = match AppConfig::load() {
        Ok(config) => {
            println!("  ✅ Config valid");
            config
        }
        Err(e) => {
            println!("  ❌ Config file invalid: {e}");
            println!("\n  ⚠️  Fix the config before running further checks.");
            return Ok(());
        }
    };

    let api_key = config.has_api_key();
    if api_key {
        println!("  ✅ API key configured");
    } else {
        println!("  ⚠️  No API key configured — set GONGBU_API_KEY or add api_key to config.toml");
        issues += 1;
    }

    match super::open_store(&config, None).await {
        Ok(store) => {
            println!("  ✅ Database reachable: {}", config.database_url());
            let filter = ConceptFilter {
                subject: String::new(),
                education_level: None,
            };
            if let Err(e) = store.concept_contexts(&filter).await {
                println!("  ❌ Concept query failed: {e}");
                issues += 1;
            }
        }
        Err(e) => {
            println!("  ❌ Database unavailable: {e}");
            issues += 1;
        }
    }

    match super::default_provider(&config) {
        Ok(provider) if api_key => match provider.health_check().await {
            Ok(true) => println!("  ✅ Provider '{}' reachable", provider.name()),
            Ok(false) => {
                println!("  ⚠️  Provider '{}' responded but reported unhealthy", provider.name());
                issues += 1;
            }
            Err(e) => {
                println!("  ❌ Provider '{}' unreachable: {e}", provider.name());
                issues += 1;
            }
        },
        Ok(provider) => println!("  ⚠️  Skipping '{}' check without an API key", provider.name()),
        Err(e) => {
            println!("  ❌ {e}");
            issues += 1;
        }
    }

    // Summary
    println!();
    if issues == 0 {
        println!("  🎉 All checks passed!");
    } else {
        println!("  ⚠️  {issues} issue(s) found. See above for details.");
    }

    Ok(())
}
