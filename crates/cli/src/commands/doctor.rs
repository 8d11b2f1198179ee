//! `askmycar doctor`: diagnose configuration and credentials.

use askmycar_config::AppConfig;

pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    println!("🩺 AskMyCar Doctor");
    println!("==================\n");

    let mut issues = 0;

    let config_path = AppConfig::config_dir().join("config.toml");
    if config_path.exists() {
        println!("  ✅ Config file found: {}", config_path.display());
    } else {
        println!("  ⚠️  No config file, using defaults (run `askmycar onboard` to create one)");
    }

    let config = match AppConfig::load() {
        Ok(config) => {
            println!("  ✅ Configuration valid");
            config
        }
        Err(e) => {
            println!("  ❌ Configuration invalid: {e}");
            println!("\n  ⚠️  1 issue(s) found. See above for details.");
            return Ok(());
        }
    };

    if config.has_api_key() {
        println!("  ✅ Anthropic API key configured (model: {})", config.model);
    } else {
        println!("  ❌ No Anthropic API key. Set ANTHROPIC_API_KEY; chat will not work");
        issues += 1;
    }

    if config.vehicle_db.api_key.is_some() {
        println!("  ✅ Vehicle manual lookup configured");
    } else {
        println!("  ⚠️  No VEHICLE_DB_API_KEY. Manual lookups fall back to general guidance");
    }

    if config.search.api_key.is_some() {
        println!("  ✅ Web search configured");
    } else {
        println!("  ⚠️  No BRAVE_SEARCH_API_KEY. Web search and image fallback disabled");
    }

    println!(
        "  ✅ Chat loop: up to {} round(s), {} max tokens",
        config.max_rounds, config.max_tokens
    );

    println!();
    if issues == 0 {
        println!("  🎉 All checks passed!");
    } else {
        println!("  ⚠️  {issues} issue(s) found. See above for details.");
    }

    Ok(())
}
