//! `askmycar onboard`: first-time setup.

use askmycar_config::AppConfig;

pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config_dir = AppConfig::config_dir();
    let config_path = config_dir.join("config.toml");

    println!("🚗 AskMyCar Setup");
    println!("=================\n");

    if !config_dir.exists() {
        std::fs::create_dir_all(&config_dir)?;
        println!("✅ Created config directory: {}", config_dir.display());
    } else {
        println!("  Config directory exists: {}", config_dir.display());
    }

    if config_path.exists() {
        println!("\n⚠️  Config already exists at: {}", config_path.display());
        println!("   Edit it manually or delete and re-run onboard.\n");
        return Ok(());
    }

    std::fs::write(&config_path, AppConfig::default_toml())?;
    println!("✅ Created config.toml at: {}", config_path.display());
    println!("\n📝 Next steps:");
    println!("   1. Set ANTHROPIC_API_KEY (or anthropic.api_key in config.toml)");
    println!("   2. Optionally set VEHICLE_DB_API_KEY and BRAVE_SEARCH_API_KEY");
    println!("   3. Run: askmycar doctor");
    println!("   4. Run: askmycar gateway\n");

    Ok(())
}
