//! `askmycar gateway`: start the HTTP API server.

use askmycar_config::AppConfig;

pub async fn run(port_override: Option<u16>) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;

    if let Some(port) = port_override {
        config.gateway.port = port;
    }

    if !config.has_api_key() {
        return Err("ANTHROPIC_API_KEY is not set. Run `askmycar doctor` for details.".into());
    }

    println!("🚗 AskMyCar Gateway");
    println!("   Listening: {}:{}", config.gateway.host, config.gateway.port);
    println!("   Model:     {}", config.model);
    println!("   Origins:   {}", config.gateway.allowed_origins.join(", "));

    askmycar_gateway::start(config).await?;

    Ok(())
}
