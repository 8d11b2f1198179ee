//! `askmycar vin`: decode a VIN and print the vehicle as JSON.

use askmycar_config::AppConfig;
use askmycar_vehicle::VinDecoder;

pub async fn run(vin: &str) -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;
    let decoder = VinDecoder::new(&config.nhtsa);

    let vehicle = decoder.decode(vin).await?;
    println!("{}", serde_json::to_string_pretty(&vehicle)?);

    Ok(())
}
