//! AskMyCar CLI, the main entry point.
//!
//! Commands:
//! - `onboard`  write a starter config
//! - `gateway`  serve the chat and lookup API
//! - `doctor`   check config and credentials
//! - `vin`      decode a VIN from the terminal

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(
    name = "askmycar",
    about = "AskMyCar: an automotive assistant that knows your car",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    json: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a default configuration file
    Onboard,

    /// Start the HTTP gateway server
    Gateway {
        /// Override the port
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Diagnose configuration and credentials
    Doctor,

    /// Decode a VIN using the NHTSA database
    Vin {
        /// 17-character vehicle identification number
        vin: String,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let level = if cli.verbose { "debug" } else { "info" };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));
    if cli.json {
        tracing_subscriber::fmt().json().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .init();
    }

    match cli.command {
        Commands::Onboard => commands::onboard::run().await?,
        Commands::Gateway { port } => commands::gateway::run(port).await?,
        Commands::Doctor => commands::doctor::run().await?,
        Commands::Vin { vin } => commands::vin::run(&vin).await?,
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_gateway_port_override() {
        let cli = Cli::try_parse_from(["askmycar", "gateway", "--port", "8080"]).unwrap();
        assert!(matches!(cli.command, Commands::Gateway { port: Some(8080) }));
        assert!(!cli.verbose);
    }

    #[test]
    fn global_flags_follow_subcommand() {
        let cli = Cli::try_parse_from(["askmycar", "doctor", "-v", "--json"]).unwrap();
        assert!(matches!(cli.command, Commands::Doctor));
        assert!(cli.verbose && cli.json);
    }

    #[test]
    fn vin_requires_argument() {
        assert!(Cli::try_parse_from(["askmycar", "vin"]).is_err());
        let cli = Cli::try_parse_from(["askmycar", "vin", "1HGCM82633A004352"]).unwrap();
        match cli.command {
            Commands::Vin { vin } => assert_eq!(vin, "1HGCM82633A004352"),
            _ => panic!("expected vin command"),
        }
    }
}
