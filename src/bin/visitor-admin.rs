use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::net::IpAddr;
use visitor_tracker::analytics::build_resolver;
use visitor_tracker::config::Config;
use visitor_tracker::logging;
use visitor_tracker::storage::open_store;

#[derive(Parser)]
#[command(name = "visitor-admin")]
#[command(about = "Visitor tracker management CLI", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the database and visitors table if missing
    Init,
    /// Print every logged visit, most recent first
    List {
        /// Print the raw JSON served by /api/get-visitors
        #[arg(long)]
        json: bool,
    },
    /// Run the configured geolocation resolver for one IP
    Resolve {
        /// IPv4 or IPv6 address
        ip: IpAddr,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    logging::init_with_writer(std::io::stderr);

    let cli = Cli::parse();
    let config = Config::from_env()?;

    match cli.command {
        Commands::Init => {
            let store = open_store(&config.database)?;
            store.ensure_schema().await?;
            println!("✓ Database and visitors table ready ({:?})", config.database.backend);
        }
        Commands::List { json } => {
            // Read-only; never provisions the database
            let store = open_store(&config.database)?;
            let visitors = store
                .list_all()
                .await
                .context("failed to read visitors (run `visitor-admin init` first?)")?;

            if json {
                println!("{}", serde_json::to_string_pretty(&visitors)?);
            } else if visitors.is_empty() {
                println!("No visits logged yet.");
            } else {
                println!(
                    "{:<24} {:<40} {:<20} {:<20} {:<24} {:<12}",
                    "Time", "IP", "Country", "City", "Browser", "Device"
                );
                println!("{}", "-".repeat(145));
                for v in &visitors {
                    println!(
                        "{:<24} {:<40} {:<20} {:<20} {:<24} {:<12}",
                        v.visit_time.format("%Y-%m-%d %H:%M:%S"),
                        v.ip_address,
                        v.country,
                        v.city,
                        v.browser_name,
                        v.device_type
                    );
                }
                println!("{} visit(s)", visitors.len());
            }
        }
        Commands::Resolve { ip } => {
            let resolver = build_resolver(&config.geo)?;
            let info = resolver.resolve(ip).await.with_context(|| {
                format!("{} resolver found nothing for {}", resolver.name(), ip)
            })?;
            println!("{}", serde_json::to_string_pretty(&info)?);
        }
    }

    Ok(())
}
