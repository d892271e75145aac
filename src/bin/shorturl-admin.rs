use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use shorturl::allocator::{Allocator, RandomIdGenerator};
use shorturl::config::Config;
use shorturl::error::AppError;
use shorturl::service::UrlService;
use shorturl::storage;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "shorturl-admin")]
#[command(about = "shorturl management CLI", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List every short URL
    List,
    /// Show a single short URL
    Show {
        /// Short id
        id: String,
    },
    /// Create a short URL
    Create {
        /// Target URL
        url: String,
        /// Use this id instead of allocating a random one
        #[arg(long)]
        id: Option<String>,
    },
    /// Point a short id at a new target
    Update {
        /// Short id
        id: String,
        /// New target URL
        url: String,
    },
    /// Delete a short URL
    Delete {
        /// Short id
        id: String,
    },
    /// Record counts per target hostname
    Stats {
        /// Only count this hostname
        #[arg(long)]
        hostname: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let config = Config::from_env()?;

    let storage = storage::connect(&config.database).await?;
    let allocator = Allocator::new(
        Arc::new(RandomIdGenerator::from_clock()),
        config.allocator.max_attempts,
    );
    let service = UrlService::new(storage, allocator);

    run(cli.command, &service).await
}

async fn run(command: Commands, service: &UrlService) -> Result<()> {
    match command {
        Commands::List => {
            let urls = service.find_all().await?;
            if urls.is_empty() {
                println!("No short URLs found.");
            } else {
                println!("{:<12} {:>8}  {}", "ID", "ACCESSES", "TARGET");
                for url in urls {
                    println!(
                        "{:<12} {:>8}  {}",
                        url.short_id, url.access_count, url.target_url
                    );
                }
            }
        }
        Commands::Show { id } => match service.find_by_id(&id).await {
            Ok(url) => {
                println!("ID:         {}", url.short_id);
                println!("Target:     {}", url.target_url);
                println!("Accesses:   {}", url.access_count);
                println!("Created at: {}", url.created_at);
                println!("Updated at: {}", url.updated_at);
            }
            Err(AppError::NotFound) => println!("✗ No short URL with id '{}'", id),
            Err(err) => return Err(err).context("failed to load short URL"),
        },
        Commands::Create { url, id } => {
            let record = match id {
                Some(id) => service.create_with_id(&id, &url).await,
                None => service.create(&url).await,
            }
            .context("failed to create short URL")?;
            println!("✓ Created '{}' -> {}", record.short_id, record.target_url);
        }
        Commands::Update { id, url } => {
            if service.update(&id, &url).await? > 0 {
                println!("✓ Updated '{}' -> {}", id, url);
            } else {
                println!("✗ No short URL with id '{}'", id);
            }
        }
        Commands::Delete { id } => match service.delete(&id).await {
            Ok(()) => println!("✓ Deleted '{}'", id),
            Err(AppError::NotFound) => println!("✗ No short URL with id '{}'", id),
            Err(err) => return Err(err).context("failed to delete short URL"),
        },
        Commands::Stats { hostname } => {
            let stats = service.stats_by_hostname(hostname.as_deref()).await?;
            if stats.is_empty() {
                println!("No matching records.");
            }
            for entry in stats {
                println!("{:>8}  {}", entry.count, entry.hostname);
            }
        }
    }

    Ok(())
}
