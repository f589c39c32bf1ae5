//! Lustre CLI - database migrations and catalog management.
//!
//! # Usage
//!
//! ```bash
//! # Run database migrations
//! lustre migrate
//!
//! # Load categories and products from a YAML file
//! lustre seed catalog.yaml
//! lustre seed catalog.yaml --dry-run
//!
//! # Inspect or change delivery pricing
//! lustre delivery show
//! lustre delivery set --fee 5.00 --threshold 50.00
//! ```
//!
//! # Environment Variables
//!
//! - `STOREFRONT_DATABASE_URL` - `PostgreSQL` connection string (falls back to `DATABASE_URL`)

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};
use lustre_core::Money;

mod commands;

#[derive(Parser)]
#[command(name = "lustre")]
#[command(author, version, about = "Lustre CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate,
    /// Upsert categories and products from a YAML catalog file
    Seed {
        /// Path to the catalog file
        file: String,

        /// Validate the file without touching the database
        #[arg(long)]
        dry_run: bool,
    },
    /// Inspect or change delivery pricing
    Delivery {
        #[command(subcommand)]
        action: DeliveryAction,
    },
}

#[derive(Subcommand)]
enum DeliveryAction {
    /// Show the current delivery fee and free-delivery threshold
    Show,
    /// Set the delivery fee and free-delivery threshold
    Set {
        /// Flat delivery fee
        #[arg(long)]
        fee: Money,

        /// Subtotal at which delivery becomes free (0 = always charge)
        #[arg(long)]
        threshold: Money,
    },
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    let result: Result<(), Box<dyn std::error::Error>> = run(cli).await;

    if let Err(e) = result {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Migrate => commands::migrate::run().await?,
        Commands::Seed { file, dry_run } => commands::seed::catalog(&file, dry_run).await?,
        Commands::Delivery { action } => match action {
            DeliveryAction::Show => commands::delivery::show().await?,
            DeliveryAction::Set { fee, threshold } => {
                commands::delivery::set(fee, threshold).await?;
            }
        },
    }
    Ok(())
}
