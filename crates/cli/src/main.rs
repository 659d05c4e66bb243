//! Bazaar CLI - Database migrations and shop administration.
//!
//! # Usage
//!
//! ```bash
//! # Apply database migrations
//! bazaar migrate
//!
//! # Load products from a JSON array file
//! bazaar seed products catalog.json
//!
//! # Validate the file without writing anything
//! bazaar seed products catalog.json --dry-run
//!
//! # Move an order along its lifecycle
//! bazaar orders set-status 2b1c...-... shipped
//! ```
//!
//! # Commands
//!
//! - `migrate` - Run database migrations
//! - `seed products` - Bulk-insert catalog products
//! - `orders show` / `orders set-status` - Inspect and advance orders

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use bazaar_core::{OrderId, OrderStatus};

mod commands;

#[derive(Parser)]
#[command(name = "bazaar")]
#[command(author, version, about = "Bazaar CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate,
    /// Seed the database
    Seed {
        #[command(subcommand)]
        target: SeedTarget,
    },
    /// Administer orders
    Orders {
        #[command(subcommand)]
        action: OrderAction,
    },
}

#[derive(Subcommand)]
enum SeedTarget {
    /// Insert products from a JSON file holding an array of products
    Products {
        /// Path to the JSON file
        file: PathBuf,

        /// Validate only, do not write
        #[arg(long)]
        dry_run: bool,
    },
}

#[derive(Subcommand)]
enum OrderAction {
    /// Print an order as JSON
    Show {
        /// Order ID
        id: OrderId,
    },
    /// Change an order's status (`processing`, `shipped`, `delivered`, `cancelled`)
    SetStatus {
        /// Order ID
        id: OrderId,

        /// Target status
        status: OrderStatus,
    },
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), commands::CommandError> {
    match cli.command {
        Commands::Migrate => commands::migrate::run().await?,
        Commands::Seed { target } => match target {
            SeedTarget::Products { file, dry_run } => {
                commands::seed::products(&file, dry_run).await?;
            }
        },
        Commands::Orders { action } => match action {
            OrderAction::Show { id } => commands::orders::show(id).await?,
            OrderAction::SetStatus { id, status } => {
                commands::orders::set_status(id, status).await?;
            }
        },
    }
    Ok(())
}
