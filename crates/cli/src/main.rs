//! Panificación Modelo CLI - catalog inspection tools.
//!
//! # Usage
//!
//! ```bash
//! # Print the catalog exactly as the storefront groups it
//! panaderia-cli catalog
//!
//! # Report categories and products the storefront cannot show
//! panaderia-cli categories audit
//! ```
//!
//! Both commands read `SUPABASE_URL` and `SUPABASE_ANON_KEY` from the
//! environment (or `.env`).

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "panaderia-cli")]
#[command(author, version, about = "Panificación Modelo CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the category-grouped catalog
    Catalog,
    /// Inspect the category table
    Categories {
        #[command(subcommand)]
        action: CategoriesAction,
    },
}

#[derive(Subcommand)]
enum CategoriesAction {
    /// Compare the category table against the fixed menu order
    Audit,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), commands::CommandError> {
    match cli.command {
        Commands::Catalog => commands::catalog::print().await?,
        Commands::Categories { action } => match action {
            CategoriesAction::Audit => {
                let clean = commands::categories::audit().await?;
                if !clean {
                    return Err(commands::CommandError::AuditFailed);
                }
            }
        },
    }
    Ok(())
}
