//! Stockroom CLI - manage stock from the terminal, online or offline
//!
//! Every write lands in the local database first and is pushed to the stock
//! API when it is reachable.

mod cli;
mod commands;
mod config_profiles;
mod error;

use clap::Parser;

use crate::cli::{Cli, Commands};
use crate::commands::auth::run_auth;
use crate::commands::category::run_category;
use crate::commands::common::{resolve_db_path, Context};
use crate::commands::completions::run_completions;
use crate::commands::config::run_config;
use crate::commands::customer::run_customer;
use crate::commands::order::run_order;
use crate::commands::product::run_product;
use crate::commands::supply::run_supply;
use crate::commands::sync::{run_refresh, run_status, run_sync, run_watch};
use crate::error::CliError;

const DEFAULT_LOG_FILTER: &str = "stockroom=info";

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        eprintln!("Error: {error}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), CliError> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(DEFAULT_LOG_FILTER)),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Completions { shell, output } => run_completions(shell, output.as_deref()),
        Commands::Config { command } => run_config(command, cli.profile.as_deref()),
        Commands::Auth { command } => run_auth(command, cli.profile.as_deref()).await,
        command => {
            let ctx = Context {
                db_path: resolve_db_path(cli.db_path)?,
                profile: cli.profile,
                offline: cli.offline,
            };
            run_inventory_command(command, &ctx).await
        }
    }
}

async fn run_inventory_command(command: Commands, ctx: &Context) -> Result<(), CliError> {
    match command {
        Commands::Category { command } => run_category(command, ctx).await,
        Commands::Product { command } => run_product(command, ctx).await,
        Commands::Supply { command } => run_supply(command, ctx).await,
        Commands::Customer { command } => run_customer(command, ctx).await,
        Commands::Order { command } => run_order(command, ctx).await,
        Commands::Sync => run_sync(ctx).await,
        Commands::Refresh => run_refresh(ctx).await,
        Commands::Status { json } => run_status(json, ctx).await,
        Commands::Watch { check_interval } => run_watch(check_interval, ctx).await,
        Commands::Completions { shell, output } => run_completions(shell, output.as_deref()),
        Commands::Config { command } => run_config(command, ctx.profile.as_deref()),
        Commands::Auth { command } => run_auth(command, ctx.profile.as_deref()).await,
    }
}
