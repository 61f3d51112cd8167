mod commands;
mod config;
mod render;

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};
use platform_api::ApiError;
use platform_obs::{ObsConfig, init_tracing};
use products_crm::CrmService;
use tracing::{error, info};

use crate::{
    commands::{AccountCommand, ContactCommand, OpportunityCommand, Output},
    config::AppConfig,
};

#[derive(Parser, Debug)]
#[command(name = "crm", version, about = "Accounts, contacts and the sales pipeline")]
struct Cli {
    /// Print JSON instead of text tables.
    #[arg(long, global = true)]
    json: bool,
    /// Directory holding the persisted dataset (overrides CRM_DATA_DIR).
    #[arg(long, global = true, value_name = "DIR")]
    data_dir: Option<PathBuf>,
    /// Storage key of the dataset blob (overrides CRM_STORAGE_KEY).
    #[arg(long, global = true, value_name = "KEY")]
    storage_key: Option<String>,
    /// Keep the dataset in memory for this run only.
    #[arg(long, global = true, conflicts_with = "data_dir")]
    memory: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Replace the dataset with freshly generated starter data.
    #[command(alias = "reset")]
    Seed,
    /// Record counts and pipeline totals.
    Dashboard,
    /// Opportunities grouped by stage.
    Pipeline,
    /// Report dangling or cross-account references.
    Check,
    /// Remove the persisted dataset blob.
    #[command(name = "clear-storage")]
    ClearStorage,
    #[command(subcommand)]
    Accounts(AccountCommand),
    #[command(subcommand)]
    Contacts(ContactCommand),
    #[command(subcommand, alias = "deals")]
    Opportunities(OpportunityCommand),
}

fn main() -> Result<ExitCode> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    let config = AppConfig::load()?.with_overrides(cli.data_dir, cli.storage_key, cli.memory);
    init_tracing(ObsConfig {
        env_filter: config.log_filter.clone(),
        ..ObsConfig::default()
    })?;

    let mut service = CrmService::from_settings(&config.store);
    info!(backend = ?config.store.backend, key = %config.store.key, "crm ready");

    let out = Output { json: cli.json };
    let outcome = match cli.command {
        Command::Seed => commands::seed(&mut service, out),
        Command::Dashboard => commands::dashboard(&service, out),
        Command::Pipeline => commands::pipeline(&service, out),
        Command::Check => commands::check(&service, out),
        Command::ClearStorage => {
            service.clear_storage();
            Ok(())
        }
        Command::Accounts(cmd) => commands::accounts(&mut service, cmd, out),
        Command::Contacts(cmd) => commands::contacts(&mut service, cmd, out),
        Command::Opportunities(cmd) => commands::opportunities(&mut service, cmd, out),
    };

    let Err(err) = outcome else {
        return Ok(ExitCode::SUCCESS);
    };
    let api = into_api_error(err);
    let payload = api.payload();
    if cli.json {
        println!("{}", serde_json::to_string_pretty(&payload)?);
    } else {
        eprintln!("error [{}]: {}", payload.code, payload.message);
    }
    Ok(ExitCode::FAILURE)
}

/// Service errors pass through; anything else is logged in full and
/// reported as an internal error.
fn into_api_error(err: anyhow::Error) -> ApiError {
    match err.downcast::<ApiError>() {
        Ok(api) => api,
        Err(other) => {
            error!(error = ?other, "command failed");
            ApiError::from(other)
        }
    }
}
