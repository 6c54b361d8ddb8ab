use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use log::info;
use reconcile_lib::api::{
    handle_delete_duplicates, handle_execute_sync, handle_find_duplicates, handle_merge_venues,
    ApiResponse,
};
use reconcile_lib::store::{CatalogStore, MemoryCatalog, PgCatalog};
use reconcile_lib::utils::config::{ReconcileConfig, StoreBackend};
use reconcile_lib::utils::env::load_env;
use reconcile_lib::utils::progress_config::ProgressConfig;
use serde_json::Value;
use std::path::Path;

#[derive(Parser, Debug)]
#[command(name = "reconcile", about = "Venue catalog duplicate detection, merging and discovery promotion")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Scan the catalog for duplicate venue groups
    FindDuplicates,
    /// Merge two venues: BODY is {"primaryVenueId", "secondaryVenueId"}
    Merge { body: String },
    /// Delete venues and their dishes: BODY is {"venueIds": [...]}
    DeleteDuplicates { body: String },
    /// Promote verified discoveries: BODY is {"venueIds"?, "dishIds"?, "syncAll"?, "skipAddressValidation"?}
    Sync {
        #[arg(default_value = r#"{"syncAll": true}"#)]
        body: String,
    },
}

impl Command {
    fn mutates(&self) -> bool {
        !matches!(self, Command::FindDuplicates)
    }
}

/// Accepts inline JSON or `@path` to a JSON file.
fn read_body(raw: &str) -> Result<Value> {
    let text = match raw.strip_prefix('@') {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read request body from {}", path))?,
        None => raw.to_string(),
    };
    serde_json::from_str(&text).context("Request body is not valid JSON")
}

async fn dispatch(
    command: &Command,
    store: &dyn CatalogStore,
    config: &ReconcileConfig,
    progress: &ProgressConfig,
) -> Result<ApiResponse> {
    let response = match command {
        Command::FindDuplicates => handle_find_duplicates(store, config).await,
        Command::Merge { body } => handle_merge_venues(store, &read_body(body)?, config).await,
        Command::DeleteDuplicates { body } => {
            handle_delete_duplicates(store, &read_body(body)?, config).await
        }
        Command::Sync { body } => {
            let multi_progress = if progress.should_show_detailed() {
                progress.create_multi_progress()
            } else {
                None
            };
            handle_execute_sync(store, &read_body(body)?, config, multi_progress).await
        }
    };
    Ok(response)
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();
    load_env();
    let cli = Cli::parse();

    let config = ReconcileConfig::from_env();
    config.log_config();
    let progress = ProgressConfig::from_env();
    info!(
        "Progress tracking: enabled={}, detailed={}",
        progress.enabled, progress.detailed
    );

    let response = match config.store {
        StoreBackend::Postgres => {
            let store = PgCatalog::connect(&config.postgres)
                .await
                .context("Failed to connect to the catalog database")?;
            info!("Connected to catalog database {}", config.postgres.dbname);
            dispatch(&cli.command, &store, &config, &progress).await?
        }
        StoreBackend::Memory => {
            let Some(path) = config.snapshot_path.as_deref() else {
                bail!("RECONCILE_SNAPSHOT_PATH must be set when RECONCILE_STORE=memory");
            };
            let store = MemoryCatalog::from_snapshot_file(path)
                .with_context(|| format!("Failed to load snapshot {}", path.display()))?;
            let response = dispatch(&cli.command, &store, &config, &progress).await?;
            if cli.command.mutates() && response.is_success() {
                persist(&store, path).await?;
            }
            response
        }
    };

    println!("{}", serde_json::to_string_pretty(&response)?);
    if !response.is_success() {
        std::process::exit(1);
    }
    Ok(())
}

async fn persist(store: &MemoryCatalog, path: &Path) -> Result<()> {
    store
        .write_snapshot_file(path)
        .await
        .with_context(|| format!("Failed to write snapshot {}", path.display()))
}
