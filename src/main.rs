use std::path::PathBuf;

use anyhow::{bail, Result};
use assessment_sync_lib::{init_logging, log_error, AppState, DuplicateKeyPolicy, SettingsStore};
use clap::{Parser, Subcommand};
use serde_json::Value;

const ENABLE_LOGS: bool = true;

#[derive(Parser, Debug)]
#[command(
    name = "assessment-sync",
    about = "Inspect and sync answers queued while the practice assessment was offline"
)]
struct Cli {
    #[arg(
        long,
        env = "ASSESSMENT_SYNC_SETTINGS",
        default_value = "assessment-sync.settings.json"
    )]
    settings: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Change persisted settings
    Config {
        #[arg(long)]
        policy: Option<DuplicateKeyPolicy>,
        #[arg(long)]
        clear_after_sync: Option<bool>,
        #[arg(long)]
        storage_key: Option<String>,
    },
    #[command(flatten)]
    Queue(QueueCommand),
}

/// Commands that open the database.
#[derive(Subcommand, Debug)]
enum QueueCommand {
    /// Show configuration and queue size
    Status,
    /// Queue a value; VALUE is parsed as JSON, falling back to a plain string
    Store { key: String, value: String },
    /// Print the most recent value stored under KEY
    Get { key: String },
    /// Print every queued [key, value] pair
    List,
    /// Drop every pair stored under KEY
    Remove { key: String },
    /// Delete the whole queue
    Clear,
    /// Push queued records to the remote synchronizer
    Sync,
}

#[tokio::main]
async fn main() {
    init_logging("info");

    if let Err(err) = run(Cli::parse()).await {
        log_error!("{err:#}");
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let settings = SettingsStore::new(cli.settings)?;

    match cli.command {
        Command::Config {
            policy,
            clear_after_sync,
            storage_key,
        } => update_config(&settings, policy, clear_after_sync, storage_key),
        Command::Queue(command) => run_queue(settings, command).await,
    }
}

async fn run_queue(settings: SettingsStore, command: QueueCommand) -> Result<()> {
    let state = AppState::open(settings)?;
    let offline = &state.offline;

    match command {
        QueueCommand::Status => {
            let current = state.settings.current();
            println!("settings:        {}", state.settings.path().display());
            println!("database:        {}", state.db.path().display());
            println!("storage key:     {}", offline.storage_key());
            println!("duplicate keys:  {}", offline.duplicate_key_policy());
            println!("clear after sync: {}", current.clear_after_sync);
            println!("synchronizer:    {}", offline.synchronizer_name());
            println!("pending records: {}", offline.pending_count().await);
            println!("distinct keys:   {}", offline.keys().await.len());
            match state.db.get_kv_entry(offline.storage_key()).await? {
                Some(entry) => println!("last write:      {}", entry.updated_at.to_rfc3339()),
                None => println!("last write:      never"),
            }
            match offline.check_storage().await {
                Ok(_) => println!("storage health:  ok"),
                Err(err) => println!("storage health:  {err}"),
            }
        }
        QueueCommand::Store { key, value } => {
            let data = serde_json::from_str(&value).unwrap_or(Value::String(value));
            offline.store_offline_data(key, data).await?;
        }
        QueueCommand::Get { key } => match offline.get_offline_data(&key).await {
            Some(value) => println!("{}", serde_json::to_string_pretty(&value)?),
            None => bail!("no offline data for '{key}'"),
        },
        QueueCommand::List => {
            let records = offline.get_all_offline_data().await;
            println!("{}", serde_json::to_string_pretty(&records)?);
        }
        QueueCommand::Remove { key } => offline.remove_offline_data(&key).await?,
        QueueCommand::Clear => offline.clear_offline_data().await?,
        QueueCommand::Sync => {
            let report = offline.sync_offline_data().await?;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
    }

    Ok(())
}

fn update_config(
    settings: &SettingsStore,
    policy: Option<DuplicateKeyPolicy>,
    clear_after_sync: Option<bool>,
    storage_key: Option<String>,
) -> Result<()> {
    let mut updated = settings.current();
    if let Some(policy) = policy {
        updated.duplicate_key_policy = policy;
    }
    if let Some(clear_after_sync) = clear_after_sync {
        updated.clear_after_sync = clear_after_sync;
    }
    if let Some(storage_key) = storage_key {
        updated.storage_key = storage_key;
    }
    settings.update(updated.clone())?;
    println!("{}", serde_json::to_string_pretty(&updated)?);
    Ok(())
}
