use anyhow::{anyhow, Result};
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use pinlock_core::config::{load_config, save_config, LockConfig, StoreBackend};
use pinlock_core::kv::open_store;
use pinlock_core::paths::{data_dir, CONFIG_FILE_NAME};
use pinlock_core::{LockController, LockError, LockState, SecretStore};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

mod prompt;

use crate::prompt::{prompt_new_pin, prompt_pin};

#[derive(Parser, Debug)]
#[command(name = "pinlock")]
#[command(author, version, about = "Local PIN lock for the finance tracker", long_about = None)]
struct Cli {
    /// Data directory holding the config and the file-backed store
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Show lock state
    Status,

    /// Set a PIN when none is configured
    Set,

    /// Replace the PIN after entering the current one
    Change,

    /// Enter the PIN to unlock this session
    Unlock,

    /// Remove the PIN after entering it
    Remove,

    /// Replace the PIN after an external identity check
    Reset {
        /// Confirms the one-time-passcode check already succeeded
        #[arg(long)]
        identity_verified: bool,
    },

    /// Inspect or create the config file
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigAction {
    /// Print the effective config
    Show,

    /// Write a config file with defaults
    Init {
        /// Storage backend: file or keyring
        #[arg(long, value_parser = parse_backend)]
        backend: Option<StoreBackend>,

        /// Overwrite an existing config file
        #[arg(long)]
        force: bool,
    },
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct StatusReport {
    state: LockState,
    has_secret: bool,
    unlocked: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    last_updated: Option<DateTime<Utc>>,
    backend: StoreBackend,
    secret_key: String,
    data_dir: String,
}

fn parse_backend(value: &str) -> Result<StoreBackend, String> {
    match value.to_ascii_lowercase().as_str() {
        "file" => Ok(StoreBackend::File),
        "keyring" => Ok(StoreBackend::Keyring),
        "memory" => Err(
            "the memory backend forgets the PIN when pinlock exits; use file or keyring"
                .to_string(),
        ),
        other => Err(format!("unknown backend '{other}' (expected file or keyring)")),
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn save_failed(err: LockError) -> anyhow::Error {
    anyhow!("failed to save PIN, try again ({err})")
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();
    let data = match cli.data_dir {
        Some(dir) => dir,
        None => data_dir()?,
    };
    let config_path = data.join(CONFIG_FILE_NAME);
    tracing::debug!(data_dir = %data.display(), "using data directory");

    if let Commands::Config { action } = cli.command {
        return config_command(action, &config_path);
    }

    let config = load_config(&config_path)?;
    require_persistent(&config)?;
    let store = SecretStore::new(open_store(&config, &data), config.secret_key.clone());
    let lock = LockController::start(store).await;

    match cli.command {
        Commands::Status => {
            let report = StatusReport {
                state: lock.state().await,
                has_secret: lock.has_secret().await,
                unlocked: lock.is_unlocked(),
                last_updated: lock.store().last_updated().await,
                backend: config.backend,
                secret_key: config.secret_key.clone(),
                data_dir: data.display().to_string(),
            };
            println!("{}", serde_json::to_string_pretty(&report)?);
        }

        Commands::Set => {
            if lock.has_secret().await {
                return Err(anyhow!("a PIN is already set; use `change` or `reset`"));
            }
            let pin = prompt_new_pin("New PIN: ", &config.policy)?;
            lock.provision_secret(&pin, &config.policy)
                .await
                .map_err(save_failed)?;
            println!("PIN set");
        }

        Commands::Change => {
            require_secret(&lock).await?;
            let current = prompt_pin("Current PIN: ")?;
            let new = prompt_new_pin("New PIN: ", &config.policy)?;
            if !lock
                .change_secret(&current, &new)
                .await
                .map_err(save_failed)?
            {
                return Err(anyhow!("incorrect PIN"));
            }
            println!("PIN changed");
        }

        Commands::Unlock => {
            require_secret(&lock).await?;
            let pin = prompt_pin("PIN: ")?;
            if !lock.verify_secret(&pin).await {
                return Err(anyhow!("incorrect PIN"));
            }
            println!("unlocked");
        }

        Commands::Remove => {
            require_secret(&lock).await?;
            let pin = prompt_pin("Current PIN: ")?;
            if !lock.verify_secret(&pin).await {
                return Err(anyhow!("incorrect PIN"));
            }
            lock.remove_secret()
                .await
                .map_err(|err| anyhow!("failed to remove PIN, try again ({err})"))?;
            println!("PIN removed");
        }

        Commands::Reset { identity_verified } => {
            if !identity_verified {
                return Err(anyhow!(
                    "reset needs a completed identity check; rerun with --identity-verified"
                ));
            }
            let new = prompt_new_pin("New PIN: ", &config.policy)?;
            lock.reset_secret(&new).await.map_err(save_failed)?;
            println!("PIN reset");
        }

        Commands::Config { .. } => unreachable!("handled before the store is opened"),
    }

    Ok(())
}

fn require_persistent(config: &LockConfig) -> Result<()> {
    if config.backend.is_persistent() {
        Ok(())
    } else {
        Err(anyhow!(
            "backend {:?} does not outlive the process; set \"backend\" to \"file\" or \"keyring\"",
            config.backend
        ))
    }
}

async fn require_secret(lock: &LockController) -> Result<()> {
    if lock.has_secret().await {
        Ok(())
    } else {
        Err(anyhow!("no PIN is set"))
    }
}

fn config_command(action: ConfigAction, config_path: &Path) -> Result<()> {
    match action {
        ConfigAction::Show => {
            let config = load_config(config_path)?;
            println!("{}", serde_json::to_string_pretty(&config)?);
        }
        ConfigAction::Init { backend, force } => {
            if config_path.exists() && !force {
                return Err(anyhow!(
                    "config already exists at {}; pass --force to overwrite",
                    config_path.display()
                ));
            }
            let mut config = LockConfig::default();
            if let Some(backend) = backend {
                config.backend = backend;
            }
            require_persistent(&config)?;
            save_config(config_path, &config)?;
            println!("Config written to {}", config_path.display());
        }
    }
    Ok(())
}
