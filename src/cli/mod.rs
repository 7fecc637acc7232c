use std::env;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use once_cell::sync::OnceCell;
use tracing_subscriber::{fmt, EnvFilter};

use crate::config::{AppConfig, ConfigLoader, StorageBackend};
use crate::storage;
use crate::store::NoteStore;

pub mod commands;

use self::commands::{AddArgs, DeleteArgs, EditArgs, ShowArgs};

#[derive(Parser, Debug)]
#[command(
    name = "pnotes",
    version,
    about = "Free and preaching notes kept in local storage"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Override the config file location (takes precedence over PNOTES_CONFIG)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Override the data directory (takes precedence over PNOTES_DATA)
    #[arg(long)]
    pub data_dir: Option<PathBuf>,

    /// Keep notes in memory for this run only
    #[arg(long)]
    pub ephemeral: bool,

    /// Minimum log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "warn")]
    pub log_level: String,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Show every note in stored order (default)
    List,
    /// Print one note by its list position
    Show(ShowArgs),
    /// Create a free or preaching note
    Add(AddArgs),
    /// Change fields of the note at a list position
    Edit(EditArgs),
    /// Remove the note at a list position
    Delete(DeleteArgs),
    /// List the card colors
    Palette,
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();

    if let Some(path) = &cli.config {
        env::set_var("PNOTES_CONFIG", path);
    }
    if let Some(path) = &cli.data_dir {
        env::set_var("PNOTES_DATA", path);
    }

    init_tracing(&cli.log_level)
        .with_context(|| format!("initialising logging at level {}", cli.log_level))?;
    let loader = ConfigLoader::discover()?;
    let paths = loader.paths().clone();
    let mut config = loader.load_or_init()?;
    if cli.ephemeral {
        config.storage.backend = StorageBackend::Memory;
    }
    let kv = storage::init(&paths, &config.storage)?;
    let store = NoteStore::with_key(kv, config.storage.key.clone());

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("starting async runtime")?;
    let command = cli.command.unwrap_or(Commands::List);
    let output = runtime.block_on(dispatch(&config, &store, command))?;
    print!("{output}");
    Ok(())
}

async fn dispatch(config: &AppConfig, store: &NoteStore, command: Commands) -> Result<String> {
    match command {
        Commands::List => commands::list_notes(config, store).await,
        Commands::Show(args) => commands::show_note(store, args).await,
        Commands::Add(args) => commands::add_note(store, args).await,
        Commands::Edit(args) => commands::edit_note(store, args).await,
        Commands::Delete(args) => commands::delete_note(store, args).await,
        Commands::Palette => Ok(commands::palette()),
    }
}

fn init_tracing(level: &str) -> Result<()> {
    static INIT: OnceCell<()> = OnceCell::new();
    INIT.get_or_try_init(|| {
        let env_filter = EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new("warn"));
        fmt()
            .with_env_filter(env_filter)
            .with_writer(std::io::stderr)
            .init();
        Ok(())
    })
    .map(|_| ())
}
