use anyhow::Result;
use clap::{Parser, Subcommand};

use encore::cli::{handle_backup_command, BackupCommands};
use encore::config::{EncorePaths, LogFormat, Settings};
use encore::storage::Storage;

#[derive(Parser)]
#[command(
    name = "encore",
    version,
    about = "Selective backup and restore for Encore player data",
    long_about = "Encore exports any subset of the player's local data (preferences, \
                  favorites, lyrics, search history, transitions) into a versioned \
                  snapshot file and restores any subset of a snapshot back."
)]
struct Cli {
    /// Diagnostic log format (pretty or json); overrides the settings file
    #[arg(long, global = true, env = "ENCORE_LOG_FORMAT")]
    log_format: Option<LogFormat>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    #[command(flatten)]
    Backup(BackupCommands),

    /// Show current configuration and paths
    Config,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize paths and settings
    let paths = EncorePaths::new()?;
    let settings = Settings::load_or_create(&paths)?;

    encore::logging::init(cli.log_format.unwrap_or(settings.log_format));

    // Initialize storage
    let storage = Storage::new(paths.clone())?;
    storage.load_all()?;

    match cli.command {
        Some(Commands::Backup(cmd)) => {
            handle_backup_command(&storage, &settings, cmd)?;
        }
        Some(Commands::Config) => {
            println!("Encore Configuration");
            println!("====================");
            println!("Base directory:   {}", paths.base_dir().display());
            println!("Data directory:   {}", paths.data_dir().display());
            println!("Backup directory: {}", paths.backup_dir().display());
            println!("Settings file:    {}", paths.settings_file().display());
            println!("Audit log:        {}", paths.audit_log().display());
            println!();
            println!("Settings:");
            println!("  Default sections:        {}", settings.default_selection().keys());
            println!("  Snapshots kept by prune: {}", settings.backup_keep);
            println!("  Log format:              {}", settings.log_format);
            println!(
                "  Archive before restore:  {}",
                settings.snapshot_before_restore
            );
        }
        None => {
            println!("Encore - selective backup and restore");
            println!();
            println!("Run 'encore --help' for usage information.");
            println!("Run 'encore export' to create a snapshot.");
        }
    }

    Ok(())
}
