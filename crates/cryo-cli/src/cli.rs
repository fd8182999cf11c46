use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "cryo",
    version,
    about = "Archive backups to a cold-storage vault, encrypted and versioned",
    after_help = "\
Configuration file lookup order:
  1. --config <path>        (explicit flag)
  2. $CRYO_CONFIG           (environment variable)
  3. ./cryo.yaml            (working directory)
  4. $XDG_CONFIG_HOME/cryo/config.yaml (or ~/.config/cryo/config.yaml)

Environment variables:
  CRYO_CONFIG       Path to configuration file (overrides default search)
  CRYO_PASSPHRASE   Encryption passphrase (skips interactive prompt)"
)]
pub(crate) struct Cli {
    /// Path to configuration file (overrides CRYO_CONFIG and default search)
    #[arg(short, long)]
    pub config: Option<String>,

    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub(crate) enum Commands {
    /// Upload every configured backup object as a new archive version
    Backup,

    /// Upload a single configured backup object
    Backuponce {
        /// Backup object name (as configured)
        name: String,
    },

    /// Retrieve the latest version of a backup object
    Get {
        /// Backup object name (as configured)
        name: String,

        /// Destination directory to extract into
        dest: String,

        /// Overwrite existing files at the destination
        #[arg(short = 'f', long)]
        overwrite: bool,

        /// Block until the vault's retrieval job completes
        #[arg(short, long)]
        wait: bool,

        /// Narrow version resolution to archive ids with this prefix
        #[arg(long)]
        id: Option<String>,
    },

    /// List catalogued archive versions
    List {
        /// Show only this backup object's versions
        name: Option<String>,
    },

    /// Generate a starter configuration file
    Config {
        /// Write to this path instead of stdout
        dest: Option<String>,
    },
}
