mod cli;
mod cmd;
mod config_gen;
mod format;
mod passphrase;
mod prompt;
mod table;

use clap::Parser;

use cryo_core::config;

use cli::{Cli, Commands};

fn main() {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    // `config` needs no config file; handle it before resolution.
    if let Commands::Config { dest } = &cli.command {
        if let Err(e) = config_gen::run(dest.as_deref()) {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
        return;
    }

    let source = match config::resolve_config_path(cli.config.as_deref()) {
        Some(path) => path,
        None => {
            eprintln!("Error: no configuration file found.");
            eprintln!("Searched:");
            for path in config::default_config_search_paths() {
                eprintln!("  {}", path.display());
            }
            eprintln!();
            eprintln!("Run `cryo config` to generate a starter config file.");
            std::process::exit(1);
        }
    };

    tracing::info!("Using config: {}", source.display());

    let cfg = match config::load_config(&source) {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    };

    let result = match &cli.command {
        Commands::Backup => cmd::backup::run(&cfg, None),
        Commands::Backuponce { name } => cmd::backup::run(&cfg, Some(name)),
        Commands::Get {
            name,
            dest,
            overwrite,
            wait,
            id,
        } => cmd::get::run(&cfg, name, dest, *overwrite, *wait, id.as_deref()),
        Commands::List { name } => cmd::list::run(&cfg, name.as_deref()),
        Commands::Config { .. } => Ok(()), // handled above
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
