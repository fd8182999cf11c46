use cryo_core::commands::{self, restore::RestoreRequest};
use cryo_core::config::CryoConfig;
use cryo_core::error::CryoError;
use cryo_core::vault;

use crate::passphrase::with_passphrase;

pub(crate) fn run(
    config: &CryoConfig,
    name: &str,
    dest: &str,
    overwrite: bool,
    wait: bool,
    id_prefix: Option<&str>,
) -> Result<(), Box<dyn std::error::Error>> {
    let vault = vault::vault_from_config(&config.vault)?;

    with_passphrase(config, |passphrase| {
        let stats = match commands::restore::run(
            config,
            vault.as_ref(),
            RestoreRequest {
                name,
                dest,
                overwrite,
                wait,
                archive_id_prefix: id_prefix,
                passphrase,
            },
        ) {
            Ok(stats) => stats,
            Err(e @ CryoError::RetrievalNotReady { .. }) => {
                eprintln!("Retrieval is still running; cold-storage jobs can take hours.");
                eprintln!("Re-run `cryo get` later, or pass --wait to block until it is ready.");
                return Err(e.into());
            }
            Err(e) => return Err(e.into()),
        };

        println!(
            "Restored '{name}' from archive {} ({} entries) into {dest}",
            stats.archive_id, stats.entries,
        );
        Ok(())
    })
}
