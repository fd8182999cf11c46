use cryo_core::commands;
use cryo_core::config::CryoConfig;
use cryo_core::vault;

use crate::format::format_bytes;
use crate::passphrase::with_passphrase;

pub(crate) fn run(config: &CryoConfig, only: Option<&str>) -> Result<(), Box<dyn std::error::Error>> {
    let vault = vault::vault_from_config(&config.vault)?;

    with_passphrase(config, |passphrase| {
        let outcomes = commands::backup::run(config, vault.as_ref(), passphrase, only)?;

        if outcomes.is_empty() {
            eprintln!("No backup objects configured.");
            return Ok(());
        }
        for outcome in &outcomes {
            println!(
                "Archived '{}' as {} ({}{})",
                outcome.name,
                outcome.archive_id,
                format_bytes(outcome.uploaded_bytes),
                if outcome.encrypted { ", encrypted" } else { "" },
            );
        }
        Ok(())
    })
}
