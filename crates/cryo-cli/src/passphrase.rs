use zeroize::Zeroizing;

use cryo_core::config::CryoConfig;

use crate::prompt::prompt_hidden;

/// Resolve the passphrase and run `action` with it.
///
/// Non-interactive sources (config, passcommand, environment) are tried
/// first; an interactive hidden prompt is the last resort. Nothing is
/// prompted when the config has no encryption section.
pub(crate) fn with_passphrase<T>(
    config: &CryoConfig,
    action: impl FnOnce(Option<&str>) -> Result<T, Box<dyn std::error::Error>>,
) -> Result<T, Box<dyn std::error::Error>> {
    let passphrase = resolve(config)?;
    action(passphrase.as_ref().map(|p| p.as_str()))
}

fn resolve(config: &CryoConfig) -> Result<Option<Zeroizing<String>>, Box<dyn std::error::Error>> {
    if config.encryption.is_none() {
        return Ok(None);
    }

    if let Some(pass) = cryo_core::passphrase::configured_passphrase(config)? {
        return Ok(Some(pass));
    }

    let prompt = format!("Enter passphrase for vault '{}': ", config.vault.name);
    let pass = Zeroizing::new(prompt_hidden(&prompt)?);
    Ok(Some(pass))
}
