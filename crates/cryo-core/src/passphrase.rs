//! Passphrase sources that do not require a terminal.

use std::process::Command;

use zeroize::{Zeroize, Zeroizing};

use crate::config::CryoConfig;
use crate::error::{CryoError, Result};

/// Resolve the passphrase from configuration or environment, in order:
/// `encryption.passphrase`, `encryption.passcommand` stdout, then the
/// `CRYO_PASSPHRASE` variable. Returns `None` when nothing is configured;
/// an interactive caller may still prompt.
pub fn configured_passphrase(config: &CryoConfig) -> Result<Option<Zeroizing<String>>> {
    let Some(ref encryption) = config.encryption else {
        return Ok(None);
    };

    if let Some(ref p) = encryption.passphrase {
        return Ok(Some(Zeroizing::new(p.clone())));
    }

    if let Some(ref cmd) = encryption.passcommand {
        let output = run_passcommand(cmd)?;
        if !output.status.success() {
            return Err(CryoError::Config(format!(
                "passcommand failed: {}",
                String::from_utf8_lossy(&output.stderr)
            )));
        }
        let mut raw = String::from_utf8(output.stdout)
            .map_err(|e| CryoError::Config(format!("passcommand output is not UTF-8: {e}")))?;
        let pass = Zeroizing::new(raw.trim().to_string());
        raw.zeroize();

        if pass.is_empty() {
            return Err(CryoError::Config(
                "passcommand returned an empty passphrase".into(),
            ));
        }
        return Ok(Some(pass));
    }

    if let Ok(pass) = std::env::var("CRYO_PASSPHRASE") {
        if !pass.is_empty() {
            return Ok(Some(Zeroizing::new(pass)));
        }
    }

    Ok(None)
}

#[cfg(unix)]
fn run_passcommand(cmd: &str) -> Result<std::process::Output> {
    Command::new("sh")
        .arg("-c")
        .arg(cmd)
        .output()
        .map_err(CryoError::Io)
}

#[cfg(not(unix))]
fn run_passcommand(cmd: &str) -> Result<std::process::Output> {
    Command::new("cmd")
        .arg("/C")
        .arg(cmd)
        .output()
        .map_err(CryoError::Io)
}
