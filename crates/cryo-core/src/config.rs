//! Configuration loading and validation.
//!
//! The config file is YAML. All validation happens once at load time, so
//! every failure here surfaces before any vault traffic.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{CryoError, Result};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CryoConfig {
    pub vault: VaultConfig,
    /// Directory for the catalog and the job ledger. Default: `~/.cryo`.
    #[serde(default)]
    pub state_dir: Option<String>,
    /// Required whenever any backup object sets `encrypt: true`.
    #[serde(default)]
    pub encryption: Option<EncryptionConfig>,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    #[serde(default)]
    pub backup_objects: Vec<BackupEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VaultConfig {
    /// Display label for the vault.
    pub name: String,
    /// Backend location: a bare path or a `file://` URL.
    pub url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EncryptionConfig {
    #[serde(default)]
    pub passphrase: Option<String>,
    /// Command whose stdout (trimmed) is the passphrase.
    #[serde(default)]
    pub passcommand: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalConfig {
    /// How long to sleep between job polls when waiting (`90s`, `10m`, `1h`).
    #[serde(default = "default_poll_interval")]
    pub poll_interval: String,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            poll_interval: default_poll_interval(),
        }
    }
}

impl RetrievalConfig {
    pub fn poll_interval_duration(&self) -> Result<Duration> {
        parse_poll_interval(&self.poll_interval)
    }
}

/// One configured backup object. The option set is closed: unknown keys
/// are a load-time error, not silently ignored.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BackupEntry {
    /// Identity key: the logical name archives are catalogued under.
    pub name: String,
    /// Source location to bundle and upload.
    pub path: String,
    #[serde(default)]
    pub encrypt: bool,
    /// Append the upload date to the archive description.
    #[serde(default = "default_add_date")]
    pub add_date: bool,
}

fn default_add_date() -> bool {
    true
}

fn default_poll_interval() -> String {
    "10m".to_string()
}

/// Parse and validate a config document.
pub fn parse_config(contents: &str) -> Result<CryoConfig> {
    let config: CryoConfig = serde_yaml::from_str(contents)
        .map_err(|e| CryoError::Config(format!("invalid configuration: {e}")))?;
    validate(&config)?;
    Ok(config)
}

/// Load and validate the config file at `path`.
pub fn load_config(path: &Path) -> Result<CryoConfig> {
    let contents = std::fs::read_to_string(path).map_err(|e| {
        CryoError::Config(format!("cannot read config '{}': {e}", path.display()))
    })?;
    parse_config(&contents)
        .map_err(|e| CryoError::Config(format!("{}: {e}", path.display())))
}

fn validate(config: &CryoConfig) -> Result<()> {
    if config.vault.name.trim().is_empty() {
        return Err(CryoError::Config("vault.name must not be empty".into()));
    }
    if config.vault.url.trim().is_empty() {
        return Err(CryoError::Config("vault.url must not be empty".into()));
    }

    let mut seen = BTreeSet::new();
    for entry in &config.backup_objects {
        if entry.name.trim().is_empty() {
            return Err(CryoError::Config(
                "backup object with an empty name".into(),
            ));
        }
        if entry.path.trim().is_empty() {
            return Err(CryoError::Config(format!(
                "backup object '{}' has an empty path",
                entry.name
            )));
        }
        if !seen.insert(entry.name.as_str()) {
            return Err(CryoError::Config(format!(
                "duplicate backup object name '{}'",
                entry.name
            )));
        }
        if entry.encrypt && config.encryption.is_none() {
            return Err(CryoError::Config(format!(
                "backup object '{}' enables encryption but the config has no encryption section",
                entry.name
            )));
        }
    }

    config.retrieval.poll_interval_duration()?;
    Ok(())
}

impl CryoConfig {
    pub fn state_dir_path(&self) -> PathBuf {
        match self.state_dir {
            Some(ref dir) => PathBuf::from(expand_tilde(dir)),
            None => home_dir()
                .map(|h| h.join(".cryo"))
                .unwrap_or_else(|| PathBuf::from(".cryo")),
        }
    }

    pub fn catalog_path(&self) -> PathBuf {
        self.state_dir_path().join("catalog.db")
    }

    pub fn jobs_path(&self) -> PathBuf {
        self.state_dir_path().join("jobs.db")
    }

    pub fn entry(&self, name: &str) -> Option<&BackupEntry> {
        self.backup_objects.iter().find(|e| e.name == name)
    }
}

/// Parse a poll interval like `90s`, `10m`, or `1h`. A plain number means
/// seconds.
pub fn parse_poll_interval(raw: &str) -> Result<Duration> {
    let input = raw.trim();
    let (num_part, unit) = match input.chars().last() {
        Some(c) if c.is_ascii_alphabetic() => (&input[..input.len() - 1], Some(c)),
        Some(_) => (input, None),
        None => {
            return Err(CryoError::Config(
                "poll interval must not be empty".into(),
            ));
        }
    };

    let value: u64 = num_part
        .parse()
        .map_err(|_| CryoError::Config(format!("invalid poll interval: '{raw}'")))?;

    let secs = match unit {
        Some('s') | Some('S') | None => value,
        Some('m') | Some('M') => value.saturating_mul(60),
        Some('h') | Some('H') => value.saturating_mul(60 * 60),
        Some(other) => {
            return Err(CryoError::Config(format!(
                "unsupported poll interval suffix '{other}' in '{raw}' (use s/m/h)"
            )));
        }
    };

    if secs == 0 {
        return Err(CryoError::Config(
            "poll interval must be greater than zero".into(),
        ));
    }

    Ok(Duration::from_secs(secs))
}

/// Expand a leading `~` to the user's home directory.
pub fn expand_tilde(path: &str) -> String {
    if path == "~" {
        if let Some(home) = home_dir() {
            return home.to_string_lossy().into_owned();
        }
    }
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = home_dir() {
            return home.join(rest).to_string_lossy().into_owned();
        }
    }
    path.to_string()
}

/// Locate the configuration file: explicit flag, then `CRYO_CONFIG`, then
/// the default search paths.
pub fn resolve_config_path(flag: Option<&str>) -> Option<PathBuf> {
    if let Some(path) = flag {
        return Some(PathBuf::from(expand_tilde(path)));
    }
    if let Some(path) = std::env::var_os("CRYO_CONFIG").filter(|v| !v.is_empty()) {
        return Some(PathBuf::from(path));
    }
    default_config_search_paths().into_iter().find(|p| p.is_file())
}

pub fn default_config_search_paths() -> Vec<PathBuf> {
    let mut paths = vec![PathBuf::from("cryo.yaml")];
    if let Some(dir) = config_dir() {
        paths.push(dir.join("cryo").join("config.yaml"));
    }
    paths
}

pub fn minimal_config_template() -> &'static str {
    r#"# cryo configuration file
# Minimal required configuration.

vault:
  name: myvault
  url: /path/to/vault

backup_objects:
  - name: documents
    path: ~/Documents

# --- Common optional settings (uncomment as needed) ---

# state_dir: ~/.cryo
#
# encryption:
#   passphrase: "secret"
#   # or have a command print it:
#   # passcommand: "pass show cryo"
#
# retrieval:
#   poll_interval: 10m
#
# Per backup object:
#   encrypt: true        # seal the archive with the passphrase
#   add_date: false      # drop the upload date from the description
"#
}

fn home_dir() -> Option<PathBuf> {
    #[cfg(unix)]
    let var = "HOME";
    #[cfg(not(unix))]
    let var = "USERPROFILE";
    std::env::var_os(var)
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
}

fn config_dir() -> Option<PathBuf> {
    std::env::var_os("XDG_CONFIG_HOME")
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
        .filter(|p| p.is_absolute())
        .or_else(|| home_dir().map(|h| h.join(".config")))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn minimal_yaml() -> &'static str {
        "\
vault:
  name: myvault
  url: /tmp/vault
backup_objects:
  - name: docs
    path: /home/user/documents
"
    }

    #[test]
    fn parses_minimal_config_with_defaults() {
        let config = parse_config(minimal_yaml()).unwrap();
        assert_eq!(config.vault.name, "myvault");
        assert_eq!(config.backup_objects.len(), 1);

        let entry = &config.backup_objects[0];
        assert!(!entry.encrypt);
        assert!(entry.add_date);
        assert_eq!(config.retrieval.poll_interval, "10m");
        assert_eq!(
            config.retrieval.poll_interval_duration().unwrap(),
            Duration::from_secs(600)
        );
    }

    #[test]
    fn rejects_unknown_backup_object_keys() {
        let yaml = "\
vault:
  name: myvault
  url: /tmp/vault
backup_objects:
  - name: docs
    path: /home/user/documents
    is_folder: true
";
        let err = parse_config(yaml).unwrap_err();
        assert!(matches!(err, CryoError::Config(_)), "{err}");
    }

    #[test]
    fn rejects_encrypt_without_encryption_section() {
        let yaml = "\
vault:
  name: myvault
  url: /tmp/vault
backup_objects:
  - name: docs
    path: /home/user/documents
    encrypt: true
";
        let err = parse_config(yaml).unwrap_err();
        assert!(err.to_string().contains("encryption"), "{err}");
    }

    #[test]
    fn accepts_encrypt_with_encryption_section() {
        let yaml = "\
vault:
  name: myvault
  url: /tmp/vault
encryption:
  passphrase: hunter2
backup_objects:
  - name: docs
    path: /home/user/documents
    encrypt: true
";
        let config = parse_config(yaml).unwrap();
        assert!(config.backup_objects[0].encrypt);
    }

    #[test]
    fn rejects_duplicate_object_names() {
        let yaml = "\
vault:
  name: myvault
  url: /tmp/vault
backup_objects:
  - name: docs
    path: /a
  - name: docs
    path: /b
";
        let err = parse_config(yaml).unwrap_err();
        assert!(err.to_string().contains("duplicate"), "{err}");
    }

    #[test]
    fn rejects_empty_vault_url() {
        let yaml = "\
vault:
  name: myvault
  url: \"\"
";
        assert!(parse_config(yaml).is_err());
    }

    #[test]
    fn poll_interval_units() {
        assert_eq!(parse_poll_interval("90s").unwrap(), Duration::from_secs(90));
        assert_eq!(parse_poll_interval("10m").unwrap(), Duration::from_secs(600));
        assert_eq!(parse_poll_interval("1h").unwrap(), Duration::from_secs(3600));
        assert_eq!(parse_poll_interval("45").unwrap(), Duration::from_secs(45));
    }

    #[test]
    fn poll_interval_rejects_invalid_values() {
        assert!(parse_poll_interval("").is_err());
        assert!(parse_poll_interval("0m").is_err());
        assert!(parse_poll_interval("5w").is_err());
        assert!(parse_poll_interval("fast").is_err());
    }

    #[test]
    fn entry_lookup_by_name() {
        let config = parse_config(minimal_yaml()).unwrap();
        assert!(config.entry("docs").is_some());
        assert!(config.entry("nope").is_none());
    }

    #[test]
    fn state_paths_derive_from_state_dir() {
        let yaml = "\
vault:
  name: myvault
  url: /tmp/vault
state_dir: /var/lib/cryo
";
        let config = parse_config(yaml).unwrap();
        assert_eq!(config.catalog_path(), PathBuf::from("/var/lib/cryo/catalog.db"));
        assert_eq!(config.jobs_path(), PathBuf::from("/var/lib/cryo/jobs.db"));
    }

    #[test]
    fn starter_template_parses_and_validates() {
        let config = parse_config(minimal_config_template()).unwrap();
        assert_eq!(config.vault.url, "/path/to/vault");
        assert_eq!(config.backup_objects.len(), 1);
        assert!(!config.backup_objects[0].encrypt);
    }

    #[test]
    fn expand_tilde_leaves_plain_paths_alone() {
        assert_eq!(expand_tilde("/opt/data"), "/opt/data");
        assert_eq!(expand_tilde("relative/dir"), "relative/dir");
    }
}
