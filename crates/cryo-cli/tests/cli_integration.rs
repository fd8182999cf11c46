use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use tempfile::TempDir;

struct CliFixture {
    tmp: TempDir,
    home_dir: PathBuf,
    vault_dir: PathBuf,
    state_dir: PathBuf,
    source: PathBuf,
    config_path: PathBuf,
}

impl CliFixture {
    fn new() -> Self {
        let tmp = tempfile::tempdir().unwrap();
        let home_dir = tmp.path().join("home");
        let vault_dir = tmp.path().join("vault");
        let state_dir = tmp.path().join("state");
        let source = tmp.path().join("source");

        std::fs::create_dir_all(&home_dir).unwrap();
        std::fs::create_dir_all(&source).unwrap();
        std::fs::write(source.join("alpha.txt"), b"alpha file\n").unwrap();

        let config_path = tmp.path().join("cryo.yaml");

        Self {
            tmp,
            home_dir,
            vault_dir,
            state_dir,
            source,
            config_path,
        }
    }

    fn write_config(&self, encrypted: bool) {
        let encryption = if encrypted { "encryption: {}\n" } else { "" };
        let config = format!(
            "vault:\n  name: testvault\n  url: {}\nstate_dir: {}\n{}backup_objects:\n  - name: docs\n    path: {}\n    encrypt: {}\n",
            yaml_quote_path(&self.vault_dir),
            yaml_quote_path(&self.state_dir),
            encryption,
            yaml_quote_path(&self.source),
            encrypted,
        );
        std::fs::write(&self.config_path, config).unwrap();
    }

    fn run(&self, args: &[&str]) -> Output {
        let mut cmd = Command::new(env!("CARGO_BIN_EXE_cryo"));
        cmd.args(args);
        cmd.current_dir(self.tmp.path());
        cmd.env("HOME", &self.home_dir);
        cmd.env("NO_COLOR", "1");
        cmd.env_remove("CRYO_CONFIG");
        cmd.env_remove("CRYO_PASSPHRASE");
        cmd.output().unwrap()
    }

    fn run_with_passphrase(&self, args: &[&str], passphrase: &str) -> Output {
        let mut cmd = Command::new(env!("CARGO_BIN_EXE_cryo"));
        cmd.args(args);
        cmd.current_dir(self.tmp.path());
        cmd.env("HOME", &self.home_dir);
        cmd.env("NO_COLOR", "1");
        cmd.env_remove("CRYO_CONFIG");
        cmd.env("CRYO_PASSPHRASE", passphrase);
        cmd.output().unwrap()
    }

    fn run_ok(&self, args: &[&str]) -> String {
        let output = self.run(args);
        if !output.status.success() {
            panic!(
                "command failed: {:?}\nstdout:\n{}\nstderr:\n{}",
                args,
                stdout(&output),
                stderr(&output)
            );
        }
        stdout(&output)
    }

    fn run_err(&self, args: &[&str]) -> String {
        let output = self.run(args);
        assert!(
            !output.status.success(),
            "command unexpectedly succeeded: {:?}\nstdout:\n{}",
            args,
            stdout(&output),
        );
        stderr(&output)
    }

    fn config_flag(&self) -> String {
        self.config_path.to_string_lossy().to_string()
    }
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).to_string()
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).to_string()
}

fn yaml_quote_path(path: &Path) -> String {
    let raw = path.to_string_lossy();
    format!("\"{}\"", raw.replace('\\', "\\\\").replace('"', "\\\""))
}

fn parse_archive_id(output: &str) -> String {
    output
        .lines()
        .find_map(|line| line.strip_prefix("Archived 'docs' as "))
        .and_then(|rest| rest.split_whitespace().next())
        .map(str::to_string)
        .unwrap_or_else(|| panic!("missing archive id in output:\n{output}"))
}

#[test]
fn cli_backup_list_get_roundtrip() {
    let fx = CliFixture::new();
    fx.write_config(false);
    let cfg = fx.config_flag();

    let backup_out = fx.run_ok(&["--config", &cfg, "backup"]);
    let archive_id = parse_archive_id(&backup_out);

    let list_out = fx.run_ok(&["--config", &cfg, "list"]);
    assert!(list_out.contains("docs"), "{list_out}");
    assert!(list_out.contains(&archive_id), "{list_out}");

    let restore = fx.tmp.path().join("restored");
    let restore_str = restore.to_string_lossy().to_string();
    let get_out = fx.run_ok(&["--config", &cfg, "get", "docs", &restore_str]);
    assert!(get_out.contains("Restored 'docs'"), "{get_out}");

    assert_eq!(
        std::fs::read_to_string(restore.join("source").join("alpha.txt")).unwrap(),
        "alpha file\n"
    );
}

#[test]
fn cli_get_refuses_to_overwrite_without_flag() {
    let fx = CliFixture::new();
    fx.write_config(false);
    let cfg = fx.config_flag();
    fx.run_ok(&["--config", &cfg, "backup"]);

    let restore = fx.tmp.path().join("restored");
    let restore_str = restore.to_string_lossy().to_string();
    fx.run_ok(&["--config", &cfg, "get", "docs", &restore_str]);

    let err = fx.run_err(&["--config", &cfg, "get", "docs", &restore_str]);
    assert!(err.contains("overwrite"), "{err}");

    fx.run_ok(&["--config", &cfg, "get", "docs", &restore_str, "--overwrite"]);
}

#[test]
fn cli_encrypted_roundtrip_with_env_passphrase() {
    let fx = CliFixture::new();
    fx.write_config(true);
    let cfg = fx.config_flag();

    let backup_out = fx.run_with_passphrase(&["--config", &cfg, "backup"], "testkeyblubb");
    assert!(backup_out.status.success(), "{}", stderr(&backup_out));
    assert!(stdout(&backup_out).contains("encrypted"));

    let restore = fx.tmp.path().join("restored");
    let restore_str = restore.to_string_lossy().to_string();
    let get_out = fx.run_with_passphrase(
        &["--config", &cfg, "get", "docs", &restore_str],
        "testkeyblubb",
    );
    assert!(get_out.status.success(), "{}", stderr(&get_out));

    assert_eq!(
        std::fs::read_to_string(restore.join("source").join("alpha.txt")).unwrap(),
        "alpha file\n"
    );
}

#[test]
fn cli_backuponce_rejects_unknown_object() {
    let fx = CliFixture::new();
    fx.write_config(false);
    let cfg = fx.config_flag();

    let err = fx.run_err(&["--config", &cfg, "backuponce", "nope"]);
    assert!(err.contains("nope"), "{err}");
}

#[test]
fn cli_fails_without_a_config_file() {
    let fx = CliFixture::new();
    let err = fx.run_err(&["list"]);
    assert!(err.contains("no configuration file found"), "{err}");
    assert!(err.contains("cryo config"), "{err}");
}

#[test]
fn cli_config_writes_a_starter_file_once() {
    let fx = CliFixture::new();
    let dest = fx.tmp.path().join("generated.yaml");
    let dest_str = dest.to_string_lossy().to_string();

    let out = fx.run_ok(&["config", &dest_str]);
    assert!(out.contains("Config written to:"), "{out}");
    let written = std::fs::read_to_string(&dest).unwrap();
    assert!(written.contains("vault:"), "{written}");

    let err = fx.run_err(&["config", &dest_str]);
    assert!(err.contains("already exists"), "{err}");
}
