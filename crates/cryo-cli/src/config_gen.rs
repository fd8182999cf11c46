use cryo_core::config;

/// `cryo config`: print a starter config to stdout, or write it to `dest`.
pub(crate) fn run(dest: Option<&str>) -> Result<(), Box<dyn std::error::Error>> {
    let Some(dest) = dest else {
        print!("{}", config::minimal_config_template());
        return Ok(());
    };

    let path = std::path::PathBuf::from(config::expand_tilde(dest));
    if path.exists() {
        return Err(format!("file already exists: {}", path.display()).into());
    }

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            std::fs::create_dir_all(parent)?;
        }
    }

    std::fs::write(&path, config::minimal_config_template())?;
    println!("Config written to: {}", path.display());
    println!("Edit it to set your vault location and backup objects.");
    Ok(())
}
