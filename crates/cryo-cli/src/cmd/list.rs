use std::collections::BTreeMap;

use cryo_core::catalog::ArchiveVersion;
use cryo_core::commands;
use cryo_core::config::CryoConfig;

use crate::table::CliTableTheme;

pub(crate) fn run(config: &CryoConfig, name: Option<&str>) -> Result<(), Box<dyn std::error::Error>> {
    let objects = match name {
        Some(n) => {
            let versions = commands::list::versions(config, n)?;
            let mut map = BTreeMap::new();
            if !versions.is_empty() {
                map.insert(n.to_string(), versions);
            }
            map
        }
        None => commands::list::run(config)?,
    };

    if objects.is_empty() {
        match name {
            Some(n) => println!("No archives recorded for '{n}'."),
            None => println!("No archives recorded yet."),
        }
        return Ok(());
    }

    let theme = CliTableTheme::detect();
    let mut table = theme.new_data_table(&["NAME", "ARCHIVE ID", "CREATED", "ENCRYPTED"]);
    for (object_name, versions) in &objects {
        let mut rows: Vec<&ArchiveVersion> = versions.values().collect();
        // Newest first within each object.
        rows.sort_by(|a, b| {
            (b.created_at, b.archive_id.as_str()).cmp(&(a.created_at, a.archive_id.as_str()))
        });
        for version in rows {
            table.add_row(vec![
                object_name.clone(),
                version.archive_id.clone(),
                version.created_at.format("%Y-%m-%d %H:%M:%S").to_string(),
                if version.encrypted { "yes" } else { "no" }.to_string(),
            ]);
        }
    }
    println!("{table}");
    Ok(())
}
