//! Catalog inventory listing.

use std::collections::BTreeMap;

use crate::catalog::{ArchiveVersion, Catalog};
use crate::config::CryoConfig;
use crate::error::Result;

/// All catalogued backup objects and their versions.
pub fn run(config: &CryoConfig) -> Result<BTreeMap<String, BTreeMap<String, ArchiveVersion>>> {
    Catalog::new(config.catalog_path()).all()
}

/// All versions of one backup object. Empty if the name is unknown.
pub fn versions(config: &CryoConfig, name: &str) -> Result<BTreeMap<String, ArchiveVersion>> {
    Catalog::new(config.catalog_path()).versions(name)
}
