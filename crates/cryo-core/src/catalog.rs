//! Durable catalog of uploaded archive versions.
//!
//! The catalog is the only place logical names resolve to vault archive
//! ids. It lives in a single MessagePack file; every mutation is one
//! load-modify-rename cycle, so a crash can lose at most the operation in
//! flight and never leaves a torn record behind.

use std::collections::BTreeMap;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{CryoError, Result};
use crate::store::atomic_write;

const CATALOG_FORMAT_VERSION: u32 = 1;

/// One uploaded snapshot of a logical backup object.
///
/// Created once when an upload completes and immutable afterwards. The
/// `encrypted` flag recorded here is the single source of truth for
/// whether retrieval must decrypt; the payload is never inspected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArchiveVersion {
    pub name: String,
    pub archive_id: String,
    pub created_at: DateTime<Utc>,
    pub encrypted: bool,
}

#[derive(Debug, Serialize, Deserialize)]
struct CatalogDocument {
    version: u32,
    objects: BTreeMap<String, BTreeMap<String, ArchiveVersion>>,
}

impl CatalogDocument {
    fn empty() -> Self {
        Self {
            version: CATALOG_FORMAT_VERSION,
            objects: BTreeMap::new(),
        }
    }
}

/// Handle to the on-disk catalog.
///
/// Holds only the file path: the store is opened and closed per call
/// rather than kept open, trading throughput for crash-safety across
/// process invocations. Concurrent processes sharing one catalog file are
/// not supported.
#[derive(Debug, Clone)]
pub struct Catalog {
    path: PathBuf,
}

impl Catalog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Insert a version record. Idempotent by archive id: re-recording an
    /// id replaces its own metadata and never touches another record.
    pub fn record_version(&self, version: &ArchiveVersion) -> Result<()> {
        let mut doc = self.load()?;
        doc.objects
            .entry(version.name.clone())
            .or_default()
            .insert(version.archive_id.clone(), version.clone());
        self.save(&doc)
    }

    /// All known versions of `name`, keyed by archive id. Empty if the
    /// name was never backed up.
    pub fn versions(&self, name: &str) -> Result<BTreeMap<String, ArchiveVersion>> {
        Ok(self.load()?.objects.get(name).cloned().unwrap_or_default())
    }

    /// The full catalog, for inventory listing.
    pub fn all(&self) -> Result<BTreeMap<String, BTreeMap<String, ArchiveVersion>>> {
        Ok(self.load()?.objects)
    }

    /// Resolve the most recent version of `name`, optionally narrowed to
    /// archive ids starting with `id_prefix`.
    ///
    /// Versions are ordered by `(created_at, archive_id)`; the id breaks
    /// timestamp ties deterministically.
    pub fn resolve_latest(&self, name: &str, id_prefix: Option<&str>) -> Result<ArchiveVersion> {
        self.versions(name)?
            .into_values()
            .filter(|v| id_prefix.is_none_or(|p| v.archive_id.starts_with(p)))
            .max_by(|a, b| {
                (a.created_at, a.archive_id.as_str()).cmp(&(b.created_at, b.archive_id.as_str()))
            })
            .ok_or_else(|| CryoError::ArchiveNotFound(name.to_string()))
    }

    fn load(&self) -> Result<CatalogDocument> {
        match std::fs::read(&self.path) {
            Ok(bytes) => Ok(rmp_serde::from_slice(&bytes)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(CatalogDocument::empty()),
            Err(e) => Err(e.into()),
        }
    }

    fn save(&self, doc: &CatalogDocument) -> Result<()> {
        atomic_write(&self.path, &rmp_serde::to_vec(doc)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tempfile::tempdir;

    fn version(name: &str, id: &str, year: i32) -> ArchiveVersion {
        ArchiveVersion {
            name: name.to_string(),
            archive_id: id.to_string(),
            created_at: Utc.with_ymd_and_hms(year, 6, 1, 12, 0, 0).unwrap(),
            encrypted: false,
        }
    }

    fn catalog_in(dir: &tempfile::TempDir) -> Catalog {
        Catalog::new(dir.path().join("catalog.db"))
    }

    #[test]
    fn record_then_resolve_single_version() {
        let tmp = tempdir().unwrap();
        let catalog = catalog_in(&tmp);
        let v = version("docs", "arch-1", 2014);

        catalog.record_version(&v).unwrap();
        assert_eq!(catalog.resolve_latest("docs", None).unwrap(), v);
    }

    #[test]
    fn resolve_latest_prefers_newest_timestamp() {
        let tmp = tempdir().unwrap();
        let catalog = catalog_in(&tmp);
        // The newest version deliberately carries the lexicographically
        // smallest id, so only the timestamp can make it win.
        for (id, year) in [("d", 2011), ("c", 2012), ("b", 2013), ("a", 2014)] {
            catalog.record_version(&version("docs", id, year)).unwrap();
        }

        let latest = catalog.resolve_latest("docs", None).unwrap();
        assert_eq!(latest.archive_id, "a");
        assert_eq!(latest.created_at.format("%Y").to_string(), "2014");
    }

    #[test]
    fn equal_timestamps_tie_break_on_archive_id() {
        let tmp = tempdir().unwrap();
        let catalog = catalog_in(&tmp);
        catalog.record_version(&version("docs", "aaa", 2014)).unwrap();
        catalog.record_version(&version("docs", "zzz", 2014)).unwrap();

        assert_eq!(catalog.resolve_latest("docs", None).unwrap().archive_id, "zzz");
    }

    #[test]
    fn id_prefix_narrows_resolution() {
        let tmp = tempdir().unwrap();
        let catalog = catalog_in(&tmp);
        catalog.record_version(&version("docs", "aa-1", 2013)).unwrap();
        catalog.record_version(&version("docs", "bb-2", 2014)).unwrap();

        let picked = catalog.resolve_latest("docs", Some("aa")).unwrap();
        assert_eq!(picked.archive_id, "aa-1");

        let err = catalog.resolve_latest("docs", Some("cc")).unwrap_err();
        assert!(matches!(err, CryoError::ArchiveNotFound(_)));
    }

    #[test]
    fn unknown_name_is_not_found() {
        let tmp = tempdir().unwrap();
        let catalog = catalog_in(&tmp);
        let err = catalog.resolve_latest("nope", None).unwrap_err();
        assert!(matches!(err, CryoError::ArchiveNotFound(_)));
        assert!(catalog.versions("nope").unwrap().is_empty());
    }

    #[test]
    fn rerecording_an_id_overwrites_in_place() {
        let tmp = tempdir().unwrap();
        let catalog = catalog_in(&tmp);
        let mut v = version("docs", "arch-1", 2014);
        catalog.record_version(&v).unwrap();
        v.encrypted = true;
        catalog.record_version(&v).unwrap();

        let versions = catalog.versions("docs").unwrap();
        assert_eq!(versions.len(), 1);
        assert!(versions["arch-1"].encrypted);
    }

    #[test]
    fn state_survives_handle_reopen() {
        let tmp = tempdir().unwrap();
        let path = tmp.path().join("catalog.db");
        Catalog::new(&path)
            .record_version(&version("docs", "arch-1", 2014))
            .unwrap();

        let reopened = Catalog::new(&path);
        assert_eq!(reopened.resolve_latest("docs", None).unwrap().archive_id, "arch-1");
    }

    #[test]
    fn missing_store_file_reads_as_empty() {
        let tmp = tempdir().unwrap();
        let catalog = catalog_in(&tmp);
        assert!(catalog.all().unwrap().is_empty());
    }

    #[test]
    fn names_are_isolated_from_each_other() {
        let tmp = tempdir().unwrap();
        let catalog = catalog_in(&tmp);
        catalog.record_version(&version("docs", "arch-1", 2014)).unwrap();
        catalog.record_version(&version("mail", "arch-2", 2013)).unwrap();

        assert_eq!(catalog.versions("docs").unwrap().len(), 1);
        assert_eq!(catalog.resolve_latest("mail", None).unwrap().archive_id, "arch-2");
        assert_eq!(catalog.all().unwrap().len(), 2);
    }
}
