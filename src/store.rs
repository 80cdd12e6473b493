use std::fs;
use std::io;
use std::path::Path;

use camino::{Utf8Path, Utf8PathBuf};

use crate::domain::{PdbId, ReplicaSlot};
use crate::error::IngestError;

/// Descriptor file written into every replica directory.
pub const DESCRIPTOR_FILE: &str = "mdrepo-metadata.toml";

/// Name the catalog archive is saved under before extraction.
pub const CATALOG_ARCHIVE_NAME: &str = "ATLAS_parsable_latest.zip";

/// On-disk layout, rooted at an explicit base directory.
///
/// `<base>/output/` holds the catalog archive and its extracted table;
/// `<base>/data/<pdb>/` is the transient working tree of one acquisition and
/// `<base>/data/<pdb>_prod_R{1,2,3}/` are the replica directories it fans
/// out into.
#[derive(Debug, Clone)]
pub struct Store {
    data_root: Utf8PathBuf,
    catalog_root: Utf8PathBuf,
}

impl Store {
    pub fn new(base: &Utf8Path) -> Self {
        Self {
            data_root: base.join("data"),
            catalog_root: base.join("output"),
        }
    }

    pub fn data_root(&self) -> &Utf8Path {
        &self.data_root
    }

    pub fn catalog_root(&self) -> &Utf8Path {
        &self.catalog_root
    }

    pub fn catalog_archive_path(&self) -> Utf8PathBuf {
        self.catalog_root.join(CATALOG_ARCHIVE_NAME)
    }

    pub fn working_dir(&self, id: &PdbId) -> Utf8PathBuf {
        self.data_root.join(id.as_str())
    }

    pub fn archive_path(&self, id: &PdbId) -> Utf8PathBuf {
        self.working_dir(id).join(format!("{id}_total.zip"))
    }

    /// Replica directory while it is still staged inside the working tree.
    pub fn staged_replica_dir(&self, id: &PdbId, slot: ReplicaSlot) -> Utf8PathBuf {
        self.working_dir(id).join(slot.dir_name(id))
    }

    /// Final replica directory, sibling of the working tree.
    pub fn replica_dir(&self, id: &PdbId, slot: ReplicaSlot) -> Utf8PathBuf {
        self.data_root.join(slot.dir_name(id))
    }

    pub fn descriptor_path(&self, id: &PdbId, slot: ReplicaSlot) -> Utf8PathBuf {
        self.replica_dir(id, slot).join(DESCRIPTOR_FILE)
    }

    pub fn ensure_data_root(&self) -> Result<(), IngestError> {
        fs::create_dir_all(self.data_root.as_std_path())
            .map_err(|err| IngestError::Filesystem(err.to_string()))
    }

    pub fn ensure_catalog_root(&self) -> Result<(), IngestError> {
        fs::create_dir_all(self.catalog_root.as_std_path())
            .map_err(|err| IngestError::Filesystem(err.to_string()))
    }

    /// Resume guard: a dataset counts as acquired once the working tree and
    /// all three replica directories exist. Existence only; contents are not
    /// inspected.
    pub fn is_complete(&self, id: &PdbId) -> bool {
        let mut required = vec![self.working_dir(id)];
        required.extend(
            ReplicaSlot::ALL
                .iter()
                .map(|slot| self.replica_dir(id, *slot)),
        );
        required.iter().all(|dir| dir.as_std_path().exists())
    }

    pub fn write_text_atomic(path: &Utf8Path, content: &str) -> Result<(), IngestError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent.as_std_path())
                .map_err(|err| IngestError::Filesystem(err.to_string()))?;
        }
        let tmp_path = path.with_extension("toml.tmp");
        fs::write(tmp_path.as_std_path(), content)
            .map_err(|err| IngestError::Filesystem(err.to_string()))?;
        fs::rename(tmp_path.as_std_path(), path.as_std_path())
            .map_err(|err| IngestError::Filesystem(err.to_string()))?;
        Ok(())
    }
}

/// Rename a directory into place, replacing whatever was there. Used when
/// promoting staged replica directories so a stale dir from an earlier
/// partial run never blocks a re-attempt.
pub fn atomic_rename_dir(from: &Path, to: &Path) -> io::Result<()> {
    if to.exists() {
        fs::remove_dir_all(to)?;
    }
    fs::rename(from, to)
}
