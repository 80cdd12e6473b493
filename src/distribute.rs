use std::fs;

use camino::Utf8Path;
use tracing::warn;

use crate::domain::{PdbId, ReplicaSlot};
use crate::error::IngestError;
use crate::store::{Store, atomic_rename_dir};

/// Extensions of files every replica needs a private copy of (topology and
/// plain-text run inputs).
pub const SHARED_EXTENSIONS: [&str; 2] = ["top", "txt"];

/// Starting-configuration files are shared regardless of extension.
pub const START_CONFIG_MARKER: &str = "_start.gro";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    /// Tagged for exactly one replica; moved there.
    Replica(ReplicaSlot),
    /// Common input; copied into all three replicas.
    Shared,
    /// Matched no rule; fate decided by [`UnclassifiedPolicy`].
    Unclassified,
}

/// What to do with an extracted file that matches no classification rule.
/// The archive occasionally carries analysis byproducts nobody asked for, so
/// the default drops them with the working tree, loudly.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum UnclassifiedPolicy {
    #[default]
    Discard,
    Fail,
}

/// Classify a top-level extracted file by name. Replica markers are checked
/// first, in R1, R2, R3 order; shared rules apply only to unmarked files.
pub fn classify(file_name: &str) -> Classification {
    for slot in ReplicaSlot::ALL {
        if file_name.contains(slot.marker()) {
            return Classification::Replica(slot);
        }
    }
    let extension = Utf8Path::new(file_name).extension();
    let shared_extension = extension
        .map(|ext| SHARED_EXTENSIONS.contains(&ext))
        .unwrap_or(false);
    if shared_extension || file_name.contains(START_CONFIG_MARKER) {
        return Classification::Shared;
    }
    Classification::Unclassified
}

/// Fan the freshly extracted working tree out into the three replica
/// directories, then destroy the working tree.
///
/// Each top-level file is classified exactly once; subdirectories (including
/// the staged replica dirs themselves) are never classified. Promotion of a
/// staged replica dir replaces any stale sibling left by an earlier partial
/// run. Postcondition: the working tree no longer exists and every surviving
/// extracted file sits in one (replica-tagged) or three (shared) replica
/// directories.
pub fn distribute(
    store: &Store,
    id: &PdbId,
    policy: UnclassifiedPolicy,
) -> Result<(), IngestError> {
    let working = store.working_dir(id);

    for slot in ReplicaSlot::ALL {
        fs::create_dir_all(store.staged_replica_dir(id, slot).as_std_path())
            .map_err(|err| IngestError::Filesystem(err.to_string()))?;
    }

    // Snapshot the listing up front; files are renamed out from under the
    // directory as classification proceeds.
    let entries = fs::read_dir(working.as_std_path())
        .map_err(|err| IngestError::Filesystem(format!("read {working}: {err}")))?
        .collect::<Result<Vec<_>, _>>()
        .map_err(|err| IngestError::Filesystem(err.to_string()))?;
    for entry in entries {
        let path = entry.path();
        if path.is_dir() {
            continue;
        }
        let name = entry.file_name().to_string_lossy().into_owned();
        match classify(&name) {
            Classification::Replica(slot) => {
                let target = store.staged_replica_dir(id, slot).join(&name);
                fs::rename(&path, target.as_std_path())
                    .map_err(|err| IngestError::Filesystem(format!("move {name}: {err}")))?;
            }
            Classification::Shared => {
                for slot in ReplicaSlot::ALL {
                    let target = store.staged_replica_dir(id, slot).join(&name);
                    fs::copy(&path, target.as_std_path())
                        .map_err(|err| IngestError::Filesystem(format!("copy {name}: {err}")))?;
                }
                fs::remove_file(&path)
                    .map_err(|err| IngestError::Filesystem(err.to_string()))?;
            }
            Classification::Unclassified => match policy {
                UnclassifiedPolicy::Discard => {
                    warn!("{id}: '{name}' matched no classification rule; discarding with the working tree");
                }
                UnclassifiedPolicy::Fail => {
                    return Err(IngestError::UnclassifiedEntry(name));
                }
            },
        }
    }

    for slot in ReplicaSlot::ALL {
        let staged = store.staged_replica_dir(id, slot);
        let target = store.replica_dir(id, slot);
        atomic_rename_dir(staged.as_std_path(), target.as_std_path())
            .map_err(|err| IngestError::Filesystem(format!("promote {target}: {err}")))?;
    }

    fs::remove_dir_all(working.as_std_path())
        .map_err(|err| IngestError::Filesystem(format!("remove {working}: {err}")))?;
    Ok(())
}
