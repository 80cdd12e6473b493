use std::fs;
use std::io;

use camino::Utf8Path;
use zip::ZipArchive;

use crate::error::IngestError;

/// Extract a ZIP archive into `target_dir`.
///
/// Entries are written with `File::create`, so a same-named file left behind
/// by an earlier failed attempt is overwritten; files with unrelated names
/// are left untouched. Entry paths are validated against traversal before
/// anything is written.
pub fn extract_zip(zip_path: &Utf8Path, target_dir: &Utf8Path) -> Result<(), IngestError> {
    let file = fs::File::open(zip_path.as_std_path())
        .map_err(|err| IngestError::Filesystem(format!("open archive {zip_path}: {err}")))?;
    let mut archive =
        ZipArchive::new(file).map_err(|err| IngestError::Filesystem(err.to_string()))?;

    for i in 0..archive.len() {
        let mut entry = archive
            .by_index(i)
            .map_err(|err| IngestError::Filesystem(err.to_string()))?;
        let entry_path = match entry.enclosed_name() {
            Some(path) => target_dir.as_std_path().join(path),
            None => {
                return Err(IngestError::Filesystem(
                    "zip entry path traversal detected".to_string(),
                ));
            }
        };

        if entry.is_dir() {
            fs::create_dir_all(&entry_path)
                .map_err(|err| IngestError::Filesystem(err.to_string()))?;
            continue;
        }

        if let Some(parent) = entry_path.parent() {
            fs::create_dir_all(parent).map_err(|err| IngestError::Filesystem(err.to_string()))?;
        }
        let mut outfile = fs::File::create(&entry_path)
            .map_err(|err| IngestError::Filesystem(err.to_string()))?;
        io::copy(&mut entry, &mut outfile)
            .map_err(|err| IngestError::Filesystem(err.to_string()))?;
    }
    Ok(())
}
