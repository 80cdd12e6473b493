use std::fs;

use camino::{Utf8Path, Utf8PathBuf};
use csv::ReaderBuilder;
use tracing::{info, warn};

use crate::domain::{DatasetRecord, PdbId};
use crate::error::IngestError;

/// The extracted catalog archive contains one table named like
/// `2024_06_13_ATLAS_info.tsv`.
pub const TABLE_SUFFIX: &str = "_ATLAS_info.tsv";

const COL_PDB: &str = "PDB";
const COL_UNIPROT: &str = "UniProt";
const COL_ORGANISM: &str = "organism";
const COL_PROTEIN_NAME: &str = "protein_name";

/// Locate the catalog table inside the extracted catalog directory.
/// First match wins when several are present.
pub fn find_catalog_table(dir: &Utf8Path) -> Result<Utf8PathBuf, IngestError> {
    let entries = fs::read_dir(dir.as_std_path())
        .map_err(|err| IngestError::Filesystem(format!("read {dir}: {err}")))?;
    let mut matches = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|err| IngestError::Filesystem(err.to_string()))?;
        let name = entry.file_name().to_string_lossy().into_owned();
        if name.ends_with(TABLE_SUFFIX) {
            matches.push(name);
        }
    }
    matches.sort();
    matches
        .into_iter()
        .next()
        .map(|name| dir.join(name))
        .ok_or_else(|| IngestError::CatalogMissing(dir.to_owned()))
}

/// Parse the tab separated catalog, keeping the four columns the pipeline
/// needs. Column order in the file does not matter; a missing column or an
/// unparseable row aborts the run.
pub fn read_catalog(path: &Utf8Path) -> Result<Vec<DatasetRecord>, IngestError> {
    let mut reader = ReaderBuilder::new()
        .delimiter(b'\t')
        .from_path(path.as_std_path())
        .map_err(|err| IngestError::CatalogParse(err.to_string()))?;

    let headers = reader
        .headers()
        .map_err(|err| IngestError::CatalogParse(err.to_string()))?
        .clone();
    let column = |name: &str| {
        headers
            .iter()
            .position(|header| header == name)
            .ok_or_else(|| IngestError::CatalogColumn(name.to_string()))
    };
    let pdb_col = column(COL_PDB)?;
    let uniprot_col = column(COL_UNIPROT)?;
    let organism_col = column(COL_ORGANISM)?;
    let protein_name_col = column(COL_PROTEIN_NAME)?;

    let mut records = Vec::new();
    for row in reader.records() {
        let row = row.map_err(|err| IngestError::CatalogParse(err.to_string()))?;
        let field = |index: usize| row.get(index).unwrap_or_default().trim().to_string();
        let pdb: PdbId = field(pdb_col).parse()?;
        records.push(DatasetRecord {
            pdb,
            uniprot: field(uniprot_col),
            organism: field(organism_col),
            protein_name: field(protein_name_col),
        });
    }
    Ok(records)
}

/// Truncate the catalog to begin at `start`. An id absent from the catalog
/// degrades to the full sequence rather than failing.
pub fn slice_from(records: Vec<DatasetRecord>, start: Option<&PdbId>) -> Vec<DatasetRecord> {
    let Some(start) = start else {
        return records;
    };
    match records.iter().position(|record| &record.pdb == start) {
        Some(position) => {
            info!(
                "resuming catalog at {} (skipping {} earlier rows)",
                start, position
            );
            records[position..].to_vec()
        }
        None => {
            warn!("no catalog row with PDB id '{start}'; processing the full catalog");
            records
        }
    }
}
