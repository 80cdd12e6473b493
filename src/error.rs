use camino::Utf8PathBuf;
use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum IngestError {
    #[error("invalid PDB id: {0}")]
    InvalidPdbId(String),

    #[error("ATLAS request failed: {0}")]
    AtlasHttp(String),

    #[error("ATLAS returned status {status}: {message}")]
    AtlasStatus { status: u16, message: String },

    #[error("no catalog table matching *_ATLAS_info.tsv found in {0}")]
    CatalogMissing(Utf8PathBuf),

    #[error("catalog table {0} contains no datasets")]
    CatalogEmpty(Utf8PathBuf),

    #[error("failed to parse catalog table: {0}")]
    CatalogParse(String),

    #[error("catalog table is missing required column: {0}")]
    CatalogColumn(String),

    #[error("failed to read template file at {0}")]
    TemplateRead(Utf8PathBuf),

    #[error("record field '{field}' for {pdb} is empty; refusing to stamp a partial descriptor")]
    TemplateField { pdb: String, field: String },

    #[error("descriptor still contains unsubstituted placeholder: {0}")]
    TemplatePlaceholder(String),

    #[error("extracted file matched no classification rule: {0}")]
    UnclassifiedEntry(String),

    #[error("filesystem error: {0}")]
    Filesystem(String),
}
