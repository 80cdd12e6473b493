use std::fs;

use camino::Utf8Path;
use chrono::NaiveDate;
use regex::Regex;

use crate::domain::{DatasetRecord, ReplicaSlot};
use crate::error::IngestError;

/// Descriptor template with `<<placeholder>>` tokens, loaded once per run.
///
/// Substitutions are plain string replacement, applied in a fixed order:
/// organism, protein name, UniProt accession, PDB id, PDB id + replica
/// suffix, current date, author ORCID.
#[derive(Debug, Clone)]
pub struct DescriptorTemplate {
    text: String,
}

impl DescriptorTemplate {
    pub fn load(path: &Utf8Path) -> Result<Self, IngestError> {
        let text = fs::read_to_string(path.as_std_path())
            .map_err(|_| IngestError::TemplateRead(path.to_owned()))?;
        Ok(Self { text })
    }

    pub fn from_text(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }

    pub fn render(
        &self,
        record: &DatasetRecord,
        slot: ReplicaSlot,
        orcid: &str,
        date: NaiveDate,
    ) -> Result<String, IngestError> {
        let prod_name = slot.dir_name(&record.pdb);
        let substitutions = [
            ("<<df_organism>>", record.organism.as_str()),
            ("<<df_protein_name>>", record.protein_name.as_str()),
            ("<<df_UniProt>>", record.uniprot.as_str()),
            ("<<df_PDB>>", record.pdb.as_str()),
            ("<<df_PDB_prod>>", prod_name.as_str()),
        ];

        let mut rendered = self.text.clone();
        for (placeholder, value) in substitutions {
            if rendered.contains(placeholder) && value.is_empty() {
                return Err(IngestError::TemplateField {
                    pdb: record.pdb.to_string(),
                    field: placeholder.trim_matches(['<', '>']).to_string(),
                });
            }
            rendered = rendered.replace(placeholder, value);
        }
        rendered = rendered.replace("<<today>>", &date.format("%Y-%m-%d").to_string());
        rendered = rendered.replace("<<df_orcid>>", orcid);

        // A token surviving substitution means the template references a
        // field this pipeline does not know; a partial descriptor must never
        // reach a replica directory.
        let leftover = Regex::new(r"<<[A-Za-z0-9_]+>>").unwrap();
        if let Some(token) = leftover.find(&rendered) {
            return Err(IngestError::TemplatePlaceholder(token.as_str().to_string()));
        }
        Ok(rendered)
    }
}
