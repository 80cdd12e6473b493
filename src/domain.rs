use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use crate::error::IngestError;

/// ATLAS dataset identifier: a four character PDB code, optionally followed
/// by an underscore separated chain suffix (`1abc`, `16pk_A`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct PdbId(String);

impl PdbId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PdbId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for PdbId {
    type Err = IngestError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim().to_string();
        let mut parts = normalized.splitn(2, '_');
        let code = parts.next().unwrap_or_default();
        let chain = parts.next();
        let code_valid = code.len() == 4 && code.chars().all(|ch| ch.is_ascii_alphanumeric());
        let chain_valid = chain
            .map(|rest| !rest.is_empty() && rest.chars().all(|ch| ch.is_ascii_alphanumeric()))
            .unwrap_or(true);
        if !code_valid || !chain_valid {
            return Err(IngestError::InvalidPdbId(value.to_string()));
        }
        Ok(Self(normalized))
    }
}

/// The three production replicas every dataset is simulated under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ReplicaSlot {
    R1,
    R2,
    R3,
}

impl ReplicaSlot {
    pub const ALL: [ReplicaSlot; 3] = [ReplicaSlot::R1, ReplicaSlot::R2, ReplicaSlot::R3];

    /// Substring that tags a file (or directory) as belonging to this slot.
    pub fn marker(self) -> &'static str {
        match self {
            ReplicaSlot::R1 => "_prod_R1",
            ReplicaSlot::R2 => "_prod_R2",
            ReplicaSlot::R3 => "_prod_R3",
        }
    }

    pub fn dir_name(self, id: &PdbId) -> String {
        format!("{}{}", id.as_str(), self.marker())
    }
}

impl fmt::Display for ReplicaSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReplicaSlot::R1 => write!(f, "R1"),
            ReplicaSlot::R2 => write!(f, "R2"),
            ReplicaSlot::R3 => write!(f, "R3"),
        }
    }
}

/// One row of the ATLAS catalog table, in catalog order.
#[derive(Debug, Clone, Serialize)]
pub struct DatasetRecord {
    pub pdb: PdbId,
    pub uniprot: String,
    pub organism: String,
    pub protein_name: String,
}
