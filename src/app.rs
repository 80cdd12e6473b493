use std::thread;

use chrono::{Local, NaiveDate};
use serde::Serialize;
use tracing::{error, info};

use crate::acquire::{self, AcquireOutcome, RetryPolicy};
use crate::atlas::AtlasClient;
use crate::catalog;
use crate::distribute::UnclassifiedPolicy;
use crate::domain::{DatasetRecord, PdbId, ReplicaSlot};
use crate::error::IngestError;
use crate::fs_util;
use crate::store::Store;
use crate::template::DescriptorTemplate;

/// Per-record outcome at the batch boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordStatus {
    Acquired,
    Skipped,
    Failed,
}

/// Tally of one batch run, printed by the CLI.
#[derive(Debug, Clone, Default, Serialize)]
pub struct IngestReport {
    pub acquired: usize,
    pub skipped: usize,
    pub failed: Vec<String>,
}

pub struct App<A: AtlasClient> {
    store: Store,
    atlas: A,
    template: DescriptorTemplate,
    retry: RetryPolicy,
    unclassified: UnclassifiedPolicy,
}

impl<A: AtlasClient> App<A> {
    pub fn new(store: Store, atlas: A, template: DescriptorTemplate) -> Self {
        Self {
            store,
            atlas,
            template,
            retry: RetryPolicy::default(),
            unclassified: UnclassifiedPolicy::default(),
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_unclassified_policy(mut self, policy: UnclassifiedPolicy) -> Self {
        self.unclassified = policy;
        self
    }

    /// Run the whole batch. Catalog-level failures abort the run; every
    /// per-record failure is caught here, logged, and counted, and the batch
    /// moves on to the next record.
    pub fn run(
        &self,
        orcid: &str,
        resume_from: Option<&PdbId>,
    ) -> Result<IngestReport, IngestError> {
        let records = self.fetch_catalog(resume_from)?;
        info!("processing {} catalog rows", records.len());

        let mut report = IngestReport::default();
        for record in &records {
            match self.process_record(record, orcid) {
                Ok(RecordStatus::Acquired) => report.acquired += 1,
                Ok(RecordStatus::Skipped) => report.skipped += 1,
                Ok(RecordStatus::Failed) => report.failed.push(record.pdb.to_string()),
                Err(err) => {
                    error!("{}: {err}", record.pdb);
                    report.failed.push(record.pdb.to_string());
                }
            }
        }
        Ok(report)
    }

    /// Download and extract the catalog archive, then parse and slice the
    /// metadata table.
    fn fetch_catalog(
        &self,
        resume_from: Option<&PdbId>,
    ) -> Result<Vec<DatasetRecord>, IngestError> {
        self.store.ensure_catalog_root()?;
        self.store.ensure_data_root()?;

        let archive = self.store.catalog_archive_path();
        info!("downloading ATLAS catalog");
        self.atlas.download_catalog(&archive)?;
        fs_util::extract_zip(&archive, self.store.catalog_root())?;

        let table = catalog::find_catalog_table(self.store.catalog_root())?;
        let records = catalog::read_catalog(&table)?;
        if records.is_empty() {
            return Err(IngestError::CatalogEmpty(table));
        }
        info!("catalog table {table} lists {} datasets", records.len());
        Ok(catalog::slice_from(records, resume_from))
    }

    /// One dataset: descriptors are regenerated unconditionally, the resume
    /// guard decides whether to download, and a completed acquisition stamps
    /// again so the freshly promoted replica directories get descriptors too.
    pub fn process_record(
        &self,
        record: &DatasetRecord,
        orcid: &str,
    ) -> Result<RecordStatus, IngestError> {
        let id = &record.pdb;
        let today = Local::now().date_naive();
        let needs_work = !self.store.is_complete(id);

        self.stamp_descriptors(record, orcid, today)?;

        if !needs_work {
            info!("{id}: all replica directories present; skipping download");
            return Ok(RecordStatus::Skipped);
        }

        let outcome = acquire::acquire(
            &self.atlas,
            &self.store,
            id,
            &self.retry,
            self.unclassified,
            thread::sleep,
        );
        match outcome {
            AcquireOutcome::Completed => {
                self.stamp_descriptors(record, orcid, today)?;
                Ok(RecordStatus::Acquired)
            }
            AcquireOutcome::Failed { .. } => Ok(RecordStatus::Failed),
        }
    }

    /// Overwrite the descriptor in every replica directory that exists on
    /// disk; directories not yet created are skipped without error.
    pub fn stamp_descriptors(
        &self,
        record: &DatasetRecord,
        orcid: &str,
        date: NaiveDate,
    ) -> Result<(), IngestError> {
        for slot in ReplicaSlot::ALL {
            let dir = self.store.replica_dir(&record.pdb, slot);
            if !dir.as_std_path().is_dir() {
                continue;
            }
            let rendered = self.template.render(record, slot, orcid, date)?;
            Store::write_text_atomic(&self.store.descriptor_path(&record.pdb, slot), &rendered)?;
        }
        Ok(())
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    pub fn atlas(&self) -> &A {
        &self.atlas
    }
}
