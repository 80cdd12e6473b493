use std::fs;
use std::io::Write;
use std::sync::Mutex;
use std::time::Duration;

use camino::Utf8Path;
use zip::ZipWriter;
use zip::write::SimpleFileOptions;

use mdrepo_ingest::acquire::{AcquireOutcome, RetryPolicy, acquire};
use mdrepo_ingest::atlas::AtlasClient;
use mdrepo_ingest::distribute::UnclassifiedPolicy;
use mdrepo_ingest::domain::{PdbId, ReplicaSlot};
use mdrepo_ingest::error::IngestError;
use mdrepo_ingest::store::Store;

fn zero_delay() -> RetryPolicy {
    RetryPolicy {
        max_attempts: 3,
        min_delay: Duration::ZERO,
        max_delay: Duration::ZERO,
    }
}

fn write_fixture_zip(destination: &Utf8Path, files: &[&str]) {
    let file = fs::File::create(destination.as_std_path()).unwrap();
    let mut writer = ZipWriter::new(file);
    for name in files {
        writer
            .start_file(*name, SimpleFileOptions::default())
            .unwrap();
        writer.write_all(name.as_bytes()).unwrap();
    }
    writer.finish().unwrap();
}

/// Serves a fixture archive, optionally failing the first N calls.
struct FixtureAtlas {
    files: Vec<&'static str>,
    fail_first: usize,
    calls: Mutex<usize>,
}

impl FixtureAtlas {
    fn new(files: &[&'static str], fail_first: usize) -> Self {
        Self {
            files: files.to_vec(),
            fail_first,
            calls: Mutex::new(0),
        }
    }

    fn calls(&self) -> usize {
        *self.calls.lock().unwrap()
    }
}

impl AtlasClient for FixtureAtlas {
    fn download_catalog(&self, _destination: &Utf8Path) -> Result<(), IngestError> {
        Err(IngestError::AtlasHttp("catalog not used here".to_string()))
    }

    fn download_trajectory(
        &self,
        _id: &PdbId,
        destination: &Utf8Path,
    ) -> Result<(), IngestError> {
        let mut calls = self.calls.lock().unwrap();
        *calls += 1;
        if *calls <= self.fail_first {
            return Err(IngestError::AtlasStatus {
                status: 503,
                message: "service unavailable".to_string(),
            });
        }
        write_fixture_zip(destination, &self.files);
        Ok(())
    }
}

fn setup() -> (tempfile::TempDir, Store, PdbId) {
    let temp = tempfile::tempdir().unwrap();
    let base = Utf8Path::from_path(temp.path()).unwrap();
    let store = Store::new(base);
    store.ensure_data_root().unwrap();
    (temp, store, "1abc".parse().unwrap())
}

#[test]
fn completed_acquisition_distributes_and_cleans_up() {
    let (_temp, store, id) = setup();
    let atlas = FixtureAtlas::new(&["topol.top", "md_start.gro", "1abc_prod_R2_traj.xtc"], 0);

    let outcome = acquire(
        &atlas,
        &store,
        &id,
        &zero_delay(),
        UnclassifiedPolicy::default(),
        |_| {},
    );

    assert_eq!(outcome, AcquireOutcome::Completed);
    assert_eq!(atlas.calls(), 1);
    assert!(!store.working_dir(&id).as_std_path().exists());
    for slot in ReplicaSlot::ALL {
        let dir = store.replica_dir(&id, slot);
        assert!(dir.join("topol.top").as_std_path().is_file());
        assert!(dir.join("md_start.gro").as_std_path().is_file());
        // The archive must never leak into a replica directory.
        assert!(!dir.join("1abc_total.zip").as_std_path().exists());
    }
    assert!(
        store
            .replica_dir(&id, ReplicaSlot::R2)
            .join("1abc_prod_R2_traj.xtc")
            .as_std_path()
            .is_file()
    );
}

#[test]
fn transient_failure_is_retried_with_a_pause() {
    let (_temp, store, id) = setup();
    let atlas = FixtureAtlas::new(&["topol.top"], 1);
    let pauses = Mutex::new(Vec::new());

    let outcome = acquire(
        &atlas,
        &store,
        &id,
        &zero_delay(),
        UnclassifiedPolicy::default(),
        |delay| pauses.lock().unwrap().push(delay),
    );

    assert_eq!(outcome, AcquireOutcome::Completed);
    assert_eq!(atlas.calls(), 2);
    assert_eq!(pauses.lock().unwrap().len(), 1);
}

#[test]
fn exhausted_retries_stop_at_three_attempts() {
    let (_temp, store, id) = setup();
    let atlas = FixtureAtlas::new(&[], usize::MAX);
    let pauses = Mutex::new(Vec::new());

    let outcome = acquire(
        &atlas,
        &store,
        &id,
        &zero_delay(),
        UnclassifiedPolicy::default(),
        |delay| pauses.lock().unwrap().push(delay),
    );

    assert_eq!(outcome, AcquireOutcome::Failed { attempts: 3 });
    assert_eq!(atlas.calls(), 3);
    // No pause after the final attempt.
    assert_eq!(pauses.lock().unwrap().len(), 2);
}

#[test]
fn jitter_stays_within_the_configured_range() {
    let policy = RetryPolicy::default();
    for _ in 0..32 {
        let delay = policy.jitter();
        assert!(delay >= policy.min_delay);
        assert!(delay <= policy.max_delay);
    }
}
