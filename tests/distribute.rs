use std::fs;

use assert_matches::assert_matches;
use camino::Utf8Path;

use mdrepo_ingest::distribute::{UnclassifiedPolicy, distribute};
use mdrepo_ingest::domain::{PdbId, ReplicaSlot};
use mdrepo_ingest::error::IngestError;
use mdrepo_ingest::store::Store;

fn setup(files: &[&str]) -> (tempfile::TempDir, Store, PdbId) {
    let temp = tempfile::tempdir().unwrap();
    let base = Utf8Path::from_path(temp.path()).unwrap();
    let store = Store::new(base);
    let id: PdbId = "1abc".parse().unwrap();

    let working = store.working_dir(&id);
    fs::create_dir_all(working.as_std_path()).unwrap();
    for name in files {
        fs::write(working.join(name).as_std_path(), name.as_bytes()).unwrap();
    }
    (temp, store, id)
}

#[test]
fn tagged_files_land_in_exactly_one_replica() {
    let (_temp, store, id) = setup(&[
        "1abc_prod_R1_traj.xtc",
        "1abc_prod_R2_traj.xtc",
        "1abc_prod_R3_traj.xtc",
    ]);

    distribute(&store, &id, UnclassifiedPolicy::default()).unwrap();

    for slot in ReplicaSlot::ALL {
        let own = store
            .replica_dir(&id, slot)
            .join(format!("1abc{}_traj.xtc", slot.marker()));
        assert!(own.as_std_path().is_file());

        for other in ReplicaSlot::ALL.into_iter().filter(|s| *s != slot) {
            let foreign = store
                .replica_dir(&id, slot)
                .join(format!("1abc{}_traj.xtc", other.marker()));
            assert!(!foreign.as_std_path().exists());
        }
    }
}

#[test]
fn shared_files_are_copied_into_all_replicas() {
    let (_temp, store, id) = setup(&["topol.top", "md_start.gro", "1abc_prod_R2_traj.xtc"]);

    distribute(&store, &id, UnclassifiedPolicy::default()).unwrap();

    for slot in ReplicaSlot::ALL {
        let dir = store.replica_dir(&id, slot);
        assert!(dir.join("topol.top").as_std_path().is_file());
        assert!(dir.join("md_start.gro").as_std_path().is_file());
    }
    assert!(
        store
            .replica_dir(&id, ReplicaSlot::R2)
            .join("1abc_prod_R2_traj.xtc")
            .as_std_path()
            .is_file()
    );
    assert!(!store.working_dir(&id).as_std_path().exists());
}

#[test]
fn discard_policy_drops_unclassified_files_with_the_tree() {
    let (_temp, store, id) = setup(&["mystery.bin", "topol.top"]);

    distribute(&store, &id, UnclassifiedPolicy::Discard).unwrap();

    assert!(!store.working_dir(&id).as_std_path().exists());
    for slot in ReplicaSlot::ALL {
        let dir = store.replica_dir(&id, slot);
        assert!(dir.join("topol.top").as_std_path().is_file());
        assert!(!dir.join("mystery.bin").as_std_path().exists());
    }
}

#[test]
fn fail_policy_names_the_offending_file() {
    let (_temp, store, id) = setup(&["mystery.bin"]);

    let err = distribute(&store, &id, UnclassifiedPolicy::Fail).unwrap_err();
    assert_matches!(err, IngestError::UnclassifiedEntry(name) if name == "mystery.bin");
    // The attempt failed mid-flight; the working tree is left for a retry.
    assert!(store.working_dir(&id).as_std_path().exists());
}

#[test]
fn stale_replica_directories_are_replaced() {
    let (_temp, store, id) = setup(&["1abc_prod_R1_traj.xtc"]);

    let stale = store.replica_dir(&id, ReplicaSlot::R1);
    fs::create_dir_all(stale.as_std_path()).unwrap();
    fs::write(stale.join("half-written.xtc").as_std_path(), b"junk").unwrap();

    distribute(&store, &id, UnclassifiedPolicy::default()).unwrap();

    assert!(!stale.join("half-written.xtc").as_std_path().exists());
    assert!(stale.join("1abc_prod_R1_traj.xtc").as_std_path().is_file());
}

#[test]
fn subdirectories_are_not_classified() {
    let (_temp, store, id) = setup(&["topol.top"]);
    let nested = store.working_dir(&id).join("scratch_prod_R1_dir");
    fs::create_dir_all(nested.as_std_path()).unwrap();
    fs::write(nested.join("ignore.me").as_std_path(), b"x").unwrap();

    distribute(&store, &id, UnclassifiedPolicy::default()).unwrap();

    assert!(!store.working_dir(&id).as_std_path().exists());
    for slot in ReplicaSlot::ALL {
        let dir = store.replica_dir(&id, slot);
        assert!(!dir.join("scratch_prod_R1_dir").as_std_path().exists());
    }
}
