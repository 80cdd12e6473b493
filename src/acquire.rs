use std::fs;
use std::time::Duration;

use rand::Rng;
use tracing::{info, warn};

use crate::atlas::AtlasClient;
use crate::distribute::{self, UnclassifiedPolicy};
use crate::domain::PdbId;
use crate::error::IngestError;
use crate::fs_util;
use crate::store::Store;

/// Bounded retry with uniformly random backoff. The delay is drawn fresh for
/// every failure so parallel operators re-running the batch do not hammer the
/// archive service in lockstep.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub min_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            min_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(5),
        }
    }
}

impl RetryPolicy {
    pub fn jitter(&self) -> Duration {
        let mut rng = rand::rng();
        Duration::from_secs_f64(
            rng.random_range(self.min_delay.as_secs_f64()..=self.max_delay.as_secs_f64()),
        )
    }
}

/// Explicit completion signal of the attempt loop. Callers must branch on
/// this, not on the presence of log lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AcquireOutcome {
    Completed,
    Failed { attempts: u32 },
}

/// Download, extract and distribute one dataset, retrying whole attempts.
///
/// An attempt spans the full chain; an error anywhere fails it. Partial
/// state in the working tree is left for the next attempt, whose extraction
/// overwrites same-named entries. The pause function is injected so tests
/// can observe backoff without sleeping.
pub fn acquire<A: AtlasClient + ?Sized>(
    atlas: &A,
    store: &Store,
    id: &PdbId,
    policy: &RetryPolicy,
    unclassified: UnclassifiedPolicy,
    pause: impl Fn(Duration),
) -> AcquireOutcome {
    for attempt in 1..=policy.max_attempts {
        match attempt_once(atlas, store, id, unclassified) {
            Ok(()) => {
                info!("{id}: downloaded and distributed (attempt {attempt})");
                return AcquireOutcome::Completed;
            }
            Err(err) => {
                warn!("{id}: attempt {attempt} failed: {err}");
                if attempt < policy.max_attempts {
                    pause(policy.jitter());
                }
            }
        }
    }
    warn!(
        "{id}: failed to acquire dataset after {} attempts",
        policy.max_attempts
    );
    AcquireOutcome::Failed {
        attempts: policy.max_attempts,
    }
}

fn attempt_once<A: AtlasClient + ?Sized>(
    atlas: &A,
    store: &Store,
    id: &PdbId,
    unclassified: UnclassifiedPolicy,
) -> Result<(), IngestError> {
    let working = store.working_dir(id);
    fs::create_dir_all(working.as_std_path())
        .map_err(|err| IngestError::Filesystem(err.to_string()))?;

    let archive = store.archive_path(id);
    atlas.download_trajectory(id, &archive)?;
    fs_util::extract_zip(&archive, &working)?;
    // Drop the archive before classification so it never reaches the
    // classifier as an unclassified entry.
    fs::remove_file(archive.as_std_path())
        .map_err(|err| IngestError::Filesystem(err.to_string()))?;

    distribute::distribute(store, id, unclassified)
}
