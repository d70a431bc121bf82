//! Checkpointed batch sweep over the user population.
//!
//! Every invocation reserves the next `batch_size` offsets through the
//! checkpoint store before doing any work, probes whether a user exists at the
//! reserved offset, and either wraps the checkpoint back to zero or expires the
//! trash of every user in the batch. A crashed invocation loses its range until
//! the next full cycle.

mod interfaces;
mod user_expirer;

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;

pub use interfaces::{
    CheckpointStore, ExpirationPolicy, ExpiredSummary, FileSystemContext, TrashExpirer, TrashItem,
    TrashLister, TrashSort, UserRecord, UserSource,
};
pub use user_expirer::{ExpirerSession, UserExpirer};

use crate::constants::{BATCH_SIZE, DEFAULT_EXPIRE_INTERVAL_SECS, USER_OFFSET_CHECKPOINT};
use crate::store::StoreError;
use crate::workers::{JobError, TimedJob, WorkerName};

/// Matches every user.
const ALL_USERS: &str = "";

#[derive(Debug, Error)]
pub enum SweepError {
    #[error("checkpoint store failed: {0}")]
    Checkpoint(#[source] StoreError),
    #[error("user source failed: {0}")]
    UserSource(#[source] StoreError),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchReport {
    pub offset: u64,
    pub fetched: usize,
    pub never_logged_in: usize,
    pub without_trash: usize,
    pub processed: usize,
    pub failed: usize,
    pub expired_items: usize,
    pub expired_bytes: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SweepOutcome {
    /// Expiration is turned off; the checkpoint was not touched.
    Disabled,
    /// No user at `offset`; the checkpoint was reset to zero.
    Wrapped { offset: u64 },
    Processed(BatchReport),
}

pub struct ExpireTrash {
    checkpoints: Arc<dyn CheckpointStore>,
    users: Arc<dyn UserSource>,
    policy: Arc<dyn ExpirationPolicy>,
    expirer: UserExpirer,
    batch_size: usize,
    interval: Duration,
}

impl ExpireTrash {
    pub fn new(
        checkpoints: Arc<dyn CheckpointStore>,
        users: Arc<dyn UserSource>,
        policy: Arc<dyn ExpirationPolicy>,
        expirer: UserExpirer,
    ) -> Self {
        Self {
            checkpoints,
            users,
            policy,
            expirer,
            batch_size: BATCH_SIZE,
            interval: Duration::from_secs(DEFAULT_EXPIRE_INTERVAL_SECS),
        }
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Run one invocation of the sweep.
    pub fn run_once(&mut self) -> Result<SweepOutcome, SweepError> {
        let Some(threshold) = self.policy.max_age_timestamp() else {
            tracing::debug!("Trash expiration disabled, nothing to do");
            return Ok(SweepOutcome::Disabled);
        };

        let delta = self.batch_size as u64;
        let offset = self
            .checkpoints
            .increment_and_get_previous(USER_OFFSET_CHECKPOINT, delta)
            .map_err(SweepError::Checkpoint)?;

        let probe = self
            .users
            .search(ALL_USERS, 1, offset)
            .map_err(SweepError::UserSource)?;
        if probe.is_empty() {
            self.checkpoints
                .set(USER_OFFSET_CHECKPOINT, 0)
                .map_err(SweepError::Checkpoint)?;
            tracing::info!(offset, "Reached end of user list, next run starts over");
            return Ok(SweepOutcome::Wrapped { offset });
        }

        let batch = self
            .users
            .search(ALL_USERS, self.batch_size, offset)
            .map_err(SweepError::UserSource)?;
        // The threshold only gates the run; each item is judged by the policy's own clock read.
        tracing::debug!(offset, users = batch.len(), %threshold, "Expiring trash for batch");

        let report = self.process_batch(offset, &batch);
        tracing::info!(
            offset,
            fetched = report.fetched,
            processed = report.processed,
            failed = report.failed,
            expired = report.expired_items,
            expired_bytes = report.expired_bytes,
            "Trash expiration batch done"
        );
        Ok(SweepOutcome::Processed(report))
    }

    fn process_batch(&mut self, offset: u64, batch: &[UserRecord]) -> BatchReport {
        let mut report = BatchReport {
            offset,
            fetched: batch.len(),
            ..BatchReport::default()
        };
        let mut session = self.expirer.session();

        for user in batch {
            if !user.has_logged_in() {
                report.never_logged_in += 1;
                continue;
            }
            if !session.prepare(&user.id) {
                report.without_trash += 1;
                continue;
            }

            let expired = session
                .list_trash(&user.id)
                .and_then(|contents| session.expire(&contents, &user.id));
            match expired {
                Ok(summary) => {
                    report.processed += 1;
                    report.expired_items += summary.count;
                    report.expired_bytes += summary.bytes;
                }
                Err(e) => {
                    tracing::warn!(user_id = %user.id, error = %e, "Failed to expire trash for user");
                    report.failed += 1;
                }
            }
        }

        report
    }
}

impl TimedJob for ExpireTrash {
    fn name(&self) -> WorkerName {
        WorkerName::ExpireTrash
    }

    fn interval(&self) -> Duration {
        self.interval
    }

    fn run(&mut self, _argument: &serde_json::Value) -> Result<(), JobError> {
        self.run_once()?;
        Ok(())
    }
}
