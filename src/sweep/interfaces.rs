use std::path::PathBuf;

use chrono::{DateTime, Utc};

use crate::store::StoreError;
use crate::trashbin::TrashError;

/// Minimal view of a user that the sweep needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserRecord {
    pub id: String,
    /// `None` is the "never logged in" sentinel.
    pub last_login: Option<DateTime<Utc>>,
}

impl UserRecord {
    pub fn has_logged_in(&self) -> bool {
        self.last_login.is_some()
    }
}

/// One entry of a user's trash area.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrashItem {
    /// Name of the entry inside the trash area, including the deletion suffix.
    pub name: String,
    /// Name the item had before it was deleted.
    pub original_name: String,
    pub path: PathBuf,
    /// When the item was moved to the trash.
    pub deleted_at: DateTime<Utc>,
    pub size: u64,
    pub is_dir: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TrashSort {
    #[default]
    Mtime,
    Name,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ExpiredSummary {
    pub count: usize,
    pub bytes: u64,
}

/// Durable named counters with an atomic range-reservation primitive.
pub trait CheckpointStore: Send + Sync {
    /// Atomically add `delta` (absent counts as 0) and return the value before the addition.
    fn increment_and_get_previous(&self, key: &str, delta: u64) -> Result<u64, StoreError>;

    fn set(&self, key: &str, value: u64) -> Result<(), StoreError>;

    fn get(&self, key: &str) -> Result<u64, StoreError>;
}

/// Offset-paginated access to the user population in a stable order.
pub trait UserSource: Send + Sync {
    fn search(&self, query: &str, limit: usize, offset: u64)
        -> Result<Vec<UserRecord>, StoreError>;
}

pub trait ExpirationPolicy: Send + Sync {
    /// Cut-off for age based expiration; `None` when expiration is disabled.
    fn max_age_timestamp(&self) -> Option<DateTime<Utc>>;

    fn is_expired(&self, timestamp: DateTime<Utc>, quota_exceeded: bool) -> bool;
}

/// Acts on behalf of one user at a time.
pub trait FileSystemContext: Send {
    fn setup(&mut self, user_id: &str) -> bool;

    fn teardown(&mut self);

    fn has_trash_directory(&self, user_id: &str) -> bool;
}

pub trait TrashLister: Send + Sync {
    fn list(&self, path: &str, user_id: &str, sort: TrashSort) -> Result<Vec<TrashItem>, TrashError>;
}

pub trait TrashExpirer: Send + Sync {
    /// Delete the expired prefix of `items`, which must be sorted oldest first.
    fn delete_expired(&self, items: &[TrashItem], user_id: &str)
        -> Result<ExpiredSummary, TrashError>;
}
