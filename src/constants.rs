/// Users fetched per sweep invocation; the checkpoint advances by this much every run.
pub const BATCH_SIZE: usize = 1000;

/// Checkpoint key holding the next unallocated user offset.
pub const USER_OFFSET_CHECKPOINT: &str = "files_trashbin:cronjob_user_offset";

/// Default interval between two trash expiration runs (30 minutes).
pub const DEFAULT_EXPIRE_INTERVAL_SECS: u64 = 60 * 30;

/// Default per-run timeout, kept below the interval so runs do not pile up.
pub const DEFAULT_WORKER_TIMEOUT_SECS: u64 = 60 * 25;

/// Retention used when the obligation says `auto` for the minimum.
pub const DEFAULT_RETENTION_DAYS: i64 = 30;

pub const SECONDS_PER_DAY: i64 = 86_400;

/// Trash area below a user's home directory.
pub const TRASH_FILES_DIR: &str = "files_trashbin/files";
