//! Wiring for the trash expiration sweep.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use crate::config::Config;
use crate::expiration::RetentionPolicy;
use crate::store::Store;
use crate::sweep::{ExpireTrash, UserExpirer};
use crate::trashbin::{LocalFileSystem, LocalTrashbin};

/// Build the sweep over `store` and the trash bins under `data_dir`.
pub fn build(store: Arc<Store>, data_dir: &Path, policy: RetentionPolicy) -> ExpireTrash {
    let policy = Arc::new(policy);
    let trashbin = Arc::new(LocalTrashbin::new(data_dir, policy.clone()));
    let expirer = UserExpirer::new(
        Box::new(LocalFileSystem::new(data_dir)),
        trashbin.clone(),
        trashbin,
    );
    ExpireTrash::new(store.clone(), store, policy, expirer)
}

pub fn from_config(store: Arc<Store>, config: &Config) -> ExpireTrash {
    let policy = RetentionPolicy::from_obligation(&config.trashbin.retention_obligation);
    if !policy.is_enabled() {
        tracing::info!("Trash retention obligation is disabled");
    }
    build(store, Path::new(&config.data_dir), policy).with_interval(Duration::from_secs(
        config.worker.expire_trash_interval_secs,
    ))
}
