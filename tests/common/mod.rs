#![allow(dead_code)]

pub mod fixtures;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use trash_expiry::store::Store;

pub struct TestEnv {
    pub store: Arc<Store>,
    pub data_dir: PathBuf,
    _temp_dir: tempfile::TempDir,
}

impl TestEnv {
    pub fn new() -> Self {
        let temp_dir = tempfile::tempdir().expect("tempdir");
        let db_path = temp_dir.path().join("trash-expiry.sled");
        let store = Arc::new(Store::open(db_path.to_str().expect("db path")).expect("open store"));
        store.run_migrations().expect("run migrations");

        let data_dir = temp_dir.path().join("users");
        std::fs::create_dir_all(&data_dir).expect("create data dir");

        Self {
            store,
            data_dir,
            _temp_dir: temp_dir,
        }
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }
}
