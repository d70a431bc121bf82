use std::path::PathBuf;

use super::{trash_root, user_home};
use crate::sweep::FileSystemContext;

/// Filesystem context rooted at one user's home directory at a time.
#[derive(Debug)]
pub struct LocalFileSystem {
    data_dir: PathBuf,
    mounted: Option<String>,
}

impl LocalFileSystem {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            mounted: None,
        }
    }

    pub fn mounted_user(&self) -> Option<&str> {
        self.mounted.as_deref()
    }
}

impl FileSystemContext for LocalFileSystem {
    fn setup(&mut self, user_id: &str) -> bool {
        let home = match user_home(&self.data_dir, user_id) {
            Ok(home) => home,
            Err(e) => {
                tracing::warn!(user_id, error = %e, "Refusing to set up filesystem");
                return false;
            }
        };
        if !home.is_dir() {
            tracing::debug!(user_id, home = %home.display(), "User home directory missing");
            return false;
        }
        self.mounted = Some(user_id.to_string());
        true
    }

    fn teardown(&mut self) {
        self.mounted = None;
    }

    fn has_trash_directory(&self, user_id: &str) -> bool {
        trash_root(&self.data_dir, user_id)
            .map(|root| root.is_dir())
            .unwrap_or(false)
    }
}
