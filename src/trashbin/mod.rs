//! Trash bins kept on the local filesystem.
//!
//! Each user owns `<data_dir>/<user_id>`; deleted items live in
//! `<home>/files_trashbin/files` and are named `<original>.d<unix seconds>`.

mod context;
mod local;

use std::path::{Path, PathBuf};

use thiserror::Error;

pub use context::LocalFileSystem;
pub use local::{parse_trash_name, trash_name, LocalTrashbin};

use crate::constants::TRASH_FILES_DIR;

#[derive(Debug, Error)]
pub enum TrashError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid user id: {0:?}")]
    InvalidUser(String),
    #[error("path escapes the trash area: {0}")]
    OutsideTrash(PathBuf),
}

/// Reject ids that could address anything but a direct child of the data directory.
fn validate_user_id(user_id: &str) -> Result<(), TrashError> {
    let invalid = user_id.is_empty()
        || user_id == "."
        || user_id == ".."
        || user_id.contains(['/', '\\', '\0']);
    if invalid {
        return Err(TrashError::InvalidUser(user_id.to_string()));
    }
    Ok(())
}

pub fn user_home(data_dir: &Path, user_id: &str) -> Result<PathBuf, TrashError> {
    validate_user_id(user_id)?;
    Ok(data_dir.join(user_id))
}

pub fn trash_root(data_dir: &Path, user_id: &str) -> Result<PathBuf, TrashError> {
    Ok(user_home(data_dir, user_id)?.join(TRASH_FILES_DIR))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_path_like_user_ids() {
        let data = Path::new("/srv/data");
        for bad in ["", ".", "..", "a/b", "a\\b", "nul\0"] {
            assert!(matches!(
                user_home(data, bad),
                Err(TrashError::InvalidUser(_))
            ));
        }
        assert_eq!(
            trash_root(data, "alice").unwrap(),
            PathBuf::from("/srv/data/alice/files_trashbin/files")
        );
    }
}
