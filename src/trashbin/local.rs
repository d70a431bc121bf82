use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Utc};

use super::{trash_root, TrashError};
use crate::sweep::{ExpirationPolicy, ExpiredSummary, TrashExpirer, TrashItem, TrashLister, TrashSort};

const DELETED_SUFFIX: &str = ".d";

/// Name an item gets when it is moved to the trash at `deleted_at`.
pub fn trash_name(original_name: &str, deleted_at: DateTime<Utc>) -> String {
    format!("{original_name}{DELETED_SUFFIX}{}", deleted_at.timestamp())
}

/// Split `<original>.d<unix seconds>` into its parts.
pub fn parse_trash_name(name: &str) -> Option<(String, DateTime<Utc>)> {
    let (original, timestamp) = name.rsplit_once(DELETED_SUFFIX)?;
    if original.is_empty() || timestamp.is_empty() || !timestamp.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let deleted_at = DateTime::from_timestamp(timestamp.parse().ok()?, 0)?;
    Some((original.to_string(), deleted_at))
}

/// Trash bins below `<data_dir>/<user>/files_trashbin/files`.
pub struct LocalTrashbin {
    data_dir: PathBuf,
    policy: Arc<dyn ExpirationPolicy>,
}

impl LocalTrashbin {
    pub fn new(data_dir: impl Into<PathBuf>, policy: Arc<dyn ExpirationPolicy>) -> Self {
        Self {
            data_dir: data_dir.into(),
            policy,
        }
    }

    fn resolve(&self, path: &str, user_id: &str) -> Result<PathBuf, TrashError> {
        let root = trash_root(&self.data_dir, user_id)?;
        let relative = Path::new(path.trim_start_matches('/'));
        if relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir))
        {
            return Err(TrashError::OutsideTrash(relative.to_path_buf()));
        }
        Ok(root.join(relative))
    }
}

fn disk_usage(path: &Path) -> io::Result<u64> {
    let meta = fs::symlink_metadata(path)?;
    if !meta.is_dir() {
        return Ok(meta.len());
    }
    let mut total = 0;
    for entry in fs::read_dir(path)? {
        total += disk_usage(&entry?.path())?;
    }
    Ok(total)
}

fn read_item(path: PathBuf) -> io::Result<TrashItem> {
    let meta = fs::symlink_metadata(&path)?;
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let (original_name, deleted_at) = match parse_trash_name(&name) {
        Some(parsed) => parsed,
        None => (name.clone(), DateTime::<Utc>::from(meta.modified()?)),
    };
    let size = if meta.is_dir() {
        disk_usage(&path)?
    } else {
        meta.len()
    };

    Ok(TrashItem {
        name,
        original_name,
        deleted_at,
        size,
        is_dir: meta.is_dir(),
        path,
    })
}

impl TrashLister for LocalTrashbin {
    fn list(&self, path: &str, user_id: &str, sort: TrashSort) -> Result<Vec<TrashItem>, TrashError> {
        let dir = self.resolve(path, user_id)?;
        let entries = match fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut items = Vec::new();
        for entry in entries {
            let entry = entry?;
            match read_item(entry.path()) {
                Ok(item) => items.push(item),
                // removed between read_dir and stat
                Err(e) if e.kind() == io::ErrorKind::NotFound => continue,
                Err(e) => return Err(e.into()),
            }
        }

        match sort {
            TrashSort::Mtime => {
                items.sort_by(|a, b| a.deleted_at.cmp(&b.deleted_at).then_with(|| a.name.cmp(&b.name)))
            }
            TrashSort::Name => items.sort_by(|a, b| a.name.cmp(&b.name)),
        }
        Ok(items)
    }
}

impl TrashExpirer for LocalTrashbin {
    fn delete_expired(&self, items: &[TrashItem], user_id: &str) -> Result<ExpiredSummary, TrashError> {
        let root = trash_root(&self.data_dir, user_id)?;
        let mut summary = ExpiredSummary::default();

        for item in items {
            // oldest first: everything after the first young item is young too
            if !self.policy.is_expired(item.deleted_at, false) {
                break;
            }
            if !item.path.starts_with(&root) {
                return Err(TrashError::OutsideTrash(item.path.clone()));
            }

            let removed = if item.is_dir {
                fs::remove_dir_all(&item.path)
            } else {
                fs::remove_file(&item.path)
            };
            match removed {
                Ok(()) => {
                    summary.count += 1;
                    summary.bytes += item.size;
                    tracing::info!(
                        user_id,
                        item = %item.original_name,
                        deleted_at = %item.deleted_at,
                        "Removed item from trash, it exceeds the retention obligation"
                    );
                }
                Err(e) if e.kind() == io::ErrorKind::NotFound => {
                    tracing::debug!(user_id, item = %item.name, "Trash item already gone");
                }
                Err(e) => return Err(e.into()),
            }
        }

        Ok(summary)
    }
}
