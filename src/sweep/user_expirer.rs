use std::ops::{Deref, DerefMut};
use std::sync::Arc;

use super::interfaces::{ExpiredSummary, FileSystemContext, TrashExpirer, TrashItem, TrashLister, TrashSort};
use crate::trashbin::TrashError;

/// Runs the trash expiration for a single user on top of the filesystem context.
pub struct UserExpirer {
    fs: Box<dyn FileSystemContext>,
    lister: Arc<dyn TrashLister>,
    expirer: Arc<dyn TrashExpirer>,
}

impl UserExpirer {
    pub fn new(
        fs: Box<dyn FileSystemContext>,
        lister: Arc<dyn TrashLister>,
        expirer: Arc<dyn TrashExpirer>,
    ) -> Self {
        Self {
            fs,
            lister,
            expirer,
        }
    }

    /// Switch the filesystem context to `user_id`.
    ///
    /// Returns `false` when the context cannot be set up or the user has no trash area.
    pub fn prepare(&mut self, user_id: &str) -> bool {
        self.fs.teardown();
        if !self.fs.setup(user_id) {
            tracing::debug!(user_id, "Filesystem setup failed, skipping user");
            return false;
        }
        self.fs.has_trash_directory(user_id)
    }

    pub fn list_trash(&self, user_id: &str) -> Result<Vec<TrashItem>, TrashError> {
        self.lister.list("/", user_id, TrashSort::Mtime)
    }

    pub fn expire(&self, contents: &[TrashItem], user_id: &str) -> Result<ExpiredSummary, TrashError> {
        self.expirer.delete_expired(contents, user_id)
    }

    pub fn release(&mut self) {
        self.fs.teardown();
    }

    /// Borrow the expirer for a batch; the context is released when the guard drops.
    pub fn session(&mut self) -> ExpirerSession<'_> {
        ExpirerSession { expirer: self }
    }
}

pub struct ExpirerSession<'a> {
    expirer: &'a mut UserExpirer,
}

impl Deref for ExpirerSession<'_> {
    type Target = UserExpirer;

    fn deref(&self) -> &Self::Target {
        self.expirer
    }
}

impl DerefMut for ExpirerSession<'_> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.expirer
    }
}

impl Drop for ExpirerSession<'_> {
    fn drop(&mut self) {
        self.expirer.release();
    }
}
