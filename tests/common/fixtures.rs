use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};

use trash_expiry::constants::TRASH_FILES_DIR;
use trash_expiry::store::operations::users::User;
use trash_expiry::store::Store;
use trash_expiry::trashbin::trash_name;

/// Ids sort in creation order, which is also the sweep order.
pub fn user_id(idx: usize) -> String {
    format!("user-{idx:05}")
}

pub fn seed_user(store: &Store, id: &str, last_login: Option<DateTime<Utc>>) -> User {
    let mut user = User::new(id, format!("Display {id}"));
    user.last_login = last_login;
    store.create_user(&user).expect("create seed user");
    user
}

pub fn seed_users(store: &Store, count: usize, last_login: Option<DateTime<Utc>>) -> Vec<User> {
    (0..count)
        .map(|idx| seed_user(store, &user_id(idx), last_login))
        .collect()
}

pub fn trash_dir(data_dir: &Path, user_id: &str) -> PathBuf {
    let dir = data_dir.join(user_id).join(TRASH_FILES_DIR);
    fs::create_dir_all(&dir).expect("create trash dir");
    dir
}

pub fn seed_trash_file(
    data_dir: &Path,
    user_id: &str,
    original: &str,
    deleted_at: DateTime<Utc>,
    body: &[u8],
) -> PathBuf {
    let path = trash_dir(data_dir, user_id).join(trash_name(original, deleted_at));
    fs::write(&path, body).expect("write trash file");
    path
}
