use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::store::keys;
use crate::store::{Store, StoreError};
use crate::sweep::{UserRecord, UserSource};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub display_name: String,
    /// `None` until the user authenticates for the first time.
    #[serde(default)]
    pub last_login: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn new(id: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            display_name: display_name.into(),
            last_login: None,
            created_at: Utc::now(),
        }
    }

    /// Case-insensitive substring match on id or display name; `needle` must be lowercase.
    fn matches(&self, needle: &str) -> bool {
        needle.is_empty()
            || self.id.to_lowercase().contains(needle)
            || self.display_name.to_lowercase().contains(needle)
    }
}

impl From<User> for UserRecord {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            last_login: user.last_login,
        }
    }
}

impl Store {
    pub fn create_user(&self, user: &User) -> Result<(), StoreError> {
        let key = keys::user_key(&user.id)?;
        let user_bytes = Self::serialize(user)?;

        let cas_result = self
            .users
            .compare_and_swap(key.as_bytes(), None::<&[u8]>, Some(user_bytes))?;

        if cas_result.is_err() {
            return Err(StoreError::Conflict {
                entity: "user".to_string(),
                key: user.id.clone(),
            });
        }
        Ok(())
    }

    pub fn get_user(&self, user_id: &str) -> Result<Option<User>, StoreError> {
        let key = keys::user_key(user_id)?;
        match self.users.get(key.as_bytes())? {
            Some(raw) => Ok(Some(Self::deserialize(&raw)?)),
            None => Ok(None),
        }
    }

    pub fn record_login(&self, user_id: &str, at: DateTime<Utc>) -> Result<User, StoreError> {
        let mut user = self
            .get_user(user_id)?
            .ok_or_else(|| StoreError::NotFound {
                entity: "user".to_string(),
                key: user_id.to_string(),
            })?;
        user.last_login = Some(at);

        let key = keys::user_key(user_id)?;
        self.users.insert(key.as_bytes(), Self::serialize(&user)?)?;
        Ok(user)
    }

    pub fn delete_user(&self, user_id: &str) -> Result<bool, StoreError> {
        let key = keys::user_key(user_id)?;
        Ok(self.users.remove(key.as_bytes())?.is_some())
    }

    pub fn count_users(&self) -> usize {
        self.users.len()
    }

    /// Page through users in key order without loading the whole tree.
    ///
    /// An empty query matches everybody and skips the offset without decoding values.
    pub fn search_users(
        &self,
        query: &str,
        limit: usize,
        offset: u64,
    ) -> Result<Vec<User>, StoreError> {
        let mut users = Vec::new();
        if limit == 0 {
            return Ok(users);
        }

        let offset = usize::try_from(offset).unwrap_or(usize::MAX);
        let needle = query.trim().to_lowercase();

        if needle.is_empty() {
            for item in self.users.iter().values().skip(offset).take(limit) {
                users.push(Self::deserialize::<User>(&item?)?);
            }
            return Ok(users);
        }

        let mut skipped = 0usize;
        for item in self.users.iter().values() {
            let user = Self::deserialize::<User>(&item?)?;
            if !user.matches(&needle) {
                continue;
            }
            if skipped < offset {
                skipped += 1;
                continue;
            }
            users.push(user);
            if users.len() >= limit {
                break;
            }
        }
        Ok(users)
    }
}

impl UserSource for Store {
    fn search(
        &self,
        query: &str,
        limit: usize,
        offset: u64,
    ) -> Result<Vec<UserRecord>, StoreError> {
        Ok(self
            .search_users(query, limit, offset)?
            .into_iter()
            .map(UserRecord::from)
            .collect())
    }
}
