use crate::store::operations::checkpoints::{decode_offset, encode_offset, is_legacy_text};
use crate::store::{Store, StoreError};

const VERSION_KEY: &str = "_meta:version";

type MigrationFn = fn(&Store) -> Result<(), StoreError>;

fn migrations() -> Vec<(&'static str, MigrationFn)> {
    vec![
        ("001_initial", m001_initial),
        ("002_binary_checkpoints", m002_binary_checkpoints),
    ]
}

/// Apply every migration newer than the recorded version.
///
/// Migrations must be idempotent: a crash between a migration and the
/// version bump re-runs it on the next start. Versions only move forward.
pub fn run(store: &Store) -> Result<(), StoreError> {
    let current = get_current_version(store)?;

    for (index, (name, func)) in migrations().iter().enumerate() {
        let version = (index + 1) as u32;
        if version <= current {
            tracing::debug!(version, name, "Migration already applied, skipping");
            continue;
        }
        tracing::info!(version, name, "Running migration");
        func(store)?;
        set_version(store, version)?;
        tracing::info!(version, name, "Migration complete");
    }

    Ok(())
}

pub fn get_current_version(store: &Store) -> Result<u32, StoreError> {
    let Some(raw) = store.meta.get(VERSION_KEY.as_bytes())? else {
        return Ok(0);
    };
    let bytes: [u8; 4] = raw.as_ref().try_into().map_err(|_| StoreError::Migration {
        version: 0,
        message: format!("unreadable schema version ({} bytes)", raw.len()),
    })?;
    Ok(u32::from_be_bytes(bytes))
}

pub fn set_version(store: &Store, version: u32) -> Result<(), StoreError> {
    let current = get_current_version(store)?;
    if version < current {
        return Err(StoreError::Migration {
            version,
            message: format!("Refuse to downgrade from {} to {}", current, version),
        });
    }

    store
        .meta
        .insert(VERSION_KEY.as_bytes(), &version.to_be_bytes())?;
    Ok(())
}

fn m001_initial(_store: &Store) -> Result<(), StoreError> {
    Ok(())
}

/// Rewrite counters imported as decimal text into the 8-byte encoding.
fn m002_binary_checkpoints(store: &Store) -> Result<(), StoreError> {
    for item in store.checkpoints.iter() {
        let (key, value) = item?;
        if value.len() == 8 && !is_legacy_text(&value) {
            continue;
        }
        match decode_offset(&value) {
            Some(offset) => {
                store.checkpoints.insert(key, &encode_offset(offset))?;
            }
            None => {
                tracing::warn!(
                    key = %String::from_utf8_lossy(&key),
                    "Dropping unreadable checkpoint, it restarts from zero"
                );
                store.checkpoints.remove(key)?;
            }
        }
    }
    Ok(())
}
