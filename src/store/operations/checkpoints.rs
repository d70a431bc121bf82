use std::cell::Cell;

use crate::store::keys;
use crate::store::{Store, StoreError};
use crate::sweep::CheckpointStore;

/// Counters are stored as 8 big-endian bytes.
pub fn encode_offset(value: u64) -> [u8; 8] {
    value.to_be_bytes()
}

/// Whether `raw` is a counter in the legacy decimal text encoding.
///
/// Binary counters made only of ASCII digit bytes start at 0x3030_3030_3030_3030,
/// far beyond any reachable offset, so all-digit values are read as text.
pub fn is_legacy_text(raw: &[u8]) -> bool {
    !raw.is_empty() && raw.iter().all(u8::is_ascii_digit)
}

/// Decode a stored counter, accepting the legacy decimal text encoding.
pub fn decode_offset(raw: &[u8]) -> Option<u64> {
    if !is_legacy_text(raw) {
        if let Ok(bytes) = <[u8; 8]>::try_from(raw) {
            return Some(u64::from_be_bytes(bytes));
        }
    }
    std::str::from_utf8(raw).ok()?.trim().parse::<u64>().ok()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum IncrementFault {
    Corrupt,
    Overflow,
}

impl Store {
    pub fn get_checkpoint(&self, name: &str) -> Result<u64, StoreError> {
        let key = keys::checkpoint_key(name)?;
        match self.checkpoints.get(key.as_bytes())? {
            Some(raw) => decode_offset(&raw).ok_or_else(|| corrupt(&key)),
            None => Ok(0),
        }
    }

    pub fn set_checkpoint(&self, name: &str, value: u64) -> Result<(), StoreError> {
        let key = keys::checkpoint_key(name)?;
        self.checkpoints
            .insert(key.as_bytes(), &encode_offset(value))?;
        Ok(())
    }

    /// Atomically add `delta` and return the previous value.
    ///
    /// sled retries the closure on contention, so concurrent callers always
    /// observe distinct previous values. A corrupt or overflowing counter is
    /// written back unchanged and reported as an error.
    pub fn increment_checkpoint(&self, name: &str, delta: u64) -> Result<u64, StoreError> {
        let key = keys::checkpoint_key(name)?;
        let fault = Cell::new(None);

        let previous = self.checkpoints.fetch_and_update(key.as_bytes(), |old| {
            fault.set(None);
            let current = match old {
                None => 0,
                Some(raw) => match decode_offset(raw) {
                    Some(value) => value,
                    None => {
                        fault.set(Some(IncrementFault::Corrupt));
                        return Some(raw.to_vec());
                    }
                },
            };
            match current.checked_add(delta) {
                Some(next) => Some(encode_offset(next).to_vec()),
                None => {
                    fault.set(Some(IncrementFault::Overflow));
                    old.map(<[u8]>::to_vec)
                }
            }
        })?;

        match fault.get() {
            Some(IncrementFault::Corrupt) => Err(corrupt(&key)),
            Some(IncrementFault::Overflow) => Err(StoreError::Overflow { key }),
            None => match previous {
                Some(raw) => decode_offset(&raw).ok_or_else(|| corrupt(&key)),
                None => Ok(0),
            },
        }
    }
}

fn corrupt(key: &str) -> StoreError {
    StoreError::Validation(format!("corrupt checkpoint value: key={key}"))
}

impl CheckpointStore for Store {
    fn increment_and_get_previous(&self, key: &str, delta: u64) -> Result<u64, StoreError> {
        self.increment_checkpoint(key, delta)
    }

    fn set(&self, key: &str, value: u64) -> Result<(), StoreError> {
        self.set_checkpoint(key, value)
    }

    fn get(&self, key: &str) -> Result<u64, StoreError> {
        self.get_checkpoint(key)
    }
}
