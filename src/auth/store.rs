//! Two-tier session storage.
//!
//! The same logical record can live in one of two places, distinguished
//! only by lifetime:
//!
//! - **Durable**: one `<key>.json` file per key under the data directory,
//!   survives process restart ("remember me").
//! - **Ephemeral**: an in-process map, gone when the process exits.
//!
//! The store guarantees that at most one tier holds a session at a time:
//! a successful write clears the other tier, and `clear` always sweeps
//! both. Readers check the durable tier first, deterministically.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard};

use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::{debug, warn};

use super::session::{SessionRecord, UserInfo};

/// Storage key for the session record, in both tiers.
const AUTH_TOKEN_KEY: &str = "authToken";

/// Storage key for the denormalized user cache (ephemeral only).
const CURRENT_USER_KEY: &str = "currentUser";

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("failed to access session storage: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to encode session data: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Lifetime of a stored session, chosen at issuance by "remember me".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Durability {
    /// Survives process restart.
    Durable,
    /// Cleared when the process exits.
    Ephemeral,
}

/// Key/value storage spanning both tiers.
///
/// Cloning is cheap; clones share the ephemeral map, so a background task
/// holding a clone observes the same state as the main loop.
#[derive(Clone)]
pub struct SessionStore {
    durable_dir: PathBuf,
    ephemeral: Arc<Mutex<HashMap<String, String>>>,
}

impl SessionStore {
    /// Create a store with its durable tier rooted at `durable_dir`.
    /// The directory is created if it does not exist.
    pub fn new(durable_dir: PathBuf) -> Result<Self, StoreError> {
        std::fs::create_dir_all(&durable_dir)?;
        Ok(Self {
            durable_dir,
            ephemeral: Arc::new(Mutex::new(HashMap::new())),
        })
    }

    /// Read whichever session record is present, durable tier first.
    /// Corrupt entries are purged and skipped.
    pub fn read(&self) -> Option<(SessionRecord, Durability)> {
        for tier in [Durability::Durable, Durability::Ephemeral] {
            if let Some(record) = self.read_parsed::<SessionRecord>(tier, AUTH_TOKEN_KEY) {
                return Some((record, tier));
            }
        }
        None
    }

    /// Store a session record in the chosen tier. The other tier is
    /// cleared once the new record lands, so only one location is ever
    /// populated and a failed write leaves the previous session intact.
    pub fn write(&self, record: &SessionRecord, durability: Durability) -> Result<(), StoreError> {
        let contents = serde_json::to_string(record)?;
        match durability {
            Durability::Durable => {
                std::fs::write(self.key_path(AUTH_TOKEN_KEY), contents)?;
                self.remove(Durability::Ephemeral, AUTH_TOKEN_KEY);
            }
            Durability::Ephemeral => {
                self.ephemeral_map().insert(AUTH_TOKEN_KEY.to_string(), contents);
                self.remove(Durability::Durable, AUTH_TOKEN_KEY);
            }
        }
        debug!(?durability, "Session record stored");
        Ok(())
    }

    /// Remove the session record from both tiers and drop the cached
    /// user. Safe to call when nothing is stored.
    pub fn clear(&self) {
        self.remove(Durability::Durable, AUTH_TOKEN_KEY);
        self.remove(Durability::Ephemeral, AUTH_TOKEN_KEY);
        self.remove(Durability::Ephemeral, CURRENT_USER_KEY);
    }

    /// Refresh the denormalized `currentUser` cache.
    pub fn cache_user(&self, user: &UserInfo) -> Result<(), StoreError> {
        let contents = serde_json::to_string(user)?;
        self.ephemeral_map().insert(CURRENT_USER_KEY.to_string(), contents);
        Ok(())
    }

    /// The cached user, if one was written since process start.
    pub fn cached_user(&self) -> Option<UserInfo> {
        self.read_parsed(Durability::Ephemeral, CURRENT_USER_KEY)
    }

    fn key_path(&self, key: &str) -> PathBuf {
        self.durable_dir.join(format!("{}.json", key))
    }

    fn ephemeral_map(&self) -> MutexGuard<'_, HashMap<String, String>> {
        // A poisoned lock only means another thread panicked mid-write;
        // the map itself is still usable.
        self.ephemeral
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn read_raw(&self, tier: Durability, key: &str) -> Option<String> {
        match tier {
            Durability::Durable => {
                let path = self.key_path(key);
                if !path.exists() {
                    return None;
                }
                match std::fs::read_to_string(&path) {
                    Ok(contents) => Some(contents),
                    Err(e) => {
                        warn!(key, error = %e, "Failed to read durable entry");
                        None
                    }
                }
            }
            Durability::Ephemeral => self.ephemeral_map().get(key).cloned(),
        }
    }

    /// Read and parse an entry; a corrupt entry is erased and reported
    /// as absent.
    fn read_parsed<T: DeserializeOwned>(&self, tier: Durability, key: &str) -> Option<T> {
        let raw = self.read_raw(tier, key)?;
        match serde_json::from_str(&raw) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!(key, ?tier, error = %e, "Purging unparseable entry");
                self.remove(tier, key);
                None
            }
        }
    }

    fn remove(&self, tier: Durability, key: &str) {
        match tier {
            Durability::Durable => {
                let path = self.key_path(key);
                if path.exists() {
                    if let Err(e) = std::fs::remove_file(&path) {
                        warn!(key, error = %e, "Failed to remove durable entry");
                    }
                }
            }
            Durability::Ephemeral => {
                self.ephemeral_map().remove(key);
            }
        }
    }

    #[cfg(test)]
    fn has_durable(&self, key: &str) -> bool {
        self.key_path(key).exists()
    }

    #[cfg(test)]
    fn has_ephemeral(&self, key: &str) -> bool {
        self.ephemeral_map().contains_key(key)
    }

    #[cfg(test)]
    pub(super) fn write_raw_for_test(&self, tier: Durability, key: &str, contents: &str) {
        match tier {
            Durability::Durable => {
                std::fs::write(self.key_path(key), contents).unwrap();
            }
            Durability::Ephemeral => {
                self.ephemeral_map().insert(key.to_string(), contents.to_string());
            }
        }
    }
}
