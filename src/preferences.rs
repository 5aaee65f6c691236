//! Durable storage for the language and theme preferences.

use std::fmt::Debug;
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use fjall::Keyspace;
use serde::{Deserialize, Serialize};

use crate::{Result, WayraError};

pub const STORAGE_LANGUAGE: &str = "wayrascope:language";
pub const STORAGE_THEME: &str = "wayrascope:theme";

#[derive(Serialize, Deserialize)]
struct StoredPreference {
    value: String,
    updated_at: u64, // Unix timestamp (seconds)
}

/// Small key/value store for user preferences
pub struct PreferenceStore {
    _db: fjall::Database,
    store: Keyspace,
}

impl Debug for PreferenceStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PreferenceStore").finish_non_exhaustive()
    }
}

impl PreferenceStore {
    /// Opens (or creates) the store at `path`
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let db = fjall::Database::builder(path).open().map_err(|e| {
            WayraError::storage(format!(
                "Failed to open preference store at {}: {e}",
                path.display()
            ))
        })?;
        let store = db
            .keyspace("preferences", fjall::KeyspaceCreateOptions::default)
            .map_err(|e| WayraError::storage(format!("Failed to open preferences keyspace: {e}")))?;
        Ok(Self { _db: db, store })
    }

    /// Stores a preference value
    #[tracing::instrument(name = "put_preference", level = "debug", skip(self))]
    pub fn set(&self, key: &str, value: &str) -> Result<()> {
        let updated_at = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|elapsed| elapsed.as_secs())
            .unwrap_or_default();
        let entry = StoredPreference {
            value: value.to_string(),
            updated_at,
        };
        let bytes = postcard::to_stdvec(&entry)
            .map_err(|e| WayraError::storage(format!("Failed to encode preference: {e}")))?;

        self.store
            .insert(key.as_bytes(), bytes)
            .map_err(|e| WayraError::storage(format!("Failed to write preference {key}: {e}")))?;
        Ok(())
    }

    /// Reads a preference value; `None` when it was never written
    #[tracing::instrument(name = "query_preference", level = "debug", skip(self))]
    pub fn get(&self, key: &str) -> Result<Option<String>> {
        let maybe_bytes = self
            .store
            .get(key.as_bytes())
            .map_err(|e| WayraError::storage(format!("Failed to read preference {key}: {e}")))?;

        match maybe_bytes {
            Some(bytes) => {
                let entry: StoredPreference = postcard::from_bytes(&bytes)
                    .map_err(|e| WayraError::storage(format!("Corrupt preference {key}: {e}")))?;
                tracing::debug!(updated_at = entry.updated_at, "Preference found");
                Ok(Some(entry.value))
            }
            None => {
                tracing::debug!("Preference not found");
                Ok(None)
            }
        }
    }

    /// Removes a preference
    pub fn remove(&self, key: &str) -> Result<()> {
        self.store
            .remove(key.as_bytes())
            .map_err(|e| WayraError::storage(format!("Failed to remove preference {key}: {e}")))?;
        Ok(())
    }
}
