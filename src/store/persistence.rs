//! Local state persistence backed by an embedded database
//!
//! Stores chat sessions and knowledge data as JSON values under
//! well-known string keys, mirroring the browser client's local
//! storage entries so a dump of either is interchangeable.

use crate::config::StorageConfig;
use crate::error::{QaChatError, Result};
use anyhow::Context;
use directories::ProjectDirs;
use serde::{de::DeserializeOwned, Serialize};
use sled::Db;
use std::path::PathBuf;

/// Key holding the serialized chat session list
pub const SESSIONS_KEY: &str = "chatSessions";

/// Key holding the active chat session id
pub const ACTIVE_CHAT_KEY: &str = "activeChatId";

/// Key holding knowledge bases and their document lists
pub const KNOWLEDGE_KEY: &str = "knowledge_data";

/// Embedded key-value store for client state
///
/// Values are JSON documents keyed by the same strings the browser
/// client uses, so state survives round trips between the two.
/// Cloning is cheap and clones share the underlying database, which is
/// how the chat and knowledge stores write to one file.
#[derive(Clone)]
pub struct LocalStore {
    db: Db,
}

impl LocalStore {
    /// Open the store in the user's data directory
    ///
    /// Honors the `QACHAT_DATA_DIR` environment variable as an override,
    /// which makes it easy to point the binary at a scratch directory
    /// without touching the user's application data.
    ///
    /// # Errors
    ///
    /// Returns `QaChatError::Storage` if the data directory cannot be
    /// determined or the database cannot be opened
    pub fn open_default() -> Result<Self> {
        if let Ok(override_dir) = std::env::var("QACHAT_DATA_DIR") {
            return Self::open_at(override_dir);
        }

        let proj_dirs = ProjectDirs::from("com", "qachat", "qachat")
            .ok_or_else(|| QaChatError::Storage("Could not determine data directory".into()))?;

        Self::open_at(proj_dirs.data_dir())
    }

    /// Open the store honoring a configured directory override
    ///
    /// # Errors
    ///
    /// Returns `QaChatError::Storage` if the store cannot be opened
    pub fn open_configured(config: &StorageConfig) -> Result<Self> {
        match &config.data_dir {
            Some(dir) => Self::open_at(dir.clone()),
            None => Self::open_default(),
        }
    }

    /// Open the store under the given directory
    ///
    /// The directory is created if it does not exist. This is the entry
    /// point tests use with a temporary directory.
    ///
    /// # Errors
    ///
    /// Returns `QaChatError::Storage` if the directory cannot be created
    /// or the database cannot be opened
    pub fn open_at<P: Into<PathBuf>>(dir: P) -> Result<Self> {
        let dir = dir.into();

        std::fs::create_dir_all(&dir)
            .context("Failed to create data directory")
            .map_err(|e| QaChatError::Storage(e.to_string()))?;

        let db = sled::open(dir.join("state.db"))
            .map_err(|e| QaChatError::Storage(format!("Failed to open database: {}", e)))?;

        Ok(Self { db })
    }

    /// Load and deserialize the value stored under `key`
    ///
    /// # Returns
    ///
    /// Returns `Ok(None)` if the key is absent
    ///
    /// # Errors
    ///
    /// Returns `QaChatError::Storage` if retrieval or deserialization fails
    pub fn load<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        match self
            .db
            .get(key)
            .map_err(|e| QaChatError::Storage(format!("Get failed: {}", e)))?
        {
            Some(bytes) => {
                let value = serde_json::from_slice(&bytes)
                    .map_err(|e| QaChatError::Storage(format!("Deserialization failed: {}", e)))?;
                Ok(Some(value))
            }
            None => Ok(None),
        }
    }

    /// Serialize `value` and store it under `key`
    ///
    /// # Errors
    ///
    /// Returns `QaChatError::Storage` if serialization or insertion fails
    pub fn save<T: Serialize>(&self, key: &str, value: &T) -> Result<()> {
        let bytes = serde_json::to_vec(value)
            .map_err(|e| QaChatError::Storage(format!("Serialization failed: {}", e)))?;

        self.db
            .insert(key, bytes)
            .map_err(|e| QaChatError::Storage(format!("Insert failed: {}", e)))?;

        self.db
            .flush()
            .map_err(|e| QaChatError::Storage(format!("Flush failed: {}", e)))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use tempfile::TempDir;

    /// Create a store rooted in a temporary directory for tests
    pub(crate) fn create_test_store() -> (LocalStore, TempDir) {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let store = LocalStore::open_at(temp_dir.path()).expect("Failed to open store");
        (store, temp_dir)
    }

    #[test]
    fn test_open_at_creates_directory() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let nested = temp_dir.path().join("deep").join("nested");

        let result = LocalStore::open_at(&nested);
        assert!(result.is_ok());
        assert!(nested.exists());
    }

    #[test]
    fn test_save_and_load_roundtrip() {
        let (store, _dir) = create_test_store();

        let value = vec!["alpha".to_string(), "beta".to_string()];
        store.save("test_key", &value).expect("Failed to save");

        let loaded: Option<Vec<String>> = store.load("test_key").expect("Failed to load");
        assert_eq!(loaded, Some(value));
    }

    #[test]
    fn test_load_missing_key_returns_none() {
        let (store, _dir) = create_test_store();

        let loaded: Option<Vec<String>> = store.load("absent").expect("Failed to load");
        assert!(loaded.is_none());
    }

    #[test]
    fn test_load_wrong_shape_errors() {
        let (store, _dir) = create_test_store();

        store.save("test_key", &"just a string").expect("Failed to save");

        let loaded: Result<Option<Vec<u32>>> = store.load("test_key");
        assert!(loaded.is_err());
    }

    #[test]
    fn test_save_overwrites_previous_value() {
        let (store, _dir) = create_test_store();

        store.save("counter", &1u32).expect("Failed to save");
        store.save("counter", &2u32).expect("Failed to save");

        let loaded: Option<u32> = store.load("counter").expect("Failed to load");
        assert_eq!(loaded, Some(2));
    }

    #[test]
    fn test_values_survive_reopen() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");

        {
            let store = LocalStore::open_at(temp_dir.path()).expect("Failed to open store");
            store.save("persisted", &42u32).expect("Failed to save");
        }

        let store = LocalStore::open_at(temp_dir.path()).expect("Failed to reopen store");
        let loaded: Option<u32> = store.load("persisted").expect("Failed to load");
        assert_eq!(loaded, Some(42));
    }

    #[test]
    #[serial]
    fn test_open_default_honors_env_override() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        std::env::set_var("QACHAT_DATA_DIR", temp_dir.path());

        let store = LocalStore::open_default().expect("Failed to open store");
        store.save("env_key", &"value").expect("Failed to save");

        assert!(temp_dir.path().join("state.db").exists());

        std::env::remove_var("QACHAT_DATA_DIR");
    }

    #[test]
    fn test_storage_keys_match_browser_client() {
        assert_eq!(SESSIONS_KEY, "chatSessions");
        assert_eq!(ACTIVE_CHAT_KEY, "activeChatId");
        assert_eq!(KNOWLEDGE_KEY, "knowledge_data");
    }
}
