// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Tessera-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Tessera and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Local persisted state.
//!
//! Only two things are persisted, both namespaced per user identity: the tail of the
//! conversation log and the sidebar visibility flag. Values are stored as JSON under string keys.

use std::collections::HashMap;
use std::sync::Mutex;

use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;

pub mod file;

pub use file::{FileStore, WriteDurability};

const CHAT_KEY_PREFIX: &str = "tessera.chat";
const SIDEBAR_KEY_PREFIX: &str = "tessera.sidebar";

/// Storage key of the persisted conversation log of `user`.
pub fn chat_key(user: &str) -> String {
    format!("{CHAT_KEY_PREFIX}.{user}")
}

/// Storage key of the sidebar visibility flag of `user`.
pub fn sidebar_key(user: &str) -> String {
    format!("{SIDEBAR_KEY_PREFIX}.{user}")
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("invalid store key {key:?}: {reason}")]
    InvalidKey { key: String, reason: &'static str },
    #[error("io error at {path}: {message}")]
    Io { path: String, message: String },
    #[error("stored value for {key:?} is not valid JSON: {message}")]
    Json { key: String, message: String },
}

/// Raw string storage. Implementations must be usable from one thread at a time at least.
pub trait KeyValueStore: Send + Sync {
    fn load_raw(&self, key: &str) -> Result<Option<String>, StoreError>;
    fn save_raw(&self, key: &str, value: &str) -> Result<(), StoreError>;
    fn remove(&self, key: &str) -> Result<(), StoreError>;
}

/// Typed access on top of [`KeyValueStore`].
pub trait KeyValueStoreExt: KeyValueStore {
    fn load<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, StoreError> {
        let Some(raw) = self.load_raw(key)? else {
            return Ok(None);
        };
        serde_json::from_str(&raw)
            .map(Some)
            .map_err(|err| StoreError::Json { key: key.to_owned(), message: err.to_string() })
    }

    fn save<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<(), StoreError> {
        let raw = serde_json::to_string(value)
            .map_err(|err| StoreError::Json { key: key.to_owned(), message: err.to_string() })?;
        self.save_raw(key, &raw)
    }
}

impl<S: KeyValueStore + ?Sized> KeyValueStoreExt for S {}

/// In-process store, used by tests and by hosts that opt out of persistence.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn keys(&self) -> Vec<String> {
        let entries = self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        let mut keys = entries.keys().cloned().collect::<Vec<_>>();
        keys.sort();
        keys
    }
}

impl KeyValueStore for MemoryStore {
    fn load_raw(&self, key: &str) -> Result<Option<String>, StoreError> {
        let entries = self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        Ok(entries.get(key).cloned())
    }

    fn save_raw(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let mut entries = self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        entries.insert(key.to_owned(), value.to_owned());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        let mut entries = self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        entries.remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::{chat_key, sidebar_key, KeyValueStore, KeyValueStoreExt, MemoryStore, StoreError};

    #[test]
    fn keys_are_namespaced_per_identity() {
        assert_eq!(chat_key("ada"), "tessera.chat.ada");
        assert_eq!(sidebar_key("ada"), "tessera.sidebar.ada");
        assert_ne!(chat_key("ada"), chat_key("grace"));
    }

    #[test]
    fn memory_store_round_trips_typed_values() {
        let store = MemoryStore::new();
        assert_eq!(store.load::<bool>("flag").expect("load"), None);

        store.save("flag", &true).expect("save");
        assert_eq!(store.load::<bool>("flag").expect("load"), Some(true));

        store.remove("flag").expect("remove");
        assert!(store.keys().is_empty());
    }

    #[test]
    fn malformed_values_report_the_key() {
        let store = MemoryStore::new();
        store.save_raw("broken", "{not json").expect("save");
        let err = store.load::<bool>("broken").expect_err("malformed");
        assert!(matches!(err, StoreError::Json { key, .. } if key == "broken"));
    }
}
