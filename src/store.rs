//! Persistent key-value store for onboarding answers.
//!
//! Onboarding writes the selected country, profile and category under fixed
//! keys; a chat session reads them once through [`load_context`]. Unreadable
//! or undecodable entries are logged and treated as absent so a damaged store
//! never blocks the chat.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::Context;
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::profile::{SelectedCategory, SelectedCountry, SessionContext, UserProfile};

/// Key of the selected destination.
pub const SELECTED_COUNTRY_KEY: &str = "selectedCountry";
/// Key of the selected chat topic.
pub const SELECTED_CATEGORY_KEY: &str = "selectedCategory";
/// Key of the questionnaire answers.
pub const USER_PROFILE_KEY: &str = "userProfile";

/// Durable key-value storage of JSON values.
#[async_trait]
pub trait ProfileStore: Send + Sync {
    /// Read the value under `key`.
    ///
    /// # Errors
    ///
    /// Returns an error when the backing storage cannot be read.
    async fn get(&self, key: &str) -> anyhow::Result<Option<Value>>;

    /// Write `value` under `key`, replacing any previous value.
    ///
    /// # Errors
    ///
    /// Returns an error when the backing storage cannot be written.
    async fn set(&self, key: &str, value: Value) -> anyhow::Result<()>;
}

// ---------------------------------------------------------------------------
// In-memory store
// ---------------------------------------------------------------------------

/// Process-local store, for tests and throwaway sessions.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<BTreeMap<String, Value>>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ProfileStore for MemoryStore {
    async fn get(&self, key: &str) -> anyhow::Result<Option<Value>> {
        Ok(self.entries.lock().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: Value) -> anyhow::Result<()> {
        self.entries.lock().await.insert(key.to_owned(), value);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// File store
// ---------------------------------------------------------------------------

/// Store backed by one JSON object file.
///
/// Writes go to a sibling temp file that is renamed over the original, so a
/// crash mid-write leaves the previous contents intact.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl FileStore {
    /// Store at `path`. The file is created on first write.
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            write_lock: Mutex::new(()),
        }
    }

    /// Backing file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read_all(&self) -> anyhow::Result<BTreeMap<String, Value>> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(contents) if contents.trim().is_empty() => Ok(BTreeMap::new()),
            Ok(contents) => serde_json::from_str(&contents)
                .with_context(|| format!("failed to parse state file {}", self.path.display())),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(BTreeMap::new()),
            Err(e) => Err(anyhow::anyhow!(
                "failed to read state file {}: {e}",
                self.path.display()
            )),
        }
    }
}

#[async_trait]
impl ProfileStore for FileStore {
    async fn get(&self, key: &str) -> anyhow::Result<Option<Value>> {
        Ok(self.read_all().await?.remove(key))
    }

    async fn set(&self, key: &str, value: Value) -> anyhow::Result<()> {
        let _guard = self.write_lock.lock().await;

        let mut entries = self.read_all().await?;
        entries.insert(key.to_owned(), value);
        let serialized =
            serde_json::to_string_pretty(&entries).context("failed to serialize state")?;

        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }

        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, serialized)
            .await
            .with_context(|| format!("failed to write {}", tmp.display()))?;
        tokio::fs::rename(&tmp, &self.path)
            .await
            .with_context(|| format!("failed to replace {}", self.path.display()))?;

        debug!(key, path = %self.path.display(), "state entry written");
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Typed access
// ---------------------------------------------------------------------------

/// Read and decode one entry, degrading any failure to `None`.
pub async fn read_entry<T: DeserializeOwned>(store: &dyn ProfileStore, key: &str) -> Option<T> {
    let value = match store.get(key).await {
        Ok(Some(value)) => value,
        Ok(None) => return None,
        Err(e) => {
            warn!(key, error = %e, "failed to read stored entry, treating as absent");
            return None;
        }
    };

    match serde_json::from_value(value) {
        Ok(decoded) => Some(decoded),
        Err(e) => {
            warn!(key, error = %e, "stored entry has unexpected shape, treating as absent");
            None
        }
    }
}

/// Encode and write one entry.
///
/// # Errors
///
/// Returns an error if serialization or the store write fails.
pub async fn write_entry<T: Serialize + Sync>(
    store: &dyn ProfileStore,
    key: &str,
    value: &T,
) -> anyhow::Result<()> {
    let json = serde_json::to_value(value)
        .with_context(|| format!("failed to serialize entry {key}"))?;
    store.set(key, json).await
}

/// Build a session context from whatever onboarding stored. Never fails.
pub async fn load_context(store: &dyn ProfileStore) -> SessionContext {
    let context = SessionContext {
        profile: read_entry::<UserProfile>(store, USER_PROFILE_KEY).await,
        country: read_entry::<SelectedCountry>(store, SELECTED_COUNTRY_KEY).await,
        category: read_entry::<SelectedCategory>(store, SELECTED_CATEGORY_KEY).await,
    };
    debug!(
        has_profile = context.profile.is_some(),
        has_country = context.country.is_some(),
        has_category = context.category.is_some(),
        "session context loaded"
    );
    context
}
