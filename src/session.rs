//! Session storage for access token, refresh token, and user profile.
//!
//! The [`SessionStore`] trait is the single seam every caller (pipeline,
//! login flow, logout flow, download workflow) depends on; concrete
//! storage is substitutable, so tests run against [`MemorySessionStore`]
//! while applications use the durable [`FileSessionStore`].
//!
//! Missing keys are not errors: `get` returns `None`. `set` overwrites
//! silently. `clear_all` is idempotent.

use std::collections::BTreeMap;
use std::collections::HashMap;
use std::path::PathBuf;

use async_trait::async_trait;
use parking_lot::RwLock;

use crate::error::Result;
use crate::types::TokenGrant;

/// Persisted key names used by the session.
pub mod keys {
    /// Access token attached as the bearer credential.
    pub const ACCESS_TOKEN: &str = "token";
    /// Refresh token exchanged for a new access token on 403.
    pub const REFRESH_TOKEN: &str = "refreshtoken";
    /// Last-known user profile, stored as a JSON string.
    pub const USER_PROFILE: &str = "userData";
    /// Shared download directory chosen on first shared-folder download.
    pub const DOWNLOAD_DIR: &str = "download_directory_uri";
}

/// Every key `clear_all` removes.
pub const SESSION_KEYS: [&str; 4] = [
    keys::ACCESS_TOKEN,
    keys::REFRESH_TOKEN,
    keys::USER_PROFILE,
    keys::DOWNLOAD_DIR,
];

/// Durable key/value storage for the session fields.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Return the stored value for `key`, or `None` if absent.
    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// Persist `value` under `key`, overwriting silently.
    async fn set(&self, key: &str, value: &str) -> Result<()>;

    /// Remove every persisted session key. Idempotent.
    async fn clear_all(&self) -> Result<()>;
}

/// Persist all three credential fields of a grant in one place.
///
/// Used by the login flow and by the pipeline after a successful token
/// refresh, so both paths store the same shape.
pub async fn persist_grant(store: &dyn SessionStore, grant: &TokenGrant) -> Result<()> {
    store.set(keys::ACCESS_TOKEN, &grant.token).await?;
    store.set(keys::REFRESH_TOKEN, &grant.refresh_token).await?;
    let profile = serde_json::to_string(&grant.user)?;
    store.set(keys::USER_PROFILE, &profile).await?;
    Ok(())
}

/// In-memory session store for tests and ephemeral sessions.
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    entries: RwLock<HashMap<String, String>>,
}

impl MemorySessionStore {
    /// Create an empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.read().get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        self.entries
            .write()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn clear_all(&self) -> Result<()> {
        let mut entries = self.entries.write();
        for key in SESSION_KEYS {
            entries.remove(key);
        }
        Ok(())
    }
}

/// File-backed session store: one pretty-printed JSON document on disk.
///
/// Survives process restarts until `clear_all`. The document is read on
/// every operation and rewritten on mutation; session state is three
/// short strings, so no caching layer is warranted.
#[derive(Debug, Clone)]
pub struct FileSessionStore {
    path: PathBuf,
}

impl FileSessionStore {
    /// Create a store backed by the given file path.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Default location: `~/.getrc/session.json`.
    pub fn default_path() -> PathBuf {
        let mut path = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
        path.push(".getrc");
        path.push("session.json");
        path
    }

    /// Path of the backing file.
    pub fn path(&self) -> &PathBuf {
        &self.path
    }

    async fn load(&self) -> Result<BTreeMap<String, String>> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => Ok(serde_json::from_str(&content)?),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(BTreeMap::new()),
            Err(err) => Err(err.into()),
        }
    }

    async fn save(&self, entries: &BTreeMap<String, String>) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let json = serde_json::to_string_pretty(entries)?;
        tokio::fs::write(&self.path, json).await?;
        Ok(())
    }
}

#[async_trait]
impl SessionStore for FileSessionStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.load().await?.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        let mut entries = self.load().await?;
        entries.insert(key.to_string(), value.to_string());
        self.save(&entries).await
    }

    async fn clear_all(&self) -> Result<()> {
        let mut entries = match self.load().await {
            Ok(entries) => entries,
            // Unreadable document: drop the whole file rather than leave
            // stale credentials behind. Clearing an empty store is not an
            // error.
            Err(_) => {
                match tokio::fs::remove_file(&self.path).await {
                    Ok(()) => return Ok(()),
                    Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(()),
                    Err(err) => return Err(err.into()),
                }
            }
        };
        for key in SESSION_KEYS {
            entries.remove(key);
        }
        self.save(&entries).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn memory_store_set_get_round_trip() {
        let store = MemorySessionStore::new();
        store.set(keys::ACCESS_TOKEN, "at-123").await.unwrap();
        assert_eq!(
            store.get(keys::ACCESS_TOKEN).await.unwrap(),
            Some("at-123".to_string())
        );
    }

    #[tokio::test]
    async fn memory_store_missing_key_is_absent_not_error() {
        let store = MemorySessionStore::new();
        assert_eq!(store.get(keys::REFRESH_TOKEN).await.unwrap(), None);
    }

    #[tokio::test]
    async fn memory_store_clear_all_removes_every_session_key() {
        let store = MemorySessionStore::new();
        store.set(keys::ACCESS_TOKEN, "a").await.unwrap();
        store.set(keys::REFRESH_TOKEN, "b").await.unwrap();
        store.set(keys::USER_PROFILE, "{}").await.unwrap();

        store.clear_all().await.unwrap();

        for key in SESSION_KEYS {
            assert_eq!(store.get(key).await.unwrap(), None);
        }

        // Idempotent: clearing an already-empty store succeeds.
        store.clear_all().await.unwrap();
    }

    #[tokio::test]
    async fn file_store_persists_across_instances() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");

        let store = FileSessionStore::new(&path);
        store.set(keys::ACCESS_TOKEN, "persisted").await.unwrap();
        drop(store);

        let reopened = FileSessionStore::new(&path);
        assert_eq!(
            reopened.get(keys::ACCESS_TOKEN).await.unwrap(),
            Some("persisted".to_string())
        );
    }

    #[tokio::test]
    async fn file_store_overwrites_silently() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileSessionStore::new(dir.path().join("session.json"));

        store.set(keys::REFRESH_TOKEN, "old").await.unwrap();
        store.set(keys::REFRESH_TOKEN, "new").await.unwrap();
        assert_eq!(
            store.get(keys::REFRESH_TOKEN).await.unwrap(),
            Some("new".to_string())
        );
    }

    #[tokio::test]
    async fn file_store_clear_all_on_missing_file_is_ok() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileSessionStore::new(dir.path().join("never-written.json"));
        store.clear_all().await.unwrap();
    }

    #[tokio::test]
    async fn persist_grant_stores_all_three_keys() {
        let store = MemorySessionStore::new();
        let grant: TokenGrant = serde_json::from_value(serde_json::json!({
            "token": "at-9",
            "refreshToken": "rt-9",
            "user": { "fullname": "Asha", "mobile": "9000000000" }
        }))
        .unwrap();

        persist_grant(&store, &grant).await.unwrap();

        assert_eq!(
            store.get(keys::ACCESS_TOKEN).await.unwrap(),
            Some("at-9".to_string())
        );
        assert_eq!(
            store.get(keys::REFRESH_TOKEN).await.unwrap(),
            Some("rt-9".to_string())
        );
        let profile = store.get(keys::USER_PROFILE).await.unwrap().unwrap();
        assert!(profile.contains("Asha"));
    }
}
