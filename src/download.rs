//! Local file persistence for downloaded RC artifacts.
//!
//! The workflow is strictly sequential per download: acquire a writable
//! storage target → transcode the payload to base64 → write (the write
//! primitive decodes the base64 text back to bytes, matching the platform
//! write contract) → verify the file exists and is non-empty → register
//! the file with a media gallery album (a no-op unless a registrar is
//! configured).
//!
//! Target selection is a capability probe at call time: a previously
//! granted shared directory is preferred (and cached in the session store
//! under [`keys::DOWNLOAD_DIR`]); if no shared directory is available the
//! app-private cache directory is used. A shared-directory WRITE failure
//! falls back to the cache; a shared-directory PERMISSION failure aborts
//! with no partial file.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;

use crate::error::{Error, Result};
use crate::session::{keys, SessionStore};

/// Album name for media gallery registration.
pub const GALLERY_ALBUM: &str = "Download";

/// Where a download may be written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageTarget {
    /// A user-granted shared directory.
    SharedDirectory(PathBuf),
    /// The app-private cache directory.
    PrivateCache(PathBuf),
}

impl StorageTarget {
    /// Directory this target writes into.
    pub fn dir(&self) -> &Path {
        match self {
            Self::SharedDirectory(dir) | Self::PrivateCache(dir) => dir,
        }
    }
}

/// Which location a download actually landed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SavedLocation {
    /// The user-granted shared directory.
    SharedDirectory,
    /// The app-private cache (fallback or default).
    PrivateCache,
}

/// Outcome of a successful save.
#[derive(Debug, Clone)]
pub struct SavedFile {
    /// Full path of the written file.
    pub path: PathBuf,
    /// Which location was used.
    pub location: SavedLocation,
}

/// Registers a written file with a shared media gallery.
///
/// Platform-specific; the default workflow uses [`NoopRegistrar`].
#[async_trait]
pub trait MediaRegistrar: Send + Sync {
    /// Register `path` under the named album.
    async fn register(&self, path: &Path, album: &str) -> Result<()>;
}

/// Registrar that does nothing, for platforms without a media gallery.
#[derive(Debug, Default)]
pub struct NoopRegistrar;

#[async_trait]
impl MediaRegistrar for NoopRegistrar {
    async fn register(&self, _path: &Path, _album: &str) -> Result<()> {
        Ok(())
    }
}

/// The download-decode-write-verify workflow.
pub struct DownloadWorkflow {
    store: Arc<dyn SessionStore>,
    cache_dir: PathBuf,
    shared_dir: Option<PathBuf>,
    registrar: Arc<dyn MediaRegistrar>,
}

impl DownloadWorkflow {
    /// Workflow writing into the app-private `cache_dir` by default.
    pub fn new(store: Arc<dyn SessionStore>, cache_dir: impl Into<PathBuf>) -> Self {
        Self {
            store,
            cache_dir: cache_dir.into(),
            shared_dir: None,
            registrar: Arc::new(NoopRegistrar),
        }
    }

    /// Use a user-granted shared directory as the preferred target.
    pub fn with_shared_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.shared_dir = Some(dir.into());
        self
    }

    /// Register written files with a media gallery.
    pub fn with_registrar(mut self, registrar: Arc<dyn MediaRegistrar>) -> Self {
        self.registrar = registrar;
        self
    }

    /// Acquire a target, then save `bytes` under `file_name`.
    ///
    /// A permission failure at acquisition aborts with
    /// [`Error::PermissionDenied`] and leaves no partial file. A write
    /// failure in the shared directory falls back to the private cache.
    pub async fn save(&self, file_name: &str, bytes: &[u8]) -> Result<SavedFile> {
        let target = self.acquire_target().await?;
        self.save_to(target, file_name, bytes).await
    }

    /// Save into an already-acquired target.
    ///
    /// Callers that must order the permission check before other work
    /// (the RC download fetches only after acquisition succeeds) acquire
    /// first via [`acquire_target`](Self::acquire_target).
    pub async fn save_to(
        &self,
        target: StorageTarget,
        file_name: &str,
        bytes: &[u8],
    ) -> Result<SavedFile> {
        // Transient textual representation of the artifact.
        let encoded = BASE64.encode(bytes);

        match target {
            StorageTarget::SharedDirectory(dir) => {
                let path = dir.join(file_name);
                match write_base64(&path, &encoded).await {
                    Ok(()) => {
                        self.verify_and_register(&path).await?;
                        Ok(SavedFile {
                            path,
                            location: SavedLocation::SharedDirectory,
                        })
                    }
                    Err(err) => {
                        tracing::warn!(
                            error = %err,
                            dir = %dir.display(),
                            "shared directory write failed - falling back to app cache"
                        );
                        let fallback = self.cache_dir.join(file_name);
                        write_base64(&fallback, &encoded).await?;
                        self.verify_and_register(&fallback).await?;
                        Ok(SavedFile {
                            path: fallback,
                            location: SavedLocation::PrivateCache,
                        })
                    }
                }
            }
            StorageTarget::PrivateCache(dir) => {
                let path = dir.join(file_name);
                write_base64(&path, &encoded).await?;
                self.verify_and_register(&path).await?;
                Ok(SavedFile {
                    path,
                    location: SavedLocation::PrivateCache,
                })
            }
        }
    }

    /// Probe for a writable target at call time.
    ///
    /// Preference order: the directory cached in the session store, the
    /// configured shared directory (cached on first success), then the
    /// private cache. A configured shared directory that fails the probe
    /// is a permission denial and aborts the operation.
    pub async fn acquire_target(&self) -> Result<StorageTarget> {
        if let Some(cached) = self.store.get(keys::DOWNLOAD_DIR).await? {
            let dir = PathBuf::from(&cached);
            if probe_writable(&dir).await {
                return Ok(StorageTarget::SharedDirectory(dir));
            }
            tracing::warn!(dir = %cached, "cached download directory no longer writable");
        }

        if let Some(dir) = &self.shared_dir {
            if !probe_writable(dir).await {
                return Err(Error::PermissionDenied(format!(
                    "no write access to shared directory {}",
                    dir.display()
                )));
            }
            self.store
                .set(keys::DOWNLOAD_DIR, &dir.to_string_lossy())
                .await?;
            return Ok(StorageTarget::SharedDirectory(dir.clone()));
        }

        Ok(StorageTarget::PrivateCache(self.cache_dir.clone()))
    }

    async fn verify_and_register(&self, path: &Path) -> Result<()> {
        verify_written(path).await?;
        self.registrar.register(path, GALLERY_ALBUM).await?;
        tracing::debug!(path = %path.display(), album = GALLERY_ALBUM, "registered with media gallery");
        Ok(())
    }
}

impl std::fmt::Debug for DownloadWorkflow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DownloadWorkflow")
            .field("cache_dir", &self.cache_dir)
            .field("shared_dir", &self.shared_dir)
            .finish()
    }
}

/// Check write access by creating the directory and a probe file in it.
async fn probe_writable(dir: &Path) -> bool {
    if tokio::fs::create_dir_all(dir).await.is_err() {
        return false;
    }
    let probe = dir.join(".write-probe");
    match tokio::fs::write(&probe, b"").await {
        Ok(()) => {
            let _ = tokio::fs::remove_file(&probe).await;
            true
        }
        Err(_) => false,
    }
}

/// Write a base64 artifact to `path`, decoding it back to raw bytes.
async fn write_base64(path: &Path, encoded: &str) -> Result<()> {
    let bytes = BASE64.decode(encoded)?;
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::write(path, bytes).await?;
    Ok(())
}

/// Post-write verification: the file must exist and be non-empty.
async fn verify_written(path: &Path) -> Result<()> {
    match tokio::fs::metadata(path).await {
        Ok(meta) if meta.len() > 0 => Ok(()),
        _ => Err(Error::WriteVerification {
            path: path.to_path_buf(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::MemorySessionStore;

    fn workflow_with_cache(cache: &Path) -> DownloadWorkflow {
        DownloadWorkflow::new(Arc::new(MemorySessionStore::new()), cache)
    }

    #[tokio::test]
    async fn save_to_private_cache_round_trips_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let workflow = workflow_with_cache(dir.path());

        let payload = b"\x89PNG\r\n\x1a\nfake-image-bytes";
        let saved = workflow.save("RJ14AB1234_RC.png", payload).await.unwrap();

        assert_eq!(saved.location, SavedLocation::PrivateCache);
        let written = std::fs::read(&saved.path).unwrap();
        assert_eq!(written, payload);
    }

    #[tokio::test]
    async fn shared_dir_is_cached_in_session_store() {
        let dir = tempfile::tempdir().unwrap();
        let shared = dir.path().join("shared");
        let store = Arc::new(MemorySessionStore::new());
        let workflow = DownloadWorkflow::new(store.clone(), dir.path().join("cache"))
            .with_shared_dir(&shared);

        let saved = workflow.save("a_RC.png", b"data").await.unwrap();
        assert_eq!(saved.location, SavedLocation::SharedDirectory);

        let cached = store.get(keys::DOWNLOAD_DIR).await.unwrap().unwrap();
        assert_eq!(PathBuf::from(cached), shared);
    }

    #[tokio::test]
    async fn unwritable_shared_dir_is_permission_denied_with_no_file() {
        let dir = tempfile::tempdir().unwrap();
        // A file where a directory is expected makes the probe fail.
        let blocked = dir.path().join("blocked");
        std::fs::write(&blocked, b"not a directory").unwrap();

        let workflow =
            workflow_with_cache(&dir.path().join("cache")).with_shared_dir(&blocked);
        let err = workflow.save("a_RC.png", b"data").await.unwrap_err();

        assert!(matches!(err, Error::PermissionDenied(_)), "{err:?}");
        assert!(!blocked.join("a_RC.png").exists());
        assert!(!dir.path().join("cache").join("a_RC.png").exists());
    }

    #[tokio::test]
    async fn shared_write_failure_falls_back_to_cache() {
        let dir = tempfile::tempdir().unwrap();
        let shared = dir.path().join("shared");
        std::fs::create_dir_all(&shared).unwrap();
        // The probe passes on the shared dir, but the target filename
        // collides with an existing file used as a directory component.
        std::fs::write(shared.join("sub"), b"file, not dir").unwrap();

        let cache = dir.path().join("cache");
        let workflow = workflow_with_cache(&cache).with_shared_dir(&shared);

        let saved = workflow.save("sub/a_RC.pdf", b"pdf-bytes").await.unwrap();
        assert_eq!(saved.location, SavedLocation::PrivateCache);
        assert!(saved.path.starts_with(&cache));
        assert_eq!(std::fs::read(&saved.path).unwrap(), b"pdf-bytes");
    }

    #[tokio::test]
    async fn default_registrar_is_a_silent_success() {
        // `new` wires in NoopRegistrar, so a save with no registrar
        // configured still runs the full verify-and-register tail.
        NoopRegistrar
            .register(Path::new("anywhere/a_RC.png"), GALLERY_ALBUM)
            .await
            .unwrap();

        let dir = tempfile::tempdir().unwrap();
        let workflow = workflow_with_cache(dir.path());
        let saved = workflow.save("b_RC.png", b"img").await.unwrap();
        assert!(saved.path.exists());
    }

    #[tokio::test]
    async fn registrar_receives_written_path_and_album() {
        struct Recording(parking_lot::Mutex<Vec<(PathBuf, String)>>);

        #[async_trait]
        impl MediaRegistrar for Recording {
            async fn register(&self, path: &Path, album: &str) -> Result<()> {
                self.0.lock().push((path.to_path_buf(), album.to_string()));
                Ok(())
            }
        }

        let dir = tempfile::tempdir().unwrap();
        let registrar = Arc::new(Recording(parking_lot::Mutex::new(Vec::new())));
        let workflow = workflow_with_cache(dir.path()).with_registrar(registrar.clone());

        let saved = workflow.save("a_RC.png", b"img").await.unwrap();

        let calls = registrar.0.lock();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].0, saved.path);
        assert_eq!(calls[0].1, GALLERY_ALBUM);
    }

    #[tokio::test]
    async fn empty_payload_fails_post_write_verification() {
        let dir = tempfile::tempdir().unwrap();
        let workflow = workflow_with_cache(dir.path());

        let err = workflow.save("empty_RC.png", b"").await.unwrap_err();
        assert!(matches!(err, Error::WriteVerification { .. }), "{err:?}");
    }
}
