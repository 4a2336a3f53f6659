//! Client SDK for the GetRC vehicle-registration-certificate service.
//!
//! The SDK covers everything below the presentation layer of a GetRC
//! client: durable session storage, an authenticated request pipeline
//! with a bounded token-refresh-and-replay, the full backend API surface,
//! and the download-decode-write-verify file persistence workflow.
//!
//! # Architecture
//!
//! - [`session`] — the [`SessionStore`](session::SessionStore) trait and
//!   its file-backed and in-memory implementations. Access token, refresh
//!   token, and user profile live here and nowhere else.
//! - [`client`] — [`GetRcClient`](client::GetRcClient) and the
//!   [`RequestPipeline`](client::RequestPipeline): bearer injection via an
//!   interceptor chain, and on HTTP 403 at most three (per pipeline
//!   instance) refresh-and-replay attempts.
//! - [`download`] — [`DownloadWorkflow`](download::DownloadWorkflow):
//!   capability-probed storage targets with shared-directory to
//!   private-cache fallback, base64 transcode, post-write verification,
//!   and optional media gallery registration.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use getrc_client::client::{ClientConfig, GetRcClient};
//! use getrc_client::download::DownloadWorkflow;
//! use getrc_client::session::FileSessionStore;
//!
//! # async fn example() -> getrc_client::Result<()> {
//! let store = Arc::new(FileSessionStore::new(FileSessionStore::default_path()));
//! let config = ClientConfig::new("http://192.168.29.124:8080/");
//! let client = GetRcClient::new(&config, store.clone())?;
//!
//! client.login("user@example.com", "correct").await?;
//! let dashboard = client.dashboard().await?;
//! println!("balance: {:?}", dashboard.user_data.balance);
//!
//! let workflow = DownloadWorkflow::new(store, "/tmp/getrc-cache");
//! let saved = client.download_basic_rc("RJ14AB1234", &workflow).await?;
//! println!("saved to {} ({:?})", saved.path.display(), saved.location);
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]

pub mod client;
pub mod download;
pub mod error;
pub mod session;
pub mod types;

pub use client::{ClientConfig, GetRcClient, RcKind, SignupParams};
pub use download::{DownloadWorkflow, SavedFile, SavedLocation};
pub use error::{Error, Result};
pub use session::{FileSessionStore, MemorySessionStore, SessionStore};
pub use types::{DashboardData, TokenGrant, Transaction, UserProfile};
