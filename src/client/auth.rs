//! Bearer credential injection and the bounded refresh budget.
//!
//! [`AuthInterceptor`] reads the current access token from the session
//! store before every transmission and attaches it as a bearer credential.
//! [`RefreshBudget`] is the coarse process-wide cap on refresh-triggered
//! replays: it lives on the pipeline instance (not in a module global),
//! and check-and-increment is a single atomic step, so two in-flight 403s
//! cannot both observe "below limit" without both consuming budget.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use async_trait::async_trait;

use crate::client::interceptor::{HttpRequest, Interceptor, RequestContext};
use crate::error::Result;
use crate::session::{keys, SessionStore};

/// Maximum refresh-triggered replays per budget instance.
pub const MAX_REFRESH_REPLAYS: u32 = 3;

/// Atomic counter bounding refresh-and-replay attempts.
///
/// Never reset during its lifetime; this is a deliberate coarse global
/// cap, not a per-request one.
#[derive(Debug)]
pub struct RefreshBudget {
    used: AtomicU32,
    limit: u32,
}

impl RefreshBudget {
    /// Budget with the default limit of [`MAX_REFRESH_REPLAYS`].
    pub fn new() -> Self {
        Self::with_limit(MAX_REFRESH_REPLAYS)
    }

    /// Budget with a custom limit.
    pub fn with_limit(limit: u32) -> Self {
        Self {
            used: AtomicU32::new(0),
            limit,
        }
    }

    /// Atomically reserve one replay slot.
    ///
    /// Returns false once the limit is reached; the slot is consumed even
    /// if the refresh that follows fails.
    pub fn try_reserve(&self) -> bool {
        self.used
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |used| {
                (used < self.limit).then_some(used + 1)
            })
            .is_ok()
    }

    /// Number of slots consumed so far.
    pub fn used(&self) -> u32 {
        self.used.load(Ordering::SeqCst)
    }

    /// Configured limit.
    pub fn limit(&self) -> u32 {
        self.limit
    }
}

impl Default for RefreshBudget {
    fn default() -> Self {
        Self::new()
    }
}

/// Interceptor that attaches the stored access token as a bearer credential.
pub struct AuthInterceptor {
    store: Arc<dyn SessionStore>,
}

impl AuthInterceptor {
    /// Create an interceptor reading tokens from `store`.
    pub fn new(store: Arc<dyn SessionStore>) -> Self {
        Self { store }
    }
}

impl std::fmt::Debug for AuthInterceptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthInterceptor").finish()
    }
}

#[async_trait]
impl Interceptor for AuthInterceptor {
    async fn on_request(&self, request: &mut HttpRequest, context: &RequestContext) -> Result<()> {
        // A replay already carries the rewritten header; never clobber it.
        if request.has_header("Authorization") {
            tracing::debug!(
                path = %context.path,
                "Authorization header already present - skipping bearer injection"
            );
            return Ok(());
        }

        match self.store.get(keys::ACCESS_TOKEN).await? {
            Some(token) => {
                request.set_header("Authorization", format!("Bearer {token}"));
                tracing::trace!(path = %context.path, "bearer credential attached");
            }
            None => {
                // Sent without credentials; the backend rejects it.
                tracing::debug!(
                    path = %context.path,
                    "no access token stored - sending request without credentials"
                );
            }
        }

        Ok(())
    }

    fn priority(&self) -> i32 {
        10 // Run early so later interceptors see the final headers.
    }
}
