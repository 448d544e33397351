//! Shared session handling
//!
//! The session is an immutable snapshot behind a `tokio::sync::RwLock`.
//! Fetches clone the current `Arc<Session>` and keep using it even if it is
//! replaced while they are in flight. A refresh holds the write lock for the
//! whole login, so new fetches wait for the fresh cookies, and a refresh for
//! a generation that has already been superseded returns the newer session
//! without logging in again.

use crate::auth::{AuthError, Authenticator};
use crate::transport::CookieSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;

/// An authenticated session
#[derive(Debug, Clone)]
pub struct Session {
    generation: u64,
    cookies: CookieSet,
}

impl Session {
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn cookies(&self) -> &CookieSet {
        &self.cookies
    }
}

/// Owns the current session and serializes re-authentication
pub struct SessionManager {
    authenticator: Arc<dyn Authenticator>,
    current: RwLock<Arc<Session>>,
    refreshes: AtomicUsize,
}

impl SessionManager {
    /// Logs in for the first time
    pub async fn establish(authenticator: Arc<dyn Authenticator>) -> Result<Self, AuthError> {
        let cookies = authenticator.login().await?;
        tracing::info!(cookies = cookies.len(), "Session established");

        Ok(Self {
            authenticator,
            current: RwLock::new(Arc::new(Session {
                generation: 0,
                cookies,
            })),
            refreshes: AtomicUsize::new(0),
        })
    }

    /// The current session; waits while a refresh is in progress
    pub async fn current(&self) -> Arc<Session> {
        self.current.read().await.clone()
    }

    /// Replaces `stale` with a freshly authenticated session
    ///
    /// If another task already replaced `stale`, its session is returned
    /// and no login happens.
    pub async fn refresh(&self, stale: &Session) -> Result<Arc<Session>, AuthError> {
        let mut current = self.current.write().await;
        if current.generation != stale.generation {
            tracing::debug!(
                generation = current.generation,
                "Session already refreshed by another request"
            );
            return Ok(current.clone());
        }

        tracing::info!(generation = stale.generation, "Session expired, re-authenticating");
        let cookies = self.authenticator.login().await?;
        let session = Arc::new(Session {
            generation: stale.generation + 1,
            cookies,
        });
        *current = session.clone();
        self.refreshes.fetch_add(1, Ordering::Relaxed);

        Ok(session)
    }

    /// Number of re-authentications performed since the first login
    pub fn refreshes(&self) -> usize {
        self.refreshes.load(Ordering::Relaxed)
    }
}
