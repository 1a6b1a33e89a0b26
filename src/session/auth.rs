use std::future::Future;
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use super::{Session, SessionHandle, SessionStore};
use crate::error::FeedError;
use crate::xrpc::XrpcClient;

/// What happened when restoring a stored session at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResumeOutcome {
    /// The stored access token is still accepted.
    Resumed(Session),
    /// The access token had expired and was refreshed.
    Refreshed(Session),
    /// The service could not be reached; the stored session is used unverified.
    Unverified(Session),
    /// Nothing was stored.
    NoSession,
    /// The stored session was rejected and has been discarded.
    Expired,
}

/// Login, logout, session resume and token refresh. The only writer of the
/// session handle.
#[derive(Clone)]
pub struct Authenticator {
    client: XrpcClient,
    store: SessionStore,
    /// Serializes refreshes; refresh tokens are single use.
    refresh_lock: Arc<Mutex<()>>,
}

impl Authenticator {
    #[must_use]
    pub fn new(client: XrpcClient, store: SessionStore) -> Self {
        Self {
            client,
            store,
            refresh_lock: Arc::new(Mutex::new(())),
        }
    }

    #[must_use]
    pub fn client(&self) -> &XrpcClient {
        &self.client
    }

    #[must_use]
    pub fn session(&self) -> &SessionHandle {
        self.client.session()
    }

    /// Create a session and persist it.
    ///
    /// # Errors
    ///
    /// Returns an error if the credentials are rejected or the session cannot be stored.
    pub async fn login(&self, identifier: &str, password: &str) -> Result<Session> {
        let session = self
            .client
            .create_session(identifier.trim(), password)
            .await
            .context("Login failed")?;
        self.store
            .save(&session)
            .await
            .context("Failed to persist session")?;
        self.session().set(session.clone());
        info!(handle = %session.handle, "Logged in");
        Ok(session)
    }

    /// Drop the current session locally and, best effort, on the server.
    ///
    /// # Errors
    ///
    /// Returns an error if the stored session cannot be removed.
    pub async fn logout(&self) -> Result<()> {
        if let Some(session) = self.session().take() {
            if let Err(e) = self.client.delete_session(&session.refresh_jwt).await {
                warn!(handle = %session.handle, "Failed to revoke session upstream: {e}");
            }
            info!(handle = %session.handle, "Logged out");
        }
        self.store
            .clear()
            .await
            .context("Failed to clear stored session")
    }

    /// Restore the stored session, refreshing it if the access token expired.
    ///
    /// # Errors
    ///
    /// Returns an error only if the session store itself fails.
    pub async fn resume(&self) -> Result<ResumeOutcome> {
        let stored = match self.store.load().await {
            Ok(Some(session)) => session,
            Ok(None) => return Ok(ResumeOutcome::NoSession),
            Err(e) => {
                warn!("Discarding unreadable session: {e}");
                self.store.clear().await.context("Failed to clear stored session")?;
                return Ok(ResumeOutcome::NoSession);
            }
        };

        self.session().set(stored.clone());
        match self.client.get_session().await {
            Ok(_) => {
                info!(handle = %stored.handle, "Session resumed");
                Ok(ResumeOutcome::Resumed(stored))
            }
            Err(e) if e.is_auth() => {
                info!(handle = %stored.handle, reason = %e, "Stored session rejected, refreshing");
                self.refresh(&stored).await
            }
            Err(e) => {
                warn!(handle = %stored.handle, "Could not verify stored session: {e}");
                Ok(ResumeOutcome::Unverified(stored))
            }
        }
    }

    async fn refresh(&self, stored: &Session) -> Result<ResumeOutcome> {
        match self.client.refresh_session(&stored.refresh_jwt).await {
            Ok(session) => {
                self.store
                    .save(&session)
                    .await
                    .context("Failed to persist refreshed session")?;
                self.session().set(session.clone());
                info!(handle = %session.handle, "Session refreshed");
                Ok(ResumeOutcome::Refreshed(session))
            }
            Err(e) if !e.is_auth() => {
                warn!(handle = %stored.handle, "Could not refresh stored session: {e}");
                Ok(ResumeOutcome::Unverified(stored.clone()))
            }
            Err(e) => {
                warn!(handle = %stored.handle, "Session refresh rejected: {e}");
                self.session().take();
                self.store
                    .clear()
                    .await
                    .context("Failed to clear stored session")?;
                Ok(ResumeOutcome::Expired)
            }
        }
    }

    /// Run an authenticated request, refreshing the session once if the
    /// access token has expired.
    ///
    /// The refreshed session is persisted before the request is retried. A
    /// rejected refresh is returned as the request's error.
    ///
    /// # Errors
    ///
    /// Returns the request's error, or the refresh error when the expired
    /// token could not be replaced.
    pub async fn call<T, F, Fut>(&self, request: F) -> Result<T, FeedError>
    where
        F: Fn(XrpcClient) -> Fut,
        Fut: Future<Output = Result<T, FeedError>>,
    {
        let used = self.session().current().map(|s| s.access_jwt);
        match request(self.client.clone()).await {
            Err(e) if e.is_expired_token() => {
                debug!("Access token expired, refreshing session");
                self.refresh_expired(used.as_deref()).await?;
                request(self.client.clone()).await
            }
            result => result,
        }
    }

    /// Replace the session whose access token `expired` was rejected.
    ///
    /// A concurrent request may have refreshed already; then the newer
    /// session is kept as is.
    async fn refresh_expired(&self, expired: Option<&str>) -> Result<(), FeedError> {
        let _guard = self.refresh_lock.lock().await;
        let current = self
            .session()
            .current()
            .ok_or_else(|| FeedError::Auth("no active session".to_string()))?;
        if expired.is_some_and(|token| token != current.access_jwt) {
            debug!(handle = %current.handle, "Session already refreshed");
            return Ok(());
        }

        let session = match self.client.refresh_session(&current.refresh_jwt).await {
            Ok(session) => session,
            Err(e) => {
                warn!(handle = %current.handle, "Session refresh failed: {e}");
                return Err(e);
            }
        };
        if let Err(e) = self.store.save(&session).await {
            warn!(handle = %session.handle, "Failed to persist refreshed session: {e}");
        }
        info!(handle = %session.handle, "Session refreshed");
        self.session().set(session);
        Ok(())
    }
}
