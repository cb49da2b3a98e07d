// SPDX-License-Identifier: MIT

//! Session synchronization: the single authority for "who is signed in".
//!
//! A `SessionSync` reconciles three inputs into one owned, serializable
//! `SessionState`:
//!
//! 1. the identity provider's push event stream,
//! 2. the persisted key-value cache (instant paint before the provider
//!    answers), and
//! 3. a change signal shared across instances (the "storage event" that
//!    lets a logout in one tab reach every other tab).
//!
//! Initialization is ordered: the one-shot `current_user` read completes
//! BEFORE the push subscription attaches, and every applied update carries a
//! sequence number; an update whose seq is not newer than the last applied
//! one is discarded. Consumers observe state through a watch channel and must
//! not evaluate authorization until `resolved` is true.

use crate::error::AppError;
use crate::models::UserIdentity;
use crate::services::auth::AuthService;
use crate::services::provider::{AuthChange, IdentityProvider};
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::{broadcast, watch};

/// Cache keys persisted across reloads.
pub const CACHE_USER: &str = "user";
pub const CACHE_USER_ROLE: &str = "user_role";
pub const CACHE_SESSION: &str = "session";

/// Cached session fields (the `session` cache key).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CachedSession {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

/// Key-value cache shared by every synchronizer instance. Writes notify the
/// change signal, which is how one tab's logout reaches the others.
#[derive(Clone)]
pub struct LocalCache {
    entries: Arc<DashMap<String, String>>,
    signal: broadcast::Sender<()>,
}

impl Default for LocalCache {
    fn default() -> Self {
        Self::new()
    }
}

impl LocalCache {
    pub fn new() -> Self {
        let (signal, _) = broadcast::channel(64);
        Self {
            entries: Arc::new(DashMap::new()),
            signal,
        }
    }

    pub fn get(&self, key: &str) -> Option<String> {
        self.entries.get(key).map(|v| v.clone())
    }

    pub fn set(&self, key: &str, value: String) {
        self.entries.insert(key.to_string(), value);
        let _ = self.signal.send(());
    }

    pub fn remove(&self, key: &str) {
        self.entries.remove(key);
        let _ = self.signal.send(());
    }

    /// Subscribe to change notifications.
    pub fn changes(&self) -> broadcast::Receiver<()> {
        self.signal.subscribe()
    }

    /// Read the cached session, tolerating a corrupt entry.
    pub fn cached_session(&self) -> Option<CachedSession> {
        let raw = self.get(CACHE_SESSION)?;
        serde_json::from_str(&raw).ok()
    }

    pub fn cached_identity(&self) -> Option<UserIdentity> {
        let raw = self.get(CACHE_USER)?;
        serde_json::from_str(&raw).ok()
    }
}

/// The synchronized session state. Serializable so it can be persisted or
/// shipped to a client verbatim.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SessionState {
    /// False until the first one-shot resolution completes. Route-guard
    /// style consumers must treat an unresolved state as "undetermined",
    /// never as "signed out".
    pub resolved: bool,
    pub identity: Option<UserIdentity>,
    pub session_expires_at: Option<DateTime<Utc>>,
    /// Sequence number of the last applied update.
    pub last_seq: u64,
}

/// One synchronizer instance ("tab").
pub struct SessionSync {
    inner: Inner,
}

#[derive(Clone)]
struct Inner {
    auth: AuthService,
    provider: IdentityProvider,
    cache: LocalCache,
    state: watch::Sender<SessionState>,
}

impl SessionSync {
    pub fn new(auth: AuthService, provider: IdentityProvider, cache: LocalCache) -> Self {
        // Instant paint: pre-populate from the cache, but stay unresolved so
        // guards wait for the one-shot read.
        let initial = SessionState {
            resolved: false,
            identity: cache.cached_identity(),
            session_expires_at: cache.cached_session().map(|s| s.expires_at),
            last_seq: 0,
        };
        let (state, _) = watch::channel(initial);
        Self {
            inner: Inner {
                auth,
                provider,
                cache,
                state,
            },
        }
    }

    /// Observe every applied state change.
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.inner.state.subscribe()
    }

    pub fn current(&self) -> SessionState {
        self.inner.state.borrow().clone()
    }

    /// Resolve the session: one-shot read first, then attach the push
    /// subscription and the cache change signal.
    pub async fn init(&self) {
        // 1. One-shot read against the provider using the cached token.
        let seq = self.inner.provider.current_seq();
        let (identity, expires_at) = match self.inner.cache.cached_session() {
            Some(session) => (
                self.inner.auth.current_user(&session.token).await,
                Some(session.expires_at),
            ),
            None => (None, None),
        };
        let expires_at = identity.as_ref().and(expires_at);

        self.inner.apply(seq, identity, expires_at);

        // 2. Only now attach the push subscription: anything the provider
        // publishes after this point carries a seq greater than the snapshot
        // we just applied.
        self.spawn_provider_listener();
        self.spawn_cache_listener();
    }

    fn spawn_provider_listener(&self) {
        let mut rx = self.inner.provider.subscribe();
        let inner = self.inner.clone();
        tokio::spawn(async move {
            loop {
                match rx.recv().await {
                    Ok(event) => match event.change {
                        AuthChange::SignedIn { user } => {
                            // Optimistic identity from provider metadata only;
                            // the authoritative profile merge follows without
                            // blocking the event handler.
                            let optimistic = UserIdentity {
                                id: user.id,
                                email: user.email.clone(),
                                display_name: user.metadata.full_name.clone(),
                                role: user.metadata.user_role,
                            };
                            inner.apply(event.seq, Some(optimistic), None);

                            let follower = inner.clone();
                            tokio::spawn(async move {
                                let merged = follower.auth.normalize(&user);
                                follower.upgrade_in_place(event.seq, merged);
                            });
                        }
                        AuthChange::SignedOut { .. } => {
                            inner.apply(event.seq, None, None);
                        }
                    },
                    Err(broadcast::error::RecvError::Lagged(missed)) => {
                        tracing::warn!(missed, "Session sync lagged behind auth events");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        });
    }

    fn spawn_cache_listener(&self) {
        let mut rx = self.inner.cache.changes();
        let inner = self.inner.clone();
        tokio::spawn(async move {
            loop {
                match rx.recv().await {
                    Ok(()) => {
                        // Re-read the cache and fold it in with a fresh seq.
                        let seq = inner.provider.current_seq();
                        let identity = inner.cache.cached_identity();
                        let expires = inner.cache.cached_session().map(|s| s.expires_at);
                        inner.apply(seq, identity, expires);
                    }
                    Err(broadcast::error::RecvError::Lagged(_)) => continue,
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        });
    }

    /// Sign out through the adapter. On success the state and cache are
    /// cleared (and every other instance follows via the change signal); on
    /// failure the prior state is left untouched.
    pub async fn logout(&self) -> Result<(), AppError> {
        match self.inner.cache.cached_session() {
            Some(session) => {
                self.inner.auth.sign_out(&session.token).await?;
                let seq = self.inner.provider.current_seq();
                self.inner.apply(seq, None, None);
                Ok(())
            }
            // Already signed out: succeed silently, mirroring the provider.
            None => Ok(()),
        }
    }
}

impl Inner {
    /// Apply an update unless something newer has already been applied.
    /// The first resolution always applies and flips `resolved`.
    fn apply(
        &self,
        seq: u64,
        identity: Option<UserIdentity>,
        session_expires_at: Option<DateTime<Utc>>,
    ) {
        self.state.send_modify(|state| {
            if state.resolved && seq <= state.last_seq {
                tracing::debug!(seq, last = state.last_seq, "Discarding stale session update");
                return;
            }
            state.identity = identity;
            state.session_expires_at = session_expires_at;
            state.last_seq = state.last_seq.max(seq);
            state.resolved = true;
        });
    }

    /// Upgrade the identity applied at `seq` with authoritative profile
    /// fields, unless a newer update has landed in the meantime.
    fn upgrade_in_place(&self, seq: u64, identity: UserIdentity) {
        self.state.send_modify(|state| {
            if state.last_seq != seq || state.identity.is_none() {
                return;
            }
            state.identity = Some(identity);
        });
    }
}
