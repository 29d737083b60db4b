use crate::domain::identity::Principal;
use crate::domain::ports::{CredentialProvider, IdentityListener};
use crate::error::CredentialError;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

/// A process-local credential provider.
///
/// Holds an optional signed-in principal and a table of exchangeable
/// tokens behind `tokio::sync::RwLock`s. Anonymous principals get fresh
/// UUIDs. Suitable for the CLI and for tests; nothing is persisted.
pub struct InMemoryCredentialProvider {
    existing: RwLock<Option<Principal>>,
    tokens: RwLock<HashMap<String, Principal>>,
    accept_any_token: bool,
    anonymous_enabled: bool,
    listeners: Mutex<Vec<IdentityListener>>,
    existing_calls: AtomicUsize,
    exchange_calls: AtomicUsize,
    anonymous_calls: AtomicUsize,
}

impl Default for InMemoryCredentialProvider {
    fn default() -> Self {
        Self {
            existing: RwLock::default(),
            tokens: RwLock::default(),
            accept_any_token: false,
            anonymous_enabled: true,
            listeners: Mutex::default(),
            existing_calls: AtomicUsize::new(0),
            exchange_calls: AtomicUsize::new(0),
            anonymous_calls: AtomicUsize::new(0),
        }
    }
}

impl InMemoryCredentialProvider {
    /// Creates a provider with no session, no tokens and anonymous sign-in enabled.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_existing(mut self, principal: Principal) -> Self {
        *self.existing.get_mut() = Some(principal);
        self
    }

    pub fn with_token(mut self, token: impl Into<String>, principal: Principal) -> Self {
        self.tokens.get_mut().insert(token.into(), principal);
        self
    }

    /// Unknown tokens are exchanged for a freshly generated principal.
    pub fn accepting_any_token(mut self) -> Self {
        self.accept_any_token = true;
        self
    }

    pub fn without_anonymous(mut self) -> Self {
        self.anonymous_enabled = false;
        self
    }

    /// Records a sign-in and notifies every identity listener.
    pub async fn sign_in(&self, principal: Principal) {
        *self.existing.write().await = Some(principal.clone());

        let listeners = match self.listeners.lock() {
            Ok(listeners) => listeners.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        };
        debug!(user_id = %principal.id, listeners = listeners.len(), "Identity changed");
        for listener in listeners {
            listener(principal.clone());
        }
    }

    pub fn existing_calls(&self) -> usize {
        self.existing_calls.load(Ordering::SeqCst)
    }

    pub fn exchange_calls(&self) -> usize {
        self.exchange_calls.load(Ordering::SeqCst)
    }

    pub fn anonymous_calls(&self) -> usize {
        self.anonymous_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CredentialProvider for InMemoryCredentialProvider {
    fn on_identity_change(&self, listener: IdentityListener) {
        match self.listeners.lock() {
            Ok(mut listeners) => listeners.push(listener),
            Err(poisoned) => poisoned.into_inner().push(listener),
        }
    }

    async fn resolve_existing(&self) -> Result<Option<Principal>, CredentialError> {
        self.existing_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.existing.read().await.clone())
    }

    async fn exchange_token(&self, token: &str) -> Result<Principal, CredentialError> {
        self.exchange_calls.fetch_add(1, Ordering::SeqCst);
        let principal = match self.tokens.read().await.get(token) {
            Some(principal) => principal.clone(),
            None if self.accept_any_token => Principal::new(format!("user-{}", Uuid::new_v4())),
            None => return Err(CredentialError::Rejected("unknown credential token".to_string())),
        };

        *self.existing.write().await = Some(principal.clone());
        Ok(principal)
    }

    async fn resolve_anonymous(&self) -> Result<Principal, CredentialError> {
        self.anonymous_calls.fetch_add(1, Ordering::SeqCst);
        if !self.anonymous_enabled {
            return Err(CredentialError::Unavailable(
                "anonymous sign-in is disabled".to_string(),
            ));
        }

        let principal = Principal::new(format!("anon-{}", Uuid::new_v4()));
        *self.existing.write().await = Some(principal.clone());
        Ok(principal)
    }
}
