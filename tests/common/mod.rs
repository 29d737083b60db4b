#![allow(dead_code)]

use async_trait::async_trait;
use feedesk::application::session::SessionBootstrapper;
use feedesk::config::SessionConfig;
use feedesk::domain::identity::Principal;
use feedesk::domain::ports::{
    CredentialProvider, IdentityListener, PaymentGateway, PaymentReceipt, PaymentRequest,
};
use feedesk::error::{CredentialError, GatewayError};
use feedesk::infrastructure::in_memory::InMemoryCredentialProvider;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Notify;

/// Credential provider returning canned results, optionally after a delay.
pub struct ScriptedProvider {
    existing: Result<Option<Principal>, CredentialError>,
    exchange: Result<Principal, CredentialError>,
    anonymous: Result<Principal, CredentialError>,
    delay: Duration,
    calls: Mutex<Vec<&'static str>>,
    listeners: Mutex<Vec<IdentityListener>>,
}

impl ScriptedProvider {
    pub fn new() -> Self {
        Self {
            existing: Ok(None),
            exchange: Err(CredentialError::Rejected("no token accepted".to_string())),
            anonymous: Ok(Principal::new("anon-1")),
            delay: Duration::ZERO,
            calls: Mutex::new(Vec::new()),
            listeners: Mutex::new(Vec::new()),
        }
    }

    pub fn existing(mut self, result: Result<Option<Principal>, CredentialError>) -> Self {
        self.existing = result;
        self
    }

    pub fn exchange(mut self, result: Result<Principal, CredentialError>) -> Self {
        self.exchange = result;
        self
    }

    pub fn anonymous(mut self, result: Result<Principal, CredentialError>) -> Self {
        self.anonymous = result;
        self
    }

    pub fn delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn calls(&self) -> Vec<&'static str> {
        self.calls.lock().unwrap().clone()
    }

    /// Reports `principal` to every registered identity listener.
    pub fn emit(&self, principal: Principal) {
        let listeners = self.listeners.lock().unwrap().clone();
        for listener in listeners {
            listener(principal.clone());
        }
    }

    async fn record(&self, call: &'static str) {
        self.calls.lock().unwrap().push(call);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
    }
}

#[async_trait]
impl CredentialProvider for ScriptedProvider {
    fn on_identity_change(&self, listener: IdentityListener) {
        self.listeners.lock().unwrap().push(listener);
    }

    async fn resolve_existing(&self) -> Result<Option<Principal>, CredentialError> {
        self.record("existing").await;
        self.existing.clone()
    }

    async fn exchange_token(&self, _token: &str) -> Result<Principal, CredentialError> {
        self.record("exchange").await;
        self.exchange.clone()
    }

    async fn resolve_anonymous(&self) -> Result<Principal, CredentialError> {
        self.record("anonymous").await;
        self.anonymous.clone()
    }
}

#[derive(Clone, Copy, Debug)]
pub enum GatewayOutcome {
    Receipt(Option<&'static str>),
    Remote(u16),
    Network,
}

/// Payment gateway that records requests and can hold them until released.
pub struct ScriptedGateway {
    outcome: GatewayOutcome,
    gate: Option<Arc<Notify>>,
    requests: Mutex<Vec<PaymentRequest>>,
}

impl ScriptedGateway {
    pub fn new(outcome: GatewayOutcome) -> Self {
        Self {
            outcome,
            gate: None,
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Requests block until `release` is called once per request.
    pub fn gated(outcome: GatewayOutcome) -> Self {
        Self {
            gate: Some(Arc::new(Notify::new())),
            ..Self::new(outcome)
        }
    }

    pub fn release(&self) {
        if let Some(gate) = &self.gate {
            gate.notify_one();
        }
    }

    pub fn requests(&self) -> Vec<PaymentRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl PaymentGateway for ScriptedGateway {
    async fn submit(&self, request: PaymentRequest) -> Result<PaymentReceipt, GatewayError> {
        self.requests.lock().unwrap().push(request);
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }

        match self.outcome {
            GatewayOutcome::Receipt(reference) => Ok(PaymentReceipt {
                transaction_id: reference.map(str::to_string),
            }),
            GatewayOutcome::Remote(status) => Err(GatewayError::Remote { status }),
            GatewayOutcome::Network => {
                Err(GatewayError::Network("connection reset".to_string()))
            }
        }
    }
}

/// A bootstrapped session signed in as `user_id`.
pub async fn ready_session(
    user_id: &str,
) -> (Arc<InMemoryCredentialProvider>, Arc<SessionBootstrapper>) {
    let provider =
        Arc::new(InMemoryCredentialProvider::new().with_existing(Principal::new(user_id)));
    let session = SessionBootstrapper::new(provider.clone(), SessionConfig::default());
    session.bootstrap().await;
    (provider, session)
}
