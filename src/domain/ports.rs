use super::identity::Principal;
use crate::error::{CredentialError, GatewayError};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Callback invoked whenever the provider reports a new signed-in principal.
pub type IdentityListener = Arc<dyn Fn(Principal) + Send + Sync>;

/// Source of user principals.
#[async_trait]
pub trait CredentialProvider: Send + Sync {
    /// Registers a listener for identity changes made outside the bootstrap.
    fn on_identity_change(&self, listener: IdentityListener);

    /// Returns the principal of a previously authenticated session, if any.
    async fn resolve_existing(&self) -> Result<Option<Principal>, CredentialError>;

    async fn exchange_token(&self, token: &str) -> Result<Principal, CredentialError>;

    async fn resolve_anonymous(&self) -> Result<Principal, CredentialError>;
}

/// Body of the outbound payment request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentRequest {
    pub amount: u64,
    pub user_id: String,
}

/// Successful payment reply. The remote may omit the reference.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentReceipt {
    #[serde(default)]
    pub transaction_id: Option<String>,
}

#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Sends one payment request. Implementations must not retry.
    async fn submit(&self, request: PaymentRequest) -> Result<PaymentReceipt, GatewayError>;
}

pub type CredentialProviderRef = Arc<dyn CredentialProvider>;
pub type PaymentGatewayRef = Arc<dyn PaymentGateway>;
