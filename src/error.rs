use thiserror::Error;

/// Raised when a pricing input falls outside the closed fee table.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PricingError {
    #[error("Unknown grade band: {0:?}")]
    UnknownTier(String),
}

/// Failures reported by a credential provider.
///
/// Every variant is recoverable from the session's point of view: the
/// bootstrapper moves on to the next strategy instead of giving up.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CredentialError {
    #[error("Credential provider unavailable: {0}")]
    Unavailable(String),
    #[error("Credential rejected: {0}")]
    Rejected(String),
}

/// Failures of the outbound payment call.
#[derive(Error, Debug)]
pub enum GatewayError {
    #[error("Payment request could not be delivered: {0}")]
    Network(String),
    #[error("Payment rejected by remote with status {status}")]
    Remote { status: u16 },
    #[error("Payment response could not be read: {0}")]
    InvalidResponse(String),
}

impl From<reqwest::Error> for GatewayError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            GatewayError::InvalidResponse(err.to_string())
        } else {
            GatewayError::Network(err.to_string())
        }
    }
}

/// Reasons a payment request is refused before anything is sent.
///
/// A refused submission never changes the orchestrator's state.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SubmitError {
    #[error("A transaction is already in progress")]
    AlreadyInProgress,
    #[error("The previous transaction result is still on display")]
    AwaitingDismissal,
    #[error("Session is not ready yet")]
    SessionPending,
    #[error("No identity could be established for this session")]
    IdentityUnavailable,
    #[error("Amount must be positive")]
    InvalidAmount,
    #[error("Orchestrator has been disposed")]
    Disposed,
    #[error("No async runtime is available to run the payment")]
    NoRuntime,
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid payment endpoint {url:?}: {source}")]
    InvalidEndpoint {
        url: String,
        #[source]
        source: url::ParseError,
    },
    #[error("Failed to build HTTP client: {0}")]
    HttpClient(#[source] reqwest::Error),
}

#[derive(Error, Debug)]
pub enum FeeDeskError {
    #[error(transparent)]
    Pricing(#[from] PricingError),
    #[error(transparent)]
    Submit(#[from] SubmitError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("Background task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

pub type Result<T> = std::result::Result<T, FeeDeskError>;
