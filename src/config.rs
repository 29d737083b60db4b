//! Process-start configuration.
//!
//! Everything here is read once. A missing credential token or application
//! identifier is a normal condition, not an error.

use crate::error::ConfigError;
use std::time::Duration;
use url::Url;

pub const DEFAULT_APP_ID: &str = "default-app-id";
/// How long a terminal payment result stays on display before auto-dismissal.
pub const DEFAULT_DISPLAY_WINDOW: Duration = Duration::from_secs(3);
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionConfig {
    credential_token: Option<String>,
    app_id: Option<String>,
}

impl SessionConfig {
    pub fn new(credential_token: Option<String>, app_id: Option<String>) -> Self {
        Self {
            credential_token: non_empty(credential_token),
            app_id: non_empty(app_id),
        }
    }

    pub fn credential_token(&self) -> Option<&str> {
        self.credential_token.as_deref()
    }

    pub fn app_id(&self) -> &str {
        self.app_id.as_deref().unwrap_or(DEFAULT_APP_ID)
    }

    pub fn has_app_id(&self) -> bool {
        self.app_id.is_some()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrchestratorConfig {
    pub display_window: Duration,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            display_window: DEFAULT_DISPLAY_WINDOW,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewayConfig {
    pub endpoint: Url,
    pub request_timeout: Duration,
}

impl GatewayConfig {
    pub fn parse(endpoint: &str) -> Result<Self, ConfigError> {
        let endpoint = Url::parse(endpoint).map_err(|source| ConfigError::InvalidEndpoint {
            url: endpoint.to_string(),
            source,
        })?;
        Ok(Self {
            endpoint,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        })
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}
