use crate::config::GatewayConfig;
use crate::domain::ports::{PaymentGateway, PaymentReceipt, PaymentRequest};
use crate::error::{ConfigError, GatewayError};
use async_trait::async_trait;
use reqwest::{Client, header};
use tracing::{debug, warn};
use url::Url;

const USER_AGENT: &str = concat!("feedesk/", env!("CARGO_PKG_VERSION"));

/// Payment collaborator reached over HTTP(S).
///
/// Sends exactly one JSON `POST` per payment. There is no retry and no
/// idempotency key, so delivery is at most once.
#[derive(Clone)]
pub struct HttpPaymentGateway {
    client: Client,
    endpoint: Url,
}

impl HttpPaymentGateway {
    pub fn new(config: GatewayConfig) -> Result<Self, ConfigError> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(config.request_timeout)
            .build()
            .map_err(ConfigError::HttpClient)?;

        Ok(Self {
            client,
            endpoint: config.endpoint,
        })
    }
}

#[async_trait]
impl PaymentGateway for HttpPaymentGateway {
    async fn submit(&self, request: PaymentRequest) -> Result<PaymentReceipt, GatewayError> {
        debug!(endpoint = %self.endpoint, amount = request.amount, "Sending payment request");

        let response = self
            .client
            .post(self.endpoint.clone())
            .header(header::ACCEPT, "application/json")
            .json(&request)
            .send()
            .await
            .map_err(|e| GatewayError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(status = %status, body = %body, "Payment endpoint rejected request");
            return Err(GatewayError::Remote {
                status: status.as_u16(),
            });
        }

        let body = response.bytes().await?;
        if body.iter().all(u8::is_ascii_whitespace) {
            return Ok(PaymentReceipt::default());
        }

        serde_json::from_slice(&body).map_err(|e| GatewayError::InvalidResponse(e.to_string()))
    }
}
