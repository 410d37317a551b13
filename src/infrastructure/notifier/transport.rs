//! Outbound HTTP delivery for webhooks.

use async_trait::async_trait;
use std::time::Duration;

/// Identifies this service in outbound webhook requests.
pub const WEBHOOK_USER_AGENT: &str = "URLShortener-Webhook/1.0";

/// Header carrying the payload HMAC when the owner configured a secret.
pub const SIGNATURE_HEADER: &str = "X-Webhook-Signature";

/// Failures before an HTTP status was obtained.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("connection error: {0}")]
    Connection(String),

    #[error("delivery timed out")]
    Timeout,
}

/// Performs one webhook POST and reports the response status.
///
/// Abstracted behind a trait so the delivery worker can be exercised
/// without a network.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait WebhookTransport: Send + Sync {
    /// POSTs `body` as JSON to `url`, attaching the signature header when
    /// present. Returns the HTTP status code.
    async fn deliver(
        &self,
        url: &str,
        signature: Option<String>,
        body: String,
    ) -> Result<u16, TransportError>;
}

/// Reqwest-backed transport with a per-request timeout.
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    /// Builds a client with the webhook timeout and user agent.
    pub fn new(timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(WEBHOOK_USER_AGENT)
            .build()?;

        Ok(Self { client })
    }
}

#[async_trait]
impl WebhookTransport for HttpTransport {
    async fn deliver(
        &self,
        url: &str,
        signature: Option<String>,
        body: String,
    ) -> Result<u16, TransportError> {
        let mut request = self
            .client
            .post(url)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .body(body);

        if let Some(signature) = signature {
            request = request.header(SIGNATURE_HEADER, signature);
        }

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                TransportError::Timeout
            } else {
                TransportError::Connection(e.to_string())
            }
        })?;

        Ok(response.status().as_u16())
    }
}
