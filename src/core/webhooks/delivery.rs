//! Delivery engine
//!
//! Builds the signed payload for a webhook and performs the outbound POST.
//! Transport failures are returned as data, never as errors.

use super::signing::{SIGNATURE_HEADER, sign};
use super::types::{DeliveryResult, Webhook, WebhookPayload};
use crate::config::WebhooksConfig;
use crate::utils::error::Result;
use reqwest::Client;
use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue, USER_AGENT};
use serde_json::{Map, Value};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

// Lowercase so they can be used with `HeaderName::from_static`
pub const EVENT_HEADER: &str = "x-webhook-event";
pub const WEBHOOK_ID_HEADER: &str = "x-webhook-id";

/// A payload ready for transmission
#[derive(Debug, Clone, PartialEq)]
pub struct SignedPayload {
    /// Exact bytes put on the wire
    pub body: String,
    /// Hex HMAC over the unsigned serialization
    pub signature: Option<String>,
}

/// What a delivery produced: the transmitted body and the HTTP outcome
#[derive(Debug, Clone)]
pub struct DeliveryOutcome {
    pub payload: SignedPayload,
    pub result: DeliveryResult,
}

/// Performs outbound webhook calls
#[derive(Clone)]
pub struct DeliveryEngine {
    client: Client,
    user_agent: String,
    max_response_body_bytes: usize,
}

impl DeliveryEngine {
    pub fn new(policy: &WebhooksConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent(policy.user_agent.clone())
            .build()?;

        Ok(Self {
            client,
            user_agent: policy.user_agent.clone(),
            max_response_body_bytes: policy.max_response_body_bytes,
        })
    }

    /// Serialize the payload and sign it with the webhook's secret.
    ///
    /// The signature covers the payload without its `signature` field; the
    /// transmitted body is a second serialization that includes it.
    pub fn build_payload(
        webhook: &Webhook,
        event_type: &str,
        data: Map<String, Value>,
    ) -> Result<SignedPayload> {
        let mut payload = WebhookPayload::new(event_type, data);

        let signature = match webhook.signing_secret() {
            Some(secret) => {
                let unsigned = serde_json::to_vec(&payload)?;
                Some(sign(&unsigned, secret)?)
            }
            None => None,
        };
        payload.signature = signature.clone();

        Ok(SignedPayload {
            body: serde_json::to_string(&payload)?,
            signature,
        })
    }

    /// Build, sign and send one event to one webhook
    pub async fn deliver(
        &self,
        webhook: &Webhook,
        event_type: &str,
        data: Map<String, Value>,
    ) -> Result<DeliveryOutcome> {
        let payload = Self::build_payload(webhook, event_type, data)?;
        let result = self
            .send(
                webhook,
                event_type,
                &payload.body,
                payload.signature.as_deref(),
            )
            .await;
        Ok(DeliveryOutcome { payload, result })
    }

    /// POST an already-built body. Used directly by retries to resend stored bytes.
    pub async fn send(
        &self,
        webhook: &Webhook,
        event_type: &str,
        body: &str,
        signature: Option<&str>,
    ) -> DeliveryResult {
        let start = Instant::now();
        let timeout = Duration::from_secs(u64::from(webhook.timeout_seconds.max(1)));

        let request = self
            .client
            .post(&webhook.url)
            .timeout(timeout)
            .headers(self.headers(webhook, event_type, signature))
            .body(body.to_string());

        debug!("Sending {} to webhook {} ({})", event_type, webhook.id, webhook.url);

        let exchange = async {
            let mut response = request.send().await?;
            let status = response.status().as_u16();
            let body = self.read_body(&mut response, webhook).await;
            Ok::<_, reqwest::Error>((status, body))
        };

        let outcome = tokio::time::timeout(timeout, exchange).await;
        let elapsed_ms = start.elapsed().as_millis() as u64;

        let result = match outcome {
            Ok(Ok((status_code, response_body))) => DeliveryResult {
                status_code,
                response_body,
                elapsed_ms,
                transport_error: None,
            },
            Ok(Err(e)) if e.is_timeout() => DeliveryResult::transport_failure(
                format!("request timed out after {}s", timeout.as_secs()),
                elapsed_ms,
            ),
            Ok(Err(e)) => DeliveryResult::transport_failure(e.to_string(), elapsed_ms),
            Err(_) => DeliveryResult::transport_failure(
                format!("request timed out after {}s", timeout.as_secs()),
                elapsed_ms,
            ),
        };

        if result.success() {
            info!(
                "Delivered {} to webhook {}: status {} in {}ms",
                event_type, webhook.id, result.status_code, result.elapsed_ms
            );
        } else {
            warn!(
                "Delivery of {} to webhook {} failed: status {} in {}ms{}",
                event_type,
                webhook.id,
                result.status_code,
                result.elapsed_ms,
                result
                    .transport_error
                    .as_deref()
                    .map(|e| format!(" ({})", e))
                    .unwrap_or_default()
            );
        }

        result
    }

    fn headers(&self, webhook: &Webhook, event_type: &str, signature: Option<&str>) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        if let Ok(value) = HeaderValue::from_str(&self.user_agent) {
            headers.insert(USER_AGENT, value);
        }
        if let Ok(value) = HeaderValue::from_str(event_type) {
            headers.insert(HeaderName::from_static(EVENT_HEADER), value);
        }
        headers.insert(
            HeaderName::from_static(WEBHOOK_ID_HEADER),
            HeaderValue::from(webhook.id),
        );

        for (name, value) in &webhook.headers {
            match (
                HeaderName::from_bytes(name.as_bytes()),
                HeaderValue::from_str(value),
            ) {
                (Ok(name), Ok(value)) => {
                    headers.insert(name, value);
                }
                _ => warn!("Skipping invalid custom header {} on webhook {}", name, webhook.id),
            }
        }

        if let Some(signature) = signature {
            if let Ok(value) = HeaderValue::from_str(signature) {
                headers.insert(HeaderName::from_static(SIGNATURE_HEADER), value);
            }
        }

        headers
    }

    /// Read the response body chunk by chunk, stopping once the cap is reached
    async fn read_body(&self, response: &mut reqwest::Response, webhook: &Webhook) -> String {
        let mut body = Vec::new();
        loop {
            match response.chunk().await {
                Ok(Some(chunk)) => {
                    body.extend_from_slice(&chunk);
                    if body.len() >= self.max_response_body_bytes {
                        body.truncate(self.max_response_body_bytes);
                        break;
                    }
                }
                Ok(None) => break,
                Err(e) => {
                    warn!("Failed to read response body from webhook {}: {}", webhook.id, e);
                    break;
                }
            }
        }
        self.truncate_body(&body)
    }

    fn truncate_body(&self, bytes: &[u8]) -> String {
        let text = String::from_utf8_lossy(bytes);
        if text.len() <= self.max_response_body_bytes {
            return text.into_owned();
        }
        let mut end = self.max_response_body_bytes;
        while !text.is_char_boundary(end) {
            end -= 1;
        }
        text[..end].to_string()
    }
}
