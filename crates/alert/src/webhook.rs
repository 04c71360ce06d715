// Copyright The Vitals Authors
// SPDX-License-Identifier: Apache-2.0

//! Webhook delivery channel.

use crate::alert::Alert;
use crate::channel::AlertChannel;
use crate::error::Error;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::time::Duration;

/// Per-request deadline for webhook deliveries.
const WEBHOOK_TIMEOUT: Duration = Duration::from_secs(10);

/// The JSON envelope POSTed to the webhook endpoint.
#[derive(Debug, Serialize)]
struct WebhookPayload<'a> {
    alert: &'a Alert,
    timestamp: DateTime<Utc>,
    source: &'a str,
}

/// POSTs alerts to an HTTP endpoint as JSON.
///
/// Any response status ≥ 400 is treated as a delivery failure.
#[derive(Debug, Clone)]
pub struct WebhookChannel {
    url: String,
    source: String,
    client: reqwest::Client,
}

impl WebhookChannel {
    /// Creates a channel delivering to `url`, identifying itself as `source`.
    pub fn new(url: impl Into<String>, source: impl Into<String>) -> Result<Self, Error> {
        let client = reqwest::Client::builder()
            .timeout(WEBHOOK_TIMEOUT)
            .build()
            .map_err(|e| Error::ChannelInit {
                details: e.to_string(),
            })?;
        Ok(Self {
            url: url.into(),
            source: source.into(),
            client,
        })
    }
}

#[async_trait]
impl AlertChannel for WebhookChannel {
    fn name(&self) -> &str {
        "webhook"
    }

    async fn send(&self, alert: &Alert) -> Result<(), Error> {
        let payload = WebhookPayload {
            alert,
            timestamp: Utc::now(),
            source: &self.source,
        };
        let response = self
            .client
            .post(&self.url)
            .json(&payload)
            .send()
            .await
            .map_err(|e| Error::WebhookRequest {
                url: self.url.clone(),
                details: e.to_string(),
            })?;

        let status = response.status();
        if status.as_u16() >= 400 {
            return Err(Error::WebhookStatus {
                url: self.url.clone(),
                status: status.as_u16(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rule::Severity;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn alert() -> Alert {
        Alert {
            rule: "cpu_high".into(),
            severity: Severity::Warning,
            message: "cpu above threshold".into(),
            value: 92.0,
            threshold: 80.0,
            first_seen: Utc::now(),
            last_seen: Utc::now(),
            count: 1,
            active: true,
        }
    }

    #[tokio::test]
    async fn posts_the_envelope_and_accepts_2xx() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/hook"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let channel =
            WebhookChannel::new(format!("{}/hook", server.uri()), "vitals").expect("client builds");
        channel.send(&alert()).await.expect("delivery succeeds");

        let requests = server.received_requests().await.expect("recorded");
        let body: serde_json::Value =
            serde_json::from_slice(&requests[0].body).expect("json body");
        assert_eq!(body["alert"]["rule"], "cpu_high");
        assert_eq!(body["source"], "vitals");
        assert!(body["timestamp"].is_string());
    }

    #[tokio::test]
    async fn status_400_and_above_is_a_failure() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let channel = WebhookChannel::new(server.uri(), "vitals").expect("client builds");
        let err = channel.send(&alert()).await.expect_err("5xx fails");
        assert!(matches!(err, Error::WebhookStatus { status: 500, .. }));
    }
}
