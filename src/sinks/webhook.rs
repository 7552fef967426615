//! Outbound webhook. POSTs the submission as JSON.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;

use super::{Delivery, Sink, SinkContext};
use crate::error::SinkError;

const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// JSON document sent to the webhook.
#[derive(Debug, Serialize)]
pub struct WebhookPayload<'a> {
    pub form: &'a str,
    pub submitted_at: String,
    pub fields: serde_json::Map<String, serde_json::Value>,
}

impl<'a> WebhookPayload<'a> {
    pub fn new(
        form: &'a str,
        submitted_at: DateTime<Utc>,
        fields: serde_json::Map<String, serde_json::Value>,
    ) -> Self {
        Self {
            form,
            submitted_at: submitted_at.to_rfc3339_opts(SecondsFormat::Secs, true),
            fields,
        }
    }
}

pub struct WebhookSink {
    client: reqwest::Client,
}

impl WebhookSink {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Sink for WebhookSink {
    fn name(&self) -> &str {
        "webhook"
    }

    async fn deliver(&self, ctx: &SinkContext<'_>) -> Result<Delivery, SinkError> {
        let Some(url) = ctx
            .params
            .lookup("webhook.url")
            .map(str::trim)
            .filter(|u| !u.is_empty())
        else {
            return Ok(Delivery::Skipped("webhook.url not set"));
        };
        let timeout =
            Duration::from_secs(ctx.params.get_u64("webhook.timeout", DEFAULT_TIMEOUT_SECS));

        let submission = ctx.submission;
        let payload = WebhookPayload::new(
            &submission.form,
            submission.received_at,
            submission.json_fields(),
        );

        let resp = self
            .client
            .post(url)
            .timeout(timeout)
            .json(&payload)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            return Err(SinkError::WebhookStatus {
                status: status.as_u16(),
            });
        }

        tracing::debug!(%url, status = status.as_u16(), "Webhook accepted submission");
        Ok(Delivery::Delivered)
    }
}
