//! Auto-reply email to the person who filled in the form.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::fs;

use super::mailer::{MailTransport, send_mail};
use super::{Delivery, Sink, SinkContext};
use crate::error::SinkError;
use crate::form::template;

pub const DEFAULT_SUBJECT: &str = "Thanks for getting in touch";
/// Form field holding the sender's address.
pub const EMAIL_FIELD: &str = "email";

/// Sends the `response.template` file, with placeholders filled in, to the
/// address in the form's `email` field.
pub struct AutoReplySink {
    mailer: Arc<dyn MailTransport>,
}

impl AutoReplySink {
    pub fn new(mailer: Arc<dyn MailTransport>) -> Self {
        Self { mailer }
    }
}

#[async_trait]
impl Sink for AutoReplySink {
    fn name(&self) -> &str {
        "auto_reply"
    }

    async fn deliver(&self, ctx: &SinkContext<'_>) -> Result<Delivery, SinkError> {
        if !ctx.params.get_bool("response.enabled", false) {
            return Ok(Delivery::Skipped("response.enabled is false"));
        }
        let Some(template_path) = ctx.params.get_path("response.template") else {
            return Ok(Delivery::Skipped("response.template not set"));
        };
        if !fs::try_exists(&template_path).await.unwrap_or(false) {
            tracing::warn!(path = %template_path.display(), "Auto-reply template does not exist");
            return Ok(Delivery::Skipped("response.template missing on disk"));
        }
        let Some(recipient) = ctx
            .submission
            .field(EMAIL_FIELD)
            .map(str::trim)
            .filter(|v| !v.is_empty())
        else {
            return Ok(Delivery::Skipped("form has no email field"));
        };
        // A single address only; the field is visitor-controlled.
        if recipient.contains(',') {
            return Ok(Delivery::Skipped("email field lists several addresses"));
        }

        let contents = fs::read_to_string(&template_path).await?;
        let body = template::render(&contents, ctx.submission);
        let subject = template::render(
            &ctx.params.get("response.subject", DEFAULT_SUBJECT),
            ctx.submission,
        );

        send_mail(
            self.mailer.as_ref(),
            ctx.params,
            self.name(),
            recipient,
            subject,
            body,
            true,
        )
        .await
    }
}
