//! Notification email to the site owner.

use std::sync::Arc;

use async_trait::async_trait;

use super::mailer::{MailTransport, send_mail};
use super::{Delivery, Sink, SinkContext};
use crate::error::SinkError;

pub const DEFAULT_SUBJECT: &str = "New form submission from FormMailer!";

/// Emails the submitted fields to `toAddress`.
pub struct NotificationSink {
    mailer: Arc<dyn MailTransport>,
}

impl NotificationSink {
    pub fn new(mailer: Arc<dyn MailTransport>) -> Self {
        Self { mailer }
    }
}

#[async_trait]
impl Sink for NotificationSink {
    fn name(&self) -> &str {
        "notification"
    }

    async fn deliver(&self, ctx: &SinkContext<'_>) -> Result<Delivery, SinkError> {
        let recipients = ctx.params.get("toAddress", "");
        let subject = ctx.params.get("subject", DEFAULT_SUBJECT);
        let body = ctx.submission.email_body();

        send_mail(
            self.mailer.as_ref(),
            ctx.params,
            self.name(),
            &recipients,
            subject,
            body,
            false,
        )
        .await
    }
}
