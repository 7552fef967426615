//! Sinks: where an accepted submission is delivered.
//!
//! Every sink runs for every submission, in a fixed order. A sink decides
//! from the form's parameters whether it is enabled. Failures are logged
//! and swallowed: the browser is redirected regardless.

pub mod auto_reply;
pub mod csv_file;
pub mod mailer;
pub mod notification;
pub mod webhook;

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, error, info};

use crate::error::SinkError;
use crate::form::params::ParamResolver;
use crate::form::submission::Submission;

pub use auto_reply::AutoReplySink;
pub use csv_file::CsvSink;
pub use mailer::{MailTransport, OutgoingMail, SmtpMailer, SmtpSettings};
pub use notification::NotificationSink;
pub use webhook::WebhookSink;

/// Outcome of a sink that did not fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    Delivered,
    Skipped(&'static str),
}

/// Everything a sink may look at for one submission.
pub struct SinkContext<'a> {
    pub params: &'a ParamResolver<'a>,
    pub submission: &'a Submission,
}

#[async_trait]
pub trait Sink: Send + Sync {
    /// Stable name used in logs.
    fn name(&self) -> &str;

    async fn deliver(&self, ctx: &SinkContext<'_>) -> Result<Delivery, SinkError>;
}

/// Result of one sink run, as reported by [`Dispatcher::dispatch`].
#[derive(Debug)]
pub struct SinkReport {
    pub sink: String,
    pub outcome: Result<Delivery, SinkError>,
}

/// Runs the configured sinks in order.
pub struct Dispatcher {
    sinks: Vec<Arc<dyn Sink>>,
}

impl Dispatcher {
    pub fn new(sinks: Vec<Arc<dyn Sink>>) -> Self {
        Self { sinks }
    }

    /// Notification email, webhook, CSV append, auto-reply.
    pub fn standard(mailer: Arc<dyn MailTransport>, http: reqwest::Client) -> Self {
        Self::new(vec![
            Arc::new(NotificationSink::new(Arc::clone(&mailer))),
            Arc::new(WebhookSink::new(http)),
            Arc::new(CsvSink::new()),
            Arc::new(AutoReplySink::new(mailer)),
        ])
    }

    /// Run every sink. Errors are logged and collected, never propagated.
    pub async fn dispatch(&self, ctx: &SinkContext<'_>) -> Vec<SinkReport> {
        let mut reports = Vec::with_capacity(self.sinks.len());
        for sink in &self.sinks {
            let outcome = sink.deliver(ctx).await;
            match &outcome {
                Ok(Delivery::Delivered) => {
                    info!(sink = sink.name(), submission_id = %ctx.submission.id, "Sink delivered");
                }
                Ok(Delivery::Skipped(reason)) => {
                    debug!(sink = sink.name(), submission_id = %ctx.submission.id, reason, "Sink skipped");
                }
                Err(e) => {
                    error!(sink = sink.name(), submission_id = %ctx.submission.id, error = %e, "Sink failed");
                }
            }
            reports.push(SinkReport {
                sink: sink.name().to_string(),
                outcome,
            });
        }
        reports
    }
}
