//! Outbound email over SMTP via lettre.
//!
//! SMTP settings are resolved per request from the form's parameters, so
//! the transport is built for each send rather than held open.

use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Address, Message, SmtpTransport, Transport};
use secrecy::{ExposeSecret, SecretString};

use crate::error::SinkError;
use crate::form::params::ParamResolver;
use crate::sinks::Delivery;

/// SMTP server and sender settings.
#[derive(Debug)]
pub struct SmtpSettings {
    pub host: String,
    pub port: u16,
    /// Credentials are only sent when a user name is configured.
    pub user: Option<String>,
    pub password: SecretString,
    /// Upgrade the connection with STARTTLS.
    pub starttls: bool,
    pub from_address: String,
    pub from_name: Option<String>,
}

impl SmtpSettings {
    /// Resolve SMTP settings, failing when the sender, recipients or host
    /// are missing.
    pub fn from_params(
        params: &ParamResolver<'_>,
        sink: &str,
        recipients: &str,
    ) -> Result<Self, SinkError> {
        let from_address = params.get("fromAddress", "");
        let host = params.get("server.host", "");

        let missing: Vec<&str> = [
            ("fromAddress", from_address.trim().is_empty()),
            ("recipients", recipients.trim().is_empty()),
            ("server.host", host.trim().is_empty()),
        ]
        .into_iter()
        .filter_map(|(key, is_missing)| is_missing.then_some(key))
        .collect();
        if !missing.is_empty() {
            return Err(SinkError::MissingConfig {
                sink: sink.to_string(),
                keys: missing.join(", "),
            });
        }

        Ok(Self {
            host: host.trim().to_string(),
            port: params.get_u16("server.port", 587),
            user: params.lookup("server.user").map(str::to_string),
            password: SecretString::from(params.get("server.password", "")),
            starttls: params.get_bool("server.SSL", true),
            from_address: from_address.trim().to_string(),
            from_name: params.lookup("fromName").map(str::to_string),
        })
    }

    fn sender(&self) -> Result<Mailbox, SinkError> {
        let address: Address = self.from_address.parse().map_err(|e| SinkError::SendFailed {
            sink: "smtp".into(),
            reason: format!("Invalid from address {:?}: {e}", self.from_address),
        })?;
        Ok(Mailbox::new(self.from_name.clone(), address))
    }
}

/// A message ready to hand to a transport.
#[derive(Debug, Clone)]
pub struct OutgoingMail {
    pub to: Vec<Mailbox>,
    pub subject: String,
    pub body: String,
    pub html: bool,
}

/// Something that can deliver an email. The SMTP implementation is used in
/// production; tests record messages instead.
#[async_trait]
pub trait MailTransport: Send + Sync {
    async fn send(&self, smtp: &SmtpSettings, mail: OutgoingMail) -> Result<(), SinkError>;
}

/// lettre-backed SMTP transport.
#[derive(Debug, Default)]
pub struct SmtpMailer;

impl SmtpMailer {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl MailTransport for SmtpMailer {
    async fn send(&self, smtp: &SmtpSettings, mail: OutgoingMail) -> Result<(), SinkError> {
        let message = build_message(smtp, &mail)?;
        let transport = build_transport(smtp)?;
        let host = smtp.host.clone();

        tokio::task::spawn_blocking(move || transport.send(&message))
            .await
            .map_err(|e| SinkError::SendFailed {
                sink: "smtp".into(),
                reason: format!("SMTP task panicked: {e}"),
            })?
            .map_err(|e| SinkError::SendFailed {
                sink: "smtp".into(),
                reason: format!("SMTP send via {host} failed: {e}"),
            })?;

        tracing::info!(recipients = mail.to.len(), %host, "Email sent");
        Ok(())
    }
}

fn build_transport(smtp: &SmtpSettings) -> Result<SmtpTransport, SinkError> {
    let builder = if smtp.starttls {
        SmtpTransport::starttls_relay(&smtp.host).map_err(|e| SinkError::SendFailed {
            sink: "smtp".into(),
            reason: format!("SMTP relay error: {e}"),
        })?
    } else {
        SmtpTransport::builder_dangerous(&smtp.host)
    };

    let builder = builder.port(smtp.port);
    let builder = match &smtp.user {
        Some(user) => builder.credentials(Credentials::new(
            user.clone(),
            smtp.password.expose_secret().to_string(),
        )),
        None => builder,
    };
    Ok(builder.build())
}

/// Assemble the RFC 5322 message.
pub fn build_message(smtp: &SmtpSettings, mail: &OutgoingMail) -> Result<Message, SinkError> {
    let mut builder = Message::builder()
        .from(smtp.sender()?)
        .subject(mail.subject.as_str())
        .header(if mail.html {
            ContentType::TEXT_HTML
        } else {
            ContentType::TEXT_PLAIN
        });
    for mailbox in &mail.to {
        builder = builder.to(mailbox.clone());
    }
    builder
        .body(mail.body.clone())
        .map_err(|e| SinkError::SendFailed {
            sink: "smtp".into(),
            reason: format!("Failed to build email: {e}"),
        })
}

/// Parse a comma separated recipient list, skipping invalid entries.
pub fn parse_recipients(list: &str) -> Vec<Mailbox> {
    list.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .filter_map(|raw| match raw.parse::<Mailbox>() {
            Ok(mailbox) => Some(mailbox),
            Err(e) => {
                tracing::warn!(recipient = raw, error = %e, "Skipping invalid recipient");
                None
            }
        })
        .collect()
}

/// Resolve SMTP settings and send one email. Empty bodies and lists with no
/// valid recipient are skipped.
pub async fn send_mail(
    transport: &dyn MailTransport,
    params: &ParamResolver<'_>,
    sink: &str,
    recipients: &str,
    subject: String,
    body: String,
    html: bool,
) -> Result<Delivery, SinkError> {
    if body.is_empty() {
        return Ok(Delivery::Skipped("empty body"));
    }

    let smtp = SmtpSettings::from_params(params, sink, recipients)?;
    let to = parse_recipients(recipients);
    if to.is_empty() {
        return Ok(Delivery::Skipped("no valid recipients"));
    }

    transport
        .send(
            &smtp,
            OutgoingMail {
                to,
                subject,
                body,
                html,
            },
        )
        .await?;
    Ok(Delivery::Delivered)
}
