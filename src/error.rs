//! Error types for form-mailer.

/// Top-level error type for request processing.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Definition error: {0}")]
    Definition(#[from] DefinitionError),

    #[error("Request rejected: {0}")]
    Security(#[from] SecurityError),

    #[error("Form error: {0}")]
    Form(#[from] FormError),
}

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// Errors locating or reading a form definition file.
#[derive(Debug, thiserror::Error)]
pub enum DefinitionError {
    #[error("Definition not found: {0}")]
    NotFound(String),

    #[error("IO error reading definition: {0}")]
    Io(#[from] std::io::Error),
}

/// Reasons a submission is refused before any sink runs.
#[derive(Debug, thiserror::Error)]
pub enum SecurityError {
    #[error("Request has no usable referrer")]
    MissingReferrer,

    #[error("Referrer domain {domain} is not allowed")]
    DomainNotAllowed { domain: String },

    #[error("Honeypot field was filled in")]
    HoneypotFilled,
}

/// Errors decoding the posted form body.
#[derive(Debug, thiserror::Error)]
pub enum FormError {
    #[error("Malformed form body: {0}")]
    Malformed(String),

    #[error("Unsupported content type: {0}")]
    UnsupportedContentType(String),
}

/// Errors raised by an individual sink. These are logged, never returned to the client.
#[derive(Debug, thiserror::Error)]
pub enum SinkError {
    #[error("Sink {sink} is missing configuration: {keys}")]
    MissingConfig { sink: String, keys: String },

    #[error("Sink {sink} failed to send: {reason}")]
    SendFailed { sink: String, reason: String },

    #[error("Webhook returned HTTP {status}")]
    WebhookStatus { status: u16 },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for form-mailer.
pub type Result<T> = std::result::Result<T, Error>;
