//! form-mailer: turns HTML form posts into emails, CSV rows and webhook calls.

pub mod config;
pub mod error;
pub mod form;
pub mod logging;
pub mod server;
pub mod sinks;
