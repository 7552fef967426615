//! HTTP surface.

pub mod request;
pub mod routes;

pub use routes::{AppState, form_routes};
