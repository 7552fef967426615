//! Form definitions, parameter layering and submission checks.

pub mod definition;
pub mod guard;
pub mod params;
pub mod submission;
pub mod template;

pub use definition::FormDefinition;
pub use guard::check_request;
pub use params::ParamResolver;
pub use submission::{DEST_URL_FIELD, FormFields, HONEYPOT_FIELD, RequestMeta, Submission};
