//! HTTP routes: the form endpoint and a health check.

use std::path::PathBuf;
use std::sync::Arc;

use axum::extract::{Request, State};
use axum::http::{HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;
use tracing::{Instrument, info, info_span, warn};

use super::request::{read_form, request_meta};
use crate::config::Settings;
use crate::error::{DefinitionError, Error, FormError, Result};
use crate::form::{FormDefinition, ParamResolver, RequestMeta, Submission, check_request};
use crate::sinks::{Dispatcher, MailTransport, SinkContext};

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    /// Directory request paths are mapped onto.
    pub forms_root: Arc<PathBuf>,
    /// Application configuration layer.
    pub settings: Arc<Settings>,
    pub dispatcher: Arc<Dispatcher>,
}

impl AppState {
    pub fn new(forms_root: PathBuf, settings: Settings, mailer: Arc<dyn MailTransport>) -> Self {
        Self {
            forms_root: Arc::new(forms_root),
            settings: Arc::new(settings),
            dispatcher: Arc::new(Dispatcher::standard(mailer, reqwest::Client::new())),
        }
    }
}

/// Build the Axum router.
pub fn form_routes(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/{*path}", post(submit))
        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()))
        .with_state(state)
}

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "service": "form-mailer"
    }))
}

/// POST /{path}
///
/// Processes one form submission and redirects the browser.
async fn submit(State(state): State<AppState>, request: Request) -> Response {
    match process(&state, request).await {
        Ok(location) => (StatusCode::FOUND, [(header::LOCATION, location)]).into_response(),
        Err(e) => e.into_response(),
    }
}

async fn process(state: &AppState, request: Request) -> Result<HeaderValue> {
    let (parts, body) = request.into_parts();
    let meta = request_meta(&parts);

    let definition = FormDefinition::load(&state.forms_root, &meta.path).await?;
    let form = read_form(Request::from_parts(parts, body)).await?;

    let params = ParamResolver::new(&definition, &state.settings, &state.forms_root);
    check_request(&params, &meta, &form)?;

    let submission = Submission::new(form, &meta);
    let span = info_span!("submission", submission_id = %submission.id, form = %submission.form);
    let ctx = SinkContext {
        params: &params,
        submission: &submission,
    };
    async {
        info!(fields = submission.csv_row().len(), "Accepted form submission");
        let reports = state.dispatcher.dispatch(&ctx).await;
        let failed = reports.iter().filter(|r| r.outcome.is_err()).count();
        if failed > 0 {
            warn!(failed, sinks = reports.len(), "Submission delivered with sink failures");
        }
    }
    .instrument(span)
    .await;

    Ok(destination_url(&params, &submission, &meta))
}

/// `dest.url`, else the destination form field, else the referrer, else `/`.
///
/// A candidate that is not a valid header value is skipped.
pub fn destination_url(
    params: &ParamResolver<'_>,
    submission: &Submission,
    meta: &RequestMeta,
) -> HeaderValue {
    let referrer = meta.referrer.as_ref().map(|r| r.to_string());
    [
        params.lookup("dest.url"),
        submission.dest_url(),
        referrer.as_deref(),
    ]
    .into_iter()
    .flatten()
    .map(str::trim)
    .filter(|candidate| !candidate.is_empty())
    .find_map(|candidate| match HeaderValue::try_from(candidate) {
        Ok(value) => Some(value),
        Err(_) => {
            warn!(destination = candidate, "Ignoring unusable redirect destination");
            None
        }
    })
    .unwrap_or_else(|| HeaderValue::from_static("/"))
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        match &self {
            Error::Definition(DefinitionError::NotFound(path)) => {
                info!(%path, "No form definition for request");
                (StatusCode::NOT_FOUND, "File not found").into_response()
            }
            Error::Security(reason) => {
                warn!(%reason, "Rejected form submission");
                (StatusCode::FORBIDDEN, "Forbidden").into_response()
            }
            Error::Form(FormError::UnsupportedContentType(ct)) => {
                warn!(content_type = %ct, "Unsupported form content type");
                (StatusCode::UNSUPPORTED_MEDIA_TYPE, self.to_string()).into_response()
            }
            Error::Form(FormError::Malformed(_)) => {
                warn!(error = %self, "Malformed form body");
                (StatusCode::BAD_REQUEST, self.to_string()).into_response()
            }
            _ => {
                tracing::error!(error = %self, "Form processing failed");
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error").into_response()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use axum::body::{Body, to_bytes};
    use tempfile::TempDir;
    use tower::ServiceExt;

    use super::*;
    use crate::sinks::SmtpMailer;

    fn app(dir: &TempDir) -> Router {
        form_routes(AppState::new(
            dir.path().to_path_buf(),
            Settings::default(),
            Arc::new(SmtpMailer::new()),
        ))
    }

    fn form_post(path: &str, referer: Option<&str>, body: &str) -> Request {
        let mut builder = axum::http::Request::post(path)
            .header(header::HOST, "example.com")
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded");
        if let Some(r) = referer {
            builder = builder.header(header::REFERER, r);
        }
        builder.body(Body::from(body.to_string())).unwrap()
    }

    #[tokio::test]
    async fn health_ok() {
        let dir = TempDir::new().unwrap();
        let resp = app(&dir)
            .oneshot(axum::http::Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let body = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["status"], "ok");
    }

    #[tokio::test]
    async fn unknown_form_is_404() {
        let dir = TempDir::new().unwrap();
        let resp = app(&dir)
            .oneshot(form_post("/missing.form", Some("https://example.com/"), "a=1"))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        let body = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&body[..], b"File not found");
    }

    #[tokio::test]
    async fn missing_referrer_is_403() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("contact.form"), "").unwrap();
        let resp = app(&dir)
            .oneshot(form_post("/contact.form", None, "a=1"))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn get_on_form_path_is_405() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("contact.form"), "").unwrap();
        let resp = app(&dir)
            .oneshot(axum::http::Request::get("/contact.form").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::METHOD_NOT_ALLOWED);
    }

    #[tokio::test]
    async fn accepted_submission_redirects_to_referrer() {
        let dir = TempDir::new().unwrap();
        // No sinks enabled: notification fails on missing config and is ignored.
        std::fs::write(dir.path().join("contact.form"), "---\n---\n").unwrap();
        let resp = app(&dir)
            .oneshot(form_post("/contact.form", Some("https://example.com/contact"), "name=Ada"))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::FOUND);
        assert_eq!(
            resp.headers()[header::LOCATION],
            "https://example.com/contact"
        );
    }

    #[tokio::test]
    async fn dest_field_overrides_referrer() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("contact.form"), "").unwrap();
        let resp = app(&dir)
            .oneshot(form_post(
                "/contact.form",
                Some("https://example.com/contact"),
                "name=Ada&formmailer-dest-url=https%3A%2F%2Fexample.com%2Fthanks",
            ))
            .await
            .unwrap();
        assert_eq!(resp.headers()[header::LOCATION], "https://example.com/thanks");
    }

    #[tokio::test]
    async fn dest_url_param_overrides_field() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("contact.form"), "dest.url: /done.html\n").unwrap();
        let resp = app(&dir)
            .oneshot(form_post(
                "/contact.form",
                Some("https://example.com/contact"),
                "formmailer-dest-url=https%3A%2F%2Fexample.com%2Fthanks",
            ))
            .await
            .unwrap();
        assert_eq!(resp.headers()[header::LOCATION], "/done.html");
    }

    #[tokio::test]
    async fn unusable_dest_field_falls_back_to_referrer() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("contact.form"), "").unwrap();
        let resp = app(&dir)
            .oneshot(form_post(
                "/contact.form",
                Some("https://example.com/contact"),
                "name=Ada&formmailer-dest-url=https%3A%2F%2Fexample.com%2Fa%0Ab",
            ))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::FOUND);
        assert_eq!(
            resp.headers()[header::LOCATION],
            "https://example.com/contact"
        );
    }

    #[tokio::test]
    async fn encoded_form_path_maps_to_decoded_file() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("contact us.form"), "dest.url: /thanks\n").unwrap();
        let resp = app(&dir)
            .oneshot(form_post(
                "/contact%20us.form",
                Some("https://example.com/contact"),
                "name=Ada",
            ))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::FOUND);
        assert_eq!(resp.headers()[header::LOCATION], "/thanks");
    }

    #[tokio::test]
    async fn encoded_traversal_is_404() {
        let dir = TempDir::new().unwrap();
        let resp = app(&dir)
            .oneshot(form_post(
                "/%2e%2e/contact.form",
                Some("https://example.com/contact"),
                "name=Ada",
            ))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn non_form_content_type_is_415() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("contact.form"), "").unwrap();
        let request = axum::http::Request::post("/contact.form")
            .header(header::HOST, "example.com")
            .header(header::REFERER, "https://example.com/contact")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(r#"{"name":"Ada"}"#))
            .unwrap();
        let resp = app(&dir).oneshot(request).await.unwrap();
        assert_eq!(resp.status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);
    }
}
