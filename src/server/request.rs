//! Pulling request metadata and form fields out of an HTTP request.

use std::net::SocketAddr;

use axum::extract::rejection::FormRejection;
use axum::extract::{ConnectInfo, Form, FromRequest, Multipart, Request};
use axum::http::header::{CONTENT_TYPE, HOST, REFERER, USER_AGENT};
use axum::http::request::Parts;
use axum::http::HeaderMap;
use reqwest::Url;

use crate::error::FormError;
use crate::form::submission::{FormFields, RequestMeta};

const X_FORWARDED_FOR: &str = "x-forwarded-for";

/// Capture path, host, client IP, user-agent and referrer.
pub fn request_meta(parts: &Parts) -> RequestMeta {
    let headers = &parts.headers;
    let peer = parts
        .extensions
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string());

    RequestMeta {
        path: parts.uri.path().to_string(),
        host: header_str(headers, HOST.as_str())
            .map(|h| strip_port(h).to_string())
            .or_else(|| parts.uri.host().map(str::to_string)),
        ip: forwarded_for(headers).or(peer).unwrap_or_default(),
        user_agent: header_str(headers, USER_AGENT.as_str())
            .unwrap_or_default()
            .to_string(),
        referrer: header_str(headers, REFERER.as_str()).and_then(|r| Url::parse(r).ok()),
    }
}

/// Decode a url-encoded or multipart form body. File parts are ignored.
pub async fn read_form(request: Request) -> Result<FormFields, FormError> {
    let content_type = header_str(request.headers(), CONTENT_TYPE.as_str())
        .unwrap_or_default()
        .to_string();

    if content_type.starts_with("multipart/form-data") {
        let mut multipart = Multipart::from_request(request, &())
            .await
            .map_err(|e| FormError::Malformed(e.body_text()))?;

        let mut fields = FormFields::default();
        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| FormError::Malformed(e.body_text()))?
        {
            if field.file_name().is_some() {
                continue;
            }
            let Some(name) = field.name().map(str::to_string) else {
                continue;
            };
            let value = field
                .text()
                .await
                .map_err(|e| FormError::Malformed(e.body_text()))?;
            fields.add(name, value);
        }
        return Ok(fields);
    }

    let Form(pairs) = Form::<Vec<(String, String)>>::from_request(request, &())
        .await
        .map_err(|e| match e {
            FormRejection::InvalidFormContentType(_) => {
                FormError::UnsupportedContentType(content_type.clone())
            }
            other => FormError::Malformed(other.body_text()),
        })?;
    Ok(FormFields::from_pairs(pairs))
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

/// First address of `X-Forwarded-For`, if any.
fn forwarded_for(headers: &HeaderMap) -> Option<String> {
    header_str(headers, X_FORWARDED_FOR)?
        .split(',')
        .map(str::trim)
        .find(|s| !s.is_empty())
        .map(str::to_string)
}

/// `example.com:8080` -> `example.com`, `[::1]:8080` -> `[::1]`.
fn strip_port(host: &str) -> &str {
    if host.starts_with('[') {
        return host.find(']').map(|i| &host[..=i]).unwrap_or(host);
    }
    host.rsplit_once(':').map(|(h, _)| h).unwrap_or(host)
}
