//! Request legitimacy checks: referrer allow-list and honeypot.

use crate::error::SecurityError;
use crate::form::params::ParamResolver;
use crate::form::submission::{FormFields, HONEYPOT_FIELD, RequestMeta};

/// Check that the form was posted from an allowed page and not by a bot.
///
/// The allow-list comes from `allowedDomains` and defaults to the host the
/// request was addressed to.
pub fn check_request(
    params: &ParamResolver<'_>,
    meta: &RequestMeta,
    form: &FormFields,
) -> Result<(), SecurityError> {
    let referrer_host = meta
        .referrer
        .as_ref()
        .and_then(|url| url.host_str())
        .ok_or(SecurityError::MissingReferrer)?;

    let default_domains = meta.host.as_deref().unwrap_or_default();
    let allowed = params.get("allowedDomains", default_domains);
    if !is_domain_allowed(&allowed, referrer_host) {
        return Err(SecurityError::DomainNotAllowed {
            domain: referrer_host.to_string(),
        });
    }

    if form.get(HONEYPOT_FIELD).is_some_and(|v| !v.is_empty()) {
        return Err(SecurityError::HoneypotFilled);
    }

    Ok(())
}

/// Exact host match against a comma separated list.
pub fn is_domain_allowed(allowed: &str, host: &str) -> bool {
    allowed
        .split(',')
        .map(str::trim)
        .filter(|d| !d.is_empty())
        .any(|d| d.eq_ignore_ascii_case(host))
}

#[cfg(test)]
mod tests {
    use std::path::{Path, PathBuf};

    use reqwest::Url;

    use super::*;
    use crate::config::Settings;
    use crate::form::definition::FormDefinition;

    fn meta(referrer: Option<&str>) -> RequestMeta {
        RequestMeta {
            path: "/contact.form".into(),
            host: Some("example.com".into()),
            ip: "127.0.0.1".into(),
            user_agent: String::new(),
            referrer: referrer.and_then(|r| Url::parse(r).ok()),
        }
    }

    fn check(def_text: &str, referrer: Option<&str>, form: &FormFields) -> Result<(), SecurityError> {
        let def = FormDefinition::parse(PathBuf::from("/forms/contact.form"), def_text);
        let settings = Settings::default();
        let params = ParamResolver::new(&def, &settings, Path::new("/forms"));
        check_request(&params, &meta(referrer), form)
    }

    #[test]
    fn missing_referrer_is_rejected() {
        let err = check("", None, &FormFields::default()).unwrap_err();
        assert!(matches!(err, SecurityError::MissingReferrer));
    }

    #[test]
    fn same_host_referrer_is_allowed_by_default() {
        assert!(check("", Some("https://example.com/contact"), &FormFields::default()).is_ok());
    }

    #[test]
    fn foreign_referrer_is_rejected_by_default() {
        let err = check("", Some("https://evil.test/"), &FormFields::default()).unwrap_err();
        assert!(matches!(err, SecurityError::DomainNotAllowed { domain } if domain == "evil.test"));
    }

    #[test]
    fn allow_list_from_definition() {
        let def = "allowedDomains: www.example.com, landing.example.org\n";
        assert!(check(def, Some("https://landing.example.org/x"), &FormFields::default()).is_ok());
        assert!(check(def, Some("https://example.com/"), &FormFields::default()).is_err());
    }

    #[test]
    fn filled_honeypot_is_rejected() {
        let form = FormFields::from_pairs([(HONEYPOT_FIELD, "gotcha")]);
        let err = check("", Some("https://example.com/"), &form).unwrap_err();
        assert!(matches!(err, SecurityError::HoneypotFilled));
    }

    #[test]
    fn empty_honeypot_is_fine() {
        let form = FormFields::from_pairs([(HONEYPOT_FIELD, "")]);
        assert!(check("", Some("https://example.com/"), &form).is_ok());
    }

    #[test]
    fn domain_match_is_case_insensitive() {
        assert!(is_domain_allowed("Example.COM", "example.com"));
        assert!(!is_domain_allowed("", "example.com"));
        assert!(!is_domain_allowed("sub.example.com", "example.com"));
    }
}
