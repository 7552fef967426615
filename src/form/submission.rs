//! Captured form data plus request metadata.

use chrono::{DateTime, Utc};
use reqwest::Url;
use uuid::Uuid;

/// Hidden field that must stay empty; bots tend to fill every input.
pub const HONEYPOT_FIELD: &str = "formmailer-hpt";
/// Optional field naming where to send the browser afterwards.
pub const DEST_URL_FIELD: &str = "formmailer-dest-url";

/// Request details captured alongside the form body.
#[derive(Debug, Clone, Default)]
pub struct RequestMeta {
    /// Request path, used to locate the definition.
    pub path: String,
    /// Host the request was addressed to, without port.
    pub host: Option<String>,
    pub ip: String,
    pub user_agent: String,
    pub referrer: Option<Url>,
}

/// Ordered name/value pairs. Names compare case-insensitively and repeated
/// names are merged into a comma-joined value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FormFields {
    entries: Vec<(String, String)>,
}

impl FormFields {
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut fields = Self::default();
        for (name, value) in pairs {
            fields.add(name, value);
        }
        fields
    }

    pub fn add(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self
            .entries
            .iter_mut()
            .find(|(existing, _)| existing.eq_ignore_ascii_case(&name))
        {
            Some((_, existing)) => {
                existing.push(',');
                existing.push_str(&value);
            }
            None => self.entries.push((name, value)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Whether a field carries data rather than an instruction to the mailer.
pub fn is_data_field(name: &str) -> bool {
    !name.eq_ignore_ascii_case(HONEYPOT_FIELD) && !name.eq_ignore_ascii_case(DEST_URL_FIELD)
}

/// One accepted form post, as handed to the sinks.
#[derive(Debug, Clone)]
pub struct Submission {
    pub id: Uuid,
    /// Request path of the form endpoint.
    pub form: String,
    pub received_at: DateTime<Utc>,
    /// Fields exactly as posted.
    posted: FormFields,
    /// Posted fields followed by the metadata fields.
    data: FormFields,
}

impl Submission {
    pub fn new(posted: FormFields, meta: &RequestMeta) -> Self {
        let mut data = posted.clone();
        data.add("IP", meta.ip.as_str());
        data.add("User-Agent", meta.user_agent.as_str());
        data.add(
            "Referrer",
            meta.referrer.as_ref().map(Url::to_string).unwrap_or_default(),
        );
        Self {
            id: Uuid::new_v4(),
            form: meta.path.clone(),
            received_at: Utc::now(),
            posted,
            data,
        }
    }

    /// Raw posted value, control fields included.
    pub fn field(&self, name: &str) -> Option<&str> {
        self.posted.get(name)
    }

    pub fn dest_url(&self) -> Option<&str> {
        self.field(DEST_URL_FIELD).filter(|v| !v.trim().is_empty())
    }

    /// Data fields (metadata included), control fields excluded.
    pub fn data_fields(&self) -> impl Iterator<Item = (&str, &str)> {
        self.data.iter().filter(|(name, _)| is_data_field(name))
    }

    /// Plain-text listing used as the notification email body.
    pub fn email_body(&self) -> String {
        self.data_fields()
            .map(|(name, value)| format!("- {name}: {value}\n"))
            .collect()
    }

    pub fn csv_header(&self) -> Vec<&str> {
        self.data_fields().map(|(name, _)| name).collect()
    }

    pub fn csv_row(&self) -> Vec<&str> {
        self.data_fields().map(|(_, value)| value).collect()
    }

    pub fn json_fields(&self) -> serde_json::Map<String, serde_json::Value> {
        self.data_fields()
            .map(|(name, value)| (name.to_string(), serde_json::Value::from(value)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn meta() -> RequestMeta {
        RequestMeta {
            path: "/contact.form".into(),
            host: Some("example.com".into()),
            ip: "203.0.113.7".into(),
            user_agent: "TestAgent/1.0".into(),
            referrer: Url::parse("https://example.com/contact").ok(),
        }
    }

    #[test]
    fn repeated_fields_are_comma_joined() {
        let fields = FormFields::from_pairs([
            ("topic", "sales"),
            ("name", "Ada"),
            ("Topic", "support"),
        ]);
        assert_eq!(fields.len(), 2);
        assert_eq!(fields.get("topic"), Some("sales,support"));
    }

    #[test]
    fn control_fields_are_excluded_from_data() {
        let form = FormFields::from_pairs([
            ("name", "Ada"),
            ("FormMailer-HPT", ""),
            ("formmailer-dest-url", "https://example.com/thanks"),
        ]);
        let submission = Submission::new(form, &meta());
        let names = submission.csv_header();
        assert_eq!(names, vec!["name", "IP", "User-Agent", "Referrer"]);
        assert_eq!(submission.dest_url(), Some("https://example.com/thanks"));
        assert_eq!(submission.field("formmailer-hpt"), Some(""));
    }

    #[test]
    fn email_body_lists_fields_and_metadata() {
        let form = FormFields::from_pairs([("name", "Ada"), ("message", "Hello")]);
        let submission = Submission::new(form, &meta());
        assert_eq!(
            submission.email_body(),
            "- name: Ada\n- message: Hello\n- IP: 203.0.113.7\n\
             - User-Agent: TestAgent/1.0\n- Referrer: https://example.com/contact\n"
        );
    }

    #[test]
    fn csv_row_has_values_only() {
        let form = FormFields::from_pairs([("name", "Ada")]);
        let submission = Submission::new(form, &meta());
        assert_eq!(
            submission.csv_row(),
            vec!["Ada", "203.0.113.7", "TestAgent/1.0", "https://example.com/contact"]
        );
    }

    #[test]
    fn json_fields_keep_posted_order() {
        let form = FormFields::from_pairs([("zeta", "1"), ("alpha", "2")]);
        let json = Submission::new(form, &meta()).json_fields();
        let names: Vec<&str> = json.keys().map(String::as_str).collect();
        assert_eq!(names, vec!["zeta", "alpha", "IP", "User-Agent", "Referrer"]);
    }

    #[test]
    fn json_fields_carry_data() {
        let form = FormFields::from_pairs([("email", "ada@example.com"), (HONEYPOT_FIELD, "")]);
        let json = Submission::new(form, &meta()).json_fields();
        assert_eq!(json["email"], "ada@example.com");
        assert_eq!(json["IP"], "203.0.113.7");
        assert!(!json.contains_key(HONEYPOT_FIELD));
    }
}
