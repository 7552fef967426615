//! `{name}` placeholder substitution.

use std::collections::BTreeSet;
use std::sync::LazyLock;

use regex::Regex;

use crate::form::submission::Submission;

static PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{([A-Za-z0-9_.\-]+)\}").expect("placeholder regex is valid"));

/// Distinct placeholder names in order of first appearance.
pub fn placeholder_names(text: &str) -> Vec<&str> {
    let mut seen = BTreeSet::new();
    PLACEHOLDER
        .captures_iter(text)
        .filter_map(|c| c.get(1))
        .map(|m| m.as_str())
        .filter(|name| seen.insert(*name))
        .collect()
}

/// Replace every `{name}` with the submitted value of `name` (empty if absent).
pub fn render(text: &str, submission: &Submission) -> String {
    let mut rendered = text.to_string();
    for name in placeholder_names(text) {
        let value = submission.field(name).unwrap_or_default();
        rendered = rendered.replace(&format!("{{{name}}}"), value);
    }
    rendered
}
