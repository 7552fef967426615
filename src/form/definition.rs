//! Form definition files.
//!
//! A definition is a small front-matter block of `key: value` lines that
//! configures how a single form endpoint behaves:
//!
//! ```text
//! ---
//! toAddress: sales@example.com
//! subject: "New lead"
//! CSV.enabled: true
//! CSV.path: leads.csv
//! ---
//! ```

use std::collections::HashMap;
use std::path::{Component, Path, PathBuf};

use tokio::fs;

use crate::error::DefinitionError;

const FRONT_MATTER_DELIMITER: &str = "---";

/// Parsed parameters of one form definition.
#[derive(Debug, Clone, Default)]
pub struct FormDefinition {
    /// Absolute path of the definition file on disk.
    path: PathBuf,
    /// Keys are stored lower-cased.
    params: HashMap<String, String>,
}

impl FormDefinition {
    /// Parse definition text. `path` is kept for resolving relative files.
    pub fn parse(path: PathBuf, text: &str) -> Self {
        Self {
            path,
            params: parse_front_matter(text),
        }
    }

    /// Load the definition that a request path maps onto.
    pub async fn load(forms_root: &Path, request_path: &str) -> Result<Self, DefinitionError> {
        let path = resolve_request_path(forms_root, request_path)?;
        match fs::metadata(&path).await {
            Ok(meta) if meta.is_file() => {}
            Ok(_) => return Err(DefinitionError::NotFound(request_path.to_string())),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(DefinitionError::NotFound(request_path.to_string()));
            }
            Err(e) => return Err(e.into()),
        }
        let text = fs::read_to_string(&path).await?;
        Ok(Self::parse(path, &text))
    }

    /// Raw parameter value, if the definition sets it (case-insensitive key).
    pub fn get(&self, name: &str) -> Option<&str> {
        self.params.get(&name.to_lowercase()).map(String::as_str)
    }

    /// Directory containing the definition file.
    pub fn directory(&self) -> &Path {
        self.path.parent().unwrap_or_else(|| Path::new("."))
    }
}

/// Map a URL path onto a file below `forms_root`, refusing traversal.
///
/// The path is percent-decoded first, so `%2e%2e` is refused like `..`.
pub fn resolve_request_path(
    forms_root: &Path,
    request_path: &str,
) -> Result<PathBuf, DefinitionError> {
    let decoded = urlencoding::decode(request_path)
        .map_err(|_| DefinitionError::NotFound(request_path.to_string()))?;
    let relative = decoded.trim_start_matches('/');
    if relative.is_empty() {
        return Err(DefinitionError::NotFound(request_path.to_string()));
    }

    let mut resolved = forms_root.to_path_buf();
    for component in Path::new(relative).components() {
        match component {
            Component::Normal(part) => resolved.push(part),
            Component::CurDir => {}
            _ => return Err(DefinitionError::NotFound(request_path.to_string())),
        }
    }
    Ok(resolved)
}

/// Extract `key: value` pairs from the front matter (or the whole text when
/// there is no opening delimiter).
fn parse_front_matter(text: &str) -> HashMap<String, String> {
    let mut lines = text.lines().peekable();
    let fenced = lines.peek().is_some_and(|first| {
        first.trim_start_matches('\u{feff}').trim() == FRONT_MATTER_DELIMITER
    });
    if fenced {
        lines.next();
    }

    let mut params = HashMap::new();
    for line in lines {
        let line = line.trim();
        if fenced && line == FRONT_MATTER_DELIMITER {
            break;
        }
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let Some((key, value)) = line.split_once(':') else {
            continue;
        };
        let key = key.trim();
        if key.is_empty() {
            continue;
        }
        params.insert(key.to_lowercase(), unquote(value.trim()).to_string());
    }
    params
}

fn unquote(value: &str) -> &str {
    for quote in ['"', '\''] {
        if value.len() >= 2 && value.starts_with(quote) && value.ends_with(quote) {
            return &value[1..value.len() - 1];
        }
    }
    value
}
