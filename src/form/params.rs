//! Layered parameter resolution: definition file, then application
//! settings (prefixed, then bare), then the caller's default.

use std::path::{Path, PathBuf};

use crate::config::Settings;
use crate::form::definition::FormDefinition;

/// Resolves parameters for a single request.
#[derive(Debug, Clone, Copy)]
pub struct ParamResolver<'a> {
    definition: &'a FormDefinition,
    settings: &'a Settings,
    forms_root: &'a Path,
}

impl<'a> ParamResolver<'a> {
    pub fn new(definition: &'a FormDefinition, settings: &'a Settings, forms_root: &'a Path) -> Self {
        Self {
            definition,
            settings,
            forms_root,
        }
    }

    /// Value of `name`, or `default` when no layer provides a non-empty one.
    pub fn get(&self, name: &str, default: &str) -> String {
        self.lookup(name).unwrap_or(default).to_string()
    }

    /// Value of `name`, or `None` when every layer is empty.
    pub fn lookup(&self, name: &str) -> Option<&'a str> {
        self.definition
            .get(name)
            .filter(|v| !v.is_empty())
            .or_else(|| self.settings.lookup(name))
    }

    /// Lenient boolean: unrecognized values fall back to `false`.
    pub fn get_bool(&self, name: &str, default: bool) -> bool {
        match self.lookup(name) {
            Some(raw) => parse_bool(raw).unwrap_or(false),
            None => default,
        }
    }

    pub fn get_u16(&self, name: &str, default: u16) -> u16 {
        self.lookup(name)
            .and_then(|raw| raw.trim().parse().ok())
            .unwrap_or(default)
    }

    pub fn get_u64(&self, name: &str, default: u64) -> u64 {
        self.lookup(name)
            .and_then(|raw| raw.trim().parse().ok())
            .unwrap_or(default)
    }

    /// Resolve a file parameter to a filesystem path.
    ///
    /// Absolute paths are kept, `~/` is relative to the forms root and
    /// anything else is relative to the definition file's directory.
    pub fn get_path(&self, name: &str) -> Option<PathBuf> {
        let raw = self.lookup(name)?.trim();
        if raw.is_empty() {
            return None;
        }
        Some(self.resolve_path(raw))
    }

    fn resolve_path(&self, raw: &str) -> PathBuf {
        if let Some(rest) = raw.strip_prefix("~/") {
            return self.forms_root.join(rest);
        }
        let path = Path::new(raw);
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.definition.directory().join(path)
        }
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "yes" | "on" | "1" => Some(true),
        "false" | "no" | "off" | "0" => Some(false),
        _ => None,
    }
}
