//! Core types shared by the loader, normalizer and session.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Default nesting limit for normalization.
pub const DEFAULT_MAX_DEPTH: usize = 256;

/// Default timeout for HTTP requests (10 seconds).
pub const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(10);

/// Returns the JSON type name for error messages.
pub fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Which renderer is active.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ViewMode {
    #[default]
    Explorer,
    Graph,
    Source,
}

impl ViewMode {
    /// Parse a view mode from a string.
    ///
    /// Returns `None` for unknown values (caller should error).
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "explorer" => Some(ViewMode::Explorer),
            "graph" => Some(ViewMode::Graph),
            "source" => Some(ViewMode::Source),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ViewMode::Explorer => "explorer",
            ViewMode::Graph => "graph",
            ViewMode::Source => "source",
        }
    }
}

/// Options for schema normalization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizeOptions {
    /// Deepest nesting of subschemas accepted before giving up.
    pub max_depth: usize,
}

impl NormalizeOptions {
    pub fn new() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }

    /// Set the nesting limit.
    pub fn max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }
}

impl Default for NormalizeOptions {
    fn default() -> Self {
        Self::new()
    }
}

/// Options for remote schema fetching.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchOptions {
    pub timeout: Duration,
}

impl FetchOptions {
    pub fn new() -> Self {
        Self {
            timeout: DEFAULT_HTTP_TIMEOUT,
        }
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn view_mode_parse_valid() {
        assert_eq!(ViewMode::parse("explorer"), Some(ViewMode::Explorer));
        assert_eq!(ViewMode::parse("graph"), Some(ViewMode::Graph));
        assert_eq!(ViewMode::parse("source"), Some(ViewMode::Source));
    }

    #[test]
    fn view_mode_parse_invalid() {
        assert_eq!(ViewMode::parse("tree"), None);
        assert_eq!(ViewMode::parse("Graph"), None);
        assert_eq!(ViewMode::parse(""), None);
    }

    #[test]
    fn view_mode_defaults_to_explorer() {
        assert_eq!(ViewMode::default(), ViewMode::Explorer);
        assert_eq!(ViewMode::Source.as_str(), "source");
    }

    #[test]
    fn json_type_names() {
        assert_eq!(json_type_name(&json!(null)), "null");
        assert_eq!(json_type_name(&json!(1.5)), "number");
        assert_eq!(json_type_name(&json!([])), "array");
    }

    #[test]
    fn options_builders() {
        assert_eq!(NormalizeOptions::default().max_depth, DEFAULT_MAX_DEPTH);
        assert_eq!(NormalizeOptions::new().max_depth(8).max_depth, 8);
        assert_eq!(
            FetchOptions::new().timeout(Duration::from_secs(1)).timeout,
            Duration::from_secs(1)
        );
    }
}
