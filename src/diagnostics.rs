//! Schema diagnostics - static checks over a loaded document.
//!
//! Reports:
//! - documents that cannot be normalized
//! - `$ref` targets that are missing, external or cyclic
//! - meta-schema violations for known JSON Schema drafts

use serde::Serialize;
use serde_json::Value;

use crate::normalizer::{normalize, RefTarget, SchemaTree};
use crate::pointer;

/// Drafts whose meta-schemas ship with the validator, so no fetch is needed.
const KNOWN_DRAFTS: &[&str] = &[
    "http://json-schema.org/draft-04/schema",
    "http://json-schema.org/draft-06/schema",
    "http://json-schema.org/draft-07/schema",
    "https://json-schema.org/draft/2019-09/schema",
    "https://json-schema.org/draft/2020-12/schema",
];

/// Severity level for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
}

/// A single diagnostic message.
#[derive(Debug, Clone, Serialize)]
pub struct Diagnostic {
    pub severity: Severity,
    pub code: String,
    /// JSON path to the issue (e.g., "/properties/id/$ref")
    pub path: String,
    pub message: String,
}

impl Diagnostic {
    fn error(code: &str, path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            code: code.to_string(),
            path: path.into(),
            message: message.into(),
        }
    }

    fn warning(code: &str, path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            code: code.to_string(),
            path: path.into(),
            message: message.into(),
        }
    }
}

/// Result of checking one document.
#[derive(Debug, Clone, Serialize)]
pub struct CheckReport {
    pub errors: usize,
    pub warnings: usize,
    pub diagnostics: Vec<Diagnostic>,
}

impl CheckReport {
    fn new(diagnostics: Vec<Diagnostic>) -> Self {
        let errors = diagnostics
            .iter()
            .filter(|d| d.severity == Severity::Error)
            .count();
        Self {
            errors,
            warnings: diagnostics.len() - errors,
            diagnostics,
        }
    }

    /// Returns true if there are no errors.
    pub fn is_ok(&self) -> bool {
        self.errors == 0
    }
}

/// Normalize and check a document.
pub fn check(document: &Value) -> CheckReport {
    match normalize(document) {
        Ok(tree) => check_tree(document, &tree),
        Err(e) => CheckReport::new(vec![Diagnostic::error("E003", "/", e.to_string())]),
    }
}

/// Check an already normalized document.
pub fn check_tree(document: &Value, tree: &SchemaTree) -> CheckReport {
    let mut diagnostics = Vec::new();

    check_refs(tree, &mut diagnostics);

    if let Value::Object(map) = document {
        match map.get("$schema").and_then(Value::as_str) {
            None => diagnostics.push(Diagnostic::warning(
                "W003",
                "/",
                "schema missing $schema field",
            )),
            // Building a validator also resolves every `$ref`, so a document
            // with unresolvable refs would fail here for the wrong reason.
            Some(uri) if is_known_draft(uri) && all_refs_local(tree) => {
                check_meta(document, &mut diagnostics)
            }
            Some(_) => {}
        }
    }

    CheckReport::new(diagnostics)
}

fn check_refs(tree: &SchemaTree, diagnostics: &mut Vec<Diagnostic>) {
    for (id, reference) in tree.references() {
        let path = pointer::push(&tree.node(id).pointer, "$ref");
        match &reference.target {
            RefTarget::Resolved(_) => {}
            RefTarget::BackReference(_) => diagnostics.push(Diagnostic::warning(
                "W002",
                path,
                format!("cyclic reference: {}", reference.raw),
            )),
            RefTarget::External(uri) => diagnostics.push(Diagnostic::warning(
                "W001",
                path,
                format!("external reference not followed: {}", uri),
            )),
            RefTarget::Missing(target) => diagnostics.push(Diagnostic::error(
                "E001",
                path,
                format!("reference target not found: {}", target),
            )),
        }
    }
}

fn all_refs_local(tree: &SchemaTree) -> bool {
    tree.references().all(|(_, r)| r.target.node().is_some())
}

fn is_known_draft(uri: &str) -> bool {
    let uri = uri.trim_end_matches('#');
    KNOWN_DRAFTS.contains(&uri)
}

/// `validator_for` checks the document against its draft's meta-schema
/// before compiling it.
fn check_meta(document: &Value, diagnostics: &mut Vec<Diagnostic>) {
    if let Err(e) = jsonschema::validator_for(document) {
        let path = e.instance_path.to_string();
        diagnostics.push(Diagnostic::error(
            "E002",
            if path.is_empty() { "/".to_string() } else { path },
            format!("meta-schema violation: {}", e),
        ));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn codes(report: &CheckReport) -> Vec<&str> {
        report.diagnostics.iter().map(|d| d.code.as_str()).collect()
    }

    #[test]
    fn clean_schema() {
        let report = check(&json!({
            "$schema": "https://json-schema.org/draft/2020-12/schema",
            "type": "object",
            "properties": { "id": { "type": "string" } }
        }));
        assert!(report.is_ok());
        assert!(report.diagnostics.is_empty());
    }

    #[test]
    fn missing_schema_keyword_warns() {
        let report = check(&json!({ "type": "string" }));
        assert!(report.is_ok());
        assert_eq!(codes(&report), vec!["W003"]);
    }

    #[test]
    fn reference_problems() {
        let report = check(&json!({
            "$schema": "http://json-schema.org/draft-07/schema#",
            "properties": {
                "a": { "$ref": "#/definitions/missing" },
                "b": { "$ref": "other.json" },
                "c": { "$ref": "#" }
            }
        }));
        assert_eq!(codes(&report), vec!["E001", "W001", "W002"]);
        assert_eq!(report.errors, 1);
        assert_eq!(report.warnings, 2);
        assert_eq!(report.diagnostics[0].path, "/properties/a/$ref");
    }

    #[test]
    fn meta_schema_violation() {
        let report = check(&json!({
            "$schema": "https://json-schema.org/draft/2020-12/schema",
            "minLength": -1
        }));
        assert!(!report.is_ok());
        assert_eq!(codes(&report), vec!["E002"]);
    }

    #[test]
    fn missing_ref_is_not_reported_as_meta_violation() {
        let report = check(&json!({
            "$schema": "https://json-schema.org/draft/2020-12/schema",
            "properties": { "a": { "$ref": "#/$defs/gone" } }
        }));
        assert_eq!(codes(&report), vec!["E001"]);
    }

    #[test]
    fn meta_violation_inside_conditional() {
        let report = check(&json!({
            "$schema": "https://json-schema.org/draft/2020-12/schema",
            "$defs": { "len": { "type": "string" } },
            "if": { "$ref": "#/$defs/len" },
            "then": { "maxLength": "ten" }
        }));
        assert_eq!(codes(&report), vec!["E002"]);
    }

    #[test]
    fn unknown_draft_skips_meta_validation() {
        let report = check(&json!({
            "$schema": "https://example.com/custom-meta",
            "minLength": -1
        }));
        assert!(report.is_ok());
    }

    #[test]
    fn unreadable_document() {
        let report = check(&json!("just a string"));
        assert_eq!(codes(&report), vec!["E003"]);
    }
}
