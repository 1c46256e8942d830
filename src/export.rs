//! Export and interchange of the raw document.
//!
//! Everything here works on the raw [`Value`], never on the normalized tree,
//! so exporting is available even when normalization failed.

use std::path::{Path, PathBuf};

use serde_json::Value;

use crate::error::{ExportError, LoadError};
use crate::loader::load_schema_str;

/// Destination for copied text.
pub trait Clipboard {
    /// # Errors
    ///
    /// Returns `ExportError::Clipboard` when the platform refuses the write.
    fn set_text(&mut self, text: &str) -> Result<(), ExportError>;
}

/// In-process clipboard, for hosts without a platform clipboard.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemoryClipboard {
    contents: Option<String>,
}

impl MemoryClipboard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contents(&self) -> Option<&str> {
        self.contents.as_deref()
    }
}

impl Clipboard for MemoryClipboard {
    fn set_text(&mut self, text: &str) -> Result<(), ExportError> {
        self.contents = Some(text.to_string());
        Ok(())
    }
}

/// Format a document as two-space indented JSON, keys in source order.
///
/// # Errors
///
/// Returns `ExportError::Serialize` if the value cannot be encoded.
pub fn serialize(document: &Value) -> Result<String, ExportError> {
    Ok(serde_json::to_string_pretty(document)?)
}

/// Parse user-supplied text back into a document.
///
/// `parse_user_text(&serialize(d)?)` always yields a value equal to `d`.
///
/// # Errors
///
/// Returns `LoadError::InvalidJson` if the text isn't valid JSON.
pub fn parse_user_text(text: &str) -> Result<Value, LoadError> {
    load_schema_str(text)
}

/// Copy the formatted document to a clipboard.
pub fn copy_to_clipboard(
    document: &Value,
    clipboard: &mut dyn Clipboard,
) -> Result<(), ExportError> {
    let text = serialize(document)?;
    clipboard.set_text(&text)
}

/// Write the formatted document to `path`, adding `.json` when the file name
/// has no extension. Returns the path actually written.
pub fn download_as_file(document: &Value, path: &Path) -> Result<PathBuf, ExportError> {
    let path = if path.extension().is_none() {
        path.with_extension("json")
    } else {
        path.to_path_buf()
    };

    let mut text = serialize(document)?;
    text.push('\n');
    std::fs::write(&path, text).map_err(|source| ExportError::Write {
        path: path.clone(),
        source,
    })?;

    tracing::info!(path = %path.display(), "exported schema");
    Ok(path)
}

/// Suggested download name: slugged `title`, else the last `$id` segment,
/// else `schema.json`.
pub fn default_file_name(document: &Value) -> String {
    if let Some(title) = document.get("title").and_then(Value::as_str) {
        let slug = slugify(title);
        if !slug.is_empty() {
            return format!("{}.json", slug);
        }
    }

    let from_id = document
        .get("$id")
        .and_then(Value::as_str)
        .map(|id| id.split('#').next().unwrap_or(id))
        .and_then(|id| id.rsplit('/').next())
        .filter(|segment| !segment.is_empty());

    match from_id {
        Some(segment) if segment.ends_with(".json") => segment.to_string(),
        Some(segment) => format!("{}.json", segment),
        None => "schema.json".to_string(),
    }
}

fn slugify(title: &str) -> String {
    let mut slug = String::with_capacity(title.len());
    for c in title.chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
        } else if !slug.is_empty() && !slug.ends_with('-') {
            slug.push('-');
        }
    }
    slug.trim_end_matches('-').to_string()
}
