//! Schema Viewer
//!
//! Load JSON Schema documents from files, URLs, pasted text or bundled
//! samples, normalize them into an arena of nodes, and render them as an
//! explorer outline, a node-link graph or pretty-printed source.
//!
//! # Example
//!
//! ```
//! use schema_viewer::{normalize, NodeKind, RefTarget};
//! use serde_json::json;
//!
//! let schema = json!({
//!     "type": "object",
//!     "properties": {
//!         "name": { "type": "string" },
//!         "children": { "type": "array", "items": { "$ref": "#" } }
//!     }
//! });
//!
//! let tree = normalize(&schema).unwrap();
//! assert_eq!(tree.root_node().kind, NodeKind::Object);
//!
//! // The recursive $ref becomes a back-reference to the root, not a copy.
//! let items = tree.get("/properties/children/items").unwrap();
//! let target = &items.reference.as_ref().unwrap().target;
//! assert_eq!(*target, RefTarget::BackReference(tree.root()));
//! ```
//!
//! # Sessions
//!
//! [`ViewerSession`] owns the loaded [`Document`], its normalized tree and
//! the [`ViewState`]. Every load takes a [`LoadTicket`] when requested; only
//! the most recent ticket may replace the document, so a slow URL fetch can
//! never overwrite a newer load. Failed loads set the error banner and keep
//! the previous document.
//!
//! | Error tag | Raised when |
//! |-----------|-------------|
//! | `invalid-json` | input text is not well-formed JSON |
//! | `fetch-failed` | file, URL or sample cannot be obtained |
//! | `parse-failed` | JSON is well-formed but not schema-shaped |

mod diagnostics;
mod error;
mod explorer;
mod export;
mod graph;
mod loader;
mod normalizer;
mod pointer;
mod samples;
mod session;
mod types;

pub use diagnostics::{check, check_tree, CheckReport, Diagnostic, Severity};
pub use error::{ExportError, LoadError, LoadErrorKind, ParseError};
pub use explorer::{render_text as render_explorer, rows as explorer_rows, ExplorerRow};
pub use export::{
    copy_to_clipboard, default_file_name, download_as_file, parse_user_text, serialize,
    Clipboard, MemoryClipboard,
};
pub use graph::{EdgeKind, GraphEdge, GraphNode, Layout, Position, SchemaGraph};
pub use loader::{
    is_url, load_schema_file, load_schema_str, parse_source, LoadSource, SchemaFetcher,
    SAMPLE_PREFIX,
};
pub use normalizer::{
    normalize, normalize_with, Applicator, Combinator, CombinatorGroup, Edge, NodeId, NodeKind,
    RefTarget, Reference, SchemaNode, SchemaTree,
};
pub use pointer::{classify_ref, RefLocation};
pub use samples::{list as list_samples, load_sample, Sample};
pub use session::{
    Document, LoadOutcome, LoadTicket, SessionHandle, ViewState, ViewerSession,
};
pub use types::{json_type_name, FetchOptions, NormalizeOptions, ViewMode};

#[cfg(feature = "remote")]
pub use loader::HttpFetcher;
