//! Viewer session - the single owner of the loaded document and view state.
//!
//! All document changes go through [`ViewerSession::complete_load`], which
//! only applies a result carrying the most recently issued [`LoadTicket`].
//! A load that finishes after a newer one was requested is discarded, and a
//! failed load never touches the current document.

use std::collections::BTreeSet;
use std::future::Future;
use std::path::Path;
use std::sync::{Arc, Mutex, PoisonError};

use serde_json::Value;

use crate::error::{LoadError, LoadErrorKind, ParseError};
use crate::loader::{load_schema_file, load_schema_str, LoadSource, SchemaFetcher};
use crate::normalizer::{normalize_with, SchemaTree};
use crate::samples;
use crate::types::{NormalizeOptions, ViewMode};

/// The currently loaded raw schema. Never mutated once created.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    value: Value,
    source: LoadSource,
    revision: u64,
}

impl Document {
    pub fn value(&self) -> &Value {
        &self.value
    }

    pub fn source(&self) -> &LoadSource {
        &self.source
    }

    /// Strictly increasing per session; a new document is a new revision.
    pub fn revision(&self) -> u64 {
        self.revision
    }
}

/// Proof that a load was requested, in request order.
///
/// A ticket is consumed by [`ViewerSession::complete_load`] and cannot be
/// duplicated, so one request settles at most once.
///
/// ```compile_fail
/// use schema_viewer::{LoadSource, ViewerSession};
///
/// let mut session = ViewerSession::new();
/// let ticket = session.begin_load(LoadSource::Text);
/// let again = ticket.clone();
/// ```
#[derive(Debug, PartialEq, Eq)]
pub struct LoadTicket {
    generation: u64,
    source: LoadSource,
}

impl LoadTicket {
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn source(&self) -> &LoadSource {
        &self.source
    }
}

/// What happened to a completed load.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    /// The result replaced the document.
    Applied,
    /// The load failed; the previous document is kept.
    Failed(LoadErrorKind),
    /// A newer load was requested meanwhile; the result was dropped.
    Stale,
}

/// Transient presentation state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ViewState {
    pub mode: ViewMode,
    /// Pointers of expanded explorer nodes.
    pub expanded: BTreeSet<String>,
    /// Pointer of the selected graph node.
    pub selected: Option<String>,
}

/// Owned session state: document, derived tree, view and error banner.
#[derive(Debug, Default)]
pub struct ViewerSession {
    document: Option<Document>,
    tree: Option<Result<SchemaTree, ParseError>>,
    view: ViewState,
    error: Option<LoadError>,
    generation: u64,
    revision: u64,
    options: NormalizeOptions,
}

impl ViewerSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(options: NormalizeOptions) -> Self {
        Self {
            options,
            ..Self::default()
        }
    }

    pub fn document(&self) -> Option<&Document> {
        self.document.as_ref()
    }

    /// Normalization result for the current document, if one is loaded.
    pub fn tree(&self) -> Option<&Result<SchemaTree, ParseError>> {
        self.tree.as_ref()
    }

    /// The normalized tree, when normalization succeeded.
    pub fn schema(&self) -> Option<&SchemaTree> {
        self.tree.as_ref().and_then(|t| t.as_ref().ok())
    }

    pub fn view(&self) -> &ViewState {
        &self.view
    }

    /// Error banner contents.
    pub fn error(&self) -> Option<&LoadError> {
        self.error.as_ref()
    }

    pub fn clear_error(&mut self) {
        self.error = None;
    }

    pub fn set_view_mode(&mut self, mode: ViewMode) {
        self.view.mode = mode;
    }

    /// The mode actually rendered: a document that failed to normalize can
    /// only be shown as source.
    pub fn effective_mode(&self) -> ViewMode {
        match self.tree {
            Some(Err(_)) => ViewMode::Source,
            _ => self.view.mode,
        }
    }

    /// Register a new load request. Any earlier outstanding ticket becomes stale.
    pub fn begin_load(&mut self, source: LoadSource) -> LoadTicket {
        self.generation += 1;
        tracing::debug!(generation = self.generation, %source, "load requested");
        LoadTicket {
            generation: self.generation,
            source,
        }
    }

    /// Whether `ticket` is the most recently issued one.
    pub fn is_current(&self, ticket: &LoadTicket) -> bool {
        ticket.generation == self.generation
    }

    /// Settle a load. Only the latest ticket may change the session.
    pub fn complete_load(
        &mut self,
        ticket: LoadTicket,
        result: Result<Value, LoadError>,
    ) -> LoadOutcome {
        if !self.is_current(&ticket) {
            tracing::warn!(
                generation = ticket.generation,
                latest = self.generation,
                source = %ticket.source,
                "discarding stale load"
            );
            return LoadOutcome::Stale;
        }

        match result {
            Ok(value) => {
                self.install(value, ticket.source);
                LoadOutcome::Applied
            }
            Err(err) => {
                let kind = err.kind();
                tracing::warn!(source = %ticket.source, error = %err, "load failed");
                self.error = Some(err);
                LoadOutcome::Failed(kind)
            }
        }
    }

    /// Replace the document wholesale and re-normalize.
    pub fn replace_document(&mut self, value: Value, source: LoadSource) {
        let ticket = self.begin_load(source);
        self.complete_load(ticket, Ok(value));
    }

    /// Paste-to-edit: parse `text` and replace the document on success.
    pub fn load_text(&mut self, text: &str) -> LoadOutcome {
        let ticket = self.begin_load(LoadSource::Text);
        self.complete_load(ticket, load_schema_str(text))
    }

    pub fn load_file(&mut self, path: &Path) -> LoadOutcome {
        let ticket = self.begin_load(LoadSource::File(path.to_path_buf()));
        self.complete_load(ticket, load_schema_file(path))
    }

    /// Toggle an explorer node; returns whether it is now expanded.
    pub fn toggle_expanded(&mut self, pointer: &str) -> bool {
        if self.view.expanded.remove(pointer) {
            false
        } else {
            self.view.expanded.insert(pointer.to_string());
            true
        }
    }

    /// Expand one explorer node; already expanded nodes stay expanded.
    pub fn expand(&mut self, pointer: &str) {
        self.view.expanded.insert(pointer.to_string());
    }

    /// Expand every node that has children.
    pub fn expand_all(&mut self) {
        let Some(tree) = self.schema() else {
            return;
        };
        let expanded: BTreeSet<String> = tree
            .iter()
            .filter(|(id, _)| !tree.children(*id).is_empty())
            .map(|(_, node)| node.pointer.clone())
            .collect();
        self.view.expanded = expanded;
    }

    pub fn collapse_all(&mut self) {
        self.view.expanded.clear();
    }

    /// Select a graph node; unknown pointers are ignored.
    pub fn select_node(&mut self, pointer: Option<&str>) -> bool {
        match pointer {
            None => {
                self.view.selected = None;
                true
            }
            Some(p) if self.schema().is_some_and(|t| t.id_of(p).is_some()) => {
                self.view.selected = Some(p.to_string());
                true
            }
            Some(_) => false,
        }
    }

    fn install(&mut self, value: Value, source: LoadSource) {
        self.revision += 1;
        let tree = normalize_with(&value, &self.options);

        match &tree {
            Ok(schema) => {
                self.error = None;
                self.view.expanded.retain(|p| schema.id_of(p).is_some());
                if let Some(selected) = &self.view.selected {
                    if schema.id_of(selected).is_none() {
                        self.view.selected = None;
                    }
                }
                tracing::info!(%source, revision = self.revision, nodes = schema.len(), "document loaded");
            }
            Err(err) => {
                tracing::warn!(%source, error = %err, "document loaded but is not a readable schema");
                self.error = Some(LoadError::Parse(err.clone()));
            }
        }

        self.document = Some(Document {
            value,
            source,
            revision: self.revision,
        });
        self.tree = Some(tree);
    }
}

/// Shared handle for driving asynchronous loads against one session.
///
/// The lock is only held for the synchronous bookkeeping around a load,
/// never across an `.await`.
#[derive(Debug, Clone, Default)]
pub struct SessionHandle {
    inner: Arc<Mutex<ViewerSession>>,
}

impl SessionHandle {
    pub fn new(session: ViewerSession) -> Self {
        Self {
            inner: Arc::new(Mutex::new(session)),
        }
    }

    /// Run `f` with exclusive access to the session.
    pub fn with<R>(&self, f: impl FnOnce(&mut ViewerSession) -> R) -> R {
        let mut guard = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut guard)
    }

    /// Start loading `url`. The ticket is taken now, at request time; the
    /// returned future performs the fetch. Dropping it cancels the load.
    pub fn load_url<'a, F>(&self, fetcher: &'a F, url: &str) -> impl Future<Output = LoadOutcome> + 'a
    where
        F: SchemaFetcher + ?Sized,
    {
        let handle = self.clone();
        let url = url.to_string();
        let ticket = self.with(|s| s.begin_load(LoadSource::Url(url.clone())));

        async move {
            let result = fetcher.fetch(&url).await;
            handle.with(|s| s.complete_load(ticket, result))
        }
    }

    /// Start loading a bundled sample. Same ticket rules as [`Self::load_url`].
    pub fn load_sample(&self, name: &str) -> impl Future<Output = LoadOutcome> {
        let handle = self.clone();
        let name = name.to_string();
        let ticket = self.with(|s| s.begin_load(LoadSource::Sample(name.clone())));

        async move {
            tokio::task::yield_now().await;
            let result = samples::load_sample(&name);
            handle.with(|s| s.complete_load(ticket, result))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn loaded(value: Value) -> ViewerSession {
        let mut session = ViewerSession::new();
        session.replace_document(value, LoadSource::Text);
        session
    }

    #[test]
    fn replace_document_normalizes() {
        let session = loaded(json!({ "type": "object", "properties": { "a": {} } }));
        assert_eq!(session.document().unwrap().revision(), 1);
        assert!(session.schema().is_some());
        assert!(session.error().is_none());
    }

    #[test]
    fn revisions_increase() {
        let mut session = loaded(json!({}));
        session.replace_document(json!({}), LoadSource::Text);
        assert_eq!(session.document().unwrap().revision(), 2);
    }

    #[test]
    fn invalid_text_keeps_previous_document() {
        let mut session = loaded(json!({ "title": "first" }));
        let outcome = session.load_text("not json");

        assert_eq!(outcome, LoadOutcome::Failed(LoadErrorKind::InvalidJson));
        assert_eq!(session.document().unwrap().value()["title"], "first");
        assert_eq!(session.error().unwrap().kind(), LoadErrorKind::InvalidJson);
        assert!(session.schema().is_some());
    }

    #[test]
    fn successful_load_clears_error() {
        let mut session = loaded(json!({}));
        session.load_text("nope");
        assert!(session.error().is_some());
        assert_eq!(session.load_text(r#"{"type":"string"}"#), LoadOutcome::Applied);
        assert!(session.error().is_none());
    }

    #[test]
    fn parse_failure_falls_back_to_source() {
        let mut session = loaded(json!({}));
        session.set_view_mode(ViewMode::Graph);
        session.replace_document(json!(42), LoadSource::Text);

        assert_eq!(session.document().unwrap().value(), &json!(42));
        assert!(matches!(session.tree(), Some(Err(_))));
        assert_eq!(session.error().unwrap().kind(), LoadErrorKind::ParseFailed);
        assert_eq!(session.view().mode, ViewMode::Graph);
        assert_eq!(session.effective_mode(), ViewMode::Source);
    }

    #[test]
    fn stale_ticket_is_ignored() {
        let mut session = ViewerSession::new();
        let first = session.begin_load(LoadSource::Url("https://x".into()));
        let second = session.begin_load(LoadSource::Url("https://y".into()));

        assert_eq!(
            session.complete_load(second, Ok(json!({ "title": "Y" }))),
            LoadOutcome::Applied
        );
        assert_eq!(
            session.complete_load(first, Ok(json!({ "title": "X" }))),
            LoadOutcome::Stale
        );
        assert_eq!(session.document().unwrap().value()["title"], "Y");
    }

    #[test]
    fn stale_failure_does_not_set_banner() {
        let mut session = ViewerSession::new();
        let first = session.begin_load(LoadSource::Url("https://x".into()));
        session.load_text("{}");
        let err = LoadError::FetchFailed {
            url: "https://x".into(),
            message: "timeout".into(),
        };
        assert_eq!(session.complete_load(first, Err(err)), LoadOutcome::Stale);
        assert!(session.error().is_none());
    }

    #[test]
    fn explorer_state() {
        let mut session = loaded(json!({
            "properties": { "a": { "properties": { "b": {} } } }
        }));
        assert!(session.toggle_expanded("/properties/a"));
        assert!(!session.toggle_expanded("/properties/a"));

        session.expand("");
        session.expand("");
        assert!(session.view().expanded.contains(""));
        session.collapse_all();

        session.expand_all();
        let expanded: Vec<&str> = session.view().expanded.iter().map(String::as_str).collect();
        assert_eq!(expanded, vec!["", "/properties/a"]);

        session.collapse_all();
        assert!(session.view().expanded.is_empty());
    }

    #[test]
    fn selection_survives_only_if_node_exists() {
        let mut session = loaded(json!({ "properties": { "a": {}, "b": {} } }));
        assert!(session.select_node(Some("/properties/a")));
        assert!(!session.select_node(Some("/properties/zzz")));
        session.toggle_expanded("/properties/b");

        session.replace_document(json!({ "properties": { "b": {} } }), LoadSource::Text);
        assert_eq!(session.view().selected, None);
        assert!(session.view().expanded.contains("/properties/b"));
    }
}
