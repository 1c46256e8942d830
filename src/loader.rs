//! Schema loading from various sources.
//!
//! Handles loading schemas from files, pasted text, bundled samples and
//! HTTP URLs. Network access goes through the [`SchemaFetcher`] trait so the
//! session can drive it without caring about the transport.

use std::fmt;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde_json::Value;

use crate::error::LoadError;

#[cfg(feature = "remote")]
use crate::types::FetchOptions;

/// Prefix selecting a bundled sample on the command line.
pub const SAMPLE_PREFIX: &str = "sample:";

/// Where a document came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadSource {
    File(PathBuf),
    Url(String),
    /// Pasted or piped text.
    Text,
    Sample(String),
}

impl fmt::Display for LoadSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoadSource::File(path) => write!(f, "{}", path.display()),
            LoadSource::Url(url) => f.write_str(url),
            LoadSource::Text => f.write_str("pasted text"),
            LoadSource::Sample(name) => write!(f, "{}{}", SAMPLE_PREFIX, name),
        }
    }
}

/// Interpret a command-line source argument.
///
/// `-` reads text from stdin, `sample:<name>` picks a bundled sample,
/// `http(s)://` is a URL and anything else is a file path.
pub fn parse_source(arg: &str) -> LoadSource {
    if arg == "-" {
        LoadSource::Text
    } else if let Some(name) = arg.strip_prefix(SAMPLE_PREFIX) {
        LoadSource::Sample(name.to_string())
    } else if is_url(arg) {
        LoadSource::Url(arg.to_string())
    } else {
        LoadSource::File(PathBuf::from(arg))
    }
}

/// Check if a string looks like a URL (starts with http:// or https://).
pub fn is_url(s: &str) -> bool {
    s.starts_with("http://") || s.starts_with("https://")
}

/// Load a schema from a file path.
///
/// # Errors
///
/// Returns `LoadError::FileNotFound` if the file doesn't exist,
/// or `LoadError::InvalidJson` if the file isn't valid JSON.
pub fn load_schema_file(path: &Path) -> Result<Value, LoadError> {
    if !path.exists() {
        return Err(LoadError::FileNotFound {
            path: path.to_path_buf(),
        });
    }

    let content = std::fs::read_to_string(path).map_err(|source| LoadError::ReadFailed {
        path: path.to_path_buf(),
        source,
    })?;

    parse_json(&content, &path.display().to_string())
}

/// Load a schema from a JSON string.
///
/// # Errors
///
/// Returns `LoadError::InvalidJson` if the string isn't valid JSON.
pub fn load_schema_str(content: &str) -> Result<Value, LoadError> {
    parse_json(content, "pasted text")
}

pub(crate) fn parse_json(content: &str, origin: &str) -> Result<Value, LoadError> {
    serde_json::from_str(content).map_err(|source| LoadError::InvalidJson {
        origin: origin.to_string(),
        source,
    })
}

/// Fetches a JSON document by URL.
#[async_trait]
pub trait SchemaFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<Value, LoadError>;
}

/// [`SchemaFetcher`] doing a single HTTP `GET`.
///
/// Requires the `remote` feature (enabled by default).
#[cfg(feature = "remote")]
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
}

#[cfg(feature = "remote")]
impl HttpFetcher {
    /// # Errors
    ///
    /// Returns `LoadError::FetchFailed` if the HTTP client cannot be built.
    pub fn new(options: &FetchOptions) -> Result<Self, LoadError> {
        let client = reqwest::Client::builder()
            .timeout(options.timeout)
            .build()
            .map_err(|e| LoadError::FetchFailed {
                url: String::new(),
                message: e.to_string(),
            })?;
        Ok(Self { client })
    }
}

#[cfg(feature = "remote")]
#[async_trait]
impl SchemaFetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<Value, LoadError> {
        let network = |source| LoadError::Network {
            url: url.to_string(),
            source,
        };

        let response = self.client.get(url).send().await.map_err(network)?;

        // Check for HTTP errors before parsing
        let response = response.error_for_status().map_err(network)?;
        let body = response.text().await.map_err(network)?;

        parse_json(&body, url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LoadErrorKind;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn load_schema_valid_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, r#"{{"type": "object"}}"#).unwrap();

        let schema = load_schema_file(file.path()).unwrap();
        assert_eq!(schema["type"], "object");
    }

    #[test]
    fn load_schema_file_not_found() {
        let result = load_schema_file(Path::new("/nonexistent/path.json"));
        assert!(matches!(result, Err(LoadError::FileNotFound { .. })));
    }

    #[test]
    fn load_schema_invalid_json() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "not valid json").unwrap();

        let err = load_schema_file(file.path()).unwrap_err();
        assert_eq!(err.kind(), LoadErrorKind::InvalidJson);
    }

    #[test]
    fn load_schema_str_valid() {
        let schema = load_schema_str(r#"{"type": "object"}"#).unwrap();
        assert_eq!(schema["type"], "object");
    }

    #[test]
    fn load_schema_str_invalid() {
        let result = load_schema_str("not json");
        assert!(matches!(result, Err(LoadError::InvalidJson { .. })));
    }

    #[test]
    fn load_schema_str_keeps_key_order() {
        let schema = load_schema_str(r#"{"z": 1, "a": 2, "m": 3}"#).unwrap();
        let keys: Vec<&String> = schema.as_object().unwrap().keys().collect();
        assert_eq!(keys, vec!["z", "a", "m"]);
    }

    #[test]
    fn is_url_schemes() {
        assert!(is_url("https://example.com/schema.json"));
        assert!(is_url("http://example.com/schema.json"));
        assert!(!is_url("/path/to/schema.json"));
        assert!(!is_url("schema.json"));
    }

    #[test]
    fn parse_source_variants() {
        assert_eq!(parse_source("-"), LoadSource::Text);
        assert_eq!(
            parse_source("sample:petstore"),
            LoadSource::Sample("petstore".into())
        );
        assert_eq!(
            parse_source("https://example.com/s.json"),
            LoadSource::Url("https://example.com/s.json".into())
        );
        assert_eq!(
            parse_source("./schema.json"),
            LoadSource::File(PathBuf::from("./schema.json"))
        );
    }

    #[test]
    fn load_source_display() {
        assert_eq!(LoadSource::Text.to_string(), "pasted text");
        assert_eq!(LoadSource::Sample("tree".into()).to_string(), "sample:tree");
    }

    #[cfg(feature = "remote")]
    mod remote {
        use super::*;

        fn fetcher() -> HttpFetcher {
            HttpFetcher::new(&FetchOptions::default()).unwrap()
        }

        #[tokio::test]
        async fn fetch_valid_json() {
            let mut server = mockito::Server::new_async().await;
            let mock = server
                .mock("GET", "/schema.json")
                .with_status(200)
                .with_header("content-type", "application/json")
                .with_body(r#"{"type": "string"}"#)
                .create_async()
                .await;

            let url = format!("{}/schema.json", server.url());
            let schema = fetcher().fetch(&url).await.unwrap();
            assert_eq!(schema["type"], "string");
            mock.assert_async().await;
        }

        #[tokio::test]
        async fn fetch_404_is_fetch_failed() {
            let mut server = mockito::Server::new_async().await;
            server
                .mock("GET", "/missing.json")
                .with_status(404)
                .create_async()
                .await;

            let url = format!("{}/missing.json", server.url());
            let err = fetcher().fetch(&url).await.unwrap_err();
            assert!(matches!(err, LoadError::Network { .. }));
            assert_eq!(err.kind(), LoadErrorKind::FetchFailed);
        }

        #[tokio::test]
        async fn fetch_non_json_body_is_invalid_json() {
            let mut server = mockito::Server::new_async().await;
            server
                .mock("GET", "/page")
                .with_status(200)
                .with_body("<html>not json</html>")
                .create_async()
                .await;

            let url = format!("{}/page", server.url());
            let err = fetcher().fetch(&url).await.unwrap_err();
            assert_eq!(err.kind(), LoadErrorKind::InvalidJson);
        }
    }
}
