//! JSON Pointer (RFC 6901) helpers and `$ref` classification.

/// Where a `$ref` value points.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefLocation {
    /// JSON Pointer into the same document ("" is the root).
    Pointer(String),
    /// Plain-name fragment (`#name`) to be matched against `$anchor`.
    Anchor(String),
    /// Another document; never fetched.
    External(String),
}

/// Escape a single reference token (`~` -> `~0`, `/` -> `~1`).
pub fn escape_token(token: &str) -> String {
    token.replace('~', "~0").replace('/', "~1")
}

/// Unescape a single reference token (`~1` -> `/`, `~0` -> `~`).
pub fn unescape_token(token: &str) -> String {
    token.replace("~1", "/").replace("~0", "~")
}

/// Append a token to a pointer.
pub fn push(pointer: &str, token: &str) -> String {
    format!("{}/{}", pointer, escape_token(token))
}

/// Append an array index to a pointer.
pub fn push_index(pointer: &str, index: usize) -> String {
    format!("{}/{}", pointer, index)
}

/// Last unescaped token of a pointer, or `None` for the root.
pub fn last_token(pointer: &str) -> Option<String> {
    if pointer.is_empty() {
        return None;
    }
    pointer.rsplit('/').next().map(unescape_token)
}

/// Render a pointer for display, using `/` for the root.
pub fn display(pointer: &str) -> &str {
    if pointer.is_empty() {
        "/"
    } else {
        pointer
    }
}

/// Classify a `$ref` value relative to the document's root `$id`.
///
/// Fragments are percent-decoded. A fragment that is not a pointer and not a
/// plain name (for example a broken escape) is treated as external.
pub fn classify_ref(raw: &str, base_id: Option<&str>) -> RefLocation {
    let local = match base_id {
        Some(base) if !base.is_empty() => {
            let base = base.split('#').next().unwrap_or(base);
            raw.strip_prefix(base).unwrap_or(raw)
        }
        _ => raw,
    };

    if local.is_empty() {
        return RefLocation::Pointer(String::new());
    }

    let Some(fragment) = local.strip_prefix('#') else {
        return RefLocation::External(raw.to_string());
    };

    let Some(decoded) = percent_decode(fragment) else {
        return RefLocation::External(raw.to_string());
    };

    if decoded.is_empty() || decoded.starts_with('/') {
        RefLocation::Pointer(decoded)
    } else {
        RefLocation::Anchor(decoded)
    }
}

/// Decode `%XX` sequences in a URI fragment.
///
/// Returns `None` on a malformed escape or non-UTF-8 result.
fn percent_decode(input: &str) -> Option<String> {
    if !input.contains('%') {
        return Some(input.to_string());
    }

    let bytes = input.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            let hex = input.get(i + 1..i + 3)?;
            out.push(u8::from_str_radix(hex, 16).ok()?);
            i += 3;
        } else {
            out.push(bytes[i]);
            i += 1;
        }
    }
    String::from_utf8(out).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escape_and_push() {
        assert_eq!(escape_token("a/b~c"), "a~1b~0c");
        assert_eq!(push("", "properties"), "/properties");
        assert_eq!(push("/properties", "a/b"), "/properties/a~1b");
        assert_eq!(push_index("/allOf", 2), "/allOf/2");
    }

    #[test]
    fn last_token_unescapes() {
        assert_eq!(last_token(""), None);
        assert_eq!(last_token("/$defs/a~1b").as_deref(), Some("a/b"));
        assert_eq!(display(""), "/");
    }

    #[test]
    fn classify_local_pointers() {
        assert_eq!(classify_ref("#", None), RefLocation::Pointer(String::new()));
        assert_eq!(classify_ref("", None), RefLocation::Pointer(String::new()));
        assert_eq!(
            classify_ref("#/$defs/node", None),
            RefLocation::Pointer("/$defs/node".into())
        );
        assert_eq!(
            classify_ref("#/definitions/with%20space", None),
            RefLocation::Pointer("/definitions/with space".into())
        );
    }

    #[test]
    fn classify_anchor() {
        assert_eq!(
            classify_ref("#item", None),
            RefLocation::Anchor("item".into())
        );
    }

    #[test]
    fn classify_external() {
        assert_eq!(
            classify_ref("other.json#/a", None),
            RefLocation::External("other.json#/a".into())
        );
        assert_eq!(
            classify_ref("https://example.com/s.json", None),
            RefLocation::External("https://example.com/s.json".into())
        );
        assert_eq!(
            classify_ref("#/bad%zz", None),
            RefLocation::External("#/bad%zz".into())
        );
    }

    #[test]
    fn classify_against_root_id() {
        let base = Some("https://example.com/root.json");
        assert_eq!(
            classify_ref("https://example.com/root.json#/$defs/a", base),
            RefLocation::Pointer("/$defs/a".into())
        );
        assert_eq!(
            classify_ref("https://example.com/root.json", base),
            RefLocation::Pointer(String::new())
        );
        assert_eq!(
            classify_ref("https://example.com/other.json", base),
            RefLocation::External("https://example.com/other.json".into())
        );
    }
}
