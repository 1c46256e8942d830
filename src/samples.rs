//! Sample schemas bundled into the binary.

use serde_json::Value;

use crate::error::LoadError;
use crate::loader::parse_json;

/// A bundled sample schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Sample {
    pub name: &'static str,
    pub summary: &'static str,
    pub source: &'static str,
}

const SAMPLES: &[Sample] = &[
    Sample {
        name: "person",
        summary: "flat object with required fields and formats",
        source: include_str!("../samples/person.json"),
    },
    Sample {
        name: "petstore",
        summary: "definitions, oneOf/allOf and a recursive $ref",
        source: include_str!("../samples/petstore.json"),
    },
    Sample {
        name: "tree",
        summary: "self-referencing tree via $defs",
        source: include_str!("../samples/tree.json"),
    },
];

/// All bundled samples, sorted by name.
pub fn list() -> &'static [Sample] {
    SAMPLES
}

pub fn get(name: &str) -> Option<&'static Sample> {
    SAMPLES.iter().find(|s| s.name == name)
}

/// Parse a bundled sample.
///
/// # Errors
///
/// Returns `LoadError::UnknownSample` for names not in the catalog.
pub fn load_sample(name: &str) -> Result<Value, LoadError> {
    let sample = get(name).ok_or_else(|| LoadError::UnknownSample {
        name: name.to_string(),
    })?;
    parse_json(sample.source, &format!("sample {}", sample.name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalizer::normalize;

    #[test]
    fn every_sample_parses_and_normalizes() {
        for sample in list() {
            let doc = load_sample(sample.name).unwrap();
            assert!(normalize(&doc).is_ok(), "sample {} failed", sample.name);
        }
    }

    #[test]
    fn catalog_is_sorted() {
        let names: Vec<&str> = list().iter().map(|s| s.name).collect();
        let mut sorted = names.clone();
        sorted.sort_unstable();
        assert_eq!(names, sorted);
    }

    #[test]
    fn unknown_sample() {
        assert!(matches!(
            load_sample("nope"),
            Err(LoadError::UnknownSample { .. })
        ));
    }
}
