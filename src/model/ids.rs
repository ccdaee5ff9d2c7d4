//! Newtype IDs for annotations and areas.
//!
//! Area ids carry the id of the annotation that owns them
//! (`<rawId>#<annotationId>`), which keeps them unique when several
//! annotations of one task load the same wire ids.

use rand::RngExt;
use serde::{Deserialize, Serialize};
use std::fmt;

const GUID_ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789_-";
const GUID_LEN: usize = 10;

/// A fresh random identifier, as used for new areas and relations.
pub fn guid() -> String {
    let mut rng = rand::rng();
    (0..GUID_LEN)
        .map(|_| GUID_ALPHABET[rng.random_range(0..GUID_ALPHABET.len())] as char)
        .collect()
}

/// Session-local identifier of an annotation.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AnnotationId(String);

impl AnnotationId {
    #[inline]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// A new random id.
    pub fn generate() -> Self {
        Self(guid())
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for AnnotationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AnnotationId({})", self.0)
    }
}

impl fmt::Display for AnnotationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of an area: the wire id plus the owning annotation.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct AreaId {
    raw: String,
    annotation: String,
}

impl AreaId {
    pub fn new(raw: impl Into<String>, annotation: &AnnotationId) -> Self {
        Self {
            raw: raw.into(),
            annotation: annotation.as_str().to_string(),
        }
    }

    /// A fresh area id inside `annotation`.
    pub fn generate(annotation: &AnnotationId) -> Self {
        Self::new(guid(), annotation)
    }

    /// Parses `<rawId>#<annotationId>`, splitting at the last `#`.
    pub fn parse(full: &str) -> Option<Self> {
        let (raw, annotation) = full.rsplit_once('#')?;
        if raw.is_empty() || annotation.is_empty() {
            return None;
        }
        Some(Self {
            raw: raw.to_string(),
            annotation: annotation.to_string(),
        })
    }

    /// The id as written on the wire.
    #[inline]
    pub fn raw(&self) -> &str {
        &self.raw
    }

    #[inline]
    pub fn annotation(&self) -> &str {
        &self.annotation
    }

    /// Another raw id inside the same annotation.
    pub fn sibling(&self, raw: impl Into<String>) -> Self {
        Self {
            raw: raw.into(),
            annotation: self.annotation.clone(),
        }
    }
}

impl fmt::Debug for AreaId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AreaId({}#{})", self.raw, self.annotation)
    }
}

impl fmt::Display for AreaId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.raw, self.annotation)
    }
}

impl Serialize for AreaId {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn guid_shape() {
        let id = guid();
        assert_eq!(id.len(), GUID_LEN);
        assert!(!id.contains('#'));
        assert_ne!(guid(), guid());
    }

    #[test]
    fn area_id_format() {
        let ann = AnnotationId::new("ann1");
        let id = AreaId::new("abc", &ann);
        assert_eq!(id.to_string(), "abc#ann1");
        assert_eq!(id.raw(), "abc");
        assert_eq!(AreaId::parse("abc#ann1"), Some(id));
    }

    #[test]
    fn parse_splits_at_last_hash() {
        let id = AreaId::parse("a#b#c").unwrap();
        assert_eq!(id.raw(), "a#b");
        assert_eq!(id.annotation(), "c");
        assert!(AreaId::parse("plain").is_none());
        assert!(AreaId::parse("#x").is_none());
    }
}
