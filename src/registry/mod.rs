#[cfg(test)]
mod tests;

use std::collections::HashMap;

/// Result of resolving a document name against the registry.
///
/// `Unregistered` is an explicit variant rather than an empty string so callers
/// can branch on it before composing chunk ids. `raw_id` of an unregistered
/// document is empty, which makes a composed chunk id degenerate (`#chunk0`);
/// that shape is deliberate and covered by tests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocKey {
    Known(String),
    Unregistered,
}

impl DocKey {
    /// The raw short id, or the empty string for unregistered documents.
    #[inline]
    pub fn raw_id(&self) -> &str {
        match self {
            DocKey::Known(id) => id,
            DocKey::Unregistered => "",
        }
    }

    #[inline]
    pub fn is_registered(&self) -> bool {
        matches!(self, DocKey::Known(_))
    }
}

/// Closed lookup table mapping known document names to stable short ids.
///
/// Only pre-registered documents have a valid id; anything else resolves to
/// [`DocKey::Unregistered`]. There is no dynamic registration path.
#[derive(Debug, Clone)]
pub struct DocRegistry {
    entries: HashMap<String, String>,
}

impl DocRegistry {
    /// The built-in registry of supported documents.
    #[inline]
    pub fn builtin() -> Self {
        Self::from_entries([
            ("建築基準法施行令", "doc0"),
            ("東京都建築安全条例", "doc1"),
        ])
    }

    /// Build a registry from explicit (name, id) pairs. Used by tests and by
    /// deployments with a different document set.
    #[inline]
    pub fn from_entries<'a>(entries: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        Self {
            entries: entries
                .into_iter()
                .map(|(name, id)| (name.to_string(), id.to_string()))
                .collect(),
        }
    }

    /// Resolve a document name to its key.
    #[inline]
    pub fn resolve(&self, doc_name: &str) -> DocKey {
        self.entries
            .get(doc_name)
            .map_or(DocKey::Unregistered, |id| DocKey::Known(id.clone()))
    }
}

/// Compose the stable chunk id for a (document, chunk index) pair.
///
/// Stable for a given (document, chunk_size) pairing: the id uniquely determines
/// the document id and the 0-based chunk index. No normalization is applied, so
/// an empty `doc_id` yields the malformed `#chunk{n}` form.
#[inline]
pub fn chunk_id(doc_id: &str, index: usize) -> String {
    format!("{doc_id}#chunk{index}")
}
