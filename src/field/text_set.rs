//! Extracted text keyed by field path

use crate::field::FieldPath;
use indexmap::IndexMap;

/// Ordered path → text pairs pulled out of a field tree
///
/// Insertion order is the traversal order of the tree, so
/// [`TextSet::source_texts`] and [`TextSet::with_translations`] line up with
/// each other the same way a batch request lines up with its response.
///
/// # Example
///
/// ```ignore
/// TextSet {
///     "title": "Hello",
///     "fields.field_rows.0.caption": "A",
///     "fields.field_rows.1.caption": "B",
/// }
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TextSet {
    entries: IndexMap<FieldPath, String>,
}

impl TextSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace the text at `path`. A replaced path keeps its position.
    pub fn insert(&mut self, path: FieldPath, text: String) {
        self.entries.insert(path, text);
    }

    /// Text at `path`, which may be a [`FieldPath`] or a plain `&str`
    pub fn get(&self, path: &str) -> Option<&str> {
        self.entries.get(path).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn paths(&self) -> impl Iterator<Item = &FieldPath> {
        self.entries.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&FieldPath, &str)> {
        self.entries.iter().map(|(p, t)| (p, t.as_str()))
    }

    /// All texts in path order (useful for batch translation)
    pub fn source_texts(&self) -> Vec<String> {
        self.entries.values().cloned().collect()
    }

    /// Same paths, texts replaced by `translated` in order
    ///
    /// A short `translated` list leaves the trailing paths out of the result;
    /// reinjection then keeps the original text for them.
    pub fn with_translations(&self, translated: Vec<String>) -> TextSet {
        debug_assert_eq!(
            translated.len(),
            self.entries.len(),
            "Translation count must match text count"
        );

        TextSet {
            entries: self
                .entries
                .keys()
                .cloned()
                .zip(translated)
                .collect(),
        }
    }
}

impl FromIterator<(FieldPath, String)> for TextSet {
    fn from_iter<I: IntoIterator<Item = (FieldPath, String)>>(iter: I) -> Self {
        TextSet {
            entries: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> TextSet {
        [
            (FieldPath::root("title"), "Hello".to_string()),
            (FieldPath::root("rows").row(0).child("caption"), "A".to_string()),
        ]
        .into_iter()
        .collect()
    }

    #[test]
    fn test_lookup_by_str() {
        let set = sample();
        assert_eq!(set.get("rows.0.caption"), Some("A"));
        assert_eq!(set.get("rows.1.caption"), None);
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn test_source_texts_follow_insertion_order() {
        assert_eq!(sample().source_texts(), vec!["Hello", "A"]);
    }

    #[test]
    fn test_with_translations_keeps_paths() {
        let translated = sample().with_translations(vec!["Bonjour".into(), "Un".into()]);
        let paths: Vec<&str> = translated.paths().map(FieldPath::as_str).collect();
        assert_eq!(paths, vec!["title", "rows.0.caption"]);
        assert_eq!(translated.get("title"), Some("Bonjour"));
    }

    #[test]
    fn test_replaced_path_keeps_position() {
        let mut set = sample();
        set.insert(FieldPath::root("title"), "Hi".to_string());
        assert_eq!(set.source_texts(), vec!["Hi", "A"]);
    }
}
