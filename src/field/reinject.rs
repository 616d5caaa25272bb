//! Put translated text back into a copy of a field tree

use crate::field::visit::{VisitMut, walk_map_mut};
use crate::field::{FieldMap, FieldPath, TextSet};
use tracing::trace;

struct Injector<'a> {
    translated: &'a TextSet,
    replaced: usize,
}

impl VisitMut for Injector<'_> {
    fn visit_text_mut(&mut self, path: &FieldPath, text: &mut String) {
        if let Some(translation) = self.translated.get(path.as_str()) {
            *text = translation.to_string();
            self.replaced += 1;
        }
    }
}

/// Copy of `tree` with every text leaf whose path is in `translated` replaced
///
/// Leaves without an entry keep their original text. Structure, key order,
/// row counts and opaque values are never changed, and `tree` itself is left
/// as it was. Entries whose path names no text leaf are ignored.
pub fn reinject(tree: &FieldMap, translated: &TextSet) -> FieldMap {
    let mut copy = tree.clone();
    let mut injector = Injector {
        translated,
        replaced: 0,
    };
    walk_map_mut(&mut injector, &mut copy, None);
    trace!(
        replaced = injector.replaced,
        available = translated.len(),
        "Reinjected translations"
    );
    copy
}
