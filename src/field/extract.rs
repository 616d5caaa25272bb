//! Pull translatable text out of a field tree

use crate::field::visit::{Visit, walk_map};
use crate::field::{FieldMap, FieldPath, TextSet};

struct Collector {
    texts: TextSet,
}

impl Visit for Collector {
    fn visit_text(&mut self, path: &FieldPath, text: &str) {
        if text.trim().is_empty() {
            return;
        }
        self.texts.insert(path.clone(), text.to_string());
    }
}

/// Collect every non-blank text leaf of `tree`, keyed by its path
///
/// Blank leaves (empty or whitespace-only) and opaque values are skipped.
/// Paths depend only on the tree's structure, so calling this twice on the
/// same tree yields the same paths in the same order.
pub fn extract(tree: &FieldMap) -> TextSet {
    let mut collector = Collector {
        texts: TextSet::new(),
    };
    walk_map(&mut collector, tree, None);
    collector.texts
}
