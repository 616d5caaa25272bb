//! Batch deduplication in front of any engine
//!
//! Structured content repeats itself: the same boilerplate caption in every
//! repeater row, the same heading in a group and in the title. Sending each
//! occurrence to a paid API multiplies cost for nothing, so every batch goes
//! through a [`DedupPlan`] first:
//!
//! 1. each input position is classified as blank (trim-empty) or as a
//!    reference to the first occurrence of its text,
//! 2. the distinct non-blank texts are sent once, in first-seen order,
//! 3. results are expanded back to every original position, blanks as `""`.
//!
//! # Example
//!
//! ```ignore
//! let texts = vec!["Hi".into(), "".into(), "Hi".into(), "Bye".into()];
//! let out = translate_unique(&engine, &texts, "fr").await?;
//! // engine saw ["Hi", "Bye"] exactly once
//! assert_eq!(out, vec!["Salut", "", "Salut", "Au revoir"]);
//! ```

use crate::mt::error::TranslateResult;
use crate::mt::translator::{TranslateEngine, ensure_same_len};
use async_trait::async_trait;
use std::collections::HashMap;
use tracing::debug;

/// Where an input position gets its output from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Slot {
    /// Whitespace-only input, answered with an empty string
    Blank,
    /// Index into [`DedupPlan::unique`]
    Unique(usize),
}

/// Distinct texts to send plus the mapping back to the original positions
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DedupPlan {
    pub unique: Vec<String>,
    pub slots: Vec<Slot>,
}

impl DedupPlan {
    pub fn new(texts: &[String]) -> Self {
        let mut unique: Vec<String> = Vec::new();
        let mut seen: HashMap<&str, usize> = HashMap::new();
        let mut slots = Vec::with_capacity(texts.len());

        for text in texts {
            if text.trim().is_empty() {
                slots.push(Slot::Blank);
                continue;
            }
            let index = *seen.entry(text.as_str()).or_insert_with(|| {
                unique.push(text.clone());
                unique.len() - 1
            });
            slots.push(Slot::Unique(index));
        }

        Self { unique, slots }
    }

    pub fn is_all_blank(&self) -> bool {
        self.unique.is_empty()
    }

    /// Expand per-distinct results back to one entry per original position
    pub fn expand(&self, translated: &[String]) -> Vec<String> {
        self.slots
            .iter()
            .map(|slot| match slot {
                Slot::Blank => String::new(),
                Slot::Unique(i) => translated.get(*i).cloned().unwrap_or_default(),
            })
            .collect()
    }
}

/// Translate `texts`, calling `engine` at most once per distinct non-blank string
///
/// # Arguments
///
/// * `engine` - Backend to call
/// * `texts` - Input strings, possibly blank or repeated
/// * `target_locale` - Target language tag
///
/// # Returns
///
/// * `Ok(Vec<String>)` - Same length and order as `texts`, blanks mapped to `""`
/// * `Err(TranslateError)` - Backend failure, or a backend result of the wrong length
pub async fn translate_unique<E>(
    engine: &E,
    texts: &[String],
    target_locale: &str,
) -> TranslateResult<Vec<String>>
where
    E: TranslateEngine + ?Sized,
{
    let plan = DedupPlan::new(texts);
    if plan.is_all_blank() {
        return Ok(vec![String::new(); texts.len()]);
    }

    debug!(
        engine = engine.engine_name(),
        requested = texts.len(),
        unique = plan.unique.len(),
        target = target_locale,
        "sending deduplicated batch"
    );

    let translated = engine.translate_batch(&plan.unique, target_locale).await?;
    ensure_same_len(engine.engine_name(), plan.unique.len(), translated.len())?;

    Ok(plan.expand(&translated))
}

/// Engine decorator that deduplicates every batch before forwarding it
pub struct Deduplicator<E> {
    inner: E,
}

impl<E: TranslateEngine> Deduplicator<E> {
    pub fn new(inner: E) -> Self {
        Self { inner }
    }

    pub fn inner(&self) -> &E {
        &self.inner
    }
}

#[async_trait]
impl<E: TranslateEngine> TranslateEngine for Deduplicator<E> {
    async fn translate_batch(
        &self,
        texts: &[String],
        target_locale: &str,
    ) -> TranslateResult<Vec<String>> {
        translate_unique(&self.inner, texts, target_locale).await
    }

    fn engine_name(&self) -> &str {
        self.inner.engine_name()
    }
}
