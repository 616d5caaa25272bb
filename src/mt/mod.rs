/// Machine Translation Module
///
/// This module provides the translation backends used by the content
/// pipeline, behind one async trait, plus the deduplicating batch layer that
/// sits in front of them.
///
/// # Overview
///
/// 1. **Engine Trait** - `TranslateEngine`: translate a batch of strings into one target language
/// 2. **Vendors** - DeepL (API key, HTML tag handling) and Google Cloud Translation v3
///    (service account)
/// 3. **Deduplicator** - at most one backend call per distinct non-blank string per batch
/// 4. **Mock** - deterministic, call-recording engine for tests and dry runs
///
/// # Example
///
/// ```ignore
/// use autotranslate::mt::{DeepLEngine, Deduplicator, TranslateEngine};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let engine = Deduplicator::new(DeepLEngine::new(std::env::var("DEEPL_API_KEY")?)?);
///
///     let texts = vec!["Hello".to_string(), "".to_string(), "Hello".to_string()];
///     let translated = engine.translate_batch(&texts, "fr").await?;
///
///     // One request carrying ["Hello"]; output keeps the input shape
///     assert_eq!(translated.len(), 3);
///     assert_eq!(translated[1], "");
///     Ok(())
/// }
/// ```
pub mod dedup;
pub mod deepl;
pub mod error;
pub mod google_translate;
pub mod mock;
pub mod translator;

pub use dedup::{DedupPlan, Deduplicator, Slot, translate_unique};
pub use deepl::DeepLEngine;
pub use error::{TranslateError, TranslateResult};
pub use google_translate::{GoogleTranslateEngine, ServiceAccountKey};
pub use mock::{MockEngine, MockMode};
pub use translator::{TranslateEngine, engine_locale};
