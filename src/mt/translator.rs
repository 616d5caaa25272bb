//! Translation engine trait and utilities
//!
//! This module defines the `TranslateEngine` trait for backend abstraction,
//! enabling support for different vendors (DeepL, Google Cloud Translation,
//! mock) without coupling the pipeline to any specific implementation.
//!
//! # Example
//!
//! ```ignore
//! use autotranslate::mt::{DeepLEngine, TranslateEngine};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let engine = DeepLEngine::new("your-api-key".to_string())?;
//!
//!     // Translate a single string
//!     let result = engine.translate("<p>Hello, world!</p>", "fr").await?;
//!     println!("{}", result); // "<p>Bonjour, le monde !</p>"
//!
//!     // Translate multiple strings in one request
//!     let texts = vec!["Hello".to_string(), "Goodbye".to_string()];
//!     let results = engine.translate_batch(&texts, "fr").await?;
//!     println!("{:?}", results);
//!
//!     Ok(())
//! }
//! ```

use crate::mt::error::{TranslateError, TranslateResult};
use async_trait::async_trait;
use icu_locale::Locale;
use std::sync::Arc;

/// Generic trait for translation backends
///
/// One engine instance is bound to one backend configuration (credentials,
/// endpoint). Engines translate from whatever the source language is; only
/// the target is specified.
#[async_trait]
pub trait TranslateEngine: Send + Sync {
    /// Translate multiple strings in a single batch operation
    ///
    /// Input text may contain inline HTML markup; implementations must ask the
    /// vendor for tag-aware translation so markup survives verbatim.
    ///
    /// # Arguments
    ///
    /// * `texts` - Non-empty strings to translate
    /// * `target_locale` - BCP-47 target language (e.g., "fr", "pt-BR")
    ///
    /// # Returns
    ///
    /// * `Ok(Vec<String>)` - Translated strings in the same order as input
    /// * `Err(TranslateError)` - If any part of the batch fails
    ///
    /// # Guarantees
    ///
    /// - Output order matches input order
    /// - Output length equals input length
    /// - No retries are performed
    async fn translate_batch(
        &self,
        texts: &[String],
        target_locale: &str,
    ) -> TranslateResult<Vec<String>>;

    /// Name of this engine, used in logs and error messages
    fn engine_name(&self) -> &str;

    /// Translate a single string through the batch call
    async fn translate(&self, text: &str, target_locale: &str) -> TranslateResult<String> {
        let results = self
            .translate_batch(&[text.to_string()], target_locale)
            .await?;
        Ok(results.into_iter().next().unwrap_or_default())
    }
}

#[async_trait]
impl<T: TranslateEngine + ?Sized> TranslateEngine for Arc<T> {
    async fn translate_batch(
        &self,
        texts: &[String],
        target_locale: &str,
    ) -> TranslateResult<Vec<String>> {
        (**self).translate_batch(texts, target_locale).await
    }

    fn engine_name(&self) -> &str {
        (**self).engine_name()
    }
}

/// Convert a host locale code into the BCP-47 tag sent to engines
///
/// Host systems commonly store POSIX-style locales (`fr_FR`, `pt_BR`);
/// vendors expect BCP-47 (`fr-FR`, `pt-BR`). The tag is parsed and
/// canonicalised, so casing is normalised as well.
///
/// # Example
///
/// ```ignore
/// assert_eq!(engine_locale("fr_FR")?, "fr-FR");
/// assert_eq!(engine_locale("ja")?, "ja");
/// ```
pub fn engine_locale(host_locale: &str) -> TranslateResult<String> {
    let tag = host_locale.trim().replace('_', "-");
    if tag.is_empty() {
        return Err(TranslateError::InvalidLocale(
            "Locale code is empty".to_string(),
        ));
    }

    let locale: Locale = tag.parse().map_err(|e| {
        TranslateError::InvalidLocale(format!("Failed to parse locale '{}': {}", host_locale, e))
    })?;

    Ok(locale.to_string())
}

/// Split a batch into request-sized slices
pub(crate) fn chunk_batch(texts: &[String], max_batch_size: usize) -> Vec<&[String]> {
    texts.chunks(max_batch_size).collect()
}

/// Check that a vendor returned one translation per request entry
pub(crate) fn ensure_same_len(
    engine: &str,
    requested: usize,
    received: usize,
) -> TranslateResult<()> {
    if requested != received {
        return Err(TranslateError::MalformedResponse(format!(
            "{} returned {} translations for {} texts",
            engine, received, requested
        )));
    }
    Ok(())
}
