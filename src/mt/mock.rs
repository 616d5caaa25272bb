//! Mock translation engine for testing
//!
//! This module provides a deterministic, API-free engine for testing the
//! pipeline without credentials or network access. Every batch it receives is
//! recorded, so tests can assert exactly what would have been sent to a paid
//! vendor.
//!
//! # Example
//!
//! ```ignore
//! use autotranslate::mt::{MockEngine, MockMode, TranslateEngine};
//!
//! #[tokio::test]
//! async fn test_translation() {
//!     let mock = MockEngine::new(MockMode::Suffix);
//!     let result = mock.translate("hello", "fr").await.unwrap();
//!     assert_eq!(result, "hello_fr");
//!     assert_eq!(mock.call_count(), 1);
//! }
//! ```

use crate::mt::error::{TranslateError, TranslateResult};
use crate::mt::translator::TranslateEngine;
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::time::Duration;

/// Mock translation modes for testing different scenarios
#[derive(Debug, Clone)]
pub enum MockMode {
    /// Append locale suffix: "hello" → "hello_fr"
    Suffix,

    /// Use predefined mappings for realistic translations
    /// (text, target_locale) → translation, falling back to `Suffix`
    Mappings(HashMap<(String, String), String>),

    /// Fail every batch with a backend error carrying this message
    Error(String),

    /// Return only the first N translations of each batch
    Truncate(usize),

    /// No-op: return input unchanged
    NoOp,
}

/// Mock engine that simulates various translation scenarios
#[derive(Debug)]
pub struct MockEngine {
    mode: MockMode,
    /// Target locales that fail regardless of mode
    failing_locales: HashMap<String, String>,
    /// Optional simulated network delay (in milliseconds)
    delay_ms: u64,
    calls: Mutex<Vec<(Vec<String>, String)>>,
}

impl MockEngine {
    /// Create a new MockEngine with the given mode
    pub fn new(mode: MockMode) -> Self {
        Self {
            mode,
            failing_locales: HashMap::new(),
            delay_ms: 0,
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Create a MockEngine with simulated network delay
    pub fn with_delay(mode: MockMode, delay_ms: u64) -> Self {
        Self {
            delay_ms,
            ..Self::new(mode)
        }
    }

    /// Make batches for `target_locale` fail with a backend error
    ///
    /// # Example
    ///
    /// ```ignore
    /// let mock = MockEngine::new(MockMode::Suffix).failing_for("de", "quota exceeded");
    /// assert!(mock.translate("x", "de").await.is_err());
    /// assert!(mock.translate("x", "fr").await.is_ok());
    /// ```
    pub fn failing_for(mut self, target_locale: &str, message: &str) -> Self {
        self.failing_locales
            .insert(target_locale.to_string(), message.to_string());
        self
    }

    /// Every batch received so far, with its target locale
    pub fn calls(&self) -> Vec<(Vec<String>, String)> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().map(|c| c.len()).unwrap_or_default()
    }

    /// Distinct target locales that were requested
    pub fn requested_locales(&self) -> HashSet<String> {
        self.calls().into_iter().map(|(_, locale)| locale).collect()
    }

    async fn apply_delay(&self) {
        if self.delay_ms > 0 {
            tokio::time::sleep(Duration::from_millis(self.delay_ms)).await;
        }
    }

    fn apply_translation(&self, text: &str, target: &str) -> String {
        match &self.mode {
            MockMode::Mappings(map) => map
                .get(&(text.to_string(), target.to_string()))
                .cloned()
                .unwrap_or_else(|| format!("{}_{}", text, target)),
            MockMode::NoOp => text.to_string(),
            _ => format!("{}_{}", text, target),
        }
    }
}

#[async_trait]
impl TranslateEngine for MockEngine {
    async fn translate_batch(
        &self,
        texts: &[String],
        target_locale: &str,
    ) -> TranslateResult<Vec<String>> {
        // Simulated delay is per batch, not per string
        self.apply_delay().await;

        if let Ok(mut calls) = self.calls.lock() {
            calls.push((texts.to_vec(), target_locale.to_string()));
        }

        if let Some(message) = self.failing_locales.get(target_locale) {
            return Err(TranslateError::backend(self.engine_name(), message.clone()));
        }

        match &self.mode {
            MockMode::Error(message) => {
                Err(TranslateError::backend(self.engine_name(), message.clone()))
            }
            MockMode::Truncate(n) => Ok(texts
                .iter()
                .take(*n)
                .map(|t| self.apply_translation(t, target_locale))
                .collect()),
            _ => Ok(texts
                .iter()
                .map(|t| self.apply_translation(t, target_locale))
                .collect()),
        }
    }

    fn engine_name(&self) -> &str {
        "Mock Engine"
    }
}
