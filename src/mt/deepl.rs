//! DeepL API engine
//!
//! Talks to the DeepL `/v2/translate` endpoint with HTML tag handling, so
//! inline markup in rich-text fields survives translation.
//!
//! # Markup wrapper
//!
//! DeepL's HTML mode treats a bare text run and a fragment with leading or
//! trailing tags differently. Every text is therefore sent wrapped in a
//! neutral `<div>…</div>` and the wrapper is stripped from each response. A
//! response that does not come back wrapped fails the whole batch: the result
//! cannot be trusted to line up with what was sent.
//!
//! # Authentication
//!
//! Keys ending in `:fx` belong to the free plan and are routed to
//! `api-free.deepl.com`; all others go to `api.deepl.com`.

use crate::mt::error::{TranslateError, TranslateResult};
use crate::mt::translator::{TranslateEngine, chunk_batch, ensure_same_len};
use async_trait::async_trait;
use regex::Regex;
use serde::Deserialize;
use serde_json::json;
use std::sync::LazyLock;
use tracing::debug;

const PRO_ENDPOINT: &str = "https://api.deepl.com";
const FREE_ENDPOINT: &str = "https://api-free.deepl.com";

static WRAPPER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)\A<div>(.*)</div>\z").expect("valid wrapper regex"));

#[derive(Debug, Deserialize)]
struct TranslateResponse {
    translations: Vec<Translation>,
}

#[derive(Debug, Deserialize)]
struct Translation {
    text: String,
}

/// DeepL API engine
#[derive(Clone)]
pub struct DeepLEngine {
    api_key: String,
    client: reqwest::Client,
    base_url: String,
}

impl DeepLEngine {
    /// DeepL accepts at most 50 texts per request
    const MAX_BATCH_SIZE: usize = 50;

    /// Create an engine for the given API key
    ///
    /// # Returns
    ///
    /// * `Ok(Self)` - New engine instance
    /// * `Err(TranslateError)` - If the key is empty or the HTTP client cannot be built
    pub fn new(api_key: String) -> TranslateResult<Self> {
        let api_key = api_key.trim().to_string();
        if api_key.is_empty() {
            return Err(TranslateError::Configuration(
                "DeepL API key cannot be empty".to_string(),
            ));
        }

        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .map_err(|e| {
                TranslateError::Configuration(format!("Failed to create HTTP client: {}", e))
            })?;

        let base_url = if api_key.ends_with(":fx") {
            FREE_ENDPOINT
        } else {
            PRO_ENDPOINT
        };

        Ok(Self {
            api_key,
            client,
            base_url: base_url.to_string(),
        })
    }

    /// Point the engine at another endpoint (proxies, test servers)
    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn wrap(text: &str) -> String {
        format!("<div>{}</div>", text)
    }

    fn unwrap_response(text: &str) -> TranslateResult<String> {
        WRAPPER
            .captures(text)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().to_string())
            .ok_or_else(|| {
                TranslateError::MalformedResponse(format!(
                    "DeepL response lost its <div> wrapper: {:?}",
                    text
                ))
            })
    }

    async fn translate_chunk(
        &self,
        texts: &[String],
        target_locale: &str,
    ) -> TranslateResult<Vec<String>> {
        let url = format!("{}/v2/translate", self.base_url);
        let body = json!({
            "text": texts.iter().map(|t| Self::wrap(t)).collect::<Vec<_>>(),
            "target_lang": target_locale,
            "tag_handling": "html",
            "tag_handling_version": "v2",
        });

        let response = self
            .client
            .post(&url)
            .header(
                reqwest::header::AUTHORIZATION,
                format!("DeepL-Auth-Key {}", self.api_key),
            )
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(TranslateError::backend(
                self.engine_name(),
                format!("HTTP {}: {}", status, error_text),
            ));
        }

        let parsed: TranslateResponse = response.json().await.map_err(|e| {
            TranslateError::MalformedResponse(format!("Failed to parse DeepL response: {}", e))
        })?;

        ensure_same_len(self.engine_name(), texts.len(), parsed.translations.len())?;

        parsed
            .translations
            .iter()
            .map(|t| Self::unwrap_response(&t.text))
            .collect()
    }
}

impl std::fmt::Debug for DeepLEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeepLEngine")
            .field("api_key", &"***")
            .field("base_url", &self.base_url)
            .finish()
    }
}

#[async_trait]
impl TranslateEngine for DeepLEngine {
    async fn translate_batch(
        &self,
        texts: &[String],
        target_locale: &str,
    ) -> TranslateResult<Vec<String>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let mut results = Vec::with_capacity(texts.len());
        for chunk in chunk_batch(texts, Self::MAX_BATCH_SIZE) {
            debug!(count = chunk.len(), target = target_locale, "DeepL request");
            results.extend(self.translate_chunk(chunk, target_locale).await?);
        }
        Ok(results)
    }

    fn engine_name(&self) -> &str {
        "DeepL"
    }
}
