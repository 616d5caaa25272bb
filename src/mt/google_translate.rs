//! Google Cloud Translation (v3) engine
//!
//! This module integrates with the Cloud Translation v3 `translateText`
//! method, requesting `text/html` so inline markup is preserved natively.
//!
//! # Authentication
//!
//! The engine authenticates as a service account: it signs an RS256 JWT with
//! the account's private key, exchanges it at the key's `token_uri` for an
//! OAuth2 access token (JWT-bearer grant), and caches that token until shortly
//! before it expires. Create a service account with the "Cloud Translation API
//! User" role in a project that has the API enabled, and download its JSON key.
//!
//! # Example
//!
//! ```ignore
//! use autotranslate::mt::{GoogleTranslateEngine, ServiceAccountKey, TranslateEngine};
//!
//! let key = ServiceAccountKey::from_json(&std::fs::read_to_string("key.json")?)?;
//! let engine = GoogleTranslateEngine::new(key)?;
//! let results = engine.translate_batch(&["<p>Hello</p>".to_string()], "ja").await?;
//! ```

use crate::mt::error::{TranslateError, TranslateResult};
use crate::mt::translator::{TranslateEngine, chunk_batch, ensure_same_len};
use async_trait::async_trait;
use base64::Engine as _;
use base64::engine::general_purpose::{STANDARD, URL_SAFE_NO_PAD};
use ring::rand::SystemRandom;
use ring::signature::{RSA_PKCS1_SHA256, RsaKeyPair};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::debug;

const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";
const TRANSLATION_SCOPE: &str = "https://www.googleapis.com/auth/cloud-translation";
const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";

/// Assertion lifetime requested from the token endpoint, in seconds
const ASSERTION_LIFETIME: i64 = 3600;

/// Refresh the access token this many seconds before it expires
const TOKEN_REFRESH_MARGIN: i64 = 60;

fn default_token_uri() -> String {
    DEFAULT_TOKEN_URI.to_string()
}

/// The fields of a service-account key document the engine needs
#[derive(Clone, Deserialize)]
pub struct ServiceAccountKey {
    pub project_id: String,
    #[serde(default)]
    pub private_key_id: Option<String>,
    pub private_key: String,
    pub client_email: String,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

impl ServiceAccountKey {
    /// Parse a service-account key document
    ///
    /// # Returns
    ///
    /// * `Ok(Self)` - The parsed key
    /// * `Err(TranslateError::Configuration)` - If the document is not valid
    ///   JSON or lacks required fields
    pub fn from_json(document: &str) -> TranslateResult<Self> {
        let key: ServiceAccountKey = serde_json::from_str(document).map_err(|e| {
            TranslateError::Configuration(format!(
                "Google service account key is not a valid key document: {}",
                e
            ))
        })?;

        if key.project_id.trim().is_empty() {
            return Err(TranslateError::Configuration(
                "Google service account key has an empty project_id".to_string(),
            ));
        }
        Ok(key)
    }
}

impl std::fmt::Debug for ServiceAccountKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceAccountKey")
            .field("project_id", &self.project_id)
            .field("client_email", &self.client_email)
            .field("private_key", &"***")
            .finish()
    }
}

#[derive(Debug, Clone)]
struct AccessToken {
    value: String,
    expires_at: i64,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<i64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TranslateTextResponse {
    #[serde(default)]
    translations: Vec<Translation>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Translation {
    translated_text: String,
}

/// Decode a PEM-armoured PKCS#8 private key into its DER bytes
fn pem_to_der(pem: &str) -> TranslateResult<Vec<u8>> {
    let body: String = pem
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with("-----"))
        .collect();

    STANDARD.decode(body).map_err(|e| {
        TranslateError::Configuration(format!(
            "Service account private key is not valid PEM: {}",
            e
        ))
    })
}

/// Google Cloud Translation v3 engine
#[derive(Clone)]
pub struct GoogleTranslateEngine {
    key: ServiceAccountKey,
    signer: Arc<RsaKeyPair>,
    client: reqwest::Client,
    base_url: String,
    token: Arc<Mutex<Option<AccessToken>>>,
}

impl GoogleTranslateEngine {
    /// Maximum number of texts per API request
    const MAX_BATCH_SIZE: usize = 128;

    /// Create an engine for a service account
    ///
    /// The private key is parsed up front, so a broken key document fails
    /// here rather than on the first translation.
    pub fn new(key: ServiceAccountKey) -> TranslateResult<Self> {
        let der = pem_to_der(&key.private_key)?;
        let signer = RsaKeyPair::from_pkcs8(&der).map_err(|e| {
            TranslateError::Configuration(format!(
                "Service account private key was rejected: {}",
                e
            ))
        })?;

        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .map_err(|e| {
                TranslateError::Configuration(format!("Failed to create HTTP client: {}", e))
            })?;

        Ok(Self {
            key,
            signer: Arc::new(signer),
            client,
            base_url: "https://translation.googleapis.com".to_string(),
            token: Arc::new(Mutex::new(None)),
        })
    }

    /// Point the engine at another API root (proxies, test servers)
    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    fn translate_url(&self) -> String {
        format!(
            "{}/v3/projects/{}/locations/global:translateText",
            self.base_url, self.key.project_id
        )
    }

    /// Build the signed JWT exchanged for an access token
    fn build_assertion(&self, issued_at: i64) -> TranslateResult<String> {
        let mut header = json!({ "alg": "RS256", "typ": "JWT" });
        if let Some(kid) = &self.key.private_key_id {
            header["kid"] = json!(kid);
        }
        let claims = json!({
            "iss": self.key.client_email,
            "scope": TRANSLATION_SCOPE,
            "aud": self.key.token_uri,
            "iat": issued_at,
            "exp": issued_at + ASSERTION_LIFETIME,
        });

        let signing_input = format!(
            "{}.{}",
            URL_SAFE_NO_PAD.encode(header.to_string()),
            URL_SAFE_NO_PAD.encode(claims.to_string())
        );

        let mut signature = vec![0u8; self.signer.public().modulus_len()];
        self.signer
            .sign(
                &RSA_PKCS1_SHA256,
                &SystemRandom::new(),
                signing_input.as_bytes(),
                &mut signature,
            )
            .map_err(|_| {
                TranslateError::Configuration("Failed to sign token assertion".to_string())
            })?;

        Ok(format!(
            "{}.{}",
            signing_input,
            URL_SAFE_NO_PAD.encode(signature)
        ))
    }

    async fn fetch_token(&self) -> TranslateResult<AccessToken> {
        let now = chrono::Utc::now().timestamp();
        let assertion = self.build_assertion(now)?;

        let response = self
            .client
            .post(&self.key.token_uri)
            .form(&[("grant_type", JWT_BEARER_GRANT), ("assertion", assertion.as_str())])
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
                format!("token exchange failed (HTTP {}): {}", status, error_text),
            ));
        }

        let token: TokenResponse = response.json().await.map_err(|e| {
            TranslateError::MalformedResponse(format!("Failed to parse token response: {}", e))
        })?;

        Ok(AccessToken {
            value: token.access_token,
            expires_at: now + token.expires_in.unwrap_or(ASSERTION_LIFETIME),
        })
    }

    /// Return a cached access token, fetching a new one when close to expiry
    async fn access_token(&self) -> TranslateResult<String> {
        let mut cached = self.token.lock().await;
        let now = chrono::Utc::now().timestamp();

        if let Some(token) = cached.as_ref() {
            if token.expires_at - TOKEN_REFRESH_MARGIN > now {
                return Ok(token.value.clone());
            }
        }

        debug!(client_email = %self.key.client_email, "fetching Google access token");
        let token = self.fetch_token().await?;
        let value = token.value.clone();
        *cached = Some(token);
        Ok(value)
    }

    async fn translate_chunk(
        &self,
        texts: &[String],
        target_locale: &str,
    ) -> TranslateResult<Vec<String>> {
        let token = self.access_token().await?;
        let body = json!({
            "contents": texts,
            "targetLanguageCode": target_locale,
            "mimeType": "text/html",
        });

        let response = self
            .client
            .post(self.translate_url())
            .bearer_auth(token)
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

        let parsed: TranslateTextResponse = response.json().await.map_err(|e| {
            TranslateError::MalformedResponse(format!("Failed to parse Google response: {}", e))
        })?;

        ensure_same_len(self.engine_name(), texts.len(), parsed.translations.len())?;
        Ok(parsed
            .translations
            .into_iter()
            .map(|t| t.translated_text)
            .collect())
    }
}

impl std::fmt::Debug for GoogleTranslateEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GoogleTranslateEngine")
            .field("key", &self.key)
            .field("base_url", &self.base_url)
            .finish()
    }
}

#[async_trait]
impl TranslateEngine for GoogleTranslateEngine {
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
            debug!(count = chunk.len(), target = target_locale, "Google request");
            results.extend(self.translate_chunk(chunk, target_locale).await?);
        }
        Ok(results)
    }

    fn engine_name(&self) -> &str {
        "Google"
    }
}
