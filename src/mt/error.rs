//! Error types for translation engines

use thiserror::Error;

/// Errors raised while configuring or calling a translation engine
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TranslateError {
    /// Missing or invalid engine configuration (credentials, engine choice).
    /// Raised before any text is sent anywhere.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Transport-level failure talking to the vendor
    #[error("network error: {0}")]
    Network(String),

    /// The vendor answered with an error
    #[error("{engine} translation error: {message}")]
    Backend { engine: String, message: String },

    /// The vendor answered, but the payload cannot be mapped back onto the request
    #[error("malformed response: {0}")]
    MalformedResponse(String),

    /// Target language code is not a usable BCP-47 tag
    #[error("invalid locale: {0}")]
    InvalidLocale(String),
}

impl TranslateError {
    pub fn backend(engine: &str, message: impl Into<String>) -> Self {
        TranslateError::Backend {
            engine: engine.to_string(),
            message: message.into(),
        }
    }

    /// Configuration errors abort a whole run; everything else is scoped to one batch.
    pub fn is_configuration(&self) -> bool {
        matches!(self, TranslateError::Configuration(_))
    }
}

impl From<reqwest::Error> for TranslateError {
    fn from(err: reqwest::Error) -> Self {
        TranslateError::Network(err.to_string())
    }
}

/// Result type for engine operations
pub type TranslateResult<T> = Result<T, TranslateError>;
