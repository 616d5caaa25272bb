//! Translation backend configuration
//!
//! ```toml
//! engine = "deepl"            # or "google"
//!
//! [deepl]
//! api_key = "…"
//! # endpoint = "https://api.deepl.com"
//!
//! [google]
//! service_account_file = "/path/key.json"
//! # service_account_json = "{…}"
//! ```
//!
//! Environment overrides: `AUTOTRANSLATE_ENGINE`, `DEEPL_API_KEY`,
//! `GOOGLE_APPLICATION_CREDENTIALS`.

use crate::mt::{
    DeepLEngine, GoogleTranslateEngine, ServiceAccountKey, TranslateEngine, TranslateError,
    TranslateResult,
};
use serde::Deserialize;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EngineKind {
    #[default]
    DeepL,
    Google,
}

impl FromStr for EngineKind {
    type Err = TranslateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "deepl" => Ok(EngineKind::DeepL),
            "google" => Ok(EngineKind::Google),
            other => Err(TranslateError::Configuration(format!(
                "Unknown translation engine '{}'",
                other
            ))),
        }
    }
}

impl fmt::Display for EngineKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EngineKind::DeepL => f.write_str("deepl"),
            EngineKind::Google => f.write_str("google"),
        }
    }
}

#[derive(Clone, Default, Deserialize)]
pub struct DeepLSection {
    #[serde(default)]
    pub api_key: Option<String>,
    /// Overrides the endpoint picked from the key
    #[serde(default)]
    pub endpoint: Option<String>,
}

impl fmt::Debug for DeepLSection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeepLSection")
            .field("api_key", &self.api_key.as_ref().map(|_| "***"))
            .field("endpoint", &self.endpoint)
            .finish()
    }
}

#[derive(Clone, Default, Deserialize)]
pub struct GoogleSection {
    #[serde(default)]
    pub service_account_file: Option<PathBuf>,
    /// Inline key document; wins over `service_account_file`
    #[serde(default)]
    pub service_account_json: Option<String>,
    #[serde(default)]
    pub endpoint: Option<String>,
}

impl fmt::Debug for GoogleSection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GoogleSection")
            .field("service_account_file", &self.service_account_file)
            .field(
                "service_account_json",
                &self.service_account_json.as_ref().map(|_| "***"),
            )
            .field("endpoint", &self.endpoint)
            .finish()
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub engine: EngineKind,
    #[serde(default)]
    pub deepl: DeepLSection,
    #[serde(default)]
    pub google: GoogleSection,
}

impl Config {
    /// Read a TOML config file
    pub fn load(path: &Path) -> TranslateResult<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            TranslateError::Configuration(format!(
                "Failed to read config '{}': {}",
                path.display(),
                e
            ))
        })?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> TranslateResult<Self> {
        toml::from_str(content)
            .map_err(|e| TranslateError::Configuration(format!("Invalid config: {}", e)))
    }

    /// Apply `AUTOTRANSLATE_ENGINE`, `DEEPL_API_KEY` and
    /// `GOOGLE_APPLICATION_CREDENTIALS` from the process environment
    pub fn with_env_overrides(self) -> TranslateResult<Self> {
        self.with_overrides_from(|name| std::env::var(name).ok())
    }

    fn with_overrides_from(
        mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> TranslateResult<Self> {
        let lookup = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        if let Some(engine) = lookup("AUTOTRANSLATE_ENGINE") {
            self.engine = engine.parse()?;
        }
        if let Some(key) = lookup("DEEPL_API_KEY") {
            self.deepl.api_key = Some(key);
        }
        if let Some(file) = lookup("GOOGLE_APPLICATION_CREDENTIALS") {
            self.google.service_account_file = Some(PathBuf::from(file));
        }
        Ok(self)
    }

    /// Build the configured backend
    ///
    /// # Errors
    /// `TranslateError::Configuration` for missing or invalid credentials.
    pub fn build_engine(&self) -> TranslateResult<Arc<dyn TranslateEngine>> {
        debug!(engine = %self.engine, "Building translation engine");
        match self.engine {
            EngineKind::DeepL => {
                let key = self.deepl.api_key.clone().unwrap_or_default();
                if key.trim().is_empty() {
                    return Err(TranslateError::Configuration(
                        "DeepL API key is not configured".to_string(),
                    ));
                }
                let mut engine = DeepLEngine::new(key)?;
                if let Some(endpoint) = &self.deepl.endpoint {
                    engine = engine.with_base_url(endpoint);
                }
                Ok(Arc::new(engine))
            }
            EngineKind::Google => {
                let document = self.service_account_document()?;
                let key = ServiceAccountKey::from_json(&document)?;
                let mut engine = GoogleTranslateEngine::new(key)?;
                if let Some(endpoint) = &self.google.endpoint {
                    engine = engine.with_base_url(endpoint);
                }
                Ok(Arc::new(engine))
            }
        }
    }

    fn service_account_document(&self) -> TranslateResult<String> {
        if let Some(json) = &self.google.service_account_json {
            return Ok(json.clone());
        }
        let path = self.google.service_account_file.as_ref().ok_or_else(|| {
            TranslateError::Configuration(
                "Google service account is not configured".to_string(),
            )
        })?;
        fs::read_to_string(path).map_err(|e| {
            TranslateError::Configuration(format!(
                "Failed to read service account '{}': {}",
                path.display(),
                e
            ))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::tempdir;

    const SERVICE_ACCOUNT: &str = include_str!("mt/testdata/service_account.json");

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name: &str| map.get(name).cloned()
    }

    // ========== Parsing Tests ==========

    #[test]
    fn test_defaults_to_deepl() {
        let config = Config::from_toml_str("").unwrap();
        assert_eq!(config.engine, EngineKind::DeepL);
        assert!(config.deepl.api_key.is_none());
    }

    #[test]
    fn test_parse_google_section() {
        let config = Config::from_toml_str(
            r#"
            engine = "google"

            [google]
            service_account_file = "/etc/key.json"
            "#,
        )
        .unwrap();
        assert_eq!(config.engine, EngineKind::Google);
        assert_eq!(
            config.google.service_account_file,
            Some(PathBuf::from("/etc/key.json"))
        );
    }

    #[test]
    fn test_unknown_engine_is_configuration_error() {
        let err = Config::from_toml_str(r#"engine = "babelfish""#).unwrap_err();
        assert!(err.is_configuration());
        assert!("babelfish".parse::<EngineKind>().is_err());
        assert_eq!("Google".parse::<EngineKind>().unwrap(), EngineKind::Google);
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("autotranslate.toml");
        fs::write(&path, "[deepl]\napi_key = \"abc:fx\"\n").unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.deepl.api_key.as_deref(), Some("abc:fx"));
        assert!(Config::load(&dir.path().join("missing.toml")).is_err());
    }

    // ========== Override Tests ==========

    #[test]
    fn test_env_overrides() {
        let config = Config::from_toml_str("[deepl]\napi_key = \"from-file\"\n")
            .unwrap()
            .with_overrides_from(env(&[
                ("DEEPL_API_KEY", "from-env"),
                ("GOOGLE_APPLICATION_CREDENTIALS", "/tmp/key.json"),
            ]))
            .unwrap();

        assert_eq!(config.engine, EngineKind::DeepL);
        assert_eq!(config.deepl.api_key.as_deref(), Some("from-env"));
        assert_eq!(
            config.google.service_account_file,
            Some(PathBuf::from("/tmp/key.json"))
        );
    }

    #[test]
    fn test_blank_env_values_are_ignored() {
        let config = Config::from_toml_str("[deepl]\napi_key = \"from-file\"\n")
            .unwrap()
            .with_overrides_from(env(&[("DEEPL_API_KEY", "  ")]))
            .unwrap();
        assert_eq!(config.deepl.api_key.as_deref(), Some("from-file"));
    }

    #[test]
    fn test_bad_engine_override() {
        let result = Config::default().with_overrides_from(env(&[("AUTOTRANSLATE_ENGINE", "x")]));
        assert!(result.unwrap_err().is_configuration());
    }

    // ========== Engine Building Tests ==========

    #[test]
    fn test_build_deepl() {
        let config = Config::from_toml_str("[deepl]\napi_key = \"abc\"\n").unwrap();
        let engine = config.build_engine().unwrap();
        assert_eq!(engine.engine_name(), "DeepL");
    }

    #[test]
    fn test_build_deepl_without_key() {
        let err = Config::default().build_engine().err().unwrap();
        assert!(err.is_configuration());
    }

    #[test]
    fn test_build_google_inline() {
        let config = Config {
            engine: EngineKind::Google,
            google: GoogleSection {
                service_account_json: Some(SERVICE_ACCOUNT.to_string()),
                ..GoogleSection::default()
            },
            ..Config::default()
        };
        assert_eq!(config.build_engine().unwrap().engine_name(), "Google");
    }

    #[test]
    fn test_build_google_from_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("key.json");
        fs::write(&path, SERVICE_ACCOUNT).unwrap();

        let config = Config {
            engine: EngineKind::Google,
            google: GoogleSection {
                service_account_file: Some(path),
                ..GoogleSection::default()
            },
            ..Config::default()
        };
        assert!(config.build_engine().is_ok());
    }

    #[test]
    fn test_build_google_errors() {
        let missing = Config {
            engine: EngineKind::Google,
            ..Config::default()
        };
        assert!(missing.build_engine().err().unwrap().is_configuration());

        let broken = Config {
            engine: EngineKind::Google,
            google: GoogleSection {
                service_account_json: Some("{\"project_id\": \"p\"}".to_string()),
                ..GoogleSection::default()
            },
            ..Config::default()
        };
        assert!(broken.build_engine().err().unwrap().is_configuration());
    }

    #[test]
    fn test_debug_masks_secrets() {
        let config = Config::from_toml_str("[deepl]\napi_key = \"secret-key\"\n").unwrap();
        assert!(!format!("{:?}", config).contains("secret-key"));
    }
}
