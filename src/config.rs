//! Model credential configuration.
//!
//! The API key is looked up once at startup, first in a TOML secrets file and
//! then in the environment, and handed to the completion client explicitly.
//!
//! Secrets file format:
//!
//! ```toml
//! OPENAI_API_KEY = "sk-..."
//! # optional
//! OPENAI_BASE_URL = "https://api.openai.com/v1"
//! ```

use crate::error::{Result, SurveyError};
use serde::Deserialize;
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Default OpenAI-compatible endpoint
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// Secrets file looked up in the working directory
const LOCAL_SECRETS_FILE: &str = "secrets.toml";

const API_KEY_VAR: &str = "OPENAI_API_KEY";
const BASE_URL_VAR: &str = "OPENAI_BASE_URL";

/// Default secrets path: `<config_dir>/litsurvey/secrets.toml`
fn default_secrets_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("litsurvey").join(LOCAL_SECRETS_FILE))
}

/// Keys read from the secrets file
#[derive(Debug, Default, Deserialize)]
pub struct SecretsFile {
    #[serde(rename = "OPENAI_API_KEY")]
    pub openai_api_key: Option<String>,
    #[serde(rename = "OPENAI_BASE_URL")]
    pub openai_base_url: Option<String>,
}

impl SecretsFile {
    /// Load a secrets file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| {
            SurveyError::Config(format!("Invalid secrets file {:?}: {}", path, e))
        })
    }
}

/// Credential and endpoint for the completion model
#[derive(Clone)]
pub struct LlmSettings {
    pub api_key: String,
    pub base_url: String,
}

impl fmt::Debug for LlmSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LlmSettings")
            .field("api_key", &"<redacted>")
            .field("base_url", &self.base_url)
            .finish()
    }
}

impl LlmSettings {
    /// Resolve settings from the secrets store and the process environment.
    ///
    /// An explicit `secrets_path` must exist. Without one, `./secrets.toml`
    /// and then the per-user config file are tried.
    pub fn resolve(secrets_path: Option<&Path>) -> Result<Self> {
        let secrets = match secrets_path {
            Some(path) => Some(SecretsFile::load(path)?),
            None => {
                let candidates = std::iter::once(PathBuf::from(LOCAL_SECRETS_FILE))
                    .chain(default_secrets_path());
                let mut found = None;
                for path in candidates {
                    if path.is_file() {
                        info!(path = ?path, "Loading secrets file");
                        found = Some(SecretsFile::load(&path)?);
                        break;
                    }
                    debug!(path = ?path, "Secrets file not found");
                }
                found
            }
        };

        Self::from_sources(secrets, |key| std::env::var(key).ok())
    }

    /// Combine a secrets file with an environment lookup; the file wins.
    pub fn from_sources<F>(secrets: Option<SecretsFile>, env: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let secrets = secrets.unwrap_or_default();
        let non_empty = |v: Option<String>| v.filter(|s| !s.trim().is_empty());

        let api_key = non_empty(secrets.openai_api_key)
            .or_else(|| non_empty(env(API_KEY_VAR)))
            .ok_or_else(|| {
                SurveyError::Config(format!(
                    "{} not set: add it to {} or export it",
                    API_KEY_VAR, LOCAL_SECRETS_FILE
                ))
            })?;

        let base_url = non_empty(secrets.openai_base_url)
            .or_else(|| non_empty(env(BASE_URL_VAR)))
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());

        Ok(Self { api_key, base_url })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    #[test]
    fn test_secrets_file_wins_over_env() -> Result<()> {
        let secrets = SecretsFile {
            openai_api_key: Some("from-file".to_string()),
            openai_base_url: None,
        };
        let settings = LlmSettings::from_sources(Some(secrets), |key| {
            (key == API_KEY_VAR).then(|| "from-env".to_string())
        })?;
        assert_eq!(settings.api_key, "from-file");
        assert_eq!(settings.base_url, DEFAULT_BASE_URL);
        Ok(())
    }

    #[test]
    fn test_env_fallback() -> Result<()> {
        let settings = LlmSettings::from_sources(None, |key| match key {
            API_KEY_VAR => Some("from-env".to_string()),
            BASE_URL_VAR => Some("http://localhost:8080/v1".to_string()),
            _ => None,
        })?;
        assert_eq!(settings.api_key, "from-env");
        assert_eq!(settings.base_url, "http://localhost:8080/v1");
        Ok(())
    }

    #[test]
    fn test_missing_key_is_config_error() {
        let blank = SecretsFile {
            openai_api_key: Some("  ".to_string()),
            openai_base_url: None,
        };
        let err = LlmSettings::from_sources(Some(blank), no_env).expect_err("no key");
        assert!(matches!(err, SurveyError::Config(_)));
    }

    #[test]
    fn test_load_secrets_file() -> Result<()> {
        let mut temp = NamedTempFile::new()?;
        writeln!(temp, "OPENAI_API_KEY = \"sk-file\"")?;
        writeln!(temp, "OPENAI_BASE_URL = \"https://proxy.example/v1\"")?;

        let settings = LlmSettings::resolve(Some(temp.path()))?;
        assert_eq!(settings.api_key, "sk-file");
        assert_eq!(settings.base_url, "https://proxy.example/v1");
        Ok(())
    }

    #[test]
    fn test_explicit_missing_file_fails() {
        let err = LlmSettings::resolve(Some(Path::new("/nonexistent/secrets.toml")))
            .expect_err("missing file");
        assert!(matches!(err, SurveyError::Io(_)));
    }

    #[test]
    fn test_debug_redacts_key() {
        let settings = LlmSettings {
            api_key: "sk-secret".to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
        };
        assert!(!format!("{:?}", settings).contains("sk-secret"));
    }
}
