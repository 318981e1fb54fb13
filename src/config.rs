//! Engine configuration
//!
//! Registered locales, the primary locale and the strategy used to fill
//! locales missing from a LOCALE value. Loaded from a JSON file and
//! validated before use.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type for configuration operations
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Configuration errors
#[derive(Debug, Clone, Error)]
pub enum ConfigError {
    #[error("Failed to read config: {0}")]
    Read(String),

    #[error("Invalid config JSON: {0}")]
    Parse(String),

    #[error("Invalid config: {0}")]
    Invalid(String),
}

/// How locales absent from a LOCALE value are populated
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LocaleStrategy {
    /// Missing locales are set to null
    NoneValue,
    /// Missing locales copy the primary locale's value
    #[default]
    PrimaryLocale,
    /// Missing locales are produced by a named registry callback
    Fallback(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Registered locale codes
    #[serde(default = "default_locales")]
    pub locales: Vec<String>,

    /// Primary locale; must be one of `locales`
    #[serde(default = "default_locale")]
    pub locale: String,

    #[serde(default)]
    pub locale_strategy: LocaleStrategy,
}

fn default_locales() -> Vec<String> {
    vec!["en".to_string()]
}

fn default_locale() -> String {
    "en".to_string()
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            locales: default_locales(),
            locale: default_locale(),
            locale_strategy: LocaleStrategy::default(),
        }
    }
}

impl EngineConfig {
    /// Configuration with the given locales, the first being primary
    pub fn with_locales<I, S>(locales: I) -> ConfigResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let locales: Vec<String> = locales.into_iter().map(Into::into).collect();
        let locale = locales
            .first()
            .cloned()
            .ok_or_else(|| ConfigError::Invalid("locales must not be empty".into()))?;
        Self {
            locales,
            locale,
            locale_strategy: LocaleStrategy::default(),
        }
        .validated()
    }

    pub fn with_strategy(mut self, strategy: LocaleStrategy) -> Self {
        self.locale_strategy = strategy;
        self
    }

    /// Load configuration from file
    pub fn load(path: &Path) -> ConfigResult<Self> {
        let content = fs::read_to_string(path).map_err(|e| ConfigError::Read(e.to_string()))?;

        let config: EngineConfig =
            serde_json::from_str(&content).map_err(|e| ConfigError::Parse(e.to_string()))?;

        config.validated()
    }

    /// Validates and removes duplicate locales, keeping first occurrences
    pub fn validated(mut self) -> ConfigResult<Self> {
        self.validate()?;
        let mut seen = Vec::with_capacity(self.locales.len());
        self.locales.retain(|locale| {
            if seen.contains(locale) {
                false
            } else {
                seen.push(locale.clone());
                true
            }
        });
        Ok(self)
    }

    pub fn validate(&self) -> ConfigResult<()> {
        if self.locales.is_empty() {
            return Err(ConfigError::Invalid("locales must not be empty".into()));
        }

        if let Some(bad) = self
            .locales
            .iter()
            .find(|locale| locale.is_empty() || locale.contains('.'))
        {
            return Err(ConfigError::Invalid(format!(
                "locale code '{}' must be non-empty and contain no '.'",
                bad
            )));
        }

        if !self.is_registered(&self.locale) {
            return Err(ConfigError::Invalid(format!(
                "primary locale '{}' is not in locales",
                self.locale
            )));
        }

        if let LocaleStrategy::Fallback(name) = &self.locale_strategy {
            if name.is_empty() {
                return Err(ConfigError::Invalid("empty locale fallback name".into()));
            }
        }

        Ok(())
    }

    pub fn is_registered(&self, locale: &str) -> bool {
        self.locales.iter().any(|l| l == locale)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_defaults() {
        let config: EngineConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config, EngineConfig::default());
        assert_eq!(config.locale_strategy, LocaleStrategy::PrimaryLocale);
    }

    #[test]
    fn test_strategy_serde() {
        let config: EngineConfig = serde_json::from_str(
            r#"{"locales": ["en", "fr"], "locale": "en", "locale_strategy": {"fallback": "upper"}}"#,
        )
        .unwrap();
        assert_eq!(config.locale_strategy, LocaleStrategy::Fallback("upper".into()));

        let config: EngineConfig =
            serde_json::from_str(r#"{"locale_strategy": "none_value"}"#).unwrap();
        assert_eq!(config.locale_strategy, LocaleStrategy::NoneValue);
    }

    #[test]
    fn test_primary_must_be_registered() {
        let config = EngineConfig {
            locales: vec!["fr".into()],
            locale: "en".into(),
            locale_strategy: LocaleStrategy::NoneValue,
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_dotted_locale_rejected() {
        assert!(EngineConfig::with_locales(["en", "en.us"]).is_err());
        assert!(EngineConfig::with_locales(Vec::<String>::new()).is_err());
    }

    #[test]
    fn test_duplicates_removed_in_order() {
        let config = EngineConfig::with_locales(["en", "fr", "en", "ar"]).unwrap();
        assert_eq!(config.locales, vec!["en", "fr", "ar"]);
    }

    #[test]
    fn test_load_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, r#"{{"locales": ["ar", "en"], "locale": "ar"}}"#).unwrap();

        let config = EngineConfig::load(file.path()).unwrap();
        assert_eq!(config.locale, "ar");
        assert!(config.is_registered("en"));
    }

    #[test]
    fn test_load_rejects_bad_json() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "not json").unwrap();
        assert!(matches!(
            EngineConfig::load(file.path()),
            Err(ConfigError::Parse(_))
        ));
    }
}
