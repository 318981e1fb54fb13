//! LOCALE values
//!
//! A localized text is a mapping from registered locale codes to text that
//! must include the primary locale. The canonical form carries every
//! registered locale; missing ones are filled by the configured strategy.

use tracing::{debug, warn};

use super::validator::AttrValidator;
use crate::config::LocaleStrategy;
use crate::value::{Document, Value};

impl AttrValidator<'_> {
    pub(super) fn check_locale(&self, name: &str, value: &Value) -> Option<Value> {
        let config = self.config();
        let map = value.as_map()?;
        if map.is_empty() {
            return None;
        }

        let mut given = Document::new();
        for (locale, text) in map {
            if !config.is_registered(locale) {
                debug!(attr = name, locale = %locale, "locale not registered");
                return None;
            }
            match text {
                Value::Str(text) => {
                    given.insert(locale.clone(), Value::Str(text.clone()));
                }
                // Canonical output of the none-value strategy
                Value::Null
                    if *locale != config.locale
                        && config.locale_strategy == LocaleStrategy::NoneValue => {}
                _ => return None,
            }
        }
        if !given.contains_key(&config.locale) {
            return None;
        }

        let mut out = Document::new();
        for locale in &config.locales {
            let text = match given.get(locale) {
                Some(text) => text.clone(),
                None => self.fill_locale(name, &given, locale)?,
            };
            out.insert(locale.clone(), text);
        }
        Some(Value::Map(out))
    }

    fn fill_locale(&self, name: &str, given: &Document, locale: &str) -> Option<Value> {
        let config = self.config();
        match &config.locale_strategy {
            LocaleStrategy::NoneValue => Some(Value::Null),
            LocaleStrategy::PrimaryLocale => given.get(&config.locale).cloned(),
            LocaleStrategy::Fallback(fallback) => match self.registry().locale_fallback(fallback) {
                Some(fill) => Some(fill(given, locale)),
                None => {
                    warn!(attr = name, fallback = %fallback, "locale fallback not registered");
                    None
                }
            },
        }
    }
}
