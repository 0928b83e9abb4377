//! Locale tables loaded from locales.toml
//!
//! The file holds one table per language (`[fr]`, `[en]`, `[ar]`) mapping dotted
//! message keys to templates with `{name}` placeholders.

use crate::{
    core::locale::{Locale, Translator, interpolate},
    errors::{Error, Result},
};
use serde::Deserialize;
use std::{collections::HashMap, path::Path};
use tracing::debug;

/// Default locale file location used when `LOCALE_PATH` is not set.
pub const DEFAULT_LOCALE_PATH: &str = "locales.toml";

#[derive(Debug, Default, Deserialize)]
struct LocaleFile {
    #[serde(default)]
    fr: HashMap<String, String>,
    #[serde(default)]
    en: HashMap<String, String>,
    #[serde(default)]
    ar: HashMap<String, String>,
}

/// Message templates for every locale, rendering in one active locale.
///
/// A key missing from the active locale falls back to the fallback locale,
/// then to the key itself.
#[derive(Debug, Clone, Default)]
pub struct LocaleTable {
    messages: HashMap<Locale, HashMap<String, String>>,
    active: Locale,
    fallback: Locale,
}

impl LocaleTable {
    /// Parses locale TOML text, rendering in `active` with French as fallback.
    ///
    /// # Errors
    /// Returns [`Error::Config`] if the TOML is invalid.
    pub fn parse(contents: &str, active: Locale) -> Result<Self> {
        let file: LocaleFile = toml::from_str(contents).map_err(|e| Error::Config {
            message: format!("Failed to parse locale table: {e}"),
        })?;
        let messages = HashMap::from([
            (Locale::Fr, file.fr),
            (Locale::En, file.en),
            (Locale::Ar, file.ar),
        ]);
        Ok(Self {
            messages,
            active,
            fallback: Locale::Fr,
        })
    }

    /// Loads locale tables from a TOML file.
    ///
    /// # Errors
    /// Returns [`Error::Config`] if the file cannot be read or parsed.
    pub fn load<P: AsRef<Path>>(path: P, active: Locale) -> Result<Self> {
        let path = path.as_ref();
        debug!("Loading locale table from {:?}", path);
        let contents = std::fs::read_to_string(path).map_err(|e| Error::Config {
            message: format!("Failed to read locale table {}: {e}", path.display()),
        })?;
        Self::parse(&contents, active)
    }

    /// The same tables rendering in another locale.
    #[must_use]
    pub fn with_locale(mut self, active: Locale) -> Self {
        self.active = active;
        self
    }

    /// Locale messages are rendered in.
    #[must_use]
    pub const fn locale(&self) -> Locale {
        self.active
    }

    fn lookup(&self, locale: Locale, key: &str) -> Option<&str> {
        self.messages.get(&locale)?.get(key).map(String::as_str)
    }
}

impl Translator for LocaleTable {
    fn translate(&self, key: &str, params: &[(&str, &str)]) -> String {
        let template = self
            .lookup(self.active, key)
            .or_else(|| self.lookup(self.fallback, key))
            .unwrap_or(key);
        interpolate(template, params)
    }
}
