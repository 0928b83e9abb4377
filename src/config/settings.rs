//! Application settings read from environment variables.

use super::{catalog::DEFAULT_SEED_PATH, database, locale::DEFAULT_LOCALE_PATH};
use crate::{core::locale::Locale, errors::Result};
use std::path::PathBuf;

/// Runtime settings of the binary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    /// Database connection string (`DATABASE_URL`)
    pub database_url: String,
    /// Seed catalog file (`CATALOG_SEED_PATH`)
    pub seed_path: PathBuf,
    /// Locale table file (`LOCALE_PATH`)
    pub locale_path: PathBuf,
    /// Locale messages are rendered in (`DEFAULT_LOCALE`)
    pub locale: Locale,
}

impl Settings {
    /// Reads settings from the environment, using defaults for unset variables.
    ///
    /// # Errors
    /// Returns [`crate::errors::Error::Config`] if `DEFAULT_LOCALE` names an unsupported locale.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let locale = match lookup("DEFAULT_LOCALE") {
            Some(raw) => raw.parse()?,
            None => Locale::default(),
        };
        Ok(Self {
            database_url: lookup("DATABASE_URL")
                .unwrap_or_else(|| database::DEFAULT_DATABASE_URL.to_string()),
            seed_path: lookup("CATALOG_SEED_PATH")
                .map_or_else(|| PathBuf::from(DEFAULT_SEED_PATH), PathBuf::from),
            locale_path: lookup("LOCALE_PATH")
                .map_or_else(|| PathBuf::from(DEFAULT_LOCALE_PATH), PathBuf::from),
            locale,
        })
    }
}
