//! Locale selection and the translation lookup contract.
//!
//! The core never builds user-facing text itself; every label or message goes
//! through a [`Translator`] keyed by a dotted message key.

use crate::errors::{Error, Result};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Supported user interface languages.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Locale {
    /// French, the primary catalog language
    #[default]
    Fr,
    /// English
    En,
    /// Arabic
    Ar,
}

impl FromStr for Locale {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "fr" => Ok(Self::Fr),
            "en" => Ok(Self::En),
            "ar" => Ok(Self::Ar),
            other => Err(Error::Config {
                message: format!("Unsupported locale: {other}"),
            }),
        }
    }
}

/// Translation lookup: message key plus named parameters to display text.
pub trait Translator: Send + Sync {
    /// Resolves `key`, substituting `{name}` placeholders from `params`.
    fn translate(&self, key: &str, params: &[(&str, &str)]) -> String;
}

/// Substitutes `{name}` placeholders in `template`.
#[must_use]
pub fn interpolate(template: &str, params: &[(&str, &str)]) -> String {
    params
        .iter()
        .fold(template.to_string(), |text, (name, value)| {
            text.replace(&format!("{{{name}}}"), value)
        })
}
