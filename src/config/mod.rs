/// Database configuration and connection management
pub mod database;

/// Global catalog seeding from catalog.toml
pub mod catalog;

/// Locale tables from locales.toml
pub mod locale;

/// Settings from environment variables
pub mod settings;
