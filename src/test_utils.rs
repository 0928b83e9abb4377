//! Shared test utilities for the farm catalog.
//!
//! This module provides common helper functions for setting up test databases
//! and creating catalog rows with sensible defaults.

#![allow(clippy::unwrap_used)]

use crate::{
    core::{
        catalog::{self, LocalizedName, NewCatalogItem},
        locale::Translator,
        notify::{Feedback, Notifier},
        scope::Actor,
    },
    entities::{CatalogKind, catalog_item},
    errors::Result,
};
use sea_orm::DatabaseConnection;
use std::sync::{Arc, Mutex};

/// Creates an in-memory `SQLite` database with all tables initialized.
/// This is the standard setup for all integration tests.
pub async fn setup_test_db() -> Result<DatabaseConnection> {
    let db = sea_orm::Database::connect("sqlite::memory:").await?;
    crate::config::database::create_tables(&db).await?;
    Ok(db)
}

fn names(code: &str) -> LocalizedName {
    LocalizedName {
        fr: format!("Nom {code}"),
        en: format!("Name {code}"),
        ar: format!("اسم {code}"),
    }
}

/// Builds an unsaved breed row for pure-function tests.
///
/// # Defaults
/// * names: `"Nom {code}"`, `"Name {code}"`, `"اسم {code}"`
/// * active, version 1, not deleted
pub fn sample_item(id: i64, code: &str, farm_id: Option<&str>) -> catalog_item::Model {
    let name = names(code);
    let now = chrono::Utc::now();
    catalog_item::Model {
        id,
        kind: CatalogKind::Breed,
        code: code.to_string(),
        name_fr: name.fr,
        name_en: name.en,
        name_ar: name.ar,
        description: None,
        region: None,
        is_active: true,
        display_order: None,
        farm_id: farm_id.map(str::to_string),
        version: 1,
        created_at: now,
        updated_at: now,
        deleted_at: None,
    }
}

/// Creates an active global item through the operator path.
pub async fn create_global(
    db: &DatabaseConnection,
    kind: CatalogKind,
    code: &str,
) -> Result<catalog_item::Model> {
    catalog::create(db, &Actor::Operator, NewCatalogItem::new(kind, code, names(code))).await
}

/// Translator that renders every message as its own key.
#[derive(Debug, Default)]
pub struct EchoTranslator;

impl Translator for EchoTranslator {
    fn translate(&self, key: &str, _params: &[(&str, &str)]) -> String {
        key.to_string()
    }
}

/// Notifier that keeps every message it receives.
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    successes: Mutex<Vec<String>>,
    errors: Mutex<Vec<String>>,
    warnings: Mutex<Vec<String>>,
}

impl RecordingNotifier {
    /// Success messages received so far.
    pub fn successes(&self) -> Vec<String> {
        self.successes.lock().unwrap().clone()
    }

    /// Error messages received so far.
    pub fn errors(&self) -> Vec<String> {
        self.errors.lock().unwrap().clone()
    }

    /// Warning messages received so far.
    pub fn warnings(&self) -> Vec<String> {
        self.warnings.lock().unwrap().clone()
    }
}

impl Notifier for RecordingNotifier {
    fn success(&self, _title: &str, message: &str) {
        self.successes.lock().unwrap().push(message.to_string());
    }

    fn error(&self, _title: &str, message: &str) {
        self.errors.lock().unwrap().push(message.to_string());
    }

    fn warning(&self, _title: &str, message: &str) {
        self.warnings.lock().unwrap().push(message.to_string());
    }
}

/// Feedback wired to a [`RecordingNotifier`] and an [`EchoTranslator`].
pub fn recording_feedback() -> (Feedback, Arc<RecordingNotifier>) {
    let notifier = Arc::new(RecordingNotifier::default());
    let feedback = Feedback::new(
        Arc::clone(&notifier) as Arc<dyn Notifier>,
        Arc::new(EchoTranslator),
    );
    (feedback, notifier)
}
