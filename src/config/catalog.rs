//! Global catalog seeding from catalog.toml
//!
//! The seed file lists the shared reference data an operator ships with the
//! application: `[[items]]` rows and `[[links]]` associations between them,
//! the latter addressed by business code. Seeding is idempotent. Rows whose
//! `(kind, code)` already exists and pairs that are already linked are skipped,
//! so operator edits made after the first run are never overwritten.

use crate::{
    core::{
        catalog::{self, LocalizedName, NewCatalogItem},
        junction,
        scope::Actor,
    },
    entities::{CatalogKind, JunctionRelation},
    errors::{Error, Result},
};
use sea_orm::DatabaseConnection;
use serde::Deserialize;
use std::path::Path;
use tracing::{debug, info, instrument};

/// Default seed file location used when `CATALOG_SEED_PATH` is not set.
pub const DEFAULT_SEED_PATH: &str = "catalog.toml";

/// Structure of the whole catalog.toml file
#[derive(Debug, Default, Deserialize)]
pub struct SeedCatalog {
    /// Global items to create
    #[serde(default)]
    pub items: Vec<SeedItem>,
    /// Associations to create between seeded items
    #[serde(default)]
    pub links: Vec<SeedLink>,
}

/// One global catalog item
#[derive(Debug, Clone, Deserialize)]
pub struct SeedItem {
    /// Type of reference data
    pub kind: CatalogKind,
    /// Business code, unique within `kind`
    pub code: String,
    /// French label
    pub name_fr: String,
    /// English label
    #[serde(default)]
    pub name_en: String,
    /// Arabic label
    #[serde(default)]
    pub name_ar: String,
    /// Free-text description
    pub description: Option<String>,
    /// Region or origin
    pub region: Option<String>,
    /// Activation flag
    #[serde(default = "default_active")]
    pub is_active: bool,
    /// Ordering hint
    pub display_order: Option<i32>,
}

const fn default_active() -> bool {
    true
}

impl SeedItem {
    fn into_new_item(self) -> NewCatalogItem {
        NewCatalogItem {
            description: self.description,
            region: self.region,
            is_active: self.is_active,
            display_order: self.display_order,
            ..NewCatalogItem::new(
                self.kind,
                &self.code,
                LocalizedName {
                    fr: self.name_fr,
                    en: self.name_en,
                    ar: self.name_ar,
                },
            )
        }
    }
}

/// One association, addressed by the codes of its two sides
#[derive(Debug, Clone, Deserialize)]
pub struct SeedLink {
    /// Association type
    pub relation: JunctionRelation,
    /// Code of the left item
    pub left: String,
    /// Code of the right item
    pub right: String,
}

/// Counts of what a seeding run did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SeedReport {
    /// Items inserted
    pub items_created: usize,
    /// Items already present
    pub items_skipped: usize,
    /// Links inserted
    pub links_created: usize,
    /// Links already present
    pub links_skipped: usize,
}

/// Parses seed TOML text.
///
/// # Errors
/// Returns [`Error::Config`] if the TOML is invalid or a kind or relation is unknown.
pub fn parse_seed(contents: &str) -> Result<SeedCatalog> {
    toml::from_str(contents).map_err(|e| Error::Config {
        message: format!("Failed to parse catalog seed: {e}"),
    })
}

/// Loads the seed catalog from a TOML file.
///
/// # Errors
/// Returns [`Error::Config`] if the file cannot be read or parsed.
pub fn load_seed<P: AsRef<Path>>(path: P) -> Result<SeedCatalog> {
    let path = path.as_ref();
    debug!("Loading catalog seed from {:?}", path);
    let contents = std::fs::read_to_string(path).map_err(|e| Error::Config {
        message: format!("Failed to read catalog seed {}: {e}", path.display()),
    })?;
    parse_seed(&contents)
}

async fn resolve_code(db: &DatabaseConnection, kind: CatalogKind, code: &str) -> Result<i64> {
    catalog::find_by_code(db, kind, code)
        .await?
        .map(|item| item.id)
        .ok_or_else(|| Error::Config {
            message: format!("Seed link references unknown {kind:?} code {code}"),
        })
}

/// Inserts the missing parts of `seed` into the global catalog.
///
/// # Errors
/// Returns [`Error::Config`] for a link naming an unknown code, or any error from
/// the catalog and junction services.
#[instrument(skip_all, fields(items = seed.items.len(), links = seed.links.len()))]
pub async fn seed_catalog(db: &DatabaseConnection, seed: SeedCatalog) -> Result<SeedReport> {
    let mut report = SeedReport::default();

    for item in seed.items {
        if catalog::find_by_code(db, item.kind, &item.code).await?.is_some() {
            debug!(code = %item.code, "Seed item already present");
            report.items_skipped += 1;
            continue;
        }
        catalog::create(db, &Actor::Operator, item.into_new_item()).await?;
        report.items_created += 1;
    }

    for link in seed.links {
        let left_id = resolve_code(db, link.relation.left_kind(), &link.left).await?;
        let right_id = resolve_code(db, link.relation.right_kind(), &link.right).await?;
        if junction::find_pair(db, link.relation, left_id, right_id).await?.is_some() {
            report.links_skipped += 1;
            continue;
        }
        junction::link(db, &Actor::Operator, link.relation, left_id, right_id).await?;
        report.links_created += 1;
    }

    info!(
        items_created = report.items_created,
        items_skipped = report.items_skipped,
        links_created = report.links_created,
        links_skipped = report.links_skipped,
        "Catalog seed applied"
    );
    Ok(report)
}
