//! Database configuration module.
//!
//! This module handles database connection and table creation using `SeaORM`. Tables
//! are generated from the entity definitions with `Schema::create_table_from_entity`,
//! so the schema always matches the Rust structs. Composite uniqueness that the
//! catalog relies on (code per kind, one preference per farm and item, one link per
//! pair) is declared as explicit unique indexes, and those indexes are the authority
//! the core maps constraint errors from.

use crate::entities::{
    CatalogItem, CatalogItemColumn, CatalogReference, CatalogReferenceColumn, FarmPreference,
    FarmPreferenceColumn, JunctionLink, JunctionLinkColumn,
};
use crate::errors::{Error, Result};
use sea_orm::sea_query::{Index, IndexCreateStatement};
use sea_orm::{ConnectionTrait, Database, DatabaseConnection, Schema};
use tracing::{debug, info};

/// Default database location used when `DATABASE_URL` is not set.
pub const DEFAULT_DATABASE_URL: &str = "sqlite://data/farm_catalog.sqlite?mode=rwc";

/// Establishes a connection to `database_url`.
pub async fn create_connection(database_url: &str) -> Result<DatabaseConnection> {
    debug!("Connecting to {}", database_url);
    Database::connect(database_url).await.map_err(Into::into)
}

/// Creates the parent directory of a file-backed `SQLite` URL.
///
/// In-memory and non-`SQLite` URLs are left alone.
pub fn ensure_sqlite_dir(database_url: &str) -> Result<()> {
    let Some(rest) = database_url.strip_prefix("sqlite://") else {
        return Ok(());
    };
    let file = rest.split('?').next().unwrap_or_default();
    match std::path::Path::new(file).parent() {
        Some(dir) if !dir.as_os_str().is_empty() => {
            std::fs::create_dir_all(dir).map_err(|e| Error::Config {
                message: format!("Failed to create database directory {}: {e}", dir.display()),
            })
        }
        _ => Ok(()),
    }
}

fn unique_indexes() -> Vec<IndexCreateStatement> {
    vec![
        Index::create()
            .if_not_exists()
            .name("idx_catalog_items_kind_code")
            .table(CatalogItem)
            .col(CatalogItemColumn::Kind)
            .col(CatalogItemColumn::Code)
            .unique()
            .to_owned(),
        Index::create()
            .if_not_exists()
            .name("idx_farm_preferences_farm_item")
            .table(FarmPreference)
            .col(FarmPreferenceColumn::FarmId)
            .col(FarmPreferenceColumn::CatalogItemId)
            .unique()
            .to_owned(),
        Index::create()
            .if_not_exists()
            .name("idx_junction_links_pair")
            .table(JunctionLink)
            .col(JunctionLinkColumn::Relation)
            .col(JunctionLinkColumn::LeftId)
            .col(JunctionLinkColumn::RightId)
            .unique()
            .to_owned(),
    ]
}

fn lookup_indexes() -> Vec<IndexCreateStatement> {
    vec![
        Index::create()
            .if_not_exists()
            .name("idx_catalog_items_farm")
            .table(CatalogItem)
            .col(CatalogItemColumn::FarmId)
            .to_owned(),
        Index::create()
            .if_not_exists()
            .name("idx_catalog_references_item")
            .table(CatalogReference)
            .col(CatalogReferenceColumn::CatalogItemId)
            .to_owned(),
    ]
}

/// Creates all tables and indexes if they do not exist yet.
pub async fn create_tables(db: &DatabaseConnection) -> Result<()> {
    let builder = db.get_database_backend();
    let schema = Schema::new(builder);

    let mut tables = vec![
        schema.create_table_from_entity(CatalogItem),
        schema.create_table_from_entity(FarmPreference),
        schema.create_table_from_entity(JunctionLink),
        schema.create_table_from_entity(CatalogReference),
    ];
    for table in &mut tables {
        table.if_not_exists();
        db.execute(builder.build(&*table)).await?;
    }

    for index in unique_indexes().into_iter().chain(lookup_indexes()) {
        db.execute(builder.build(&index)).await?;
    }

    info!("Catalog tables and indexes ensured");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::{CatalogItemModel, FarmPreferenceModel, JunctionLinkModel};
    use sea_orm::{EntityTrait, QuerySelect};

    #[tokio::test]
    async fn test_create_tables() -> Result<()> {
        let db = Database::connect("sqlite::memory:").await?;
        create_tables(&db).await?;

        let _: Vec<CatalogItemModel> = CatalogItem::find().limit(1).all(&db).await?;
        let _: Vec<FarmPreferenceModel> = FarmPreference::find().limit(1).all(&db).await?;
        let _: Vec<JunctionLinkModel> = JunctionLink::find().limit(1).all(&db).await?;
        Ok(())
    }

    #[test]
    fn test_ensure_sqlite_dir_ignores_memory() -> Result<()> {
        ensure_sqlite_dir("sqlite::memory:")?;
        ensure_sqlite_dir("postgres://localhost/farm")?;
        Ok(())
    }

    #[tokio::test]
    async fn test_create_tables_is_idempotent() -> Result<()> {
        let db = create_connection("sqlite::memory:").await?;
        create_tables(&db).await?;
        create_tables(&db).await?;
        Ok(())
    }
}
