//! Dependent records - Historic data pointing at catalog rows.
//!
//! Animals, treatments and vaccinations register a reference when they are
//! created against a catalog item (and optionally a junction pair). The counts
//! kept here are what guard hard deletion of catalog items and junction links.

use crate::{
    core::catalog,
    entities::{CatalogReference, JunctionLink, catalog_reference},
    errors::{Error, Result},
};
use sea_orm::{Set, prelude::*};
use std::collections::BTreeMap;
use tracing::debug;

/// Records that `source`/`source_id` depends on a catalog item (and pair).
///
/// # Errors
/// Returns [`Error::NotFound`] if the catalog item or junction link does not exist,
/// and [`Error::Validation`] for a blank source.
pub async fn add_reference(
    db: &DatabaseConnection,
    catalog_item_id: i64,
    junction_link_id: Option<i64>,
    source: &str,
    source_id: &str,
) -> Result<catalog_reference::Model> {
    if source.trim().is_empty() {
        return Err(Error::validation("source", "source cannot be empty"));
    }
    catalog::find_model(db, catalog_item_id).await?;
    if let Some(link_id) = junction_link_id {
        JunctionLink::find_by_id(link_id)
            .one(db)
            .await?
            .ok_or(Error::NotFound {
                entity: "junction_link",
                id: link_id,
            })?;
    }

    let reference = catalog_reference::ActiveModel {
        catalog_item_id: Set(catalog_item_id),
        junction_link_id: Set(junction_link_id),
        source: Set(source.trim().to_string()),
        source_id: Set(source_id.to_string()),
        created_at: Set(chrono::Utc::now()),
        ..Default::default()
    };
    let created = reference.insert(db).await?;
    debug!(id = created.id, catalog_item_id, "Catalog reference recorded");
    Ok(created)
}

/// Removes a dependent reference.
pub async fn remove_reference(db: &DatabaseConnection, reference_id: i64) -> Result<()> {
    let result = CatalogReference::delete_by_id(reference_id).exec(db).await?;
    if result.rows_affected == 0 {
        return Err(Error::NotFound {
            entity: "catalog_reference",
            id: reference_id,
        });
    }
    Ok(())
}

/// Counts references to a catalog item, grouped by source.
pub async fn count_for_item<C: ConnectionTrait>(
    db: &C,
    catalog_item_id: i64,
) -> Result<BTreeMap<String, u64>> {
    let references = CatalogReference::find()
        .filter(catalog_reference::Column::CatalogItemId.eq(catalog_item_id))
        .all(db)
        .await?;

    Ok(references
        .into_iter()
        .fold(BTreeMap::new(), |mut counts, reference| {
            *counts.entry(reference.source).or_insert(0) += 1;
            counts
        }))
}

/// Counts references to a junction link.
pub async fn count_for_link<C: ConnectionTrait>(db: &C, junction_link_id: i64) -> Result<u64> {
    CatalogReference::find()
        .filter(catalog_reference::Column::JunctionLinkId.eq(junction_link_id))
        .count(db)
        .await
        .map_err(Into::into)
}
