//! Farm preference business logic - A farm's curated subset of the catalog.
//!
//! Selecting a global item creates a preference link; deselecting removes the link
//! and never touches the catalog row. Local items are selected by ownership alone,
//! so deselecting one archives (soft-deletes) the item itself. Links are written
//! only by their farm and carry no version: concurrent sessions of one farm are
//! last-write-wins.

use crate::{
    core::{
        catalog,
        scope::{self, Actor, CatalogOperation, Scope},
    },
    entities::{FarmPreference, catalog_item, farm_preference},
    errors::{Error, Result, is_unique_violation},
};
use sea_orm::{QueryOrder, Set, TransactionTrait, prelude::*};
use tracing::{debug, info, instrument};

/// Result of [`select`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectOutcome {
    /// A new preference link was created
    Selected(farm_preference::Model),
    /// The item was already part of the farm's list; nothing changed
    AlreadySelected,
}

/// Result of [`deselect`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeselectOutcome {
    /// The farm's link to a global item was deleted
    LinkRemoved,
    /// The farm's local item was soft-deleted
    LocalArchived(catalog_item::Model),
}

/// All preference links of a farm, in display order.
pub async fn links_for_farm(
    db: &DatabaseConnection,
    farm_id: &str,
) -> Result<Vec<farm_preference::Model>> {
    FarmPreference::find()
        .filter(farm_preference::Column::FarmId.eq(farm_id))
        .order_by_asc(farm_preference::Column::DisplayOrder)
        .order_by_asc(farm_preference::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

/// The farm's link to an item, if any.
pub async fn find_link<C: ConnectionTrait>(
    db: &C,
    farm_id: &str,
    catalog_item_id: i64,
) -> Result<Option<farm_preference::Model>> {
    FarmPreference::find()
        .filter(farm_preference::Column::FarmId.eq(farm_id))
        .filter(farm_preference::Column::CatalogItemId.eq(catalog_item_id))
        .one(db)
        .await
        .map_err(Into::into)
}

/// Loads an item the farm may point a link at: visible and not deleted.
async fn load_referencable<C: ConnectionTrait>(
    db: &C,
    farm_id: &str,
    catalog_item_id: i64,
) -> Result<catalog_item::Model> {
    let item = catalog::find_model(db, catalog_item_id).await?;
    let actor = Actor::Farm(farm_id.to_string());
    scope::authorize(&actor, &scope::classify(&item), CatalogOperation::Reference, item.id)?;
    if item.is_deleted() {
        return Err(Error::NotFound {
            entity: "catalog_item",
            id: item.id,
        });
    }
    Ok(item)
}

async fn next_display_order<C: ConnectionTrait>(db: &C, farm_id: &str) -> Result<i32> {
    let last = FarmPreference::find()
        .filter(farm_preference::Column::FarmId.eq(farm_id))
        .order_by_desc(farm_preference::Column::DisplayOrder)
        .one(db)
        .await?;
    Ok(last.map_or(1, |link| link.display_order + 1))
}

async fn insert_link<C: ConnectionTrait>(
    db: &C,
    farm_id: &str,
    catalog_item_id: i64,
) -> Result<farm_preference::Model> {
    let display_order = next_display_order(db, farm_id).await?;
    farm_preference::ActiveModel {
        farm_id: Set(farm_id.to_string()),
        catalog_item_id: Set(catalog_item_id),
        display_order: Set(display_order),
        is_favorite: Set(false),
        usage_count: Set(0),
        created_at: Set(chrono::Utc::now()),
        ..Default::default()
    }
    .insert(db)
    .await
    .map_err(Into::into)
}

/// Returns the farm's link to an item, creating one for the farm's own local items.
///
/// Global items must be selected first; a missing link is reported as not found.
async fn ensure_link<C: ConnectionTrait>(
    db: &C,
    farm_id: &str,
    catalog_item_id: i64,
) -> Result<farm_preference::Model> {
    if let Some(link) = find_link(db, farm_id, catalog_item_id).await? {
        return Ok(link);
    }
    let item = load_referencable(db, farm_id, catalog_item_id).await?;
    if !scope::classify(&item).is_owned_by(farm_id) {
        return Err(Error::NotFound {
            entity: "farm_preference",
            id: catalog_item_id,
        });
    }
    insert_link(db, farm_id, catalog_item_id).await
}

/// Adds an item to the farm's list.
///
/// Selecting an item that is already selected (or a local item the farm owns)
/// changes nothing and reports [`SelectOutcome::AlreadySelected`].
///
/// # Errors
/// - [`Error::NotFound`] if the item does not exist, is deleted or belongs to another farm
/// - [`Error::Validation`] if the global item is inactive
#[instrument(skip(db))]
pub async fn select(
    db: &DatabaseConnection,
    farm_id: &str,
    catalog_item_id: i64,
) -> Result<SelectOutcome> {
    let item = load_referencable(db, farm_id, catalog_item_id).await?;
    if let Scope::Local { .. } = scope::classify(&item) {
        debug!(catalog_item_id, "Local item is selected by ownership");
        return Ok(SelectOutcome::AlreadySelected);
    }
    // An existing link wins over a later deactivation.
    if find_link(db, farm_id, catalog_item_id).await?.is_some() {
        return Ok(SelectOutcome::AlreadySelected);
    }
    if !item.is_active {
        return Err(Error::validation(
            "catalog_item_id",
            format!("catalog item {catalog_item_id} is inactive"),
        ));
    }

    match insert_link(db, farm_id, catalog_item_id).await {
        Ok(link) => {
            info!(link_id = link.id, "Catalog item selected");
            Ok(SelectOutcome::Selected(link))
        }
        // Another session of the same farm won the insert.
        Err(Error::Database(e)) if is_unique_violation(&e) => Ok(SelectOutcome::AlreadySelected),
        Err(e) => Err(e),
    }
}

/// Removes an item from the farm's list.
///
/// # Errors
/// Returns [`Error::NotFound`] if the item is not in the farm's list.
#[instrument(skip(db))]
pub async fn deselect(
    db: &DatabaseConnection,
    farm_id: &str,
    catalog_item_id: i64,
) -> Result<DeselectOutcome> {
    let item = catalog::find_model(db, catalog_item_id).await?;
    match scope::classify(&item) {
        Scope::Local { farm_id: owner } if owner == farm_id => {
            let archived = catalog::delete(db, &Actor::Farm(owner), catalog_item_id).await?;
            Ok(DeselectOutcome::LocalArchived(archived))
        }
        Scope::Local { .. } => Err(Error::NotFound {
            entity: "catalog_item",
            id: catalog_item_id,
        }),
        Scope::Global => {
            let result = FarmPreference::delete_many()
                .filter(farm_preference::Column::FarmId.eq(farm_id))
                .filter(farm_preference::Column::CatalogItemId.eq(catalog_item_id))
                .exec(db)
                .await?;
            if result.rows_affected == 0 {
                return Err(Error::NotFound {
                    entity: "farm_preference",
                    id: catalog_item_id,
                });
            }
            info!(catalog_item_id, "Preference link removed");
            Ok(DeselectOutcome::LinkRemoved)
        }
    }
}

/// Pins or unpins an item in the farm's list.
pub async fn set_favorite(
    db: &DatabaseConnection,
    farm_id: &str,
    catalog_item_id: i64,
    is_favorite: bool,
) -> Result<farm_preference::Model> {
    let link = ensure_link(db, farm_id, catalog_item_id).await?;
    let mut model: farm_preference::ActiveModel = link.into();
    model.is_favorite = Set(is_favorite);
    model.update(db).await.map_err(Into::into)
}

/// Rewrites the farm's display order to follow `ordered_item_ids`.
///
/// Items not mentioned keep their current position value.
pub async fn reorder(
    db: &DatabaseConnection,
    farm_id: &str,
    ordered_item_ids: &[i64],
) -> Result<Vec<farm_preference::Model>> {
    let txn = db.begin().await?;
    let mut updated = Vec::with_capacity(ordered_item_ids.len());
    for (position, item_id) in (1..).zip(ordered_item_ids) {
        let link = ensure_link(&txn, farm_id, *item_id).await?;
        let mut model: farm_preference::ActiveModel = link.into();
        model.display_order = Set(position);
        updated.push(model.update(&txn).await?);
    }
    txn.commit().await?;
    Ok(updated)
}

/// Counts one more use of an item by the farm.
///
/// The increment is a single `usage_count = usage_count + 1` statement. Global
/// items the farm has not selected are not counted and yield `None`.
pub async fn record_usage(
    db: &DatabaseConnection,
    farm_id: &str,
    catalog_item_id: i64,
) -> Result<Option<farm_preference::Model>> {
    use sea_orm::sea_query::Expr;

    let link = match ensure_link(db, farm_id, catalog_item_id).await {
        Ok(link) => link,
        Err(Error::NotFound {
            entity: "farm_preference",
            ..
        }) => {
            debug!(catalog_item_id, "Usage not counted for unselected item");
            return Ok(None);
        }
        Err(e) => return Err(e),
    };

    FarmPreference::update_many()
        .col_expr(
            farm_preference::Column::UsageCount,
            Expr::col(farm_preference::Column::UsageCount).add(1),
        )
        .filter(farm_preference::Column::Id.eq(link.id))
        .exec(db)
        .await?;

    FarmPreference::find_by_id(link.id)
        .one(db)
        .await
        .map_err(Into::into)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::core::{catalog::LocalExtras, version::CatalogPatch};
    use crate::entities::CatalogKind;
    use crate::test_utils::*;

    #[tokio::test]
    async fn test_select_is_idempotent() -> Result<()> {
        let db = setup_test_db().await?;
        let vaccine = create_global(&db, CatalogKind::Vaccine, "FMD").await?;

        let first = select(&db, "farm-a", vaccine.id).await?;
        assert!(matches!(
            first,
            SelectOutcome::Selected(ref link) if link.catalog_item_id == vaccine.id
        ));
        assert_eq!(select(&db, "farm-a", vaccine.id).await?, SelectOutcome::AlreadySelected);
        assert_eq!(links_for_farm(&db, "farm-a").await?.len(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_reselect_after_deactivation_is_a_no_op() -> Result<()> {
        let db = setup_test_db().await?;
        let vaccine = create_global(&db, CatalogKind::Vaccine, "FMD").await?;
        select(&db, "farm-a", vaccine.id).await?;
        let before = links_for_farm(&db, "farm-a").await?;

        let patch = CatalogPatch {
            is_active: Some(false),
            ..Default::default()
        };
        catalog::update(&db, &Actor::Operator, vaccine.id, patch, vaccine.version).await?;

        assert_eq!(
            select(&db, "farm-a", vaccine.id).await?,
            SelectOutcome::AlreadySelected
        );
        assert_eq!(links_for_farm(&db, "farm-a").await?, before);
        Ok(())
    }

    #[tokio::test]
    async fn test_select_appends_to_display_order() -> Result<()> {
        let db = setup_test_db().await?;
        let a = create_global(&db, CatalogKind::Product, "A").await?;
        let b = create_global(&db, CatalogKind::Product, "B").await?;
        select(&db, "farm-a", a.id).await?;
        select(&db, "farm-a", b.id).await?;

        let links = links_for_farm(&db, "farm-a").await?;
        let orders: Vec<i32> = links.iter().map(|link| link.display_order).collect();
        assert_eq!(orders, vec![1, 2]);
        Ok(())
    }

    #[tokio::test]
    async fn test_select_rejects_inactive_and_foreign_items() -> Result<()> {
        let db = setup_test_db().await?;
        let item = create_global(&db, CatalogKind::Vaccine, "OLD").await?;
        let patch = CatalogPatch {
            is_active: Some(false),
            ..Default::default()
        };
        catalog::update(&db, &Actor::Operator, item.id, patch, 1).await?;
        let err = select(&db, "farm-a", item.id).await.unwrap_err();
        assert!(matches!(err, Error::Validation { .. }));

        let foreign = catalog::create_local(
            &db,
            "farm-b",
            CatalogKind::Vaccine,
            "Maison",
            LocalExtras::default(),
        )
        .await?;
        let err = select(&db, "farm-a", foreign.id).await.unwrap_err();
        assert!(matches!(err, Error::NotFound { .. }));
        Ok(())
    }

    #[tokio::test]
    async fn test_deselect_global_removes_only_the_link() -> Result<()> {
        let db = setup_test_db().await?;
        let item = create_global(&db, CatalogKind::Species, "BOV").await?;
        select(&db, "farm-a", item.id).await?;

        assert_eq!(deselect(&db, "farm-a", item.id).await?, DeselectOutcome::LinkRemoved);
        let still_there = catalog::get_by_id(&db, &Actor::Operator, item.id).await?;
        assert!(!still_there.item.is_deleted());

        let err = deselect(&db, "farm-a", item.id).await.unwrap_err();
        assert!(matches!(err, Error::NotFound { entity: "farm_preference", .. }));
        Ok(())
    }

    #[tokio::test]
    async fn test_deselect_local_archives_the_item() -> Result<()> {
        let db = setup_test_db().await?;
        let local = catalog::create_local(
            &db,
            "farm-a",
            CatalogKind::Product,
            "Mélange maison",
            LocalExtras::default(),
        )
        .await?;
        assert_eq!(select(&db, "farm-a", local.id).await?, SelectOutcome::AlreadySelected);

        let outcome = deselect(&db, "farm-a", local.id).await?;
        assert!(matches!(outcome, DeselectOutcome::LocalArchived(ref item) if item.is_deleted()));

        let restored = catalog::restore(&db, &Actor::Farm("farm-a".to_string()), local.id).await?;
        assert!(!restored.is_deleted());
        Ok(())
    }

    #[tokio::test]
    async fn test_usage_is_counted_per_farm() -> Result<()> {
        let db = setup_test_db().await?;
        let item = create_global(&db, CatalogKind::Product, "IVER").await?;
        select(&db, "farm-a", item.id).await?;
        select(&db, "farm-b", item.id).await?;

        record_usage(&db, "farm-a", item.id).await?;
        let link = record_usage(&db, "farm-a", item.id).await?.unwrap();
        assert_eq!(link.usage_count, 2);
        assert_eq!(find_link(&db, "farm-b", item.id).await?.unwrap().usage_count, 0);

        // Unselected global items are not counted.
        let other = create_global(&db, CatalogKind::Product, "OXY").await?;
        assert!(record_usage(&db, "farm-a", other.id).await?.is_none());
        Ok(())
    }

    #[tokio::test]
    async fn test_local_items_get_a_link_on_first_use() -> Result<()> {
        let db = setup_test_db().await?;
        let local = catalog::create_local(
            &db,
            "farm-a",
            CatalogKind::Product,
            "Tisane",
            LocalExtras::default(),
        )
        .await?;

        let link = record_usage(&db, "farm-a", local.id).await?.unwrap();
        assert_eq!(link.usage_count, 1);

        let favorite = set_favorite(&db, "farm-a", local.id, true).await?;
        assert_eq!(favorite.id, link.id);
        assert!(favorite.is_favorite);
        Ok(())
    }

    #[tokio::test]
    async fn test_reorder_rewrites_positions() -> Result<()> {
        let db = setup_test_db().await?;
        let a = create_global(&db, CatalogKind::Species, "A").await?;
        let b = create_global(&db, CatalogKind::Species, "B").await?;
        select(&db, "farm-a", a.id).await?;
        select(&db, "farm-a", b.id).await?;

        reorder(&db, "farm-a", &[b.id, a.id]).await?;
        let links = links_for_farm(&db, "farm-a").await?;
        let order: Vec<i64> = links.iter().map(|link| link.catalog_item_id).collect();
        assert_eq!(order, vec![b.id, a.id]);

        let unselected = create_global(&db, CatalogKind::Species, "C").await?;
        let err = reorder(&db, "farm-a", &[unselected.id]).await.unwrap_err();
        assert!(matches!(err, Error::NotFound { .. }));
        Ok(())
    }
}
