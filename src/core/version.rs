//! Optimistic concurrency guard for shared catalog rows.
//!
//! Every update carries the version read at load time. The write is a
//! compare-and-set on `(id, version)` inside a database transaction, so either
//! the whole patch lands together with `version + 1` or nothing changes.

use crate::{
    core::scope::{self, Actor, CatalogOperation},
    entities::{CatalogItem, catalog_item},
    errors::{Error, Result, is_unique_violation},
};
use sea_orm::{Set, TransactionTrait, prelude::*};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};

/// Partial update of a catalog item. Scope (`farm_id`) and `kind` are not patchable.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogPatch {
    /// New business code
    pub code: Option<String>,
    /// New French label
    pub name_fr: Option<String>,
    /// New English label
    pub name_en: Option<String>,
    /// New Arabic label
    pub name_ar: Option<String>,
    /// New description; `Some(None)` clears it
    pub description: Option<Option<String>>,
    /// New region; `Some(None)` clears it
    pub region: Option<Option<String>>,
    /// New activation flag
    pub is_active: Option<bool>,
    /// New ordering hint; `Some(None)` clears it
    pub display_order: Option<Option<i32>>,
}

impl CatalogPatch {
    /// Whether the patch changes nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }

    /// Checks the patch against the row it will be applied to.
    pub fn validate(&self, current: &catalog_item::Model) -> Result<()> {
        if self.is_empty() {
            return Err(Error::validation("patch", "patch does not change any field"));
        }
        if let Some(code) = &self.code {
            validate_code(code)?;
        }
        let names = [
            self.name_fr.as_deref().unwrap_or(&current.name_fr),
            self.name_en.as_deref().unwrap_or(&current.name_en),
            self.name_ar.as_deref().unwrap_or(&current.name_ar),
        ];
        if names.iter().all(|name| name.trim().is_empty()) {
            return Err(Error::validation("name", "at least one localized name is required"));
        }
        Ok(())
    }

    fn into_active_model(self, next_version: i32) -> catalog_item::ActiveModel {
        let mut model = catalog_item::ActiveModel {
            version: Set(next_version),
            updated_at: Set(chrono::Utc::now()),
            ..Default::default()
        };
        if let Some(code) = self.code {
            model.code = Set(code.trim().to_string());
        }
        if let Some(name) = self.name_fr {
            model.name_fr = Set(name.trim().to_string());
        }
        if let Some(name) = self.name_en {
            model.name_en = Set(name.trim().to_string());
        }
        if let Some(name) = self.name_ar {
            model.name_ar = Set(name.trim().to_string());
        }
        if let Some(description) = self.description {
            model.description = Set(description);
        }
        if let Some(region) = self.region {
            model.region = Set(region);
        }
        if let Some(is_active) = self.is_active {
            model.is_active = Set(is_active);
        }
        if let Some(display_order) = self.display_order {
            model.display_order = Set(display_order);
        }
        model
    }
}

/// Validates a business code.
pub(crate) fn validate_code(code: &str) -> Result<()> {
    let code = code.trim();
    if code.is_empty() {
        return Err(Error::validation("code", "code cannot be empty"));
    }
    if code.chars().count() > 64 {
        return Err(Error::validation("code", "code cannot exceed 64 characters"));
    }
    Ok(())
}

pub(crate) fn duplicate_code(code: &str) -> Error {
    Error::validation("code", format!("code {} is already in use", code.trim()))
}

/// Applies `patch` to item `id` if its stored version still equals `expected`.
///
/// # Errors
/// - [`Error::NotFound`] if the item does not exist, is invisible to `actor`
///   or is soft-deleted
/// - [`Error::ScopeViolation`] if `actor` may not update it
/// - [`Error::Validation`] if the patch is empty or malformed, or the new code is taken
/// - [`Error::VersionConflict`] if `expected` is stale
#[instrument(skip(db, patch))]
pub async fn apply_versioned(
    db: &DatabaseConnection,
    actor: &Actor,
    id: i64,
    expected: i32,
    patch: CatalogPatch,
) -> Result<catalog_item::Model> {
    let txn = db.begin().await?;

    let current = CatalogItem::find_by_id(id)
        .one(&txn)
        .await?
        .ok_or(Error::NotFound {
            entity: "catalog_item",
            id,
        })?;
    scope::authorize(actor, &scope::classify(&current), CatalogOperation::Update, id)?;
    if current.is_deleted() {
        return Err(Error::NotFound {
            entity: "catalog_item",
            id,
        });
    }

    if current.version != expected {
        warn!(
            id,
            expected,
            actual = current.version,
            "Rejecting update with stale version"
        );
        return Err(Error::VersionConflict {
            id,
            expected,
            actual: current.version,
        });
    }

    patch.validate(&current)?;
    if let Some(code) = &patch.code {
        let taken = CatalogItem::find()
            .filter(catalog_item::Column::Kind.eq(current.kind))
            .filter(catalog_item::Column::Code.eq(code.trim()))
            .filter(catalog_item::Column::Id.ne(id))
            .one(&txn)
            .await?;
        if taken.is_some() {
            return Err(duplicate_code(code));
        }
    }

    let new_code = patch.code.clone();
    let result = CatalogItem::update_many()
        .set(patch.into_active_model(expected + 1))
        .filter(catalog_item::Column::Id.eq(id))
        .filter(catalog_item::Column::Version.eq(expected))
        .exec(&txn)
        .await
        .map_err(|e| match &new_code {
            Some(code) if is_unique_violation(&e) => duplicate_code(code),
            _ => Error::from(e),
        })?;

    if result.rows_affected == 0 {
        // Lost the race between the read above and the write.
        let actual = CatalogItem::find_by_id(id)
            .one(&txn)
            .await?
            .map_or(expected, |item| item.version);
        return Err(Error::VersionConflict {
            id,
            expected,
            actual,
        });
    }

    let updated = CatalogItem::find_by_id(id)
        .one(&txn)
        .await?
        .ok_or(Error::NotFound {
            entity: "catalog_item",
            id,
        })?;
    txn.commit().await?;

    debug!(id, version = updated.version, "Catalog item updated");
    Ok(updated)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::core::catalog;
    use crate::test_utils::*;

    fn rename(name: &str) -> CatalogPatch {
        CatalogPatch {
            name_en: Some(name.to_string()),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_update_increments_version_by_one() -> Result<()> {
        let db = setup_test_db().await?;
        let breed = create_global(&db, crate::entities::CatalogKind::Breed, "HOL").await?;
        assert_eq!(breed.version, 1);

        let updated =
            apply_versioned(&db, &Actor::Operator, breed.id, 1, rename("Holstein")).await?;
        assert_eq!(updated.version, 2);
        assert_eq!(updated.name_en, "Holstein");

        let renamed = rename("Holstein-Friesian");
        let updated = apply_versioned(&db, &Actor::Operator, breed.id, 2, renamed).await?;
        assert_eq!(updated.version, 3);
        Ok(())
    }

    #[tokio::test]
    async fn test_stale_version_conflicts_then_retry_succeeds() -> Result<()> {
        let db = setup_test_db().await?;
        let breed = create_global(&db, crate::entities::CatalogKind::Breed, "MTB").await?;
        for version in 1..4 {
            let renamed = rename(&format!("v{version}"));
            apply_versioned(&db, &Actor::Operator, breed.id, version, renamed).await?;
        }

        // Server is at version 4; a client still holding version 3 loses.
        let err = apply_versioned(&db, &Actor::Operator, breed.id, 3, rename("Montbéliarde"))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            Error::VersionConflict {
                expected: 3,
                actual: 4,
                ..
            }
        ));
        assert!(err.is_retryable());

        let fresh = catalog::get_by_id(&db, &Actor::Operator, breed.id).await?;
        assert_eq!(fresh.item.version, 4);
        assert_eq!(fresh.item.name_en, "v3");

        let updated =
            apply_versioned(&db, &Actor::Operator, breed.id, 4, rename("Montbéliarde")).await?;
        assert_eq!(updated.version, 5);
        assert_eq!(updated.name_en, "Montbéliarde");
        Ok(())
    }

    #[tokio::test]
    async fn test_rejected_patch_writes_nothing() -> Result<()> {
        let db = setup_test_db().await?;
        let kind = crate::entities::CatalogKind::Vaccine;
        let first = create_global(&db, kind, "FMD").await?;
        let second = create_global(&db, kind, "PPR").await?;

        let patch = CatalogPatch {
            code: Some("FMD".to_string()),
            name_en: Some("Renamed".to_string()),
            ..Default::default()
        };
        let err = apply_versioned(&db, &Actor::Operator, second.id, 1, patch)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Validation { ref field, .. } if field == "code"));

        let unchanged = catalog::get_by_id(&db, &Actor::Operator, second.id).await?;
        assert_eq!(unchanged.item.version, 1);
        assert_eq!(unchanged.item.code, "PPR");
        assert_eq!(unchanged.item.name_en, second.name_en);
        assert_eq!(first.code, "FMD");
        Ok(())
    }

    #[tokio::test]
    async fn test_empty_patch_is_a_validation_failure() -> Result<()> {
        let db = setup_test_db().await?;
        let item = create_global(&db, crate::entities::CatalogKind::Species, "BOV").await?;
        let err = apply_versioned(&db, &Actor::Operator, item.id, 1, CatalogPatch::default())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Validation { .. }));
        Ok(())
    }

    #[tokio::test]
    async fn test_farm_cannot_update_global_item() -> Result<()> {
        let db = setup_test_db().await?;
        let item = create_global(&db, crate::entities::CatalogKind::Species, "OVI").await?;
        let farm = Actor::Farm("farm-a".to_string());
        let err = apply_versioned(&db, &farm, item.id, 1, rename("Sheep"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::ScopeViolation { .. }));
        Ok(())
    }
}
