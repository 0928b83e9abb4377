//! Junction link business logic - Many-to-many associations between catalog kinds.
//!
//! Pairs move between three states: unlinked (no row), active and inactive.
//! Deactivation only flips `is_active` so the pair stays queryable; removing the
//! row is a separate unlink that is refused while dependent records point at it.

use crate::{
    core::{catalog, dependency, scope::{self, Actor}},
    entities::{CatalogKind, JunctionLink, JunctionRelation, catalog_item, junction_link},
    errors::{Error, Result, is_unique_violation},
};
use sea_orm::{QueryOrder, Set, TransactionTrait, prelude::*};
use std::collections::BTreeMap;
use tracing::{info, instrument};

/// Dependency key reported when an unlink is refused.
pub const CATALOG_REFERENCES: &str = "catalog_references";

fn require_operator(actor: &Actor) -> Result<()> {
    match actor {
        Actor::Operator => Ok(()),
        Actor::Farm(farm_id) => Err(Error::ScopeViolation {
            message: format!("farm {farm_id} cannot change catalog associations"),
        }),
    }
}

async fn load_side(
    db: &DatabaseConnection,
    id: i64,
    expected: CatalogKind,
    field: &str,
) -> Result<catalog_item::Model> {
    let item = catalog::find_model(db, id).await?;
    if item.is_deleted() {
        return Err(Error::NotFound {
            entity: "catalog_item",
            id,
        });
    }
    if item.kind != expected {
        return Err(Error::validation(
            field,
            format!("expected a {expected:?} item, got {:?}", item.kind),
        ));
    }
    if !scope::classify(&item).is_global() {
        return Err(Error::validation(field, "only global items can be associated"));
    }
    Ok(item)
}

/// Fetches a link by id.
pub async fn get(db: &DatabaseConnection, id: i64) -> Result<junction_link::Model> {
    find(db, id).await
}

async fn find<C: ConnectionTrait>(db: &C, id: i64) -> Result<junction_link::Model> {
    JunctionLink::find_by_id(id)
        .one(db)
        .await?
        .ok_or(Error::NotFound {
            entity: "junction_link",
            id,
        })
}

/// Finds the link for a pair, active or not.
pub async fn find_pair(
    db: &DatabaseConnection,
    relation: JunctionRelation,
    left_id: i64,
    right_id: i64,
) -> Result<Option<junction_link::Model>> {
    JunctionLink::find()
        .filter(junction_link::Column::Relation.eq(relation))
        .filter(junction_link::Column::LeftId.eq(left_id))
        .filter(junction_link::Column::RightId.eq(right_id))
        .one(db)
        .await
        .map_err(Into::into)
}

/// Creates an active association between two global items.
///
/// # Errors
/// Returns [`Error::DuplicateLink`] when the pair already exists, detected by the
/// unique index. Callers should re-fetch the pair rather than retry.
#[instrument(skip(db))]
pub async fn link(
    db: &DatabaseConnection,
    actor: &Actor,
    relation: JunctionRelation,
    left_id: i64,
    right_id: i64,
) -> Result<junction_link::Model> {
    require_operator(actor)?;
    load_side(db, left_id, relation.left_kind(), "left_id").await?;
    load_side(db, right_id, relation.right_kind(), "right_id").await?;

    let now = chrono::Utc::now();
    let model = junction_link::ActiveModel {
        relation: Set(relation),
        left_id: Set(left_id),
        right_id: Set(right_id),
        is_active: Set(true),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    };
    let created = model.insert(db).await.map_err(|e| {
        if is_unique_violation(&e) {
            Error::DuplicateLink {
                relation: format!("{relation:?}"),
                left_id,
                right_id,
            }
        } else {
            Error::from(e)
        }
    })?;
    info!(id = created.id, "Junction link created");
    Ok(created)
}

/// Sets the activation flag of a link.
pub async fn set_active(
    db: &DatabaseConnection,
    actor: &Actor,
    id: i64,
    is_active: bool,
) -> Result<junction_link::Model> {
    require_operator(actor)?;
    let current = find(db, id).await?;
    if current.is_active == is_active {
        return Ok(current);
    }
    let mut model: junction_link::ActiveModel = current.into();
    model.is_active = Set(is_active);
    model.updated_at = Set(chrono::Utc::now());
    let updated = model.update(db).await?;
    info!(id, is_active, "Junction link toggled");
    Ok(updated)
}

/// Flips the activation flag of a link.
pub async fn toggle(
    db: &DatabaseConnection,
    actor: &Actor,
    id: i64,
) -> Result<junction_link::Model> {
    let current = find(db, id).await?;
    set_active(db, actor, id, !current.is_active).await
}

/// Removes a link row.
///
/// # Errors
/// Returns [`Error::HasDependencies`] while dependent records reference the pair;
/// deactivate it instead.
#[instrument(skip(db))]
pub async fn unlink(db: &DatabaseConnection, actor: &Actor, id: i64) -> Result<()> {
    require_operator(actor)?;
    let txn = db.begin().await?;
    find(&txn, id).await?;

    let dependents = dependency::count_for_link(&txn, id).await?;
    if dependents > 0 {
        return Err(Error::HasDependencies {
            entity: "junction_link",
            id,
            dependents: BTreeMap::from([(CATALOG_REFERENCES.to_string(), dependents)]),
        });
    }

    JunctionLink::delete_by_id(id).exec(&txn).await?;
    txn.commit().await?;
    info!(id, "Junction link removed");
    Ok(())
}

/// Removes the link of a pair. See [`unlink`].
pub async fn unlink_pair(
    db: &DatabaseConnection,
    actor: &Actor,
    relation: JunctionRelation,
    left_id: i64,
    right_id: i64,
) -> Result<()> {
    let link = find_pair(db, relation, left_id, right_id)
        .await?
        .ok_or(Error::NotFound {
            entity: "junction_link",
            id: left_id,
        })?;
    unlink(db, actor, link.id).await
}

/// Links of `relation` whose left side is `left_id`.
pub async fn links_for_left(
    db: &DatabaseConnection,
    relation: JunctionRelation,
    left_id: i64,
    active_only: bool,
) -> Result<Vec<junction_link::Model>> {
    let mut query = JunctionLink::find()
        .filter(junction_link::Column::Relation.eq(relation))
        .filter(junction_link::Column::LeftId.eq(left_id));
    if active_only {
        query = query.filter(junction_link::Column::IsActive.eq(true));
    }
    query
        .order_by_asc(junction_link::Column::RightId)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Links of `relation` whose right side is `right_id`.
pub async fn links_for_right(
    db: &DatabaseConnection,
    relation: JunctionRelation,
    right_id: i64,
    active_only: bool,
) -> Result<Vec<junction_link::Model>> {
    let mut query = JunctionLink::find()
        .filter(junction_link::Column::Relation.eq(relation))
        .filter(junction_link::Column::RightId.eq(right_id));
    if active_only {
        query = query.filter(junction_link::Column::IsActive.eq(true));
    }
    query
        .order_by_asc(junction_link::Column::LeftId)
        .all(db)
        .await
        .map_err(Into::into)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::core::catalog::LocalExtras;
    use crate::test_utils::*;

    async fn breed_and_country(db: &DatabaseConnection) -> Result<(i64, i64)> {
        let breed = create_global(db, CatalogKind::Breed, "HOL").await?;
        let country = create_global(db, CatalogKind::Country, "DZ").await?;
        Ok((breed.id, country.id))
    }

    #[tokio::test]
    async fn test_link_twice_is_a_duplicate() -> Result<()> {
        let db = setup_test_db().await?;
        let (breed, country) = breed_and_country(&db).await?;

        let created =
            link(&db, &Actor::Operator, JunctionRelation::BreedCountry, breed, country).await?;
        assert!(created.is_active);

        let err = link(&db, &Actor::Operator, JunctionRelation::BreedCountry, breed, country)
            .await
            .unwrap_err();
        let Error::DuplicateLink { left_id, right_id, .. } = err else {
            panic!("expected DuplicateLink, got {err:?}");
        };
        assert_eq!((left_id, right_id), (breed, country));
        Ok(())
    }

    #[tokio::test]
    async fn test_toggle_then_unlink_removes_the_row() -> Result<()> {
        let db = setup_test_db().await?;
        let (breed, country) = breed_and_country(&db).await?;
        let created =
            link(&db, &Actor::Operator, JunctionRelation::BreedCountry, breed, country).await?;

        let inactive = toggle(&db, &Actor::Operator, created.id).await?;
        assert!(!inactive.is_active);
        let active_only = links_for_left(&db, JunctionRelation::BreedCountry, breed, true).await?;
        assert!(active_only.is_empty());
        let all = links_for_left(&db, JunctionRelation::BreedCountry, breed, false).await?;
        assert_eq!(all.len(), 1);

        let active = toggle(&db, &Actor::Operator, created.id).await?;
        assert!(active.is_active);
        toggle(&db, &Actor::Operator, created.id).await?;

        unlink(&db, &Actor::Operator, created.id).await?;
        assert!(find_pair(&db, JunctionRelation::BreedCountry, breed, country).await?.is_none());

        // The pair can be linked again once removed.
        link(&db, &Actor::Operator, JunctionRelation::BreedCountry, breed, country).await?;
        Ok(())
    }

    #[tokio::test]
    async fn test_unlink_with_dependents_is_refused() -> Result<()> {
        let db = setup_test_db().await?;
        let (breed, country) = breed_and_country(&db).await?;
        let created =
            link(&db, &Actor::Operator, JunctionRelation::BreedCountry, breed, country).await?;
        dependency::add_reference(&db, breed, Some(created.id), "animal", "FR1234").await?;

        let err = unlink_pair(&db, &Actor::Operator, JunctionRelation::BreedCountry, breed, country)
            .await
            .unwrap_err();
        match err {
            Error::HasDependencies { dependents, .. } => {
                assert_eq!(dependents[CATALOG_REFERENCES], 1);
            }
            other => panic!("unexpected error: {other}"),
        }

        // Deactivation stays available.
        assert!(!set_active(&db, &Actor::Operator, created.id, false).await?.is_active);
        assert!(get(&db, created.id).await.is_ok());
        Ok(())
    }

    #[tokio::test]
    async fn test_link_validates_sides() -> Result<()> {
        let db = setup_test_db().await?;
        let (breed, country) = breed_and_country(&db).await?;

        let err = link(&db, &Actor::Operator, JunctionRelation::BreedCountry, country, breed)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Validation { ref field, .. } if field == "left_id"));

        let local = catalog::create_local(
            &db,
            "farm-a",
            CatalogKind::Country,
            "Zone nord",
            LocalExtras::default(),
        )
        .await?;
        let err = link(&db, &Actor::Operator, JunctionRelation::BreedCountry, breed, local.id)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Validation { ref field, .. } if field == "right_id"));

        let farm = Actor::Farm("farm-a".to_string());
        let err = link(&db, &farm, JunctionRelation::BreedCountry, breed, country)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::ScopeViolation { .. }));

        let species = create_global(&db, CatalogKind::Species, "BOV").await?;
        let vaccine = create_global(&db, CatalogKind::Vaccine, "FMD").await?;
        let relation = JunctionRelation::VaccineSpecies;
        let created = link(&db, &Actor::Operator, relation, vaccine.id, species.id).await?;
        let by_species = links_for_right(&db, relation, species.id, true).await?;
        assert_eq!(by_species, vec![created]);
        Ok(())
    }
}
