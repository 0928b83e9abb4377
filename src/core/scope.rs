//! Scope resolution - Decides who may see and mutate a catalog item.
//!
//! Scope is derived once, from provenance (`farm_id`), and travels with the item
//! as a [`ScopedItem`]. Nothing else in the crate inspects `farm_id` to decide
//! ownership.

use crate::{
    entities::{CatalogItemColumn, catalog_item},
    errors::{Error, Result},
};
use sea_orm::{ColumnTrait, Condition};
use serde::{Deserialize, Serialize};

/// Ownership of a catalog item.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Scope {
    /// Operator-owned, visible to every farm
    Global,
    /// Private to a single farm
    Local {
        /// Owning farm
        farm_id: String,
    },
}

impl Scope {
    /// Whether the item is shared by every farm.
    #[must_use]
    pub const fn is_global(&self) -> bool {
        matches!(self, Self::Global)
    }

    /// Whether the item is local to `farm_id`.
    #[must_use]
    pub fn is_owned_by(&self, farm_id: &str) -> bool {
        matches!(self, Self::Local { farm_id: owner } if owner == farm_id)
    }
}

/// Classifies an item from its provenance fields.
#[must_use]
pub fn classify(item: &catalog_item::Model) -> Scope {
    item.farm_id
        .as_ref()
        .map_or(Scope::Global, |farm_id| Scope::Local {
            farm_id: farm_id.clone(),
        })
}

/// Who is issuing a request.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Actor {
    /// Platform operator administering the global catalog
    Operator,
    /// A farm working with its own view of the catalog
    Farm(String),
}

impl Actor {
    /// The farm behind this actor, if any.
    #[must_use]
    pub fn farm_id(&self) -> Option<&str> {
        match self {
            Self::Operator => None,
            Self::Farm(farm_id) => Some(farm_id),
        }
    }
}

/// Operations gated by scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CatalogOperation {
    /// Fetch the item
    Read,
    /// Create a new item
    Create,
    /// Patch an existing item
    Update,
    /// Soft or hard delete
    Delete,
    /// Undo a soft delete
    Restore,
    /// Point a preference or dependent row at the item
    Reference,
}

impl CatalogOperation {
    const fn is_mutation(self) -> bool {
        !matches!(self, Self::Read | Self::Reference)
    }
}

/// Whether `actor` can see an item of `scope` at all.
#[must_use]
pub fn is_visible_to(actor: &Actor, scope: &Scope) -> bool {
    match (actor, scope) {
        (_, Scope::Global) | (Actor::Operator, Scope::Local { .. }) => true,
        (Actor::Farm(farm_id), Scope::Local { .. }) => scope.is_owned_by(farm_id),
    }
}

/// Checks that `actor` may perform `operation` on an item of `scope`.
///
/// Another farm's local item is reported as not found rather than forbidden so
/// its existence does not leak.
pub fn authorize(actor: &Actor, scope: &Scope, operation: CatalogOperation, id: i64) -> Result<()> {
    if !is_visible_to(actor, scope) {
        return Err(Error::NotFound {
            entity: "catalog_item",
            id,
        });
    }

    match (actor, scope) {
        (Actor::Farm(_), Scope::Global) if operation.is_mutation() => Err(Error::ScopeViolation {
            message: format!("farms cannot {operation:?} global catalog item {id}"),
        }),
        (Actor::Operator, Scope::Local { .. }) if operation != CatalogOperation::Read => {
            Err(Error::ScopeViolation {
                message: format!("operator cannot {operation:?} local catalog item {id}"),
            })
        }
        _ => Ok(()),
    }
}

/// The scope an actor's create request lands in.
#[must_use]
pub fn scope_for_new_item(actor: &Actor) -> Scope {
    match actor {
        Actor::Operator => Scope::Global,
        Actor::Farm(farm_id) => Scope::Local {
            farm_id: farm_id.clone(),
        },
    }
}

/// Which slice of the catalog a listing returns.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ScopeFilter {
    /// All global items plus the caller's own local items
    #[default]
    Visible,
    /// Global items only, used when curating preferences
    GlobalOnly,
    /// The caller's local items (every local item for the operator)
    LocalOnly,
}

/// Builds the query condition for `filter` as seen by `actor`.
#[must_use]
pub fn condition(actor: &Actor, filter: ScopeFilter) -> Condition {
    let global = CatalogItemColumn::FarmId.is_null();
    match (filter, actor.farm_id()) {
        (ScopeFilter::GlobalOnly, _) => Condition::all().add(global),
        (ScopeFilter::Visible, None) => Condition::all(),
        (ScopeFilter::Visible, Some(farm_id)) => Condition::any()
            .add(global)
            .add(CatalogItemColumn::FarmId.eq(farm_id)),
        (ScopeFilter::LocalOnly, None) => {
            Condition::all().add(CatalogItemColumn::FarmId.is_not_null())
        }
        (ScopeFilter::LocalOnly, Some(farm_id)) => {
            Condition::all().add(CatalogItemColumn::FarmId.eq(farm_id))
        }
    }
}

/// A catalog item tagged with its scope at fetch time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScopedItem {
    /// Ownership of the item
    pub scope: Scope,
    /// The stored row
    pub item: catalog_item::Model,
}

impl ScopedItem {
    /// Item id.
    #[must_use]
    pub const fn id(&self) -> i64 {
        self.item.id
    }
}

impl From<catalog_item::Model> for ScopedItem {
    fn from(item: catalog_item::Model) -> Self {
        Self {
            scope: classify(&item),
            item,
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::test_utils::sample_item;

    #[test]
    fn test_classify_uses_farm_id_only() {
        let global = sample_item(1, "HOL", None);
        let local = sample_item(2, "global-looking-code", Some("farm-a"));

        assert_eq!(classify(&global), Scope::Global);
        assert_eq!(
            classify(&local),
            Scope::Local {
                farm_id: "farm-a".to_string()
            }
        );
    }

    #[test]
    fn test_farm_may_only_read_and_reference_globals() {
        let farm = Actor::Farm("farm-a".to_string());
        assert!(authorize(&farm, &Scope::Global, CatalogOperation::Read, 1).is_ok());
        assert!(authorize(&farm, &Scope::Global, CatalogOperation::Reference, 1).is_ok());
        for op in [
            CatalogOperation::Create,
            CatalogOperation::Update,
            CatalogOperation::Delete,
            CatalogOperation::Restore,
        ] {
            assert!(matches!(
                authorize(&farm, &Scope::Global, op, 1).unwrap_err(),
                Error::ScopeViolation { .. }
            ));
        }
    }

    #[test]
    fn test_local_items_belong_to_their_farm() {
        let scope = Scope::Local {
            farm_id: "farm-a".to_string(),
        };
        let owner = Actor::Farm("farm-a".to_string());
        let other = Actor::Farm("farm-b".to_string());

        assert!(authorize(&owner, &scope, CatalogOperation::Update, 5).is_ok());
        assert!(authorize(&owner, &scope, CatalogOperation::Delete, 5).is_ok());
        assert!(matches!(
            authorize(&other, &scope, CatalogOperation::Read, 5).unwrap_err(),
            Error::NotFound { id: 5, .. }
        ));
        assert!(authorize(&Actor::Operator, &scope, CatalogOperation::Read, 5).is_ok());
        assert!(matches!(
            authorize(&Actor::Operator, &scope, CatalogOperation::Update, 5).unwrap_err(),
            Error::ScopeViolation { .. }
        ));
    }

    #[test]
    fn test_new_items_take_the_actor_scope() {
        assert_eq!(scope_for_new_item(&Actor::Operator), Scope::Global);
        assert!(scope_for_new_item(&Actor::Farm("f".to_string())).is_owned_by("f"));
    }
}
