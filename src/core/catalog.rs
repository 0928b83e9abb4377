//! Catalog business logic - CRUD over reference data.
//!
//! This module is the storage side of the catalog transport: listing with scope and
//! search filters, lookups, creation of global and local items, versioned updates,
//! soft delete and restore, dependency counting and guarded hard deletion. All
//! functions are async and take the acting [`Actor`] so scope rules are applied
//! in one place.

use crate::{
    core::{
        dependency,
        locale::Locale,
        scope::{self, Actor, CatalogOperation, Scope, ScopeFilter, ScopedItem},
        search::SearchTerm,
        version::{self, CatalogPatch},
    },
    entities::{
        CatalogItem, CatalogKind, FarmPreference, JunctionLink, catalog_item, farm_preference,
        junction_link,
    },
    errors::{Error, Result, is_unique_violation},
};
use sea_orm::{Condition, Set, TransactionTrait, prelude::*};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use tracing::{debug, info, instrument};

/// Dependency key for farm preference links.
pub const FARM_PREFERENCES: &str = "farm_preferences";
/// Dependency key for junction links.
pub const JUNCTION_LINKS: &str = "junction_links";

/// Labels of a catalog item in every supported language.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalizedName {
    /// French label
    pub fr: String,
    /// English label
    pub en: String,
    /// Arabic label
    pub ar: String,
}

impl LocalizedName {
    /// Uses the same text for every language, as farms type a single name.
    #[must_use]
    pub fn uniform(name: &str) -> Self {
        let name = name.trim().to_string();
        Self {
            fr: name.clone(),
            en: name.clone(),
            ar: name,
        }
    }

    fn is_blank(&self) -> bool {
        [&self.fr, &self.en, &self.ar]
            .iter()
            .all(|name| name.trim().is_empty())
    }
}

/// Input for [`create`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewCatalogItem {
    /// Type of reference data
    pub kind: CatalogKind,
    /// Business code, unique within `kind`
    pub code: String,
    /// Labels
    pub name: LocalizedName,
    /// Free-text description
    pub description: Option<String>,
    /// Region or origin
    pub region: Option<String>,
    /// Activation flag; forced to true for local items
    pub is_active: bool,
    /// Ordering hint
    pub display_order: Option<i32>,
}

impl NewCatalogItem {
    /// Creates an active item with no description, region or ordering.
    #[must_use]
    pub fn new(kind: CatalogKind, code: &str, name: LocalizedName) -> Self {
        Self {
            kind,
            code: code.to_string(),
            name,
            description: None,
            region: None,
            is_active: true,
            display_order: None,
        }
    }

    fn validate(&self) -> Result<()> {
        version::validate_code(&self.code)?;
        if self.name.is_blank() {
            return Err(Error::validation("name", "at least one localized name is required"));
        }
        Ok(())
    }
}

/// Optional fields a farm may fill in when creating a local item inline.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalExtras {
    /// Explicit code; generated from the farm and the name when absent
    pub code: Option<String>,
    /// Free-text description
    pub description: Option<String>,
    /// Region or origin
    pub region: Option<String>,
}

/// Filters accepted by [`list`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListParams {
    /// Type of reference data
    pub kind: CatalogKind,
    /// Which slice of the catalog to return
    pub scope: ScopeFilter,
    /// Skip items with `is_active = false`
    pub active_only: bool,
    /// Include soft-deleted items
    pub include_deleted: bool,
    /// Text filter over code, names and region
    pub search: SearchTerm,
    /// Number of matching items to skip
    pub offset: usize,
    /// Maximum number of items to return
    pub limit: Option<usize>,
}

impl ListParams {
    /// Default read view: all global items plus the caller's local ones, deleted excluded.
    #[must_use]
    pub fn new(kind: CatalogKind) -> Self {
        Self {
            kind,
            scope: ScopeFilter::Visible,
            active_only: false,
            include_deleted: false,
            search: SearchTerm::default(),
            offset: 0,
            limit: None,
        }
    }

    /// Restricts the listing to a scope slice.
    #[must_use]
    pub const fn with_scope(mut self, scope: ScopeFilter) -> Self {
        self.scope = scope;
        self
    }

    /// Keeps only active items.
    #[must_use]
    pub const fn active_only(mut self) -> Self {
        self.active_only = true;
        self
    }

    /// Filters by search text.
    #[must_use]
    pub fn with_search(mut self, raw: &str) -> Self {
        self.search = SearchTerm::new(raw);
        self
    }

    /// Selects one page of results.
    #[must_use]
    pub const fn page(mut self, offset: usize, limit: usize) -> Self {
        self.offset = offset;
        self.limit = Some(limit);
        self
    }
}

/// One page of a listing and the total number of matching items.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page<T> {
    /// Items of the requested page
    pub data: Vec<T>,
    /// Matching items across all pages
    pub total: u64,
}

/// Label of `item` in `locale`, falling back to the other languages, then the code.
#[must_use]
pub fn display_name(item: &catalog_item::Model, locale: Locale) -> String {
    let preferred = match locale {
        Locale::Fr => &item.name_fr,
        Locale::En => &item.name_en,
        Locale::Ar => &item.name_ar,
    };
    [preferred, &item.name_fr, &item.name_en, &item.name_ar]
        .into_iter()
        .find(|name| !name.trim().is_empty())
        .unwrap_or(&item.code)
        .clone()
}

/// Catalog ordering: `display_order` ascending with unset values last, then code, then id.
pub(crate) fn catalog_order(a: &catalog_item::Model, b: &catalog_item::Model) -> Ordering {
    let rank = |item: &catalog_item::Model| item.display_order.unwrap_or(i32::MAX);
    rank(a)
        .cmp(&rank(b))
        .then_with(|| a.code.cmp(&b.code))
        .then_with(|| a.id.cmp(&b.id))
}

/// Lists catalog items visible to `actor`.
pub async fn list(
    db: &DatabaseConnection,
    actor: &Actor,
    params: &ListParams,
) -> Result<Page<ScopedItem>> {
    let mut condition = Condition::all()
        .add(catalog_item::Column::Kind.eq(params.kind))
        .add(scope::condition(actor, params.scope));
    if params.active_only {
        condition = condition.add(catalog_item::Column::IsActive.eq(true));
    }
    if !params.include_deleted {
        condition = condition.add(catalog_item::Column::DeletedAt.is_null());
    }

    let mut items: Vec<catalog_item::Model> = CatalogItem::find()
        .filter(condition)
        .all(db)
        .await?
        .into_iter()
        .filter(|item| params.search.matches_catalog_item(item))
        .collect();
    items.sort_by(catalog_order);

    let total = items.len() as u64;
    let data = items
        .into_iter()
        .skip(params.offset)
        .take(params.limit.unwrap_or(usize::MAX))
        .map(ScopedItem::from)
        .collect();
    Ok(Page { data, total })
}

/// Global, non-deleted items of `kind`, in catalog order.
pub(crate) async fn fetch_globals(
    db: &DatabaseConnection,
    kind: CatalogKind,
    active_only: bool,
) -> Result<Vec<catalog_item::Model>> {
    let mut query = CatalogItem::find()
        .filter(catalog_item::Column::Kind.eq(kind))
        .filter(catalog_item::Column::FarmId.is_null())
        .filter(catalog_item::Column::DeletedAt.is_null());
    if active_only {
        query = query.filter(catalog_item::Column::IsActive.eq(true));
    }
    let mut items = query.all(db).await?;
    items.sort_by(catalog_order);
    Ok(items)
}

/// Non-deleted local items of `kind` owned by `farm_id`.
pub(crate) async fn fetch_locals(
    db: &DatabaseConnection,
    farm_id: &str,
    kind: CatalogKind,
) -> Result<Vec<catalog_item::Model>> {
    let mut items = CatalogItem::find()
        .filter(catalog_item::Column::Kind.eq(kind))
        .filter(catalog_item::Column::FarmId.eq(farm_id))
        .filter(catalog_item::Column::DeletedAt.is_null())
        .all(db)
        .await?;
    items.sort_by(catalog_order);
    Ok(items)
}

/// Fetches an item by id, tagged with its scope.
///
/// Soft-deleted items are still returned so historic data can resolve them.
pub async fn get_by_id(db: &DatabaseConnection, actor: &Actor, id: i64) -> Result<ScopedItem> {
    let item = find_model(db, id).await?;
    let scoped = ScopedItem::from(item);
    scope::authorize(actor, &scoped.scope, CatalogOperation::Read, id)?;
    Ok(scoped)
}

/// Finds an item by its business code, soft-deleted or not.
pub async fn find_by_code(
    db: &DatabaseConnection,
    kind: CatalogKind,
    code: &str,
) -> Result<Option<catalog_item::Model>> {
    CatalogItem::find()
        .filter(catalog_item::Column::Kind.eq(kind))
        .filter(catalog_item::Column::Code.eq(code.trim()))
        .one(db)
        .await
        .map_err(Into::into)
}

pub(crate) async fn find_model<C: ConnectionTrait>(db: &C, id: i64) -> Result<catalog_item::Model> {
    CatalogItem::find_by_id(id)
        .one(db)
        .await?
        .ok_or(Error::NotFound {
            entity: "catalog_item",
            id,
        })
}

/// Creates a catalog item in the scope of `actor`.
///
/// Operators create global items; farms create local items, which always start active.
///
/// # Errors
/// Returns [`Error::Validation`] for a blank code or name, or a code already used
/// within the same kind.
#[instrument(skip(db, new_item), fields(kind = ?new_item.kind, code = %new_item.code))]
pub async fn create(
    db: &DatabaseConnection,
    actor: &Actor,
    new_item: NewCatalogItem,
) -> Result<catalog_item::Model> {
    new_item.validate()?;
    let scope = scope::scope_for_new_item(actor);
    let code = new_item.code.trim().to_string();

    if find_by_code(db, new_item.kind, &code).await?.is_some() {
        return Err(version::duplicate_code(&code));
    }

    let (farm_id, is_active) = match scope {
        Scope::Global => (None, new_item.is_active),
        Scope::Local { farm_id } => (Some(farm_id), true),
    };
    let now = chrono::Utc::now();
    let model = catalog_item::ActiveModel {
        kind: Set(new_item.kind),
        code: Set(code.clone()),
        name_fr: Set(new_item.name.fr.trim().to_string()),
        name_en: Set(new_item.name.en.trim().to_string()),
        name_ar: Set(new_item.name.ar.trim().to_string()),
        description: Set(new_item.description),
        region: Set(new_item.region),
        is_active: Set(is_active),
        display_order: Set(new_item.display_order),
        farm_id: Set(farm_id),
        version: Set(1),
        created_at: Set(now),
        updated_at: Set(now),
        deleted_at: Set(None),
        ..Default::default()
    };

    let created = model.insert(db).await.map_err(|e| {
        if is_unique_violation(&e) {
            version::duplicate_code(&code)
        } else {
            Error::from(e)
        }
    })?;
    info!(id = created.id, "Catalog item created");
    Ok(created)
}

/// Generates the code of a local item from its farm and typed name.
fn local_code(farm_id: &str, name: &str) -> Result<String> {
    let slug = name
        .split(|c: char| !c.is_alphanumeric())
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("_")
        .to_uppercase();
    if slug.is_empty() {
        return Err(Error::validation("name", "name must contain letters or digits"));
    }
    Ok(format!("{farm_id}:{slug}"))
}

/// Creates a farm-local item from a single typed name.
pub async fn create_local(
    db: &DatabaseConnection,
    farm_id: &str,
    kind: CatalogKind,
    name: &str,
    extras: LocalExtras,
) -> Result<catalog_item::Model> {
    if name.trim().is_empty() {
        return Err(Error::validation("name", "name cannot be empty"));
    }
    let code = match extras.code {
        Some(code) => code,
        None => local_code(farm_id, name)?,
    };
    let new_item = NewCatalogItem {
        description: extras.description,
        region: extras.region,
        ..NewCatalogItem::new(kind, &code, LocalizedName::uniform(name))
    };
    create(db, &Actor::Farm(farm_id.to_string()), new_item).await
}

/// Applies a versioned patch. See [`version::apply_versioned`].
pub async fn update(
    db: &DatabaseConnection,
    actor: &Actor,
    id: i64,
    patch: CatalogPatch,
    version: i32,
) -> Result<catalog_item::Model> {
    version::apply_versioned(db, actor, id, version, patch).await
}

/// Soft-deletes an item. Deleting an already deleted item returns it unchanged.
#[instrument(skip(db))]
pub async fn delete(
    db: &DatabaseConnection,
    actor: &Actor,
    id: i64,
) -> Result<catalog_item::Model> {
    set_deleted(db, actor, id, CatalogOperation::Delete).await
}

/// Clears the soft-delete marker. Restoring a live item returns it unchanged.
#[instrument(skip(db))]
pub async fn restore(
    db: &DatabaseConnection,
    actor: &Actor,
    id: i64,
) -> Result<catalog_item::Model> {
    set_deleted(db, actor, id, CatalogOperation::Restore).await
}

async fn set_deleted(
    db: &DatabaseConnection,
    actor: &Actor,
    id: i64,
    operation: CatalogOperation,
) -> Result<catalog_item::Model> {
    let txn = db.begin().await?;
    let current = find_model(&txn, id).await?;
    scope::authorize(actor, &scope::classify(&current), operation, id)?;

    let deleting = operation == CatalogOperation::Delete;
    if current.is_deleted() == deleting {
        debug!(id, ?operation, "Soft-delete state already as requested");
        return Ok(current);
    }

    let now = chrono::Utc::now();
    let next_version = current.version + 1;
    let mut model: catalog_item::ActiveModel = current.into();
    model.deleted_at = Set(deleting.then_some(now));
    model.updated_at = Set(now);
    model.version = Set(next_version);
    let updated = model.update(&txn).await?;
    txn.commit().await?;

    info!(id, ?operation, "Catalog item soft-delete state changed");
    Ok(updated)
}

/// Counts the rows that depend on an item, keyed by source.
///
/// Always contains [`FARM_PREFERENCES`] and [`JUNCTION_LINKS`]; dependent record
/// sources appear only when they reference the item.
pub async fn check_dependencies<C: ConnectionTrait>(
    db: &C,
    id: i64,
) -> Result<BTreeMap<String, u64>> {
    let preferences = FarmPreference::find()
        .filter(farm_preference::Column::CatalogItemId.eq(id))
        .count(db)
        .await?;
    let links = JunctionLink::find()
        .filter(
            Condition::any()
                .add(junction_link::Column::LeftId.eq(id))
                .add(junction_link::Column::RightId.eq(id)),
        )
        .count(db)
        .await?;

    let mut counts = dependency::count_for_item(db, id).await?;
    counts.insert(FARM_PREFERENCES.to_string(), preferences);
    counts.insert(JUNCTION_LINKS.to_string(), links);
    Ok(counts)
}

/// Hard-deletes an item that nothing depends on.
///
/// # Errors
/// Returns [`Error::HasDependencies`] when any dependency count is non-zero; the
/// caller should soft-delete or deactivate instead.
#[instrument(skip(db))]
pub async fn purge(db: &DatabaseConnection, actor: &Actor, id: i64) -> Result<()> {
    let txn = db.begin().await?;
    let current = find_model(&txn, id).await?;
    scope::authorize(actor, &scope::classify(&current), CatalogOperation::Delete, id)?;

    let dependents = check_dependencies(&txn, id).await?;
    if dependents.values().any(|count| *count > 0) {
        return Err(Error::HasDependencies {
            entity: "catalog_item",
            id,
            dependents,
        });
    }

    CatalogItem::delete_by_id(id).exec(&txn).await?;
    txn.commit().await?;
    info!(id, "Catalog item purged");
    Ok(())
}
