//! Preference resolution - Splits one catalog into a farm's `selected` and `available` views.
//!
//! Resolution is a pure recomputation from two immutable snapshots (catalog rows and
//! the farm's preference links). Callers re-run it after every mutation instead of
//! patching a cached merged list.

use crate::{
    core::{
        catalog,
        locale::Locale,
        preference,
        ranking::Candidate,
        scope::ScopedItem,
        search::SearchTerm,
    },
    entities::{CatalogKind, catalog_item, farm_preference},
    errors::Result,
};
use sea_orm::DatabaseConnection;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use tracing::debug;

/// Which farm and which catalog a resolution is computed for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FarmContext {
    /// Farm whose preferences apply
    pub farm_id: String,
    /// Catalog being resolved
    pub kind: CatalogKind,
    /// Drop inactive global items before resolving
    pub active_only: bool,
}

impl FarmContext {
    /// Context over active items of `kind` for `farm_id`.
    #[must_use]
    pub fn new(farm_id: &str, kind: CatalogKind) -> Self {
        Self {
            farm_id: farm_id.to_string(),
            kind,
            active_only: true,
        }
    }
}

/// A selected item together with the farm's link to it, if any.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedItem {
    /// The catalog item and its scope
    pub entry: ScopedItem,
    /// The farm's preference link; local items may have none
    pub link: Option<farm_preference::Model>,
}

impl ResolvedItem {
    /// Catalog item id.
    #[must_use]
    pub const fn id(&self) -> i64 {
        self.entry.item.id
    }

    /// Whether the farm pinned the item.
    #[must_use]
    pub fn is_favorite(&self) -> bool {
        self.link.as_ref().is_some_and(|link| link.is_favorite)
    }

    /// How often the farm used the item.
    #[must_use]
    pub fn usage_count(&self) -> i64 {
        self.link.as_ref().map_or(0, |link| link.usage_count)
    }

    /// Projects the item into a ranking candidate labelled in `locale`.
    #[must_use]
    pub fn to_candidate(&self, locale: Locale) -> Candidate {
        Candidate {
            id: self.id(),
            label: catalog::display_name(&self.entry.item, locale),
            description: self.entry.item.description.clone(),
            is_favorite: self.is_favorite(),
            usage_count: self.usage_count(),
        }
    }

    fn sort_key(&self) -> (i32, chrono::DateTime<chrono::Utc>, i64) {
        let item = &self.entry.item;
        match &self.link {
            Some(link) => (link.display_order, link.created_at, item.id),
            None => (item.display_order.unwrap_or(i32::MAX), item.created_at, item.id),
        }
    }
}

/// The farm's `selected` list and the `available` rest of the global catalog.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resolution {
    selected: Vec<ResolvedItem>,
    available: Vec<ScopedItem>,
}

impl Resolution {
    /// Items in the farm's list, in display order.
    #[must_use]
    pub fn selected(&self) -> &[ResolvedItem] {
        &self.selected
    }

    /// Global items the farm has not selected, in catalog order.
    #[must_use]
    pub fn available(&self) -> &[ScopedItem] {
        &self.available
    }

    /// Whether `id` is in the farm's list.
    #[must_use]
    pub fn is_selected(&self, id: i64) -> bool {
        self.selected.iter().any(|item| item.id() == id)
    }

    /// A selected item by id.
    #[must_use]
    pub fn find_selected(&self, id: i64) -> Option<&ResolvedItem> {
        self.selected.iter().find(|item| item.id() == id)
    }

    /// Available items matching `search` on code, names or region. `selected` is untouched.
    #[must_use]
    pub fn search_available(&self, search: &SearchTerm) -> Vec<&ScopedItem> {
        self.available
            .iter()
            .filter(|entry| search.matches_catalog_item(&entry.item))
            .collect()
    }

    /// Selected items as ranking candidates.
    #[must_use]
    pub fn candidates(&self, locale: Locale) -> Vec<Candidate> {
        self.selected
            .iter()
            .map(|item| item.to_candidate(locale))
            .collect()
    }
}

/// Merges catalog snapshots with the farm's links.
///
/// `selected` holds every global item the farm links to plus every non-deleted
/// local item the farm owns; `available` holds the remaining global items. The two
/// never share an id.
#[must_use]
pub fn resolve(
    farm_id: &str,
    globals: Vec<catalog_item::Model>,
    locals: Vec<catalog_item::Model>,
    links: Vec<farm_preference::Model>,
) -> Resolution {
    let mut links_by_item: HashMap<i64, farm_preference::Model> = links
        .into_iter()
        .filter(|link| link.farm_id == farm_id)
        .map(|link| (link.catalog_item_id, link))
        .collect();

    let mut seen = HashSet::new();
    let mut selected = Vec::new();
    let mut available = Vec::new();

    for item in globals {
        let entry = ScopedItem::from(item);
        if !entry.scope.is_global() || entry.item.is_deleted() || !seen.insert(entry.id()) {
            continue;
        }
        match links_by_item.remove(&entry.id()) {
            Some(link) => selected.push(ResolvedItem {
                entry,
                link: Some(link),
            }),
            None => available.push(entry),
        }
    }

    for item in locals {
        let entry = ScopedItem::from(item);
        if !entry.scope.is_owned_by(farm_id)
            || entry.item.is_deleted()
            || !seen.insert(entry.id())
        {
            continue;
        }
        let link = links_by_item.remove(&entry.id());
        selected.push(ResolvedItem { entry, link });
    }

    selected.sort_by_key(ResolvedItem::sort_key);
    Resolution {
        selected,
        available,
    }
}

/// Fetches the catalog and the farm's links concurrently and resolves them.
///
/// A failure in any of the fetches fails the whole resolution.
pub async fn load(db: &DatabaseConnection, context: &FarmContext) -> Result<Resolution> {
    let (globals, locals, links) = tokio::try_join!(
        catalog::fetch_globals(db, context.kind, context.active_only),
        catalog::fetch_locals(db, &context.farm_id, context.kind),
        preference::links_for_farm(db, &context.farm_id),
    )?;
    debug!(
        farm_id = %context.farm_id,
        globals = globals.len(),
        locals = locals.len(),
        links = links.len(),
        "Resolving farm catalog"
    );
    Ok(resolve(&context.farm_id, globals, locals, links))
}
