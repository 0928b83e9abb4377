//! Catalog reference entity - A dependent row pointing at catalog data.
//!
//! Animals, treatments and vaccinations record which catalog item (and optionally
//! which junction pair) they were created against. These rows are what keep a
//! catalog item or a junction link from being hard-deleted.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Catalog reference database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "catalog_references")]
pub struct Model {
    /// Unique identifier
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Referenced catalog item
    pub catalog_item_id: i64,
    /// Referenced junction pair, if any
    pub junction_link_id: Option<i64>,
    /// Kind of dependent record (e.g. `"animal"`, `"vaccination"`)
    pub source: String,
    /// Identifier of the dependent record in its own system
    pub source_id: String,
    /// When the reference was recorded
    pub created_at: DateTimeUtc,
}

/// Defines relationships between catalog references and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each reference points at one catalog item
    #[sea_orm(
        belongs_to = "super::catalog_item::Entity",
        from = "Column::CatalogItemId",
        to = "super::catalog_item::Column::Id"
    )]
    CatalogItem,
}

impl Related<super::catalog_item::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::CatalogItem.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
