//! Farm preference entity - A farm's pick of one catalog item.
//!
//! Only the owning farm writes these rows, so they carry no version token.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Farm preference database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "farm_preferences")]
pub struct Model {
    /// Unique identifier
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Farm that owns the preference
    pub farm_id: String,
    /// Selected catalog item
    pub catalog_item_id: i64,
    /// Position in the farm's list
    pub display_order: i32,
    /// Pinned by the farm
    pub is_favorite: bool,
    /// How many times the farm picked this item
    pub usage_count: i64,
    /// When the farm selected the item
    pub created_at: DateTimeUtc,
}

/// Defines relationships between farm preferences and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each preference points at one catalog item
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
