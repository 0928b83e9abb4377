//! Catalog item entity - Represents one row of reference data.
//!
//! Species, breeds, countries, vaccines, products, veterinarians and campaigns all
//! live in this table, discriminated by `kind`. A row with a `farm_id` is private to
//! that farm (local); a row without one is shared by every farm (global).

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Type of reference data stored in a catalog row
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, EnumIter, DeriveActiveEnum,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(32))")]
#[serde(rename_all = "snake_case")]
pub enum CatalogKind {
    /// Animal species (cattle, sheep, ...)
    #[sea_orm(string_value = "species")]
    Species,
    /// Breed of a species
    #[sea_orm(string_value = "breed")]
    Breed,
    /// Country (used by breed and campaign associations)
    #[sea_orm(string_value = "country")]
    Country,
    /// Vaccine
    #[sea_orm(string_value = "vaccine")]
    Vaccine,
    /// Veterinary or zootechnical product
    #[sea_orm(string_value = "product")]
    Product,
    /// Veterinarian
    #[sea_orm(string_value = "veterinarian")]
    Veterinarian,
    /// Vaccination or treatment campaign
    #[sea_orm(string_value = "campaign")]
    Campaign,
    /// Disease
    #[sea_orm(string_value = "disease")]
    Disease,
    /// Medical act
    #[sea_orm(string_value = "medical_act")]
    MedicalAct,
}

/// Catalog item database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "catalog_items")]
pub struct Model {
    /// Unique identifier
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Type of reference data
    pub kind: CatalogKind,
    /// Business code, unique within `kind`
    pub code: String,
    /// French label
    pub name_fr: String,
    /// English label
    pub name_en: String,
    /// Arabic label
    pub name_ar: String,
    /// Free-text description
    pub description: Option<String>,
    /// Region or origin (e.g. breed cradle)
    pub region: Option<String>,
    /// Whether the row can be picked for new data
    pub is_active: bool,
    /// Operator-defined ordering hint
    pub display_order: Option<i32>,
    /// Owning farm for local rows, None for global rows
    pub farm_id: Option<String>,
    /// Optimistic concurrency token, starts at 1
    pub version: i32,
    /// When the row was created
    pub created_at: DateTimeUtc,
    /// When the row was last modified
    pub updated_at: DateTimeUtc,
    /// Soft delete marker
    pub deleted_at: Option<DateTimeUtc>,
}

impl Model {
    /// Whether the row has been soft-deleted.
    #[must_use]
    pub const fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }
}

/// Defines relationships between catalog items and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// One catalog item is linked by many farm preferences
    #[sea_orm(has_many = "super::farm_preference::Entity")]
    FarmPreferences,
    /// One catalog item is referenced by many dependent rows
    #[sea_orm(has_many = "super::catalog_reference::Entity")]
    References,
}

impl Related<super::farm_preference::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::FarmPreferences.def()
    }
}

impl Related<super::catalog_reference::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::References.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
