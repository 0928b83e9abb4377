//! Junction link entity - Many-to-many association between two catalog kinds.
//!
//! Deactivation flips `is_active`; rows are only removed by an explicit unlink.

use super::catalog_item::CatalogKind;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Association type, fixing which catalog kinds sit on each side
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, EnumIter, DeriveActiveEnum,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(32))")]
#[serde(rename_all = "snake_case")]
pub enum JunctionRelation {
    /// Breed raised in a country
    #[sea_orm(string_value = "breed_country")]
    BreedCountry,
    /// Campaign running in a country
    #[sea_orm(string_value = "campaign_country")]
    CampaignCountry,
    /// Vaccine applicable to a species
    #[sea_orm(string_value = "vaccine_species")]
    VaccineSpecies,
    /// Disease affecting a species
    #[sea_orm(string_value = "disease_species")]
    DiseaseSpecies,
}

impl JunctionRelation {
    /// Catalog kind expected on the left side.
    #[must_use]
    pub const fn left_kind(self) -> CatalogKind {
        match self {
            Self::BreedCountry => CatalogKind::Breed,
            Self::CampaignCountry => CatalogKind::Campaign,
            Self::VaccineSpecies => CatalogKind::Vaccine,
            Self::DiseaseSpecies => CatalogKind::Disease,
        }
    }

    /// Catalog kind expected on the right side.
    #[must_use]
    pub const fn right_kind(self) -> CatalogKind {
        match self {
            Self::BreedCountry | Self::CampaignCountry => CatalogKind::Country,
            Self::VaccineSpecies | Self::DiseaseSpecies => CatalogKind::Species,
        }
    }
}

/// Junction link database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "junction_links")]
pub struct Model {
    /// Unique identifier
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Association type
    pub relation: JunctionRelation,
    /// Left catalog item id
    pub left_id: i64,
    /// Right catalog item id
    pub right_id: i64,
    /// Whether the association is currently in effect
    pub is_active: bool,
    /// When the pair was linked
    pub created_at: DateTimeUtc,
    /// When the pair was last toggled
    pub updated_at: DateTimeUtc,
}

/// `JunctionLink` has no declared relations; both sides are catalog items
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
