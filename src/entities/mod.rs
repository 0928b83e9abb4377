//! Entity module - Contains all SeaORM entity definitions for the database.
//! Each entity has a Model struct for data and an Entity struct for operations.

pub mod catalog_item;
pub mod catalog_reference;
pub mod farm_preference;
pub mod junction_link;

pub use catalog_item::{
    CatalogKind, Column as CatalogItemColumn, Entity as CatalogItem, Model as CatalogItemModel,
};
pub use catalog_reference::{
    Column as CatalogReferenceColumn, Entity as CatalogReference,
    Model as CatalogReferenceModel,
};
pub use farm_preference::{
    Column as FarmPreferenceColumn, Entity as FarmPreference, Model as FarmPreferenceModel,
};
pub use junction_link::{
    Column as JunctionLinkColumn, Entity as JunctionLink, JunctionRelation,
    Model as JunctionLinkModel,
};
