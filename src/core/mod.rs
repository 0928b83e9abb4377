/// Catalog entity CRUD over global and farm-local items
pub mod catalog;

/// Historic records pointing at catalog rows and links
pub mod dependency;

/// Many-to-many associations between catalog kinds
pub mod junction;

/// Locale selection and the translation contract
pub mod locale;

/// Notifications sent back to the user
pub mod notify;

/// Farm preference links
pub mod preference;

/// Favorites / recent / others ranking
pub mod ranking;

/// Merging globals, locals and links into selected and available lists
pub mod resolution;

/// Global versus farm-local visibility and authorization
pub mod scope;

/// Normalized search terms
pub mod search;

/// Optimistic concurrency on shared catalog rows
pub mod version;

/// Live farm view over a resolution
pub mod view;

/// Ranked selection widget state
pub mod widget;
