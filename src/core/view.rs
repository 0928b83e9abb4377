//! Farm catalog view - The boundary between resolution and a page or dialog.
//!
//! The view owns the latest [`Resolution`] behind an `Arc<RwLock<..>>`. Mutations
//! go through a [`ViewHandle`] that only holds a `Weak` reference to that state:
//! a mutation always completes, but publishing its re-resolved result is skipped
//! once the view has been dropped.

use crate::{
    core::{
        catalog::{self, LocalExtras},
        notify::Feedback,
        preference::{self, DeselectOutcome, SelectOutcome},
        resolution::{self, FarmContext, ResolvedItem, Resolution},
        scope::ScopedItem,
        search::SearchTerm,
    },
    entities::{catalog_item, farm_preference},
    errors::{Error, Result},
};
use sea_orm::DatabaseConnection;
use std::sync::{Arc, Weak};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

#[derive(Debug, Default)]
struct ViewState {
    resolution: Resolution,
    search: SearchTerm,
}

/// A farm's live view over one catalog.
#[derive(Debug)]
pub struct FarmCatalogView {
    state: Arc<RwLock<ViewState>>,
    handle: ViewHandle,
}

impl FarmCatalogView {
    /// Loads the view. Fails if any of the underlying fetches fails.
    pub async fn open(
        db: DatabaseConnection,
        context: FarmContext,
        feedback: Feedback,
    ) -> Result<Self> {
        let resolution = resolution::load(&db, &context).await?;
        let state = Arc::new(RwLock::new(ViewState {
            resolution,
            search: SearchTerm::default(),
        }));
        let handle = ViewHandle {
            db,
            context,
            feedback,
            state: Arc::downgrade(&state),
        };
        Ok(Self { state, handle })
    }

    /// A handle for mutations that may outlive the view.
    #[must_use]
    pub fn handle(&self) -> ViewHandle {
        self.handle.clone()
    }

    /// Snapshot of the current resolution.
    pub async fn resolution(&self) -> Resolution {
        self.state.read().await.resolution.clone()
    }

    /// Items in the farm's list.
    pub async fn selected(&self) -> Vec<ResolvedItem> {
        self.state.read().await.resolution.selected().to_vec()
    }

    /// Available items matching the current search.
    pub async fn available(&self) -> Vec<ScopedItem> {
        let state = self.state.read().await;
        state
            .resolution
            .search_available(&state.search)
            .into_iter()
            .cloned()
            .collect()
    }

    /// Sets the search text applied to available items.
    pub async fn set_search(&self, text: &str) {
        self.state.write().await.search = SearchTerm::new(text);
    }

    /// Re-runs resolution.
    pub async fn refresh(&self) -> Result<()> {
        self.handle.refresh().await.map(|_| ())
    }

    /// See [`ViewHandle::select`].
    pub async fn select(&self, catalog_item_id: i64) -> Result<SelectOutcome> {
        self.handle.select(catalog_item_id).await
    }

    /// See [`ViewHandle::deselect`].
    pub async fn deselect(&self, catalog_item_id: i64) -> Result<DeselectOutcome> {
        self.handle.deselect(catalog_item_id).await
    }

    /// See [`ViewHandle::set_favorite`].
    pub async fn set_favorite(
        &self,
        catalog_item_id: i64,
        is_favorite: bool,
    ) -> Result<farm_preference::Model> {
        self.handle.set_favorite(catalog_item_id, is_favorite).await
    }

    /// See [`ViewHandle::create_local`].
    pub async fn create_local(
        &self,
        name: &str,
        extras: LocalExtras,
    ) -> Result<catalog_item::Model> {
        self.handle.create_local(name, extras).await
    }
}

/// Mutation entry point that does not keep the view alive.
#[derive(Debug, Clone)]
pub struct ViewHandle {
    db: DatabaseConnection,
    context: FarmContext,
    feedback: Feedback,
    state: Weak<RwLock<ViewState>>,
}

impl ViewHandle {
    /// Whether the view still exists.
    #[must_use]
    pub fn is_alive(&self) -> bool {
        self.state.strong_count() > 0
    }

    /// Re-runs resolution and publishes it. Returns false if the view is gone.
    pub async fn refresh(&self) -> Result<bool> {
        if !self.is_alive() {
            debug!("View dropped, skipping refresh");
            return Ok(false);
        }
        let resolution = resolution::load(&self.db, &self.context).await?;
        Ok(self.publish(resolution).await)
    }

    async fn publish(&self, resolution: Resolution) -> bool {
        match self.state.upgrade() {
            Some(state) => {
                state.write().await.resolution = resolution;
                true
            }
            None => {
                debug!("View dropped, discarding resolution");
                false
            }
        }
    }

    /// Re-resolves after a committed write. The write stands even if this fails.
    async fn refresh_after_write(&self) {
        if let Err(e) = self.refresh().await {
            warn!("Refresh after write failed: {}", e);
            self.feedback.report_error(&e);
        }
    }

    async fn fail<T>(&self, err: Error) -> Result<T> {
        if matches!(err, Error::NotFound { .. }) {
            // Drop the stale item from the view; the original error still wins.
            if let Err(refresh_err) = self.refresh().await {
                debug!("Refresh after stale id failed: {}", refresh_err);
            }
        }
        self.feedback.report_error(&err);
        Err(err)
    }

    /// Adds an item to the farm's list and re-resolves.
    ///
    /// Once the write has landed the outcome is returned even if re-resolving
    /// fails; that failure is only reported to the notifier.
    ///
    /// An already selected item yields a warning notification, not an error.
    pub async fn select(&self, catalog_item_id: i64) -> Result<SelectOutcome> {
        let farm_id = &self.context.farm_id;
        let outcome = match preference::select(&self.db, farm_id, catalog_item_id).await {
            Ok(outcome) => outcome,
            Err(e) => return self.fail(e).await,
        };
        let id = catalog_item_id.to_string();
        match &outcome {
            SelectOutcome::AlreadySelected => {
                self.feedback.warning("preferences.already_selected", &[("id", id.as_str())]);
            }
            SelectOutcome::Selected(_) => {
                self.feedback.success("preferences.selected", &[("id", id.as_str())]);
            }
        }
        self.refresh_after_write().await;
        Ok(outcome)
    }

    /// Removes an item from the farm's list and re-resolves.
    pub async fn deselect(&self, catalog_item_id: i64) -> Result<DeselectOutcome> {
        let farm_id = &self.context.farm_id;
        let outcome = match preference::deselect(&self.db, farm_id, catalog_item_id).await {
            Ok(outcome) => outcome,
            Err(e) => return self.fail(e).await,
        };
        let id = catalog_item_id.to_string();
        self.feedback.success("preferences.deselected", &[("id", id.as_str())]);
        self.refresh_after_write().await;
        Ok(outcome)
    }

    /// Pins or unpins an item and re-resolves.
    pub async fn set_favorite(
        &self,
        catalog_item_id: i64,
        is_favorite: bool,
    ) -> Result<farm_preference::Model> {
        let farm_id = &self.context.farm_id;
        let updated =
            preference::set_favorite(&self.db, farm_id, catalog_item_id, is_favorite).await;
        let link = match updated {
            Ok(link) => link,
            Err(e) => return self.fail(e).await,
        };
        self.refresh_after_write().await;
        Ok(link)
    }

    /// Creates a local item for the farm and re-resolves.
    pub async fn create_local(
        &self,
        name: &str,
        extras: LocalExtras,
    ) -> Result<catalog_item::Model> {
        let created =
            catalog::create_local(&self.db, &self.context.farm_id, self.context.kind, name, extras)
                .await;
        let item = match created {
            Ok(item) => item,
            Err(e) => return self.fail(e).await,
        };
        info!(id = item.id, "Local catalog item created from view");
        self.feedback
            .success("selection.local_created", &[("name", name.trim())]);
        self.refresh_after_write().await;
        Ok(item)
    }
}
