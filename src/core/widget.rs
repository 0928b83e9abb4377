//! Ranked selection widget state.
//!
//! Holds the candidate list, the search text, the current pick and the inline
//! "create local item" dialog. Ranking is recomputed on every search change;
//! picking an item bumps its usage count in the background without waiting.

use crate::{
    core::{
        catalog::{self, LocalExtras},
        locale::Locale,
        notify::Feedback,
        preference,
        ranking::{self, Candidate, RankedCandidates},
        resolution::Resolution,
        search::SearchTerm,
    },
    entities::CatalogKind,
    errors::{Error, Result},
};
use sea_orm::DatabaseConnection;
use tokio::{runtime::Handle, task::JoinHandle};
use tracing::{debug, warn};

/// State of the inline creation dialog.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CreateDialog {
    open: bool,
    name: String,
    error: Option<String>,
}

impl CreateDialog {
    /// Whether the dialog is shown.
    #[must_use]
    pub const fn is_open(&self) -> bool {
        self.open
    }

    /// The name typed so far.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Translated error shown next to the name field, if the last submit failed.
    #[must_use]
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }
}

/// Selection widget over one catalog for one farm.
#[derive(Debug)]
pub struct SelectionWidget {
    db: DatabaseConnection,
    farm_id: String,
    kind: CatalogKind,
    locale: Locale,
    feedback: Feedback,
    candidates: Vec<Candidate>,
    search_text: String,
    ranked: RankedCandidates,
    selected: Option<i64>,
    dialog: CreateDialog,
}

impl SelectionWidget {
    /// Creates a widget over `candidates`.
    #[must_use]
    pub fn new(
        db: DatabaseConnection,
        farm_id: &str,
        kind: CatalogKind,
        locale: Locale,
        feedback: Feedback,
        candidates: Vec<Candidate>,
    ) -> Self {
        let ranked = ranking::rank(&candidates, &SearchTerm::default());
        Self {
            db,
            farm_id: farm_id.to_string(),
            kind,
            locale,
            feedback,
            candidates,
            search_text: String::new(),
            ranked,
            selected: None,
            dialog: CreateDialog::default(),
        }
    }

    /// Creates a widget over the farm's selected items.
    #[must_use]
    pub fn from_resolution(
        db: DatabaseConnection,
        farm_id: &str,
        kind: CatalogKind,
        locale: Locale,
        feedback: Feedback,
        resolution: &Resolution,
    ) -> Self {
        let candidates = resolution.candidates(locale);
        Self::new(db, farm_id, kind, locale, feedback, candidates)
    }

    /// Replaces the candidate list, keeping search and selection.
    pub fn set_candidates(&mut self, candidates: Vec<Candidate>) {
        self.candidates = candidates;
        self.rerank();
    }

    /// Updates the search text and re-ranks.
    pub fn set_search(&mut self, text: &str) {
        self.search_text = text.to_string();
        self.rerank();
    }

    fn rerank(&mut self) {
        self.ranked = ranking::rank(&self.candidates, &SearchTerm::new(&self.search_text));
    }

    /// Current ranking.
    #[must_use]
    pub const fn ranked(&self) -> &RankedCandidates {
        &self.ranked
    }

    /// Translated heading and entries of each non-empty group, in render order.
    #[must_use]
    pub fn grouped(&self) -> Vec<(String, &[Candidate])> {
        self.ranked
            .groups()
            .into_iter()
            .map(|(group, entries)| (self.feedback.text(group.label_key(), &[]), entries))
            .collect()
    }

    /// The picked candidate, if any.
    #[must_use]
    pub fn selected(&self) -> Option<&Candidate> {
        self.selected
            .and_then(|id| self.candidates.iter().find(|candidate| candidate.id == id))
    }

    /// Clears the current pick.
    pub fn clear_selection(&mut self) {
        self.selected = None;
    }

    /// Picks a candidate and counts the use in the background.
    ///
    /// The returned handle may be ignored; a failed increment is only logged and
    /// never undoes the pick. Outside a tokio runtime the increment is skipped
    /// and `None` is returned.
    pub fn select(&mut self, id: i64) -> Result<Option<JoinHandle<()>>> {
        if !self.candidates.iter().any(|candidate| candidate.id == id) {
            return Err(Error::NotFound {
                entity: "candidate",
                id,
            });
        }
        self.selected = Some(id);

        let Ok(runtime) = Handle::try_current() else {
            warn!(id, "No async runtime, usage not recorded");
            return Ok(None);
        };
        let db = self.db.clone();
        let farm_id = self.farm_id.clone();
        Ok(Some(runtime.spawn(async move {
            match preference::record_usage(&db, &farm_id, id).await {
                Ok(_) => debug!(id, "Usage recorded"),
                Err(e) => warn!(id, "Failed to record usage: {}", e),
            }
        })))
    }

    /// The creation dialog state.
    #[must_use]
    pub const fn dialog(&self) -> &CreateDialog {
        &self.dialog
    }

    /// Opens the creation dialog, pre-filled with the current search text.
    pub fn open_create_dialog(&mut self) {
        self.dialog = CreateDialog {
            open: true,
            name: self.search_text.trim().to_string(),
            error: None,
        };
    }

    /// Updates the name typed in the dialog.
    pub fn set_dialog_name(&mut self, name: &str) {
        self.dialog.name = name.to_string();
    }

    /// Closes the dialog and discards the typed name.
    pub fn cancel_create(&mut self) {
        self.dialog = CreateDialog::default();
    }

    /// Creates a local item from the dialog and selects it.
    ///
    /// On failure the dialog stays open with the typed name and a translated
    /// error, and the error is returned.
    pub async fn submit_create(&mut self, extras: LocalExtras) -> Result<Candidate> {
        let name = self.dialog.name.clone();
        let created =
            catalog::create_local(&self.db, &self.farm_id, self.kind, &name, extras).await;

        match created {
            Ok(item) => {
                let candidate = Candidate {
                    id: item.id,
                    label: catalog::display_name(&item, self.locale),
                    description: item.description.clone(),
                    is_favorite: false,
                    usage_count: 0,
                };
                self.candidates.push(candidate.clone());
                self.rerank();
                self.dialog = CreateDialog::default();
                self.select(item.id)?;
                self.feedback
                    .success("selection.local_created", &[("name", candidate.label.as_str())]);
                Ok(candidate)
            }
            Err(e) => {
                let detail = e.to_string();
                self.dialog.error = Some(
                    self.feedback
                        .text(e.message_key(), &[("detail", detail.as_str())]),
                );
                self.feedback.report_error(&e);
                Err(e)
            }
        }
    }
}
