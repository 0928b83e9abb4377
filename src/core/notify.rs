//! Notification sink used to report operation outcomes to the user.

use super::locale::Translator;
use crate::errors::Error;
use std::sync::Arc;
use tracing::{error, info, warn};

/// Fire-and-forget notification sink. Implementations must not block.
pub trait Notifier: Send + Sync {
    /// Reports a completed operation.
    fn success(&self, title: &str, message: &str);
    /// Reports a failed operation.
    fn error(&self, title: &str, message: &str);
    /// Reports a no-op or a non-blocking problem.
    fn warning(&self, title: &str, message: &str);
}

/// Default sink that writes notifications to the tracing log.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn success(&self, title: &str, message: &str) {
        info!(title, "{}", message);
    }

    fn error(&self, title: &str, message: &str) {
        error!(title, "{}", message);
    }

    fn warning(&self, title: &str, message: &str) {
        warn!(title, "{}", message);
    }
}

/// A notifier paired with the translator that renders its messages.
#[derive(Clone)]
pub struct Feedback {
    notifier: Arc<dyn Notifier>,
    translator: Arc<dyn Translator>,
}

impl Feedback {
    /// Creates a new `Feedback` from its two collaborators.
    #[must_use]
    pub fn new(notifier: Arc<dyn Notifier>, translator: Arc<dyn Translator>) -> Self {
        Self {
            notifier,
            translator,
        }
    }

    /// Translates `key` with `params`.
    #[must_use]
    pub fn text(&self, key: &str, params: &[(&str, &str)]) -> String {
        self.translator.translate(key, params)
    }

    /// Sends a success notification; `key` names the message, `{key}.title` the title.
    pub fn success(&self, key: &str, params: &[(&str, &str)]) {
        let (title, message) = self.render(key, params);
        self.notifier.success(&title, &message);
    }

    /// Sends a warning notification.
    pub fn warning(&self, key: &str, params: &[(&str, &str)]) {
        let (title, message) = self.render(key, params);
        self.notifier.warning(&title, &message);
    }

    /// Sends the user-facing rendering of `err` as an error notification.
    pub fn report_error(&self, err: &Error) {
        let detail = err.to_string();
        let (title, message) = self.render(err.message_key(), &[("detail", detail.as_str())]);
        self.notifier.error(&title, &message);
    }

    fn render(&self, key: &str, params: &[(&str, &str)]) -> (String, String) {
        let title = self.translator.translate(&format!("{key}.title"), params);
        let message = self.translator.translate(key, params);
        (title, message)
    }
}

impl std::fmt::Debug for Feedback {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Feedback").finish_non_exhaustive()
    }
}
