//! Trailing-edge debounced saving.
//!
//! Every observed change restarts one quiet-period timer; only the last
//! change before the timer expires is saved. Dropping the scheduler cancels
//! a pending save without running it.

use crate::alert::{Alert, AlertSink};
use crate::store::{FileStore, is_document};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

pub struct Autosave {
    store: Arc<dyn FileStore>,
    alerts: Arc<dyn AlertSink>,
    quiet: Duration,
    pending: Option<JoinHandle<()>>,
    observed: Option<String>,
}

impl Autosave {
    pub fn new(store: Arc<dyn FileStore>, alerts: Arc<dyn AlertSink>, quiet: Duration) -> Self {
        Self {
            store,
            alerts,
            quiet,
            pending: None,
            observed: None,
        }
    }

    pub fn quiet_period(&self) -> Duration {
        self.quiet
    }

    /// Records `markdown` as already persisted, e.g. right after a load,
    /// and drops any pending save.
    pub fn baseline(&mut self, markdown: impl Into<String>) {
        self.cancel();
        self.observed = Some(markdown.into());
    }

    /// Notes the current serialized document. Restarts the timer and
    /// returns true when the text changed and `path` is a document;
    /// otherwise does nothing. Must be called from within a Tokio runtime.
    pub fn observe(&mut self, path: &str, markdown: &str) -> bool {
        if !is_document(path) {
            debug!(path, "not a document, autosave skipped");
            return false;
        }
        if self.observed.as_deref() == Some(markdown) {
            return false;
        }
        self.observed = Some(markdown.to_string());
        if let Some(previous) = self.pending.take() {
            previous.abort();
        }

        let store = Arc::clone(&self.store);
        let alerts = Arc::clone(&self.alerts);
        let quiet = self.quiet;
        let path = path.to_string();
        let text = markdown.to_string();
        self.pending = Some(tokio::spawn(async move {
            tokio::time::sleep(quiet).await;
            match store.save(&path, &text).await {
                Ok(()) => info!(path = %path, "autosaved"),
                Err(err) => {
                    warn!(path = %path, error = %err, "autosave failed");
                    alerts.alert(Alert::error(err.to_string()));
                }
            }
        }));
        true
    }

    pub fn is_pending(&self) -> bool {
        self.pending
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    pub fn cancel(&mut self) {
        if let Some(pending) = self.pending.take() {
            if !pending.is_finished() {
                debug!("pending autosave cancelled");
            }
            pending.abort();
        }
    }
}

impl Drop for Autosave {
    fn drop(&mut self) {
        self.cancel();
    }
}
