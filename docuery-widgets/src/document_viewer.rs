//! Read-only viewer for the active document.
//!
//! The embedded renderer does not watch its container, so the viewer forces
//! a reflow whenever the active document changes or a resize settles.

use std::sync::Arc;

use docuery_data::DocumentStore;
use tokio::sync::watch;

pub const VIEWER_TITLE: &str = "PDF Viewer";
pub const EMPTY_MESSAGE: &str = "No document loaded";
pub const EMPTY_HINT: &str = "Upload a PDF, then choose it from the viewer file list";

/// Host surface the viewer is embedded in.
pub trait ReflowTarget: Send + Sync {
    /// Tell the host window its layout changed.
    fn dispatch_window_resize(&self);

    /// Ask the embedded renderer to relayout. Failures are ignored.
    fn reflow_embedded(&self) -> Result<(), String>;
}

/// What the viewer pane shows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewerState {
    Empty {
        title: &'static str,
        message: &'static str,
        hint: &'static str,
    },
    Showing {
        key: String,
        title: String,
        /// Preview URL with the fit-to-width fragment
        source: String,
        /// `(key, name)` choices, only filled when more than one document
        choices: Vec<(String, String)>,
    },
}

pub struct DocumentViewer {
    store: DocumentStore,
    documents: watch::Receiver<u64>,
    settled: watch::Receiver<u64>,
    host: Arc<dyn ReflowTarget>,
    /// Active key and settle token seen at the last sync
    last_seen: Option<(Option<String>, u64)>,
}

impl DocumentViewer {
    pub fn new(
        store: DocumentStore,
        settled: watch::Receiver<u64>,
        host: Arc<dyn ReflowTarget>,
    ) -> Self {
        let documents = store.subscribe();
        Self {
            store,
            documents,
            settled,
            host,
            last_seen: None,
        }
    }

    pub fn view(&self) -> ViewerState {
        let Some(active) = self.store.active_document() else {
            return ViewerState::Empty {
                title: VIEWER_TITLE,
                message: EMPTY_MESSAGE,
                hint: EMPTY_HINT,
            };
        };

        let documents = self.store.documents();
        let choices = if documents.len() > 1 {
            documents
                .into_iter()
                .map(|d| (d.key, d.file.name))
                .collect()
        } else {
            Vec::new()
        };

        ViewerState::Showing {
            source: format!("{}#view=FitH", active.preview_url),
            key: active.key,
            title: active.file.name,
            choices,
        }
    }

    /// Reflow if the active document or the settle token moved since the
    /// last call. Returns whether a reflow was dispatched.
    pub fn sync(&mut self) -> bool {
        let active = self.store.active_key();
        let token = *self.settled.borrow_and_update();
        self.documents.mark_unchanged();

        let current = (active, token);
        if self.last_seen.as_ref() == Some(&current) {
            return false;
        }
        let has_active = current.0.is_some();
        self.last_seen = Some(current);

        if !has_active {
            return false;
        }

        self.host.dispatch_window_resize();
        if let Err(e) = self.host.reflow_embedded() {
            log::debug!("Embedded viewer reflow failed: {}", e);
        }
        true
    }

    /// Keep the viewer in sync until the layout it follows is dropped.
    pub async fn run(mut self) {
        self.sync();
        loop {
            let open = tokio::select! {
                changed = self.documents.changed() => changed.is_ok(),
                changed = self.settled.changed() => changed.is_ok(),
            };
            if !open {
                break;
            }
            self.sync();
        }
        log::debug!("Document viewer stopped");
    }
}
