//! Document session store: the uploaded documents of one workspace.
//!
//! Each document moves through `Uploading -> Active -> (Removed | Cleared)`.
//! A record only exists once the backend has assigned it an id. Removal is
//! local-first: the entry disappears immediately and the backend delete is
//! best-effort.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::watch;

use crate::api_client::DocumentBackend;
use crate::error::ApiError;
use crate::local_file::LocalFile;
use crate::preview::PreviewRegistry;

/// A document that has been uploaded and can be previewed locally.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedDocument {
    /// Local de-duplication key, see [`LocalFile::key`]
    pub key: String,
    /// Id assigned by the backend
    pub document_id: String,
    pub file: LocalFile,
    /// Revocable preview handle, released when the entry goes away
    pub preview_url: String,
}

/// Outcome of one [`DocumentStore::add_documents`] call.
///
/// Nothing here is surfaced to the user; upload failures stay silent in the
/// UI. The report exists so callers and tests can see what happened.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AddReport {
    pub added: Vec<String>,
    pub skipped_duplicates: Vec<String>,
    pub rejected_non_pdf: Vec<String>,
    pub failed: Vec<(String, ApiError)>,
}

/// Resolve which document is active.
///
/// The requested key wins when it is in the set, otherwise the first
/// document, otherwise nothing.
pub fn resolve_active_key(documents: &[UploadedDocument], requested: Option<&str>) -> Option<String> {
    let first = documents.first()?;
    match requested {
        Some(key) if documents.iter().any(|d| d.key == key) => Some(key.to_string()),
        _ => Some(first.key.clone()),
    }
}

struct StoreState {
    documents: Vec<UploadedDocument>,
    requested_active: Option<String>,
    previews: Arc<dyn PreviewRegistry>,
    revision: watch::Sender<u64>,
}

impl StoreState {
    fn notify(&self) {
        self.revision.send_modify(|revision| *revision += 1);
    }

    fn contains(&self, key: &str) -> bool {
        self.documents.iter().any(|d| d.key == key)
    }

    /// Revoke every preview and empty the set. Returns how many entries
    /// were released.
    fn release_all(&mut self) -> usize {
        let released = self.documents.len();
        for document in self.documents.drain(..) {
            self.previews.revoke(&document.preview_url);
        }
        self.requested_active = None;
        released
    }
}

impl Drop for StoreState {
    fn drop(&mut self) {
        let released = self.release_all();
        if released > 0 {
            log::debug!("Document store torn down, released {} previews", released);
        }
    }
}

/// Shared handle to the documents of one workspace.
///
/// Clones refer to the same state. When the last handle is dropped every
/// outstanding preview is revoked.
#[derive(Clone)]
pub struct DocumentStore {
    state: Arc<Mutex<StoreState>>,
    backend: Arc<dyn DocumentBackend>,
}

impl DocumentStore {
    pub fn new(backend: Arc<dyn DocumentBackend>, previews: Arc<dyn PreviewRegistry>) -> Self {
        let (revision, _) = watch::channel(0);
        Self {
            state: Arc::new(Mutex::new(StoreState {
                documents: Vec::new(),
                requested_active: None,
                previews,
                revision,
            })),
            backend,
        }
    }

    fn state(&self) -> MutexGuard<'_, StoreState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    // ── Mutations ────────────────────────────────────────────────────────────

    /// Upload every new PDF among `candidates`, one at a time, in order.
    ///
    /// Duplicates are checked against the documents present when the call
    /// starts and again right before insertion.
    pub async fn add_documents(&self, candidates: Vec<LocalFile>) -> AddReport {
        let mut report = AddReport::default();

        let (pdfs, others): (Vec<LocalFile>, Vec<LocalFile>) =
            candidates.into_iter().partition(LocalFile::is_pdf);
        report.rejected_non_pdf = others.into_iter().map(|f| f.name).collect();

        if pdfs.is_empty() {
            return report;
        }

        let existing: HashSet<String> = self.state().documents.iter().map(|d| d.key.clone()).collect();

        for file in pdfs {
            let key = file.key();
            if existing.contains(&key) {
                report.skipped_duplicates.push(key);
                continue;
            }

            let uploaded = match self.backend.upload(&file).await {
                Ok(uploaded) => uploaded,
                Err(e) => {
                    log::warn!("Dropping {} after failed upload: {}", file.name, e);
                    report.failed.push((key, e));
                    continue;
                }
            };

            let inserted = {
                let mut state = self.state();
                if state.contains(&key) {
                    false
                } else {
                    let preview_url = state.previews.create(&file);
                    state.documents.push(UploadedDocument {
                        key: key.clone(),
                        document_id: uploaded.document_id,
                        file,
                        preview_url,
                    });
                    state.notify();
                    true
                }
            };

            if inserted {
                log::info!("Added document {}", key);
                report.added.push(key);
            } else {
                report.skipped_duplicates.push(key);
            }
        }

        report
    }

    /// Remove one document locally, then ask the backend to forget it.
    ///
    /// Returns `false` for an unknown key, in which case nothing is sent.
    pub async fn remove_document(&self, key: &str) -> bool {
        let removed = {
            let mut state = self.state();
            let Some(index) = state.documents.iter().position(|d| d.key == key) else {
                return false;
            };
            let removed = state.documents.remove(index);
            state.previews.revoke(&removed.preview_url);
            if state.requested_active.as_deref() == Some(key) {
                state.requested_active = None;
            }
            state.notify();
            removed
        };

        log::info!("Removed document {}", key);
        if let Err(e) = self.backend.delete_one(&removed.document_id).await {
            log::warn!("Backend delete of {} failed: {}", removed.document_id, e);
        }
        true
    }

    /// Remove every document locally, then ask the backend to clear.
    pub async fn clear_all(&self) {
        let released = {
            let mut state = self.state();
            let released = state.release_all();
            state.notify();
            released
        };

        log::info!("Cleared {} documents", released);
        if let Err(e) = self.backend.delete_all().await {
            log::warn!("Backend clear failed: {}", e);
        }
    }

    /// Request a document to be shown. Unknown keys are kept and resolve to
    /// the first document.
    pub fn select(&self, key: impl Into<String>) {
        let mut state = self.state();
        state.requested_active = Some(key.into());
        state.notify();
    }

    /// Release every preview now. Later drops release nothing further.
    pub fn dispose(&self) {
        let mut state = self.state();
        if state.release_all() > 0 {
            state.notify();
        }
    }

    // ── Queries ──────────────────────────────────────────────────────────────

    pub fn documents(&self) -> Vec<UploadedDocument> {
        self.state().documents.clone()
    }

    pub fn document_ids(&self) -> Vec<String> {
        self.state().documents.iter().map(|d| d.document_id.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.state().documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state().documents.is_empty()
    }

    pub fn active_key(&self) -> Option<String> {
        let state = self.state();
        resolve_active_key(&state.documents, state.requested_active.as_deref())
    }

    pub fn active_document(&self) -> Option<UploadedDocument> {
        let state = self.state();
        let key = resolve_active_key(&state.documents, state.requested_active.as_deref())?;
        state.documents.iter().find(|d| d.key == key).cloned()
    }

    /// One-line description for the drop zone.
    pub fn summary(&self) -> String {
        let state = self.state();
        match state.documents.as_slice() {
            [] => "Supports .pdf files".to_string(),
            [only] => only.file.name.clone(),
            many => format!("{} PDF files selected", many.len()),
        }
    }

    /// Revision counter, bumped on every committed change.
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.state().revision.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api_client::{ApiDocument, ChatRequest, ChatResponse};
    use async_trait::async_trait;
    use chrono::{TimeZone, Utc};
    use std::collections::HashMap;

    #[derive(Default)]
    struct SpyBackend {
        uploads: Mutex<Vec<String>>,
        deleted: Mutex<Vec<String>>,
        delete_all_calls: Mutex<usize>,
        failing_uploads: Vec<String>,
        delete_error: Option<ApiError>,
    }

    #[async_trait]
    impl DocumentBackend for SpyBackend {
        async fn upload(&self, file: &LocalFile) -> Result<ApiDocument, ApiError> {
            tokio::task::yield_now().await;
            self.uploads.lock().unwrap().push(file.name.clone());
            if self.failing_uploads.contains(&file.name) {
                return Err(ApiError::Upload("Request failed with status 500".to_string()));
            }
            Ok(ApiDocument {
                document_id: format!("srv-{}", file.name),
                filename: file.name.clone(),
                stored_filename: format!("stored-{}", file.name),
                bytes_size: file.size,
                uploaded_at: "2026-10-19T09:00:00".to_string(),
            })
        }

        async fn delete_one(&self, document_id: &str) -> Result<(), ApiError> {
            self.deleted.lock().unwrap().push(document_id.to_string());
            match &self.delete_error {
                Some(e) => Err(e.clone()),
                None => Ok(()),
            }
        }

        async fn delete_all(&self) -> Result<(), ApiError> {
            *self.delete_all_calls.lock().unwrap() += 1;
            match &self.delete_error {
                Some(e) => Err(e.clone()),
                None => Ok(()),
            }
        }

        async fn chat(&self, _request: &ChatRequest) -> Result<ChatResponse, ApiError> {
            Err(ApiError::Chat("not used by the store".to_string()))
        }
    }

    #[derive(Default)]
    struct RevocationSpy {
        created: Mutex<Vec<String>>,
        revoked: Mutex<HashMap<String, usize>>,
    }

    impl RevocationSpy {
        fn created(&self) -> Vec<String> {
            self.created.lock().unwrap().clone()
        }

        fn revocations(&self, url: &str) -> usize {
            self.revoked.lock().unwrap().get(url).copied().unwrap_or(0)
        }

        fn total_revocations(&self) -> usize {
            self.revoked.lock().unwrap().values().sum()
        }
    }

    impl PreviewRegistry for RevocationSpy {
        fn create(&self, file: &LocalFile) -> String {
            let mut created = self.created.lock().unwrap();
            let url = format!("blob:test/{}/{}", created.len(), file.name);
            created.push(url.clone());
            url
        }

        fn revoke(&self, url: &str) {
            *self.revoked.lock().unwrap().entry(url.to_string()).or_default() += 1;
        }
    }

    fn pdf(name: &str) -> LocalFile {
        LocalFile::new(
            format!("/docs/{name}"),
            name,
            1024,
            Utc.timestamp_millis_opt(1_760_000_000_000).unwrap(),
            Some("application/pdf".to_string()),
        )
    }

    fn setup(backend: SpyBackend) -> (DocumentStore, Arc<SpyBackend>, Arc<RevocationSpy>) {
        let backend = Arc::new(backend);
        let previews = Arc::new(RevocationSpy::default());
        let store = DocumentStore::new(backend.clone(), previews.clone());
        (store, backend, previews)
    }

    fn document(key: &str) -> UploadedDocument {
        UploadedDocument {
            key: key.to_string(),
            document_id: format!("srv-{key}"),
            file: pdf(key),
            preview_url: format!("blob:test/{key}"),
        }
    }

    #[test]
    fn test_resolve_active_key() {
        assert_eq!(resolve_active_key(&[], None), None);
        assert_eq!(resolve_active_key(&[], Some("a")), None);

        let docs = vec![document("a"), document("b")];
        assert_eq!(resolve_active_key(&docs, Some("b")).as_deref(), Some("b"));
        assert_eq!(resolve_active_key(&docs, Some("stale")).as_deref(), Some("a"));
        assert_eq!(resolve_active_key(&docs, None).as_deref(), Some("a"));
    }

    #[tokio::test]
    async fn test_add_filters_non_pdf_and_uploads_in_order() {
        let (store, backend, previews) = setup(SpyBackend::default());
        let notes = LocalFile::new("/docs/notes.txt", "notes.txt", 5, Utc::now(), Some("text/plain".into()));

        let report = store
            .add_documents(vec![pdf("b.pdf"), notes, pdf("a.PDF")])
            .await;

        assert_eq!(report.rejected_non_pdf, vec!["notes.txt".to_string()]);
        assert_eq!(report.added.len(), 2);
        assert_eq!(*backend.uploads.lock().unwrap(), vec!["b.pdf", "a.PDF"]);
        assert_eq!(store.document_ids(), vec!["srv-b.pdf", "srv-a.PDF"]);
        assert_eq!(previews.created().len(), 2);
    }

    #[tokio::test]
    async fn test_adding_same_file_twice_keeps_one_entry() {
        let (store, backend, _previews) = setup(SpyBackend::default());

        store.add_documents(vec![pdf("a.pdf")]).await;
        let report = store.add_documents(vec![pdf("a.pdf")]).await;

        assert_eq!(store.len(), 1);
        assert_eq!(report.skipped_duplicates, vec![pdf("a.pdf").key()]);
        assert_eq!(backend.uploads.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_racing_adds_insert_once() {
        let (store, backend, previews) = setup(SpyBackend::default());

        let (first, second) = futures::join!(
            store.add_documents(vec![pdf("a.pdf")]),
            store.add_documents(vec![pdf("a.pdf")])
        );

        // Both calls snapshot an empty set, so both upload
        assert_eq!(backend.uploads.lock().unwrap().len(), 2);
        assert_eq!(first.added.len() + second.added.len(), 1);
        assert_eq!(store.len(), 1);
        assert_eq!(previews.created().len(), 1);
    }

    #[tokio::test]
    async fn test_failed_upload_is_dropped_silently() {
        // TODO: surface per-file upload failures to the user once the drop zone can show them
        let (store, _backend, previews) = setup(SpyBackend {
            failing_uploads: vec!["broken.pdf".to_string()],
            ..Default::default()
        });

        let report = store
            .add_documents(vec![pdf("broken.pdf"), pdf("ok.pdf")])
            .await;

        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].0, pdf("broken.pdf").key());
        assert_eq!(store.len(), 1);
        assert_eq!(store.documents()[0].file.name, "ok.pdf");
        assert_eq!(previews.created().len(), 1);
    }

    #[tokio::test]
    async fn test_remove_revokes_and_deletes_remotely() {
        let (store, backend, previews) = setup(SpyBackend::default());
        store.add_documents(vec![pdf("a.pdf"), pdf("b.pdf")]).await;
        let key_b = pdf("b.pdf").key();
        store.select(key_b.clone());
        assert_eq!(store.active_key(), Some(key_b.clone()));

        assert!(store.remove_document(&key_b).await);

        assert_eq!(store.len(), 1);
        assert_eq!(store.active_key(), Some(pdf("a.pdf").key()));
        assert_eq!(previews.revocations(&previews.created()[1]), 1);
        assert_eq!(previews.revocations(&previews.created()[0]), 0);
        assert_eq!(*backend.deleted.lock().unwrap(), vec!["srv-b.pdf"]);
    }

    #[tokio::test]
    async fn test_remove_is_final_even_when_backend_fails() {
        let (store, backend, _previews) = setup(SpyBackend {
            delete_error: Some(ApiError::Delete("Request failed with status 500".to_string())),
            ..Default::default()
        });
        store.add_documents(vec![pdf("a.pdf")]).await;

        assert!(store.remove_document(&pdf("a.pdf").key()).await);
        assert!(store.is_empty());
        assert_eq!(store.active_key(), None);
        assert_eq!(backend.deleted.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_remove_unknown_key_sends_nothing() {
        let (store, backend, _previews) = setup(SpyBackend::default());
        assert!(!store.remove_document("missing").await);
        assert!(backend.deleted.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_clear_all_revokes_each_preview_once() {
        let (store, backend, previews) = setup(SpyBackend::default());
        store
            .add_documents(vec![pdf("a.pdf"), pdf("b.pdf"), pdf("c.pdf")])
            .await;

        store.clear_all().await;

        assert!(store.is_empty());
        assert_eq!(store.active_key(), None);
        assert_eq!(*backend.delete_all_calls.lock().unwrap(), 1);
        for url in previews.created() {
            assert_eq!(previews.revocations(&url), 1, "{url}");
        }

        drop(store);
        assert_eq!(previews.total_revocations(), 3);
    }

    #[tokio::test]
    async fn test_clear_all_swallows_backend_failure() {
        let (store, _backend, _previews) = setup(SpyBackend {
            delete_error: Some(ApiError::Delete("unreachable".to_string())),
            ..Default::default()
        });
        store.add_documents(vec![pdf("a.pdf")]).await;
        store.clear_all().await;
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_teardown_revokes_outstanding_previews_once() {
        let (store, _backend, previews) = setup(SpyBackend::default());
        store.add_documents(vec![pdf("a.pdf"), pdf("b.pdf")]).await;
        let clone = store.clone();

        drop(store);
        assert_eq!(previews.total_revocations(), 0, "a live clone keeps previews");

        clone.dispose();
        drop(clone);
        assert_eq!(previews.total_revocations(), 2);
        for url in previews.created() {
            assert_eq!(previews.revocations(&url), 1);
        }
    }

    #[tokio::test]
    async fn test_summary_and_revision_notifications() {
        let (store, _backend, _previews) = setup(SpyBackend::default());
        let revisions = store.subscribe();
        assert_eq!(store.summary(), "Supports .pdf files");

        store.add_documents(vec![pdf("a.pdf")]).await;
        assert_eq!(store.summary(), "a.pdf");
        store.add_documents(vec![pdf("b.pdf"), pdf("c.pdf")]).await;
        assert_eq!(store.summary(), "3 PDF files selected");

        assert_eq!(*revisions.borrow(), 3);
        store.select("stale");
        assert_eq!(*revisions.borrow(), 4);
        assert_eq!(store.active_key(), Some(pdf("a.pdf").key()));
    }
}
