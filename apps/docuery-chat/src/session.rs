//! Chat session: the message log of one workspace and the single in-flight
//! question to the backend.

use std::sync::{Arc, Mutex, MutexGuard};

use docuery_data::{
    ApiError, ChatHistoryItem, ChatRequest, ChatResponse, ChatRole, DocumentBackend, DocumentStore,
};
use tokio::sync::watch;

use crate::markdown::clean_assistant_markdown;

/// Reply used when the user asks before uploading anything.
pub const NO_DOCUMENTS_REPLY: &str = "Please upload a PDF document first to get started.";
/// Reply used when a failure carries no message of its own.
pub const FALLBACK_ERROR_REPLY: &str = "Unable to get an answer right now.";
/// Shown while the log is empty.
pub const EMPTY_CHAT_PLACEHOLDER: &str = "Upload a document to begin...";
/// Number of trailing messages sent as history.
pub const HISTORY_WINDOW: usize = 10;

/// One turn in the log. Never modified after it is appended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatMessage {
    pub id: String,
    pub role: ChatRole,
    pub text: String,
}

impl ChatMessage {
    fn new(role: ChatRole, suffix: &str, text: impl Into<String>) -> Self {
        Self {
            id: format!("{}-{}", uuid::Uuid::now_v7(), suffix),
            role,
            text: text.into(),
        }
    }

    fn user(text: impl Into<String>) -> Self {
        Self::new(ChatRole::User, "user", text)
    }

    fn assistant(text: impl Into<String>) -> Self {
        Self::new(ChatRole::Assistant, "assistant", text)
    }

    fn assistant_error(text: impl Into<String>) -> Self {
        Self::new(ChatRole::Assistant, "assistant-error", text)
    }

    /// Text as it should be rendered: assistant answers go through the
    /// pseudo-table repair, user text is shown verbatim.
    pub fn display_text(&self) -> String {
        match self.role {
            ChatRole::Assistant => clean_assistant_markdown(&self.text),
            ChatRole::User => self.text.clone(),
        }
    }

    fn to_history(&self) -> ChatHistoryItem {
        ChatHistoryItem {
            role: self.role,
            text: self.text.clone(),
        }
    }
}

/// What a call to [`ChatSession::submit`] did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// Empty draft, or another question is still in flight
    Ignored,
    /// Answered locally because no documents are loaded
    NoDocuments,
    Answered(ChatResponse),
    Failed(ApiError),
}

struct ChatState {
    messages: Vec<ChatMessage>,
    sending: bool,
    revision: watch::Sender<u64>,
}

impl ChatState {
    fn push(&mut self, message: ChatMessage) {
        self.messages.push(message);
        self.revision.send_modify(|revision| *revision += 1);
    }
}

/// Shared handle to the chat of one workspace.
#[derive(Clone)]
pub struct ChatSession {
    state: Arc<Mutex<ChatState>>,
    store: DocumentStore,
    backend: Arc<dyn DocumentBackend>,
}

/// Clears the sending flag however the request ends.
struct SendingGuard<'a>(&'a ChatSession);

impl Drop for SendingGuard<'_> {
    fn drop(&mut self) {
        self.0.state().sending = false;
    }
}

impl ChatSession {
    pub fn new(store: DocumentStore, backend: Arc<dyn DocumentBackend>) -> Self {
        let (revision, _) = watch::channel(0);
        Self {
            state: Arc::new(Mutex::new(ChatState {
                messages: Vec::new(),
                sending: false,
                revision,
            })),
            store,
            backend,
        }
    }

    fn state(&self) -> MutexGuard<'_, ChatState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Ask a question about the loaded documents.
    ///
    /// The user message is appended right away. Exactly one assistant
    /// message follows, unless the call is ignored.
    pub async fn submit(&self, draft: &str) -> SubmitOutcome {
        let trimmed = draft.trim();

        let request = {
            let mut state = self.state();
            if trimmed.is_empty() || state.sending {
                return SubmitOutcome::Ignored;
            }

            state.push(ChatMessage::user(trimmed));

            let document_ids = self.store.document_ids();
            if document_ids.is_empty() {
                state.push(ChatMessage::assistant(NO_DOCUMENTS_REPLY));
                return SubmitOutcome::NoDocuments;
            }

            state.sending = true;
            let start = state.messages.len().saturating_sub(HISTORY_WINDOW);
            ChatRequest {
                message: trimmed.to_string(),
                document_ids,
                history: state.messages[start..].iter().map(ChatMessage::to_history).collect(),
            }
        };

        let _sending = SendingGuard(self);
        log::debug!(
            "Asking about {} documents with {} history turns",
            request.document_ids.len(),
            request.history.len()
        );

        match self.backend.chat(&request).await {
            Ok(response) => {
                self.state().push(ChatMessage::assistant(response.answer.clone()));
                SubmitOutcome::Answered(response)
            }
            Err(e) => {
                log::warn!("Chat request failed: {}", e);
                let text = match e.message().trim() {
                    "" => FALLBACK_ERROR_REPLY,
                    message => message,
                };
                self.state().push(ChatMessage::assistant_error(text));
                SubmitOutcome::Failed(e)
            }
        }
    }

    pub fn messages(&self) -> Vec<ChatMessage> {
        self.state().messages.clone()
    }

    pub fn len(&self) -> usize {
        self.state().messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state().messages.is_empty()
    }

    pub fn is_sending(&self) -> bool {
        self.state().sending
    }

    /// Revision counter, bumped on every appended message.
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.state().revision.subscribe()
    }
}
