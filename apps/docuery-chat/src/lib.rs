//! Docuery Chat App
//!
//! Question answering over the documents of a workspace, with repair of the
//! backend's malformed table answers.

pub mod markdown;
pub mod session;

pub use markdown::clean_assistant_markdown;
pub use session::{
    ChatMessage, ChatSession, SubmitOutcome, EMPTY_CHAT_PLACEHOLDER, FALLBACK_ERROR_REPLY,
    HISTORY_WINDOW, NO_DOCUMENTS_REPLY,
};
