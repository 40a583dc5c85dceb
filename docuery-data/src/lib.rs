pub mod api_client;
pub mod config;
pub mod documents;
pub mod error;
pub mod local_file;
pub mod preview;
pub mod storage;

pub use api_client::{
    swap_local_port, ApiClient, ApiDocument, ChatHistoryItem, ChatRequest, ChatResponse, ChatRole,
    Citation, DocumentBackend,
};
pub use config::{ClientConfig, DEFAULT_API_BASE_URL};
pub use documents::{resolve_active_key, AddReport, DocumentStore, UploadedDocument};
pub use error::ApiError;
pub use local_file::{LocalFile, PDF_MIME_TYPE};
pub use preview::{BlobUrlRegistry, PreviewRegistry};
pub use storage::{JsonFileStorage, KeyValueStorage, MemoryStorage};
