//! HTTP client for the document question-answering backend.
//!
//! All requests go to the configured base URL (default
//! `http://localhost:8000/api`) and follow these contracts:
//!
//!   POST   /documents/upload   → multipart `files`, returns `{documents: [...]}`
//!   DELETE /documents/{id}     → delete one document (404 counts as done)
//!   DELETE /documents          → delete every document
//!   POST   /chat               → JSON question, returns answer + citations

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use reqwest::multipart::{Form, Part};
use reqwest::{RequestBuilder, Response, StatusCode};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::config::ClientConfig;
use crate::error::ApiError;
use crate::local_file::{LocalFile, PDF_MIME_TYPE};

// ─── Wire types ───────────────────────────────────────────────────────────────

/// Document metadata assigned by the backend on upload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiDocument {
    pub document_id: String,
    pub filename: String,
    pub stored_filename: String,
    pub bytes_size: u64,
    pub uploaded_at: String,
}

#[derive(Debug, Deserialize)]
struct UploadDocumentsResponse {
    #[serde(default)]
    documents: Vec<ApiDocument>,
}

/// Author of a chat turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Assistant,
}

/// One prior turn sent as conversational context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatHistoryItem {
    pub role: ChatRole,
    pub text: String,
}

/// Body of `POST /chat`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatRequest {
    pub message: String,
    pub document_ids: Vec<String>,
    pub history: Vec<ChatHistoryItem>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Citation {
    pub document_id: String,
    pub filename: String,
    #[serde(default)]
    pub page: Option<u32>,
    pub snippet: String,
}

/// Answer returned by `POST /chat`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatResponse {
    pub answer: String,
    #[serde(default)]
    pub citations: Vec<Citation>,
    #[serde(default)]
    pub used_document_ids: Vec<String>,
}

// ─── Backend seam ─────────────────────────────────────────────────────────────

/// The four operations the client needs from the backend.
///
/// The document store and the chat session only talk to this trait, so a
/// session can run against the HTTP client or an in-process double.
#[async_trait]
pub trait DocumentBackend: Send + Sync {
    async fn upload(&self, file: &LocalFile) -> Result<ApiDocument, ApiError>;

    async fn delete_one(&self, document_id: &str) -> Result<(), ApiError>;

    async fn delete_all(&self) -> Result<(), ApiError>;

    async fn chat(&self, request: &ChatRequest) -> Result<ChatResponse, ApiError>;
}

// ─── Client ───────────────────────────────────────────────────────────────────

/// Async HTTP implementation of [`DocumentBackend`].
#[derive(Debug, Clone)]
pub struct ApiClient {
    config: ClientConfig,
    /// Base URL tried once when the primary host refuses the connection
    fallback_base_url: Option<String>,
    http: reqwest::Client,
}

impl ApiClient {
    pub fn new(config: ClientConfig) -> Self {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .unwrap_or_else(|e| {
                log::warn!("Falling back to default HTTP client: {}", e);
                reqwest::Client::new()
            });
        // Only the implicit default base URL gets an alternate
        let fallback_base_url = if config.base_url_explicit {
            None
        } else {
            swap_local_port(&config.base_url).map(|url| url.trim_end_matches('/').to_string())
        };

        Self {
            config,
            fallback_base_url,
            http,
        }
    }

    #[cfg(test)]
    fn with_fallback_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.fallback_base_url = Some(base_url.into());
        self
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url, path)
    }

    /// Alternate URL tried after a connection failure.
    fn fallback_url(&self, path: &str) -> Option<String> {
        self.fallback_base_url
            .as_ref()
            .map(|base_url| format!("{}{}", base_url, path))
    }

    /// Send a request built by `build`, retrying once against the fallback
    /// URL when the primary host could not be reached at all.
    async fn perform<F>(&self, path: &str, build: F) -> Result<Response, reqwest::Error>
    where
        F: Fn(&str) -> RequestBuilder + Send,
    {
        let primary = self.url(path);
        log::debug!("Backend request to {}", primary);

        match build(&primary).send().await {
            Ok(response) => Ok(response),
            Err(err) if err.is_connect() => match self.fallback_url(path) {
                Some(fallback) => {
                    log::warn!(
                        "Could not connect to {} ({}), retrying once against {}",
                        primary,
                        err,
                        fallback
                    );
                    build(&fallback).send().await
                }
                None => Err(err),
            },
            Err(err) => Err(err),
        }
    }
}

#[async_trait]
impl DocumentBackend for ApiClient {
    async fn upload(&self, file: &LocalFile) -> Result<ApiDocument, ApiError> {
        let bytes = file
            .read_bytes()
            .await
            .map_err(|e| ApiError::Upload(format!("Could not read {}: {}", file.name, e)))?;
        let file_name = file.name.clone();

        let response = self
            .perform("/documents/upload", |url| {
                let part = Part::bytes(bytes.clone())
                    .file_name(file_name.clone())
                    .headers(pdf_part_headers());
                self.http.post(url).multipart(Form::new().part("files", part))
            })
            .await
            .map_err(|e| ApiError::Upload(e.to_string()))?;

        if !response.status().is_success() {
            return Err(ApiError::Upload(parse_error(response).await));
        }

        let body: UploadDocumentsResponse = response
            .json()
            .await
            .map_err(|e| ApiError::Upload(e.to_string()))?;

        let document = body.documents.into_iter().next().ok_or_else(|| {
            ApiError::Upload("Upload succeeded but no document metadata was returned.".to_string())
        })?;

        log::info!("Uploaded {} as {}", file.name, document.document_id);
        Ok(document)
    }

    async fn delete_one(&self, document_id: &str) -> Result<(), ApiError> {
        let path = format!("/documents/{}", document_id);
        let response = self
            .perform(&path, |url| self.http.delete(url))
            .await
            .map_err(|e| ApiError::Delete(e.to_string()))?;

        let status = response.status();
        if status.is_success() || status == StatusCode::NOT_FOUND {
            Ok(())
        } else {
            Err(ApiError::Delete(parse_error(response).await))
        }
    }

    async fn delete_all(&self) -> Result<(), ApiError> {
        let response = self
            .perform("/documents", |url| self.http.delete(url))
            .await
            .map_err(|e| ApiError::Delete(e.to_string()))?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(ApiError::Delete(parse_error(response).await))
        }
    }

    async fn chat(&self, request: &ChatRequest) -> Result<ChatResponse, ApiError> {
        let response = self
            .perform("/chat", |url| self.http.post(url).json(request))
            .await
            .map_err(|e| ApiError::Chat(e.to_string()))?;

        if !response.status().is_success() {
            return Err(ApiError::Chat(parse_error(response).await));
        }

        response
            .json::<ChatResponse>()
            .await
            .map_err(|e| ApiError::Chat(e.to_string()))
    }
}

// ─── Helpers ──────────────────────────────────────────────────────────────────

fn pdf_part_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static(PDF_MIME_TYPE));
    headers
}

/// Swap port 8000 and 8001 on a `localhost` URL. Any other URL has no
/// fallback.
pub fn swap_local_port(raw: &str) -> Option<String> {
    let mut url = Url::parse(raw).ok()?;
    if url.host_str() != Some("localhost") {
        return None;
    }

    let swapped = match url.port() {
        Some(8000) => 8001,
        Some(8001) => 8000,
        _ => return None,
    };
    url.set_port(Some(swapped)).ok()?;
    Some(url.to_string())
}

/// Human-readable message for a failed response: the JSON `detail` string
/// when there is one, otherwise the status code.
async fn parse_error(response: Response) -> String {
    let status = response.status();
    let text = response.text().await.unwrap_or_default();
    detail_message(&text).unwrap_or_else(|| format!("Request failed with status {}", status.as_u16()))
}

fn detail_message(body: &str) -> Option<String> {
    let payload: serde_json::Value = serde_json::from_str(body).ok()?;
    payload
        .get("detail")
        .and_then(|detail| detail.as_str())
        .map(str::to_string)
}
