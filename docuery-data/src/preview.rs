//! Revocable preview handles for local files.
//!
//! A preview URL lets the viewer render a file without going back to the
//! backend. Every minted URL must be revoked exactly once.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, RwLock};

use crate::local_file::LocalFile;

const BLOB_SCHEME_PREFIX: &str = "blob:docuery/";

/// Mints and releases preview URLs.
pub trait PreviewRegistry: Send + Sync {
    /// Create a new preview URL for `file`.
    fn create(&self, file: &LocalFile) -> String;

    /// Release a URL returned by [`PreviewRegistry::create`].
    fn revoke(&self, url: &str);
}

/// In-process registry mapping `blob:docuery/<uuid>` URLs to file paths.
#[derive(Debug, Clone, Default)]
pub struct BlobUrlRegistry(Arc<RwLock<HashMap<String, PathBuf>>>);

impl BlobUrlRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Path behind a live URL, `None` once revoked.
    pub fn resolve(&self, url: &str) -> Option<PathBuf> {
        self.0.read().ok()?.get(url).cloned()
    }

    /// Number of URLs minted and not yet revoked.
    pub fn live_count(&self) -> usize {
        self.0.read().map(|entries| entries.len()).unwrap_or(0)
    }
}

impl PreviewRegistry for BlobUrlRegistry {
    fn create(&self, file: &LocalFile) -> String {
        let url = format!("{}{}", BLOB_SCHEME_PREFIX, uuid::Uuid::now_v7());
        match self.0.write() {
            Ok(mut entries) => {
                entries.insert(url.clone(), file.path.clone());
            }
            Err(e) => log::error!("Preview registry lock poisoned: {}", e),
        }
        log::debug!("Minted preview {} for {}", url, file.name);
        url
    }

    fn revoke(&self, url: &str) {
        let removed = self
            .0
            .write()
            .map(|mut entries| entries.remove(url).is_some())
            .unwrap_or(false);
        if removed {
            log::debug!("Revoked preview {}", url);
        } else {
            log::debug!("Revoke of unknown preview {} ignored", url);
        }
    }
}
