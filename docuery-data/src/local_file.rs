//! Local file handles picked or dropped by the user.

use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};
use std::time::SystemTime;

pub const PDF_MIME_TYPE: &str = "application/pdf";

/// A user-selected file on the local filesystem.
///
/// The handle is a snapshot of the metadata at selection time; the bytes are
/// only read when the file is uploaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalFile {
    pub path: PathBuf,
    pub name: String,
    pub size: u64,
    pub last_modified: DateTime<Utc>,
    /// Declared MIME type, if one could be determined
    pub mime_type: Option<String>,
}

impl LocalFile {
    pub fn new(
        path: impl Into<PathBuf>,
        name: impl Into<String>,
        size: u64,
        last_modified: DateTime<Utc>,
        mime_type: Option<String>,
    ) -> Self {
        Self {
            path: path.into(),
            name: name.into(),
            size,
            last_modified,
            mime_type,
        }
    }

    /// Snapshot a file's metadata from disk.
    pub fn from_path(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let path = path.as_ref();
        let metadata = std::fs::metadata(path)?;
        if !metadata.is_file() {
            return Err(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                format!("{} is not a regular file", path.display()),
            ));
        }

        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| path.to_string_lossy().to_string());
        let modified = metadata.modified().unwrap_or(SystemTime::UNIX_EPOCH);
        let mime_type = mime_guess::from_path(path)
            .first()
            .map(|mime| mime.essence_str().to_string());

        Ok(Self {
            path: path.to_path_buf(),
            name,
            size: metadata.len(),
            last_modified: DateTime::<Utc>::from(modified),
            mime_type,
        })
    }

    /// De-duplication key: name, size and modification time in milliseconds.
    pub fn key(&self) -> String {
        format!(
            "{}-{}-{}",
            self.name,
            self.size,
            self.last_modified.timestamp_millis()
        )
    }

    /// PDF by declared MIME type or by a case-insensitive `.pdf` suffix.
    pub fn is_pdf(&self) -> bool {
        self.mime_type.as_deref() == Some(PDF_MIME_TYPE)
            || self.name.to_lowercase().ends_with(".pdf")
    }

    pub async fn read_bytes(&self) -> std::io::Result<Vec<u8>> {
        tokio::fs::read(&self.path).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn file(name: &str, mime: Option<&str>) -> LocalFile {
        LocalFile::new(
            format!("/tmp/{name}"),
            name,
            2048,
            Utc.timestamp_millis_opt(1_700_000_000_123).unwrap(),
            mime.map(str::to_string),
        )
    }

    #[test]
    fn test_key_combines_name_size_and_mtime() {
        assert_eq!(file("report.pdf", None).key(), "report.pdf-2048-1700000000123");
    }

    #[test]
    fn test_pdf_detection() {
        assert!(file("report.PDF", None).is_pdf());
        assert!(file("scan", Some(PDF_MIME_TYPE)).is_pdf());
        assert!(!file("notes.txt", Some("text/plain")).is_pdf());
        assert!(!file("archive.pdf.zip", None).is_pdf());
    }

    #[test]
    fn test_from_path_reads_metadata() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("paper.pdf");
        std::fs::write(&path, b"%PDF-1.7 test").unwrap();

        let local = LocalFile::from_path(&path).unwrap();
        assert_eq!(local.name, "paper.pdf");
        assert_eq!(local.size, 13);
        assert_eq!(local.mime_type.as_deref(), Some(PDF_MIME_TYPE));
        assert!(local.is_pdf());
    }

    #[test]
    fn test_from_path_rejects_directories() {
        let dir = tempfile::tempdir().unwrap();
        assert!(LocalFile::from_path(dir.path()).is_err());
    }
}
