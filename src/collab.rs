//! External collaborator contracts.
//!
//! Format-specific document parsing and real object storage live outside
//! this crate; the pipeline consumes them through these narrow seams.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Mutex;

use crate::{Error, Result};

/// An image embedded in a source document, awaiting description.
#[derive(Debug, Clone)]
pub struct ImageAttachment {
    pub name: String,
    pub mime_type: String,
    pub data: Vec<u8>,
}

/// Text and auxiliary images extracted from one document.
#[derive(Debug, Clone, Default)]
pub struct ExtractedDocument {
    pub text: String,
    pub images: Vec<ImageAttachment>,
}

/// Turns raw file bytes into text plus image attachments.
///
/// Implementations own the format-specific parsing (PDF, DOCX, ...); the
/// core only assumes UTF-8 text out the other side.
pub trait DocumentSource {
    fn extract(
        &self,
        file_name: &str,
        bytes: &[u8],
    ) -> impl Future<Output = Result<ExtractedDocument>> + Send;
}

/// Blob storage for uploaded documents, keyed by file id.
pub trait ObjectStorage {
    fn download(&self, id: &str) -> impl Future<Output = Result<Vec<u8>>> + Send;
    fn upload(&self, path: &str, bytes: &[u8]) -> impl Future<Output = Result<()>> + Send;
}

/// Treats the whole file as UTF-8 text with no images. Good enough for
/// `.txt`-style inputs and for tests.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlainTextSource;

impl DocumentSource for PlainTextSource {
    async fn extract(&self, _file_name: &str, bytes: &[u8]) -> Result<ExtractedDocument> {
        Ok(ExtractedDocument {
            text: String::from_utf8_lossy(bytes).into_owned(),
            images: Vec::new(),
        })
    }
}

/// In-memory object storage.
#[derive(Debug, Default)]
pub struct MemoryObjectStorage {
    blobs: Mutex<HashMap<String, Vec<u8>>>,
}

impl MemoryObjectStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ObjectStorage for MemoryObjectStorage {
    async fn download(&self, id: &str) -> Result<Vec<u8>> {
        let blobs = self
            .blobs
            .lock()
            .map_err(|_| Error::Storage("object storage lock poisoned".to_string()))?;
        blobs
            .get(id)
            .cloned()
            .ok_or_else(|| Error::Storage(format!("object not found: {}", id)))
    }

    async fn upload(&self, path: &str, bytes: &[u8]) -> Result<()> {
        let mut blobs = self
            .blobs
            .lock()
            .map_err(|_| Error::Storage("object storage lock poisoned".to_string()))?;
        blobs.insert(path.to_string(), bytes.to_vec());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn plain_text_source_passes_bytes_through() {
        let doc = PlainTextSource
            .extract("notes.txt", "Alice works at Acme.".as_bytes())
            .await
            .unwrap();
        assert_eq!(doc.text, "Alice works at Acme.");
        assert!(doc.images.is_empty());
    }

    #[tokio::test]
    async fn plain_text_source_tolerates_invalid_utf8() {
        let doc = PlainTextSource
            .extract("bin.txt", &[0x66, 0xff, 0x6f])
            .await
            .unwrap();
        assert!(doc.text.contains('f'));
    }

    #[tokio::test]
    async fn memory_storage_round_trips() {
        let storage = MemoryObjectStorage::new();
        storage.upload("file-1", b"payload").await.unwrap();
        let bytes = storage.download("file-1").await.unwrap();
        assert_eq!(bytes, b"payload");
    }

    #[tokio::test]
    async fn memory_storage_missing_object_is_storage_error() {
        let storage = MemoryObjectStorage::new();
        let err = storage.download("nope").await.unwrap_err();
        assert!(matches!(err, Error::Storage(_)));
    }
}
