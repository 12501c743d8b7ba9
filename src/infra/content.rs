//! Filesystem-backed page content.

use std::io::ErrorKind;
use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::fs;

use crate::application::content::{ContentError, ContentSource};
use crate::domain::identifier::PageId;

/// Reads `<root>/<id>.<extension>` (or `<root>/<id>` with no extension).
#[derive(Debug, Clone)]
pub struct FsContentStore {
    root: PathBuf,
    extension: Option<String>,
}

impl FsContentStore {
    pub fn new(root: impl Into<PathBuf>, extension: Option<String>) -> Self {
        let extension = extension
            .map(|ext| ext.trim_start_matches('.').to_string())
            .filter(|ext| !ext.is_empty());
        Self {
            root: root.into(),
            extension,
        }
    }

    fn path_for(&self, id: &PageId) -> PathBuf {
        match self.extension.as_deref() {
            Some(ext) => self.root.join(format!("{id}.{ext}")),
            None => self.root.join(id.as_str()),
        }
    }
}

#[async_trait]
impl ContentSource for FsContentStore {
    async fn load(&self, id: &PageId) -> Result<Arc<str>, ContentError> {
        let path = self.path_for(id);
        let bytes = match fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(err) if matches!(err.kind(), ErrorKind::NotFound | ErrorKind::IsADirectory) => {
                return Err(ContentError::NotFound);
            }
            Err(err) => return Err(ContentError::Io(err)),
        };

        String::from_utf8(bytes)
            .map(Arc::from)
            .map_err(|err| ContentError::Io(std::io::Error::new(ErrorKind::InvalidData, err)))
    }
}
