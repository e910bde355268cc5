//! Per-document asset directory layout
//!
//! ```text
//! <root>/<documentId>/
//!   image/<blockId>.<ext>
//!   ogsData/<blockId>.json
//!   iframeData/<blockId>.json
//!   pageImageData/<pageId>.json
//!   pageImageData/icon/<pageId>.<ext>
//!   pageImageData/cover/<pageId>.<ext>
//! ```

use std::path::{Path, PathBuf};

use pagemirror_core::domain::{BlockId, DocumentId};
use tracing::debug;

use crate::SyncError;

pub const IMAGE_DIR: &str = "image";
pub const BOOKMARK_DIR: &str = "ogsData";
pub const EMBED_DIR: &str = "iframeData";
pub const CHROME_DIR: &str = "pageImageData";

/// Subdirectories cleared before every reconciliation
pub const ASSET_DIRS: [&str; 4] = [BOOKMARK_DIR, IMAGE_DIR, EMBED_DIR, CHROME_DIR];

const DEFAULT_CHROME_EXTENSION: &str = "png";

/// Which half of a page's chrome a file belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChromeField {
    Icon,
    Cover,
}

impl ChromeField {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Icon => "icon",
            Self::Cover => "cover",
        }
    }

    fn allowed_extensions(self) -> &'static [&'static str] {
        match self {
            Self::Icon => &["png", "jpg", "svg"],
            Self::Cover => &["png", "jpg"],
        }
    }

    /// Extension for a chrome file hosted at `url`
    ///
    /// Taken from the file name at the end of the URL path, query ignored;
    /// anything outside the allowed set becomes `png`.
    pub fn extension_for(self, url: &str) -> &'static str {
        url::Url::parse(url)
            .ok()
            .and_then(|u| {
                u.path_segments()
                    .and_then(|mut segments| segments.next_back().map(str::to_string))
            })
            .and_then(|name| {
                name.rsplit_once('.')
                    .map(|(_, ext)| ext.to_ascii_lowercase())
            })
            .and_then(|ext| {
                self.allowed_extensions()
                    .iter()
                    .find(|allowed| **allowed == ext)
                    .copied()
            })
            .unwrap_or(DEFAULT_CHROME_EXTENSION)
    }
}

/// Resolves asset paths beneath a root directory
#[derive(Debug, Clone)]
pub struct AssetLayout {
    root: PathBuf,
}

impl AssetLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn document_dir(&self, document_id: &DocumentId) -> PathBuf {
        self.root.join(document_id.as_str())
    }

    pub fn image_path(&self, document_id: &DocumentId, block_id: &BlockId, ext: &str) -> PathBuf {
        self.document_dir(document_id)
            .join(IMAGE_DIR)
            .join(format!("{block_id}.{ext}"))
    }

    pub fn bookmark_path(&self, document_id: &DocumentId, block_id: &BlockId) -> PathBuf {
        self.document_dir(document_id)
            .join(BOOKMARK_DIR)
            .join(format!("{block_id}.json"))
    }

    pub fn embed_path(&self, document_id: &DocumentId, block_id: &BlockId) -> PathBuf {
        self.document_dir(document_id)
            .join(EMBED_DIR)
            .join(format!("{block_id}.json"))
    }

    /// Chrome JSON for a nested page block or the document itself
    pub fn chrome_path(&self, document_id: &DocumentId, page_id: &str) -> PathBuf {
        self.document_dir(document_id)
            .join(CHROME_DIR)
            .join(format!("{page_id}.json"))
    }

    pub fn chrome_file_path(
        &self,
        document_id: &DocumentId,
        field: ChromeField,
        page_id: &str,
        ext: &str,
    ) -> PathBuf {
        self.document_dir(document_id)
            .join(CHROME_DIR)
            .join(field.as_str())
            .join(format!("{page_id}.{ext}"))
    }

    /// Creates the document's asset subdirectories, emptying any that exist
    pub async fn prepare(&self, document_id: &DocumentId) -> Result<(), SyncError> {
        let base = self.document_dir(document_id);
        for name in ASSET_DIRS {
            let dir = base.join(name);
            match tokio::fs::remove_dir_all(&dir).await {
                Ok(()) => debug!(path = %dir.display(), "Cleared asset directory"),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(SyncError::asset_dir(&dir)(e)),
            }
            tokio::fs::create_dir_all(&dir)
                .await
                .map_err(SyncError::asset_dir(&dir))?;
        }
        Ok(())
    }

    /// Removes the document's whole asset tree
    ///
    /// Returns `false` when there was nothing to remove.
    pub async fn remove(&self, document_id: &DocumentId) -> Result<bool, SyncError> {
        let dir = self.document_dir(document_id);
        match tokio::fs::remove_dir_all(&dir).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(SyncError::asset_dir(dir)(e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(id: &str) -> DocumentId {
        DocumentId::new(id.to_string()).unwrap()
    }

    #[test]
    fn test_paths() {
        let layout = AssetLayout::new("/assets");
        let d = doc("doc-a");
        let b = BlockId::new("blk-1".to_string()).unwrap();

        assert_eq!(
            layout.image_path(&d, &b, "jpg"),
            PathBuf::from("/assets/doc-a/image/blk-1.jpg")
        );
        assert_eq!(
            layout.bookmark_path(&d, &b),
            PathBuf::from("/assets/doc-a/ogsData/blk-1.json")
        );
        assert_eq!(
            layout.embed_path(&d, &b),
            PathBuf::from("/assets/doc-a/iframeData/blk-1.json")
        );
        assert_eq!(
            layout.chrome_file_path(&d, ChromeField::Cover, "blk-1", "png"),
            PathBuf::from("/assets/doc-a/pageImageData/cover/blk-1.png")
        );
    }

    #[test]
    fn test_chrome_extension_rules() {
        assert_eq!(
            ChromeField::Icon.extension_for("https://files.example/a/icon.svg?X=1"),
            "svg"
        );
        assert_eq!(
            ChromeField::Cover.extension_for("https://files.example/a/cover.svg"),
            "png"
        );
        assert_eq!(
            ChromeField::Cover.extension_for("https://files.example/a/cover.JPG"),
            "jpg"
        );
        assert_eq!(
            ChromeField::Icon.extension_for("https://files.example/v1.2/icon"),
            "png"
        );
    }

    #[tokio::test]
    async fn test_prepare_clears_stale_files() {
        let dir = tempfile::tempdir().unwrap();
        let layout = AssetLayout::new(dir.path());
        let d = doc("doc-a");

        let stale = layout.document_dir(&d).join(IMAGE_DIR).join("old.png");
        std::fs::create_dir_all(stale.parent().unwrap()).unwrap();
        std::fs::write(&stale, b"old").unwrap();

        layout.prepare(&d).await.unwrap();

        assert!(!stale.exists());
        for name in ASSET_DIRS {
            let sub = layout.document_dir(&d).join(name);
            assert!(sub.is_dir());
            assert_eq!(std::fs::read_dir(&sub).unwrap().count(), 0);
        }
    }

    #[tokio::test]
    async fn test_remove_document_tree() {
        let dir = tempfile::tempdir().unwrap();
        let layout = AssetLayout::new(dir.path());
        let d = doc("doc-a");

        assert!(!layout.remove(&d).await.unwrap());
        layout.prepare(&d).await.unwrap();
        assert!(layout.remove(&d).await.unwrap());
        assert!(!layout.document_dir(&d).exists());
    }
}
