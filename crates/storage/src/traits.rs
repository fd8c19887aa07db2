use std::fmt;

use courseforge_core::{AttachmentId, ProjectId};

use crate::error::StorageError;

/// Key/value persistence for whole serialized documents.
///
/// A document is read and written as one unit: `store` either replaces the
/// previous body completely or fails and leaves it untouched.
pub trait BlobStore {
    fn load(&self, key: &str) -> Result<Option<String>, StorageError>;

    fn store(&mut self, key: &str, body: &str) -> Result<(), StorageError>;

    /// Removing an absent key is not an error.
    fn remove(&mut self, key: &str) -> Result<(), StorageError>;
}

/// What a stored binary asset is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AssetKind {
    /// The imported source document itself.
    SourceDocument,
    /// An image extracted from a table cell of the source document.
    TableImage,
}

impl AssetKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SourceDocument => "source_document",
            Self::TableImage => "table_image",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "source_document" => Some(Self::SourceDocument),
            "table_image" => Some(Self::TableImage),
            _ => None,
        }
    }
}

impl fmt::Display for AssetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetRecord {
    pub project_id: ProjectId,
    pub attachment_id: AttachmentId,
    pub kind: AssetKind,
    pub bytes: Vec<u8>,
}

/// Binary assets owned by a project, addressed by `(project, attachment)`.
///
/// The project document only references assets by id; the bytes live here.
pub trait AssetStore {
    fn put_asset(&mut self, record: AssetRecord) -> Result<(), StorageError>;

    fn get_asset(
        &self,
        project_id: &ProjectId,
        attachment_id: &AttachmentId,
    ) -> Result<Option<AssetRecord>, StorageError>;

    /// Deletes the project's source document. Returns whether one existed.
    fn delete_source_document(&mut self, project_id: &ProjectId) -> Result<bool, StorageError>;

    /// Deletes every table image of the project. Returns how many were removed.
    fn delete_attachments(&mut self, project_id: &ProjectId) -> Result<usize, StorageError>;
}
