//! In-process stores for tests and ephemeral sessions.

use std::collections::{BTreeMap, HashMap};

use courseforge_core::{AttachmentId, ProjectId};

use crate::error::StorageError;
use crate::traits::{AssetKind, AssetRecord, AssetStore, BlobStore};

#[derive(Debug, Default)]
pub struct MemoryBlobStore {
    blobs: HashMap<String, String>,
    fail_writes: bool,
    writes: usize,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds a raw body, bypassing any encoding the caller would normally do.
    pub fn with_blob(key: impl Into<String>, body: impl Into<String>) -> Self {
        let mut store = Self::default();
        store.blobs.insert(key.into(), body.into());
        store
    }

    /// While set, every `store` and `remove` fails without touching the data.
    pub fn set_fail_writes(&mut self, fail: bool) {
        self.fail_writes = fail;
    }

    /// Number of successful writes so far.
    pub fn writes(&self) -> usize {
        self.writes
    }

    pub fn raw(&self, key: &str) -> Option<&str> {
        self.blobs.get(key).map(String::as_str)
    }

    fn check_writable(&self) -> Result<(), StorageError> {
        if self.fail_writes {
            return Err(StorageError::Unavailable("writes disabled".into()));
        }
        Ok(())
    }
}

impl BlobStore for MemoryBlobStore {
    fn load(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.blobs.get(key).cloned())
    }

    fn store(&mut self, key: &str, body: &str) -> Result<(), StorageError> {
        self.check_writable()?;
        self.blobs.insert(key.to_string(), body.to_string());
        self.writes += 1;
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), StorageError> {
        self.check_writable()?;
        self.blobs.remove(key);
        self.writes += 1;
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct MemoryAssetStore {
    assets: BTreeMap<(ProjectId, AttachmentId), AssetRecord>,
    fail_deletes: bool,
}

impl MemoryAssetStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// While set, deletions fail. Used to check that cleanup failures are
    /// not fatal to the caller.
    pub fn set_fail_deletes(&mut self, fail: bool) {
        self.fail_deletes = fail;
    }

    pub fn len(&self) -> usize {
        self.assets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.assets.is_empty()
    }

    fn delete_kind(&mut self, project_id: &ProjectId, kind: AssetKind) -> Result<usize, StorageError> {
        if self.fail_deletes {
            return Err(StorageError::Unavailable("deletes disabled".into()));
        }
        let before = self.assets.len();
        self.assets
            .retain(|(owner, _), record| !(owner == project_id && record.kind == kind));
        Ok(before - self.assets.len())
    }
}

impl AssetStore for MemoryAssetStore {
    fn put_asset(&mut self, record: AssetRecord) -> Result<(), StorageError> {
        let key = (record.project_id.clone(), record.attachment_id.clone());
        self.assets.insert(key, record);
        Ok(())
    }

    fn get_asset(
        &self,
        project_id: &ProjectId,
        attachment_id: &AttachmentId,
    ) -> Result<Option<AssetRecord>, StorageError> {
        Ok(self
            .assets
            .get(&(project_id.clone(), attachment_id.clone()))
            .cloned())
    }

    fn delete_source_document(&mut self, project_id: &ProjectId) -> Result<bool, StorageError> {
        Ok(self.delete_kind(project_id, AssetKind::SourceDocument)? > 0)
    }

    fn delete_attachments(&mut self, project_id: &ProjectId) -> Result<usize, StorageError> {
        self.delete_kind(project_id, AssetKind::TableImage)
    }
}
