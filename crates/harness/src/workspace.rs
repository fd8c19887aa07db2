use std::path::PathBuf;

use courseforge_core::{DraftManifest, FixedClock, HashAlgo, Project, ProjectId};
use courseforge_engine::{EngineError, Mutation, ProjectPatch, ProjectStore, StoreConfig};
use courseforge_storage::{MemoryAssetStore, MemoryBlobStore, SqliteStorage, StorageError};
use tempfile::TempDir;

use crate::fixtures;

/// A store over in-memory storage with a deterministic clock.
pub struct TestWorkspace {
    pub store: ProjectStore<MemoryBlobStore>,
    pub assets: MemoryAssetStore,
}

impl TestWorkspace {
    pub fn new() -> Self {
        Self::with_config(StoreConfig::default())
    }

    pub fn with_hash_algo(algo: HashAlgo) -> Self {
        Self::with_config(StoreConfig::default().with_hash_algo(algo))
    }

    pub fn with_config(config: StoreConfig) -> Self {
        Self::from_blobs(MemoryBlobStore::new(), config)
    }

    /// Starts from whatever `blobs` already holds.
    pub fn from_blobs(blobs: MemoryBlobStore, config: StoreConfig) -> Self {
        Self {
            store: ProjectStore::with_config(blobs, config, Box::new(FixedClock::default())),
            assets: MemoryAssetStore::new(),
        }
    }

    pub fn create_project(&mut self, name: &str) -> Result<ProjectId, EngineError> {
        Ok(self.store.create(name, None)?.id)
    }

    /// Attaches `manifest` the way the import flow does.
    pub fn import(&mut self, id: &ProjectId, manifest: DraftManifest) -> Result<Project, EngineError> {
        let source_doc = fixtures::source_doc(&manifest);
        self.store.update(ProjectPatch::new(id.clone()).with(Mutation::ReplaceManifest {
            manifest,
            outline_disabled_ids: None,
            source_doc: Some(source_doc),
        }))
    }

    /// Creates a project, imports `sections` and approves it.
    pub fn approved_project(&mut self, sections: &[(&str, bool)]) -> Result<ProjectId, EngineError> {
        let id = self.create_project("Onboarding")?;
        self.import(&id, fixtures::manifest(sections))?;
        self.store.approve_project(&id)?;
        Ok(id)
    }

    pub fn project(&self, id: &ProjectId) -> Result<Project, EngineError> {
        self.store
            .get(id)?
            .ok_or_else(|| EngineError::ProjectNotFound(id.clone()))
    }
}

impl Default for TestWorkspace {
    fn default() -> Self {
        Self::new()
    }
}

/// A store over an on-disk SQLite file that can be closed and reopened.
pub struct SqliteWorkspace {
    pub store: ProjectStore<SqliteStorage>,
    dir: TempDir,
}

impl SqliteWorkspace {
    pub fn open() -> Result<Self, StorageError> {
        let dir = tempfile::tempdir().map_err(|err| StorageError::Unavailable(err.to_string()))?;
        let store = Self::open_store(&dir.path().join("projects.db"))?;
        Ok(Self { store, dir })
    }

    pub fn path(&self) -> PathBuf {
        self.dir.path().join("projects.db")
    }

    /// Drops the open connection and opens the same file again.
    pub fn reopen(self) -> Result<Self, StorageError> {
        let Self { store, dir } = self;
        drop(store);
        let store = Self::open_store(&dir.path().join("projects.db"))?;
        Ok(Self { store, dir })
    }

    fn open_store(path: &std::path::Path) -> Result<ProjectStore<SqliteStorage>, StorageError> {
        Ok(ProjectStore::with_config(
            SqliteStorage::open(path)?,
            StoreConfig::default(),
            Box::new(FixedClock::default()),
        ))
    }
}
