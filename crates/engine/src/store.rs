//! The project document store.
//!
//! Every project lives in one serialized collection under a single key. A
//! write reads the whole collection, changes one project on a copy and
//! stores the collection back in one `BlobStore::store` call, so a failure
//! at any point leaves the previous collection in place.

use tracing::{debug, info, warn};

use courseforge_core::{
    ApprovedManifest, Clock, ContentHasher, CorruptStoreError, GenerationSettingsInput, JobId,
    JobRecord, Project, ProjectCollection, ProjectId, SectionId, SystemClock,
};
use courseforge_storage::{AssetStore, BlobStore};

use crate::config::StoreConfig;
use crate::error::EngineError;
use crate::manifest::{ApprovalHashes, approval_hashes, build_approved_manifest, project_draft_signature};
use crate::mutation::{Mutation, ProjectPatch, apply};
use crate::validation::{ValidationError, validate_description, validate_name};

/// An approval computed from a snapshot, not yet written.
///
/// Committing re-checks that the stored draft still matches
/// `manifest.draft_signature`; anything written in between wins.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingApproval {
    pub project_id: ProjectId,
    pub manifest: ApprovedManifest,
    pub hashes: ApprovalHashes,
    pub approved_by: Option<String>,
}

pub struct ProjectStore<B: BlobStore> {
    blobs: B,
    config: StoreConfig,
    hasher: ContentHasher,
    clock: Box<dyn Clock>,
}

impl<B: BlobStore> ProjectStore<B> {
    pub fn new(blobs: B) -> Self {
        Self::with_config(blobs, StoreConfig::default(), Box::new(SystemClock::new()))
    }

    pub fn with_config(blobs: B, config: StoreConfig, clock: Box<dyn Clock>) -> Self {
        let hasher = ContentHasher::new(config.hash_algo);
        Self {
            blobs,
            config,
            hasher,
            clock,
        }
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    pub fn hasher(&self) -> &ContentHasher {
        &self.hasher
    }

    pub fn blobs(&self) -> &B {
        &self.blobs
    }

    pub fn blobs_mut(&mut self) -> &mut B {
        &mut self.blobs
    }

    pub fn into_inner(self) -> B {
        self.blobs
    }

    /// The whole collection. An absent blob is an empty collection.
    pub fn read(&self) -> Result<ProjectCollection, EngineError> {
        match self.blobs.load(&self.config.storage_key)? {
            Some(raw) => Ok(ProjectCollection::parse(&raw)?),
            None => Ok(ProjectCollection::default()),
        }
    }

    fn write(&mut self, collection: &ProjectCollection) -> Result<(), EngineError> {
        let body = collection.serialize()?;
        ensure_readable(&body)
            .inspect_err(|err| warn!(error = %err, "refused to write unreadable collection"))?;
        self.blobs.store(&self.config.storage_key, &body)?;
        debug!(
            projects = collection.projects.len(),
            bytes = body.len(),
            "wrote project collection"
        );
        Ok(())
    }

    /// Projects, newest first.
    pub fn list(&self) -> Result<Vec<Project>, EngineError> {
        Ok(self.read()?.projects)
    }

    pub fn get(&self, id: &ProjectId) -> Result<Option<Project>, EngineError> {
        Ok(self.read()?.get(id).cloned())
    }

    pub fn create(&mut self, name: &str, description: Option<&str>) -> Result<Project, EngineError> {
        let mut collection = self.read()?;
        let name = validate_name(name)?;
        let description = validate_description(description)?;
        let now = self.clock.tick()?;
        let project = Project::new(ProjectId::generate(), name, description, now);
        collection.projects.insert(0, project.clone());
        self.write(&collection)?;
        info!(project_id = %project.id, "created project");
        Ok(project)
    }

    /// Applies the patch's intents in order to one project and writes the
    /// result. Nothing is written if any intent is rejected.
    pub fn update(&mut self, patch: ProjectPatch) -> Result<Project, EngineError> {
        let ProjectPatch { id, mutations } = patch;
        self.modify(&id, |project, now| {
            for mutation in mutations {
                apply(project, mutation, now)?;
            }
            Ok(())
        })
    }

    fn modify<F>(&mut self, id: &ProjectId, change: F) -> Result<Project, EngineError>
    where
        F: FnOnce(&mut Project, &str) -> Result<(), EngineError>,
    {
        let mut collection = self.read()?;
        let index = collection
            .position(id)
            .ok_or_else(|| EngineError::ProjectNotFound(id.clone()))?;
        let now = self.clock.tick()?;
        let mut next = collection.projects[index].clone();
        change(&mut next, &now)?;
        next.updated_at = now;
        collection.projects[index] = next.clone();
        self.write(&collection)?;
        Ok(next)
    }

    fn require(&self, id: &ProjectId) -> Result<Project, EngineError> {
        self.get(id)?
            .ok_or_else(|| EngineError::ProjectNotFound(id.clone()))
    }

    /// Removes the project and asks `assets` to drop its binaries. Asset
    /// failures are logged and do not block the delete. Unknown ids are a
    /// no-op. A corrupt collection fails before any asset is touched.
    pub fn delete(&mut self, id: &ProjectId, assets: &mut dyn AssetStore) -> Result<(), EngineError> {
        let mut collection = self.read()?;
        if let Err(err) = assets.delete_source_document(id) {
            warn!(project_id = %id, error = %err, "failed to delete source document");
        }
        if let Err(err) = assets.delete_attachments(id) {
            warn!(project_id = %id, error = %err, "failed to delete table images");
        }
        let before = collection.projects.len();
        collection.projects.retain(|project| &project.id != id);
        if collection.projects.len() != before {
            self.write(&collection)?;
            info!(project_id = %id, "deleted project");
        }
        Ok(())
    }

    /// Drops the stored collection. The way out of a corruption error.
    pub fn reset(&mut self) -> Result<(), EngineError> {
        self.blobs.remove(&self.config.storage_key)?;
        info!(key = %self.config.storage_key, "reset project store");
        Ok(())
    }

    /// Computes an approval from the current draft without writing it.
    pub fn prepare_approval(
        &mut self,
        id: &ProjectId,
        approved_by: Option<&str>,
    ) -> Result<PendingApproval, EngineError> {
        let project = self.require(id)?;
        let approved_at = self.clock.tick()?;
        let manifest = build_approved_manifest(&self.hasher, &project, &approved_at)
            .inspect_err(|err| warn!(project_id = %id, error = %err, "approval rejected"))?;
        let hashes = project
            .draft_manifest
            .as_ref()
            .map(|draft| approval_hashes(&self.hasher, draft, project.script_edits_by_node_id.as_ref()))
            .ok_or_else(|| ValidationError::field("draftManifest", "Draft manifest is missing."))?;
        Ok(PendingApproval {
            project_id: id.clone(),
            manifest,
            hashes,
            approved_by: approved_by.map(str::to_string),
        })
    }

    /// Writes a prepared approval if the stored draft still hashes to the
    /// signature it was computed from.
    pub fn commit_approval(&mut self, pending: PendingApproval) -> Result<Project, EngineError> {
        let PendingApproval {
            project_id,
            manifest,
            hashes,
            approved_by,
        } = pending;
        let hasher = self.hasher;
        let result = self.modify(&project_id, |project, now| {
            let current = project_draft_signature(&hasher, project)?;
            if current.as_deref() != Some(manifest.draft_signature.as_str()) {
                return Err(ValidationError::field(
                    "draftManifest",
                    "The draft changed while it was being approved.",
                )
                .into());
            }
            apply(
                project,
                Mutation::RecordApproval {
                    manifest,
                    hashes,
                    approved_by,
                },
                now,
            )?;
            Ok(())
        });
        match &result {
            Ok(project) => info!(project_id = %project.id, "approved project"),
            Err(err) => warn!(project_id = %project_id, error = %err, "approval rejected"),
        }
        result
    }

    pub fn approve_project(&mut self, id: &ProjectId) -> Result<Project, EngineError> {
        let pending = self.prepare_approval(id, None)?;
        self.commit_approval(pending)
    }

    pub fn reset_approval_to_draft(&mut self, id: &ProjectId) -> Result<Project, EngineError> {
        self.update(ProjectPatch::new(id.clone()).with(Mutation::ResetApproval))
    }

    pub fn save_script_draft(
        &mut self,
        id: &ProjectId,
        section_id: &SectionId,
        text: &str,
    ) -> Result<Project, EngineError> {
        self.update(ProjectPatch::new(id.clone()).with(Mutation::SaveScriptDraft {
            section_id: section_id.clone(),
            text: text.to_string(),
        }))
    }

    /// Drops one script draft. Without a draft for the section nothing is
    /// written and the project is returned as stored.
    pub fn discard_script_draft(
        &mut self,
        id: &ProjectId,
        section_id: &SectionId,
    ) -> Result<Project, EngineError> {
        let project = self.require(id)?;
        let has_draft = project
            .script_edits_by_node_id
            .as_ref()
            .is_some_and(|edits| edits.contains_key(section_id));
        if !has_draft {
            return Ok(project);
        }
        self.update(ProjectPatch::new(id.clone()).with(Mutation::DiscardScriptDraft(section_id.clone())))
    }

    pub fn set_generation_settings(
        &mut self,
        id: &ProjectId,
        input: GenerationSettingsInput,
    ) -> Result<Project, EngineError> {
        self.update(ProjectPatch::new(id.clone()).with(Mutation::SetGenerationSettings(input)))
    }

    pub fn start_generation_job(
        &mut self,
        id: &ProjectId,
        job_id: &JobId,
        initial: Option<JobRecord>,
        instance_id: Option<&str>,
    ) -> Result<Project, EngineError> {
        let project = self.update(ProjectPatch::new(id.clone()).with(Mutation::StartGenerationJob {
            job_id: job_id.clone(),
            initial,
            instance_id: instance_id.map(str::to_string),
        }))?;
        info!(project_id = %id, job_id = %job_id, "started generation job");
        Ok(project)
    }

    pub fn update_generation_job_status(
        &mut self,
        id: &ProjectId,
        record: JobRecord,
    ) -> Result<Project, EngineError> {
        self.update(ProjectPatch::new(id.clone()).with(Mutation::UpdateGenerationJobStatus(record)))
    }

    /// Records which worker runs the current job. Without a job nothing is
    /// written.
    pub fn set_generation_job_instance(
        &mut self,
        id: &ProjectId,
        instance_id: &str,
    ) -> Result<Project, EngineError> {
        let project = self.require(id)?;
        if project.generation_job.is_none() {
            return Ok(project);
        }
        self.update(
            ProjectPatch::new(id.clone())
                .with(Mutation::SetGenerationJobInstance(instance_id.to_string())),
        )
    }

    pub fn clear_generation_job(&mut self, id: &ProjectId) -> Result<Project, EngineError> {
        self.update(ProjectPatch::new(id.clone()).with(Mutation::ClearGenerationJob))
    }

    pub fn clear_cloud_outputs(&mut self, id: &ProjectId) -> Result<Project, EngineError> {
        self.update(ProjectPatch::new(id.clone()).with(Mutation::ClearCloudOutputs))
    }

    /// Deletes the imported document's binaries, then resets every field
    /// derived from the import. Asset failures abort before anything is
    /// written.
    pub fn remove_source_import(
        &mut self,
        id: &ProjectId,
        assets: &mut dyn AssetStore,
    ) -> Result<Project, EngineError> {
        self.require(id)?;
        assets.delete_source_document(id)?;
        let removed = assets.delete_attachments(id)?;
        debug!(project_id = %id, table_images = removed, "deleted import assets");
        self.update(ProjectPatch::new(id.clone()).with(Mutation::RemoveSourceImport))
    }
}

/// Decodes `body` the way `read` will, so nothing is stored that the next
/// read would report as corrupt. A shape mismatch is blamed on the offending
/// project field.
fn ensure_readable(body: &str) -> Result<(), EngineError> {
    match ProjectCollection::parse(body) {
        Ok(_) => Ok(()),
        Err(CorruptStoreError::InvalidShape(err)) => Err(ValidationError::field(
            project_field(&err.path),
            format!("Value would not read back: expected {}.", err.expected),
        )
        .into()),
        Err(CorruptStoreError::InvalidJson(err)) => Err(EngineError::Serialization(err)),
    }
}

/// `projects[3].draftManifest.fps` -> `draftManifest.fps`.
fn project_field(path: &str) -> &str {
    path.strip_prefix("projects[")
        .and_then(|rest| rest.split_once("]."))
        .map_or(path, |(_, field)| field)
}

impl<B: BlobStore + std::fmt::Debug> std::fmt::Debug for ProjectStore<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProjectStore")
            .field("blobs", &self.blobs)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
