//! Mutation intents and the rules each one carries.
//!
//! A [`ProjectPatch`] is an ordered list of intents applied to a copy of one
//! project. Any invalidation an intent causes (approval demotion, job and
//! history clearing) is decided in that intent's handler below and nowhere
//! else.

use courseforge_core::{
    ApprovedManifest, CleanupConfigOverrides, CleanupMode, ClipPlannerSettings, DraftManifest,
    GenerationJobRef, GenerationSettingsInput, JobId, JobRecord, LocalAvatarAdvancedSettings,
    LocalAvatarPreparedState, Project, ProjectId, ProjectSettings, ProjectSettingsOverrides,
    ProjectStatus, SectionId, SourceDoc, StubAvatarStyle, StubBackgroundStyle,
};

use crate::jobs::{history_item_for_start, job_ref_for_status, patch_history, push_history};
use crate::machine::{
    clear_source_import, demote_for_outline_change, demote_for_script_edit, mark_approved,
    project_status_for_job, reset_approval, status_after_clear,
};
use crate::manifest::{ApprovalHashes, disabled_ids_from_selection, selected_section_ids};
use crate::overlay::{apply_script_draft_save, build_draft_meta, discard_overlay};
use crate::validation::{
    ValidationError, validate_cleanup_overrides, validate_clip_planner, validate_description,
    validate_draft_manifest, validate_generation_settings, validate_hash_maps,
    validate_job_record, validate_local_avatar_advanced, validate_name, validate_outline_ids,
    validate_overrides, validate_prepared_avatar,
};

#[derive(Debug, Clone, PartialEq)]
pub enum Mutation {
    Rename(String),
    SetDescription(Option<String>),
    /// Attach or replace the imported outline. Without explicit disabled ids
    /// the manifest's own unselected sections are disabled.
    ReplaceManifest {
        manifest: DraftManifest,
        outline_disabled_ids: Option<Vec<SectionId>>,
        source_doc: Option<SourceDoc>,
    },
    SetOutlineDisabled(Vec<SectionId>),
    SaveScriptDraft {
        section_id: SectionId,
        text: String,
    },
    DiscardScriptDraft(SectionId),
    SetGenerationSettings(GenerationSettingsInput),
    SetProjectSettingsOverrides(Option<ProjectSettingsOverrides>),
    SetLocalAvatarAdvanced(Option<LocalAvatarAdvancedSettings>),
    SetLocalAvatar(Option<LocalAvatarPreparedState>),
    SetClipPlanner(ClipPlannerSettings),
    SetCleanupMode(Option<CleanupMode>),
    SetCleanupConfigOverrides(Option<CleanupConfigOverrides>),
    SetStubAvatarStyle(Option<StubAvatarStyle>),
    SetStubBackgroundStyle(Option<StubBackgroundStyle>),
    SetProjectSettings(ProjectSettings),
    RecordApproval {
        manifest: ApprovedManifest,
        hashes: ApprovalHashes,
        approved_by: Option<String>,
    },
    ResetApproval,
    StartGenerationJob {
        job_id: JobId,
        initial: Option<JobRecord>,
        instance_id: Option<String>,
    },
    UpdateGenerationJobStatus(JobRecord),
    SetGenerationJobInstance(String),
    ClearGenerationJob,
    ClearCloudOutputs,
    RemoveSourceImport,
}

/// Intents for one project, applied in order as a single write.
#[derive(Debug, Clone, PartialEq)]
pub struct ProjectPatch {
    pub id: ProjectId,
    pub mutations: Vec<Mutation>,
}

impl ProjectPatch {
    pub fn new(id: ProjectId) -> Self {
        Self {
            id,
            mutations: Vec::new(),
        }
    }

    pub fn with(mut self, mutation: Mutation) -> Self {
        self.mutations.push(mutation);
        self
    }
}

/// Applies one intent. `now` is the write's timestamp.
pub(crate) fn apply(project: &mut Project, mutation: Mutation, now: &str) -> Result<(), ValidationError> {
    match mutation {
        Mutation::Rename(name) => {
            project.name = validate_name(&name)?;
        }
        Mutation::SetDescription(description) => {
            project.description = validate_description(description.as_deref())?;
        }
        Mutation::ReplaceManifest {
            manifest,
            outline_disabled_ids,
            source_doc,
        } => {
            validate_draft_manifest(&manifest)?;
            let disabled = match outline_disabled_ids {
                Some(ids) => {
                    validate_outline_ids(&manifest, &ids)?;
                    dedup(ids)
                }
                None => disabled_ids_from_selection(&manifest),
            };
            project.selected_section_ids = Some(selected_section_ids(&manifest, &disabled));
            project.outline_disabled_ids = Some(disabled);
            project.draft_manifest = Some(manifest);
            if source_doc.is_some() {
                project.source_doc = source_doc;
            }
            project.script_edits_by_node_id = None;
            project.script_draft_meta = None;
            demote_for_outline_change(project);
        }
        Mutation::SetOutlineDisabled(ids) => {
            let manifest = project.draft_manifest.as_ref().ok_or_else(|| {
                ValidationError::field("outlineDisabledIds", "There is no outline to select from.")
            })?;
            validate_outline_ids(manifest, &ids)?;
            let disabled = dedup(ids);
            project.selected_section_ids = Some(selected_section_ids(manifest, &disabled));
            project.outline_disabled_ids = Some(disabled);
            demote_for_outline_change(project);
        }
        Mutation::SaveScriptDraft { section_id, text } => {
            let section = project
                .draft_manifest
                .as_ref()
                .and_then(|manifest| manifest.section(&section_id))
                .ok_or_else(|| {
                    ValidationError::field(
                        "scriptEditsByNodeId",
                        format!("Unknown section {section_id}."),
                    )
                })?;
            let save = apply_script_draft_save(
                section,
                project.script_edits_by_node_id.as_ref(),
                &text,
                project.is_approved(),
            );
            project.script_draft_meta = build_draft_meta(save.edits.as_ref(), now);
            project.script_edits_by_node_id = save.edits;
            if save.demote {
                demote_for_script_edit(project);
            }
        }
        Mutation::DiscardScriptDraft(section_id) => {
            if let Some(edits) = discard_overlay(project.script_edits_by_node_id.as_ref(), &section_id) {
                project.script_draft_meta = build_draft_meta(edits.as_ref(), now);
                project.script_edits_by_node_id = edits;
            }
        }
        Mutation::SetGenerationSettings(input) => {
            // approval is independent of generation settings
            validate_generation_settings(&input)?;
            project.generation_settings = Some(input.stamped(now.to_string()));
        }
        Mutation::SetProjectSettingsOverrides(overrides) => {
            if let Some(overrides) = &overrides {
                validate_overrides(overrides)?;
            }
            project.project_settings_overrides = overrides;
        }
        Mutation::SetLocalAvatarAdvanced(settings) => {
            if let Some(settings) = &settings {
                validate_local_avatar_advanced(settings)?;
            }
            project.local_avatar_advanced = settings;
        }
        Mutation::SetLocalAvatar(state) => {
            if let Some(state) = &state {
                validate_prepared_avatar(state)?;
            }
            project.local_avatar = state;
        }
        Mutation::SetClipPlanner(settings) => {
            validate_clip_planner(&settings)?;
            project.clip_planner = Some(settings);
        }
        Mutation::SetCleanupMode(mode) => {
            project.script_cleanup_mode = mode;
        }
        Mutation::SetCleanupConfigOverrides(overrides) => {
            if let Some(overrides) = &overrides {
                validate_cleanup_overrides(overrides)?;
            }
            project.cleanup_config_overrides = overrides;
        }
        Mutation::SetStubAvatarStyle(style) => {
            project.stub_avatar_style = style;
        }
        Mutation::SetStubBackgroundStyle(style) => {
            project.stub_background_style = style;
        }
        Mutation::SetProjectSettings(settings) => {
            project.settings = Some(settings);
        }
        Mutation::RecordApproval {
            manifest,
            hashes,
            approved_by,
        } => {
            let draft = project.draft_manifest.as_ref().ok_or_else(|| {
                ValidationError::field("draftManifest", "Draft manifest is missing.")
            })?;
            validate_hash_maps(
                draft,
                &hashes.script_hash_by_node_id,
                &hashes.sentence_hashes_by_node_id,
            )?;
            mark_approved(project, manifest, hashes, approved_by);
        }
        Mutation::ResetApproval => {
            reset_approval(project);
        }
        Mutation::StartGenerationJob {
            job_id,
            initial,
            instance_id,
        } => {
            if let Some(record) = &initial {
                validate_job_record(record)?;
            }
            if job_id.as_str().trim().is_empty() {
                return Err(ValidationError::field("generationJob.jobId", "Job id must not be blank."));
            }
            push_history(
                &mut project.generation_history,
                history_item_for_start(&job_id, now, initial.as_ref()),
            );
            project.generation_job = Some(GenerationJobRef {
                job_id,
                created_at: now.to_string(),
                updated_at: now.to_string(),
                instance_id,
                last_status: initial,
            });
            project.status = ProjectStatus::Generating;
        }
        Mutation::UpdateGenerationJobStatus(record) => {
            validate_job_record(&record)?;
            patch_history(&mut project.generation_history, &record);
            project.status = project_status_for_job(record.status);
            project.generation_job = Some(job_ref_for_status(
                project.generation_job.as_ref(),
                &record,
                now,
            ));
        }
        Mutation::SetGenerationJobInstance(instance_id) => {
            if let Some(job) = project.generation_job.as_mut() {
                job.instance_id = Some(instance_id);
                job.updated_at = now.to_string();
            }
        }
        Mutation::ClearGenerationJob => {
            project.generation_job = None;
            project.status = status_after_clear(project);
        }
        Mutation::ClearCloudOutputs => {
            project.generation_job = None;
            project.generation_history.clear();
            project.status = status_after_clear(project);
        }
        Mutation::RemoveSourceImport => {
            clear_source_import(project);
        }
    }
    Ok(())
}

/// Drops repeated ids, keeping first occurrences in order.
fn dedup(ids: Vec<SectionId>) -> Vec<SectionId> {
    let mut out: Vec<SectionId> = Vec::with_capacity(ids.len());
    for id in ids {
        if !out.contains(&id) {
            out.push(id);
        }
    }
    out
}
