//! Approval state transitions.
//!
//! Each function applies one transition to a project in place. The mutation
//! handlers call them; nothing here touches storage.

use courseforge_core::{ApprovalStatus, ApprovedManifest, JobStatus, Project, ProjectStatus};

use crate::manifest::ApprovalHashes;

/// Project status while a remote job is in the given state.
pub fn project_status_for_job(status: JobStatus) -> ProjectStatus {
    match status {
        JobStatus::Queued | JobStatus::Running => ProjectStatus::Generating,
        JobStatus::Succeeded => ProjectStatus::Ready,
        JobStatus::Failed => ProjectStatus::Failed,
    }
}

/// Status once job output is dropped: back to approved while an approved
/// manifest survives.
pub fn status_after_clear(project: &Project) -> ProjectStatus {
    if project.approved_manifest.is_some() {
        ProjectStatus::Approved
    } else {
        ProjectStatus::NeedsApproval
    }
}

fn clear_approval(project: &mut Project) {
    project.approval_status = ApprovalStatus::Draft;
    project.approved_at = None;
    project.approved_by = None;
    project.approved_manifest = None;
}

/// The outline changed: approval and every generated output are void.
pub(crate) fn demote_for_outline_change(project: &mut Project) {
    clear_approval(project);
    project.status = ProjectStatus::NeedsApproval;
    project.generation_job = None;
    project.generation_history.clear();
}

/// A script edit voids approval; generated outputs are kept for reference.
pub(crate) fn demote_for_script_edit(project: &mut Project) {
    clear_approval(project);
    project.status = ProjectStatus::Draft;
}

pub(crate) fn reset_approval(project: &mut Project) {
    clear_approval(project);
    project.status = ProjectStatus::Draft;
    project.last_approved_at = None;
}

pub(crate) fn mark_approved(
    project: &mut Project,
    manifest: ApprovedManifest,
    hashes: ApprovalHashes,
    approved_by: Option<String>,
) {
    project.status = ProjectStatus::Approved;
    project.approval_status = ApprovalStatus::Approved;
    project.approved_at = Some(manifest.approved_at.clone());
    project.last_approved_at = Some(manifest.approved_at.clone());
    project.approved_by = approved_by;
    project.approved_manifest = Some(manifest);
    project.approved_script_hash_by_node_id = Some(hashes.script_hash_by_node_id);
    project.approved_sentence_hashes_by_node_id = Some(hashes.sentence_hashes_by_node_id);
    project.approved_script_hash_algo = Some(hashes.algo);
}

/// Forget the imported document and everything derived from it.
pub(crate) fn clear_source_import(project: &mut Project) {
    reset_approval(project);
    project.draft_manifest = None;
    project.source_doc = None;
    project.selected_section_ids = None;
    project.outline_disabled_ids = None;
    project.script_edits_by_node_id = None;
    project.script_draft_meta = None;
    project.generation_job = None;
    project.generation_history.clear();
}
