use courseforge_core::{ApprovalStatus, ProjectId, ProjectStatus, SectionId};
use courseforge_engine::{
    DEFAULT_STORAGE_KEY, EngineError, GenerateBlocker, Mutation, ProjectPatch, StoreConfig,
    can_generate,
};
use courseforge_harness::{TestWorkspace, fixtures, init_tracing};
use courseforge_storage::{AssetKind, AssetRecord, AssetStore, MemoryBlobStore};

// ============================================================================
// Create / list / delete
// ============================================================================

#[test]
fn new_projects_start_as_drafts_newest_first() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();
    let mut ws = TestWorkspace::new();
    let first = ws.store.create("First course", Some("  intro  "))?;
    let second = ws.store.create("  Second course ", None)?;

    assert_eq!(first.status, ProjectStatus::Draft);
    assert_eq!(first.approval_status, ApprovalStatus::Draft);
    assert_eq!(first.description.as_deref(), Some("intro"));
    assert_eq!(first.created_at, "2024-01-01T00:00:00.000Z");
    assert_eq!(first.created_at, first.updated_at);
    assert!(first.generation_history.is_empty());
    assert_eq!(second.name, "Second course");
    assert!(second.description.is_none());

    let listed: Vec<ProjectId> = ws.store.list()?.into_iter().map(|p| p.id).collect();
    assert_eq!(listed, vec![second.id, first.id]);
    Ok(())
}

#[test]
fn create_rejects_bad_names_without_writing() -> Result<(), Box<dyn std::error::Error>> {
    let mut ws = TestWorkspace::new();
    let long = "n".repeat(81);
    for name in ["", " x ", long.as_str()] {
        let err = ws.store.create(name, None).unwrap_err();
        let validation = err.as_validation().ok_or("expected a validation error")?;
        assert!(validation.field_error("name").is_some());
    }
    let err = ws.store.create("Fine", Some("d".repeat(281).as_str())).unwrap_err();
    assert!(err.as_validation().and_then(|v| v.field_error("description")).is_some());
    assert_eq!(ws.store.blobs().writes(), 0);
    assert!(ws.store.list()?.is_empty());
    Ok(())
}

#[test]
fn update_of_unknown_project_is_not_found() -> Result<(), Box<dyn std::error::Error>> {
    let mut ws = TestWorkspace::new();
    let missing = ProjectId::from("nope");
    let err = ws
        .store
        .update(ProjectPatch::new(missing.clone()).with(Mutation::Rename("Another".into())))
        .unwrap_err();
    assert!(matches!(err, EngineError::ProjectNotFound(id) if id == missing));
    Ok(())
}

#[test]
fn patch_applies_every_intent_or_none() -> Result<(), Box<dyn std::error::Error>> {
    let mut ws = TestWorkspace::new();
    let id = ws.create_project("First draft")?;
    let err = ws
        .store
        .update(
            ProjectPatch::new(id.clone())
                .with(Mutation::Rename("Renamed".into()))
                .with(Mutation::SetDescription(Some("d".repeat(300)))),
        )
        .unwrap_err();
    assert!(err.as_validation().is_some());
    assert_eq!(ws.project(&id)?.name, "First draft");

    let renamed = ws.store.update(
        ProjectPatch::new(id.clone())
            .with(Mutation::Rename("Renamed".into()))
            .with(Mutation::SetDescription(Some("About it".into()))),
    )?;
    assert_eq!(renamed.name, "Renamed");
    assert_eq!(renamed.description.as_deref(), Some("About it"));
    assert!(renamed.updated_at > renamed.created_at);
    Ok(())
}

#[test]
fn delete_removes_project_and_assets() -> Result<(), Box<dyn std::error::Error>> {
    let mut ws = TestWorkspace::new();
    let keep = ws.create_project("Keep me")?;
    let gone = ws.create_project("Drop me")?;
    for (attachment, kind) in [("doc", AssetKind::SourceDocument), ("img-1", AssetKind::TableImage)] {
        ws.assets.put_asset(AssetRecord {
            project_id: gone.clone(),
            attachment_id: attachment.into(),
            kind,
            bytes: vec![1, 2, 3],
        })?;
    }

    ws.store.delete(&gone, &mut ws.assets)?;
    assert!(ws.store.get(&gone)?.is_none());
    assert!(ws.store.get(&keep)?.is_some());
    assert!(ws.assets.is_empty());

    let writes = ws.store.blobs().writes();
    ws.store.delete(&gone, &mut ws.assets)?;
    assert_eq!(ws.store.blobs().writes(), writes);
    Ok(())
}

#[test]
fn delete_survives_asset_failures() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();
    let mut ws = TestWorkspace::new();
    let id = ws.create_project("Doomed")?;
    ws.assets.set_fail_deletes(true);
    ws.store.delete(&id, &mut ws.assets)?;
    assert!(ws.store.get(&id)?.is_none());
    Ok(())
}

#[test]
fn delete_leaves_assets_alone_when_the_store_is_corrupt() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();
    let mut ws = TestWorkspace::from_blobs(
        MemoryBlobStore::with_blob(DEFAULT_STORAGE_KEY, "{not json"),
        StoreConfig::default(),
    );
    let id = ProjectId::from("p-1");
    ws.assets.put_asset(AssetRecord {
        project_id: id.clone(),
        attachment_id: "doc".into(),
        kind: AssetKind::SourceDocument,
        bytes: b"PK".to_vec(),
    })?;

    let err = ws.store.delete(&id, &mut ws.assets).unwrap_err();
    assert!(err.is_corrupt());
    assert_eq!(ws.assets.len(), 1);
    assert_eq!(ws.store.blobs().raw(DEFAULT_STORAGE_KEY), Some("{not json"));
    Ok(())
}

// ============================================================================
// Import -> approve
// ============================================================================

#[test]
fn import_then_approve() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();
    let mut ws = TestWorkspace::new();
    let id = ws.create_project("Onboarding")?;

    let imported = ws.import(&id, fixtures::manifest(&[("s1", true), ("s2", true)]))?;
    assert_eq!(imported.status, ProjectStatus::NeedsApproval);
    assert_eq!(imported.outline_disabled_ids, Some(Vec::new()));
    assert_eq!(
        imported.selected_section_ids,
        Some(vec![SectionId::from("s1"), SectionId::from("s2")])
    );
    assert!(imported.source_doc.is_some());

    let approved = ws.store.approve_project(&id)?;
    assert_eq!(approved.status, ProjectStatus::Approved);
    assert_eq!(approved.approval_status, ApprovalStatus::Approved);
    assert!(approved.approved_at.is_some());
    assert_eq!(approved.approved_at, approved.last_approved_at);

    let manifest = approved.approved_manifest.as_ref().ok_or("no approved manifest")?;
    let ids: Vec<&str> = manifest.sections.iter().map(|s| s.id.as_str()).collect();
    assert_eq!(ids, vec!["s1", "s2"]);
    assert_eq!(manifest.course_title, "Onboarding");
    assert_eq!(manifest.sections[0].script, "Welcome to s1. Let us begin!");

    let script_hashes = approved.approved_script_hash_by_node_id.as_ref().ok_or("no hashes")?;
    let sentence_hashes = approved
        .approved_sentence_hashes_by_node_id
        .as_ref()
        .ok_or("no sentence hashes")?;
    assert_eq!(script_hashes.len(), 2);
    assert_eq!(sentence_hashes[&SectionId::from("s1")].len(), 2);
    assert_eq!(approved.approved_script_hash_algo, Some(ws.store.hasher().algo()));
    Ok(())
}

#[test]
fn approval_snapshots_only_enabled_sections() -> Result<(), Box<dyn std::error::Error>> {
    let mut ws = TestWorkspace::new();
    let id = ws.create_project("Onboarding")?;
    let imported = ws.import(&id, fixtures::manifest(&[("s1", true), ("s2", false), ("s3", true)]))?;
    assert_eq!(imported.outline_disabled_ids, Some(vec![SectionId::from("s2")]));

    let approved = ws.store.approve_project(&id)?;
    let manifest = approved.approved_manifest.ok_or("no approved manifest")?;
    let ids: Vec<&str> = manifest.sections.iter().map(|s| s.id.as_str()).collect();
    assert_eq!(ids, vec!["s1", "s3"]);
    // hashes still cover the whole outline
    assert_eq!(approved.approved_script_hash_by_node_id.map(|m| m.len()), Some(3));
    Ok(())
}

#[test]
fn approving_without_a_draft_fails() -> Result<(), Box<dyn std::error::Error>> {
    let mut ws = TestWorkspace::new();
    let id = ws.create_project("Empty")?;
    let err = ws.store.approve_project(&id).unwrap_err();
    let validation = err.as_validation().ok_or("expected a validation error")?;
    assert!(validation.field_error("draftManifest").is_some());
    assert_eq!(ws.project(&id)?.status, ProjectStatus::Draft);
    Ok(())
}

#[test]
fn reviewer_name_is_recorded() -> Result<(), Box<dyn std::error::Error>> {
    let mut ws = TestWorkspace::new();
    let id = ws.create_project("Onboarding")?;
    ws.import(&id, fixtures::manifest(&[("s1", true)]))?;
    let pending = ws.store.prepare_approval(&id, Some("dana"))?;
    assert_eq!(ws.project(&id)?.status, ProjectStatus::NeedsApproval);

    let approved = ws.store.commit_approval(pending)?;
    assert_eq!(approved.approved_by.as_deref(), Some("dana"));
    Ok(())
}

#[test]
fn commit_rejects_an_approval_for_a_stale_draft() -> Result<(), Box<dyn std::error::Error>> {
    let mut ws = TestWorkspace::new();
    let id = ws.create_project("Onboarding")?;
    ws.import(&id, fixtures::manifest(&[("s1", true), ("s2", true)]))?;
    let pending = ws.store.prepare_approval(&id, None)?;

    ws.store.save_script_draft(&id, &SectionId::from("s2"), "Changed in between.")?;
    let err = ws.store.commit_approval(pending).unwrap_err();
    let validation = err.as_validation().ok_or("expected a validation error")?;
    assert!(validation.field_error("draftManifest").is_some());

    let project = ws.project(&id)?;
    assert!(!project.is_approved());
    assert!(project.approved_manifest.is_none());
    Ok(())
}

#[test]
fn reset_approval_returns_to_draft() -> Result<(), Box<dyn std::error::Error>> {
    let mut ws = TestWorkspace::new();
    let id = ws.approved_project(&[("s1", true)])?;
    let reset = ws.store.reset_approval_to_draft(&id)?;
    assert_eq!(reset.status, ProjectStatus::Draft);
    assert_eq!(reset.approval_status, ApprovalStatus::Draft);
    assert!(reset.approved_manifest.is_none());
    assert!(reset.approved_at.is_none());
    assert!(reset.last_approved_at.is_none());
    assert!(reset.draft_manifest.is_some());
    Ok(())
}

#[test]
fn generation_needs_approval_and_settings() -> Result<(), Box<dyn std::error::Error>> {
    let mut ws = TestWorkspace::new();
    let id = ws.create_project("Onboarding")?;
    ws.import(&id, fixtures::manifest(&[("s1", true)]))?;
    assert_eq!(can_generate(&ws.project(&id)?), Err(GenerateBlocker::NotApproved));

    ws.store.approve_project(&id)?;
    assert_eq!(can_generate(&ws.project(&id)?), Err(GenerateBlocker::SettingsIncomplete));

    let project = ws.store.set_generation_settings(&id, fixtures::settings())?;
    assert!(project.is_approved());
    assert_eq!(can_generate(&project), Ok(()));
    Ok(())
}

#[test]
fn removing_the_import_clears_derived_state() -> Result<(), Box<dyn std::error::Error>> {
    let mut ws = TestWorkspace::new();
    let id = ws.approved_project(&[("s1", true)])?;
    ws.assets.put_asset(AssetRecord {
        project_id: id.clone(),
        attachment_id: "doc".into(),
        kind: AssetKind::SourceDocument,
        bytes: b"PK".to_vec(),
    })?;

    let project = ws.store.remove_source_import(&id, &mut ws.assets)?;
    assert!(project.draft_manifest.is_none());
    assert!(project.source_doc.is_none());
    assert!(project.outline_disabled_ids.is_none());
    assert!(project.approved_manifest.is_none());
    assert_eq!(project.status, ProjectStatus::Draft);
    assert!(ws.assets.is_empty());
    Ok(())
}

#[test]
fn removing_the_import_stops_on_asset_failure() -> Result<(), Box<dyn std::error::Error>> {
    let mut ws = TestWorkspace::new();
    let id = ws.approved_project(&[("s1", true)])?;
    ws.assets.set_fail_deletes(true);
    let err = ws.store.remove_source_import(&id, &mut ws.assets).unwrap_err();
    assert!(matches!(err, EngineError::Storage(_)));
    assert!(ws.project(&id)?.draft_manifest.is_some());
    Ok(())
}
