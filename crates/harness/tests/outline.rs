use courseforge_core::{
    ApprovalStatus, CleanupConfigOverrides, ClipPlannerAvatarMode, ClipPlannerPreparedAvatar,
    ClipPlannerSettings, JobId, ProjectSettingsOverrides, ProjectStatus, SectionId,
};
use courseforge_engine::manifest::project_draft_signature;
use courseforge_engine::{Mutation, ProjectPatch};
use courseforge_harness::{TestWorkspace, fixtures};

fn ids(raw: &[&str]) -> Vec<SectionId> {
    raw.iter().copied().map(SectionId::from).collect()
}

// ============================================================================
// Outline selection
// ============================================================================

#[test]
fn disabling_every_section_blocks_approval() -> Result<(), Box<dyn std::error::Error>> {
    let mut ws = TestWorkspace::new();
    let id = ws.create_project("Onboarding")?;
    ws.import(&id, fixtures::manifest(&[("s1", true), ("s2", true)]))?;
    ws.store.update(
        ProjectPatch::new(id.clone()).with(Mutation::SetOutlineDisabled(ids(&["s1", "s2"]))),
    )?;
    let before = ws.project(&id)?;
    assert_eq!(before.selected_section_ids, Some(Vec::new()));

    let err = ws.store.approve_project(&id).unwrap_err();
    let validation = err.as_validation().ok_or("expected a validation error")?;
    assert!(validation.field_error("outlineDisabledIds").is_some());
    assert_eq!(ws.project(&id)?, before);
    Ok(())
}

#[test]
fn changing_the_outline_demotes_and_drops_outputs() -> Result<(), Box<dyn std::error::Error>> {
    let mut ws = TestWorkspace::new();
    let id = ws.approved_project(&[("s1", true), ("s2", true)])?;
    ws.store.start_generation_job(&id, &JobId::from("job-1"), None, None)?;

    let project = ws.store.update(
        ProjectPatch::new(id.clone()).with(Mutation::SetOutlineDisabled(ids(&["s2", "s2"]))),
    )?;
    assert_eq!(project.status, ProjectStatus::NeedsApproval);
    assert_eq!(project.approval_status, ApprovalStatus::Draft);
    assert!(project.approved_manifest.is_none());
    assert!(project.generation_job.is_none());
    assert!(project.generation_history.is_empty());
    assert_eq!(project.outline_disabled_ids, Some(ids(&["s2"])));
    assert_eq!(project.selected_section_ids, Some(ids(&["s1"])));
    Ok(())
}

#[test]
fn outline_ids_must_exist() -> Result<(), Box<dyn std::error::Error>> {
    let mut ws = TestWorkspace::new();
    let id = ws.approved_project(&[("s1", true)])?;
    let err = ws
        .store
        .update(ProjectPatch::new(id.clone()).with(Mutation::SetOutlineDisabled(ids(&["ghost"]))))
        .unwrap_err();
    assert!(err.as_validation().and_then(|v| v.field_error("outlineDisabledIds")).is_some());
    assert!(ws.project(&id)?.is_approved());
    Ok(())
}

#[test]
fn replacing_the_manifest_always_demotes() -> Result<(), Box<dyn std::error::Error>> {
    let mut ws = TestWorkspace::new();
    let id = ws.approved_project(&[("s1", true)])?;
    // the same outline again still counts as a new import
    let project = ws.import(&id, fixtures::manifest(&[("s1", true)]))?;
    assert_eq!(project.status, ProjectStatus::NeedsApproval);
    assert!(!project.is_approved());
    assert!(project.approved_manifest.is_none());
    Ok(())
}

#[test]
fn manifests_with_duplicate_ids_are_rejected() -> Result<(), Box<dyn std::error::Error>> {
    let mut ws = TestWorkspace::new();
    let id = ws.create_project("Onboarding")?;
    let err = ws
        .import(&id, fixtures::manifest(&[("s1", true), ("s1", true)]))
        .unwrap_err();
    let validation = err.as_validation().ok_or("expected a validation error")?;
    assert!(validation.field_error("draftManifest.sections").is_some());
    assert!(ws.project(&id)?.draft_manifest.is_none());
    Ok(())
}

// ============================================================================
// Draft signature
// ============================================================================

#[test]
fn signature_is_deterministic_and_ignores_disabled_sections() -> Result<(), Box<dyn std::error::Error>> {
    let mut ws = TestWorkspace::new();
    let id = ws.create_project("Onboarding")?;
    ws.import(&id, fixtures::manifest(&[("s1", true), ("s2", true)]))?;
    let hasher = *ws.store.hasher();

    let first = project_draft_signature(&hasher, &ws.project(&id)?)?;
    let again = project_draft_signature(&hasher, &ws.project(&id)?)?;
    assert!(first.is_some());
    assert_eq!(first, again);

    ws.store
        .save_script_draft(&id, &SectionId::from("s2"), "Different words.")?;
    let edited = project_draft_signature(&hasher, &ws.project(&id)?)?;
    assert_ne!(edited, first);

    // once s2 is disabled its edit no longer contributes
    ws.store.update(
        ProjectPatch::new(id.clone()).with(Mutation::SetOutlineDisabled(ids(&["s2"]))),
    )?;
    let without_s2 = project_draft_signature(&hasher, &ws.project(&id)?)?;
    ws.store.discard_script_draft(&id, &SectionId::from("s2"))?;
    assert_eq!(project_draft_signature(&hasher, &ws.project(&id)?)?, without_s2);
    Ok(())
}

#[test]
fn approved_manifest_carries_the_draft_signature() -> Result<(), Box<dyn std::error::Error>> {
    let mut ws = TestWorkspace::new();
    let id = ws.approved_project(&[("s1", true), ("s2", false)])?;
    let project = ws.project(&id)?;
    let signature = project_draft_signature(ws.store.hasher(), &project)?;
    let manifest = project.approved_manifest.as_ref().ok_or("no approved manifest")?;
    assert_eq!(signature.as_deref(), Some(manifest.draft_signature.as_str()));
    Ok(())
}

#[test]
fn prepared_avatar_lands_in_the_approved_manifest() -> Result<(), Box<dyn std::error::Error>> {
    let mut ws = TestWorkspace::new();
    let id = ws.create_project("Onboarding")?;
    ws.import(&id, fixtures::manifest(&[("s1", true)]))?;
    ws.store.update(ProjectPatch::new(id.clone()).with(Mutation::SetClipPlanner(
        ClipPlannerSettings {
            avatar_mode: ClipPlannerAvatarMode::Prepared,
            prepared_avatar: Some(ClipPlannerPreparedAvatar {
                avatar_id: "coach".into(),
                fps: 25.0,
                bbox_shift: -4,
                ref_image_data_url: None,
            }),
        },
    )))?;

    let project = ws.store.approve_project(&id)?;
    let block = project
        .approved_manifest
        .and_then(|manifest| manifest.local_avatar)
        .ok_or("no local avatar block")?;
    assert_eq!(block.avatar_id, "coach");
    assert_eq!(block.bbox_shift, -4);
    Ok(())
}

// ============================================================================
// Settings
// ============================================================================

#[test]
fn generation_settings_report_every_bad_field() -> Result<(), Box<dyn std::error::Error>> {
    let mut ws = TestWorkspace::new();
    let id = ws.create_project("Onboarding")?;
    let mut settings = fixtures::settings();
    settings.avatar_preset_id = "nobody".into();
    settings.voice_preset_id = String::new();
    settings.sentences_per_clip = 0;
    settings.variations_per_section = 6;

    let err = ws.store.set_generation_settings(&id, settings).unwrap_err();
    let validation = err.as_validation().ok_or("expected a validation error")?;
    assert_eq!(validation.message, "Generation settings are invalid.");
    let fields: Vec<&str> = validation.field_errors.keys().map(String::as_str).collect();
    assert_eq!(
        fields,
        vec!["avatarPresetId", "sentencesPerClip", "variationsPerSection", "voicePresetId"]
    );
    assert!(ws.project(&id)?.generation_settings.is_none());
    Ok(())
}

#[test]
fn generation_settings_are_stamped() -> Result<(), Box<dyn std::error::Error>> {
    let mut ws = TestWorkspace::new();
    let id = ws.create_project("Onboarding")?;
    let project = ws.store.set_generation_settings(&id, fixtures::settings())?;
    let settings = project.generation_settings.ok_or("no settings")?;
    assert_eq!(settings.updated_at, project.updated_at);
    assert_eq!(settings.input(), fixtures::settings());
    Ok(())
}

#[test]
fn auxiliary_settings_do_not_touch_approval() -> Result<(), Box<dyn std::error::Error>> {
    let mut ws = TestWorkspace::new();
    let id = ws.approved_project(&[("s1", true)])?;
    let project = ws.store.update(
        ProjectPatch::new(id.clone())
            .with(Mutation::SetProjectSettingsOverrides(Some(ProjectSettingsOverrides {
                sentences_per_clip: 3,
                variations_per_section: 2,
            })))
            .with(Mutation::SetCleanupConfigOverrides(Some(CleanupConfigOverrides {
                max_words_per_sentence: Some(24.0),
                ..Default::default()
            })))
            .with(Mutation::Rename("Onboarding v2".into())),
    )?;
    assert!(project.is_approved());
    assert_eq!(project.status, ProjectStatus::Approved);
    assert_eq!(project.name, "Onboarding v2");
    Ok(())
}

#[test]
fn out_of_range_overrides_are_rejected() -> Result<(), Box<dyn std::error::Error>> {
    let mut ws = TestWorkspace::new();
    let id = ws.create_project("Onboarding")?;
    let err = ws
        .store
        .update(ProjectPatch::new(id.clone()).with(Mutation::SetProjectSettingsOverrides(Some(
            ProjectSettingsOverrides {
                sentences_per_clip: 9,
                variations_per_section: 1,
            },
        ))))
        .unwrap_err();
    let validation = err.as_validation().ok_or("expected a validation error")?;
    assert!(validation
        .field_error("projectSettingsOverrides.sentencesPerClip")
        .is_some());

    let err = ws
        .store
        .update(ProjectPatch::new(id).with(Mutation::SetCleanupConfigOverrides(Some(
            CleanupConfigOverrides {
                substitution_rate: Some(f64::INFINITY),
                ..Default::default()
            },
        ))))
        .unwrap_err();
    assert!(err.as_validation().is_some());
    Ok(())
}
