//! Approved manifest construction and draft signatures.
//!
//! The draft signature is a hash over a canonical JSON rendering of the parts
//! of a draft that approval freezes. Struct field order fixes the key order,
//! so identical drafts always hash identically under one [`ContentHasher`].

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;

use courseforge_core::{
    ApprovedManifest, ApprovedSection, ContentHasher, DraftManifest, DraftSection, HashAlgo,
    LocalAvatarManifestBlock, ManifestVersion, Project, ScriptEdits, SectionId, SectionLevel,
};

use crate::error::EngineError;
use crate::overlay::effective_script;
use crate::validation::{ValidationError, validate_generation_settings};

pub fn is_section_enabled(section: &DraftSection, disabled: &[SectionId]) -> bool {
    !disabled.contains(&section.id)
}

/// Sections not excluded by `disabled`, in manifest order.
pub fn enabled_sections<'a>(
    manifest: &'a DraftManifest,
    disabled: &'a [SectionId],
) -> impl Iterator<Item = &'a DraftSection> + 'a {
    manifest
        .sections
        .iter()
        .filter(move |section| is_section_enabled(section, disabled))
}

pub fn selected_section_ids(manifest: &DraftManifest, disabled: &[SectionId]) -> Vec<SectionId> {
    enabled_sections(manifest, disabled)
        .map(|section| section.id.clone())
        .collect()
}

/// The disabled set implied by the import's own `selected` flags.
pub fn disabled_ids_from_selection(manifest: &DraftManifest) -> Vec<SectionId> {
    manifest
        .sections
        .iter()
        .filter(|section| !section.selected)
        .map(|section| section.id.clone())
        .collect()
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CanonicalDoc<'a> {
    file_name: &'a str,
    file_size: u64,
    last_modified: i64,
    stored_at: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CanonicalSection<'a> {
    id: &'a SectionId,
    title: &'a str,
    level: SectionLevel,
    selected: bool,
    script: &'a str,
    media_refs: &'a [String],
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CanonicalDraft<'a> {
    manifest_version: ManifestVersion,
    course_title: &'a str,
    doc: CanonicalDoc<'a>,
    sections: Vec<CanonicalSection<'a>>,
    local_avatar: Option<&'a LocalAvatarManifestBlock>,
}

/// Canonical JSON of what approval freezes: enabled sections with their
/// effective scripts, document metadata and the avatar block (`null` when
/// absent).
pub fn canonical_draft_payload(
    manifest: &DraftManifest,
    disabled: &[SectionId],
    edits: Option<&ScriptEdits>,
) -> Result<String, serde_json::Error> {
    let draft = CanonicalDraft {
        manifest_version: ManifestVersion,
        course_title: &manifest.course_title,
        doc: CanonicalDoc {
            file_name: &manifest.doc.file_name,
            file_size: manifest.doc.file_size,
            last_modified: manifest.doc.last_modified,
            stored_at: &manifest.doc.stored_at,
        },
        sections: enabled_sections(manifest, disabled)
            .map(|section| CanonicalSection {
                id: &section.id,
                title: &section.title,
                level: section.level,
                selected: section.selected,
                script: effective_script(section, edits),
                media_refs: &section.media_refs,
            })
            .collect(),
        local_avatar: manifest.local_avatar.as_ref(),
    };
    serde_json::to_string(&draft)
}

pub fn draft_signature(
    hasher: &ContentHasher,
    manifest: &DraftManifest,
    disabled: &[SectionId],
    edits: Option<&ScriptEdits>,
) -> Result<String, serde_json::Error> {
    Ok(hasher.digest(&canonical_draft_payload(manifest, disabled, edits)?))
}

/// Signature of the project's current draft, if it has one.
pub fn project_draft_signature(
    hasher: &ContentHasher,
    project: &Project,
) -> Result<Option<String>, serde_json::Error> {
    project
        .draft_manifest
        .as_ref()
        .map(|manifest| {
            draft_signature(
                hasher,
                manifest,
                project.disabled_ids(),
                project.script_edits_by_node_id.as_ref(),
            )
        })
        .transpose()
}

/// Fingerprints of every section's effective script at approval time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApprovalHashes {
    pub script_hash_by_node_id: BTreeMap<SectionId, String>,
    pub sentence_hashes_by_node_id: BTreeMap<SectionId, Vec<String>>,
    pub algo: HashAlgo,
}

pub fn approval_hashes(
    hasher: &ContentHasher,
    manifest: &DraftManifest,
    edits: Option<&ScriptEdits>,
) -> ApprovalHashes {
    let mut script_hash_by_node_id = BTreeMap::new();
    let mut sentence_hashes_by_node_id = BTreeMap::new();
    for section in &manifest.sections {
        let hashes = hasher.script_hashes(effective_script(section, edits));
        script_hash_by_node_id.insert(section.id.clone(), hashes.script_hash);
        sentence_hashes_by_node_id.insert(section.id.clone(), hashes.sentence_hashes);
    }
    ApprovalHashes {
        script_hash_by_node_id,
        sentence_hashes_by_node_id,
        algo: hasher.algo(),
    }
}

/// Freezes the project's current draft into an approved manifest.
///
/// Fails when there is no draft or every section is disabled.
pub fn build_approved_manifest(
    hasher: &ContentHasher,
    project: &Project,
    approved_at: &str,
) -> Result<ApprovedManifest, EngineError> {
    let manifest = project
        .draft_manifest
        .as_ref()
        .ok_or_else(|| ValidationError::field("draftManifest", "Draft manifest is missing."))?;
    let disabled = project.disabled_ids();
    let edits = project.script_edits_by_node_id.as_ref();

    let sections: Vec<ApprovedSection> = enabled_sections(manifest, disabled)
        .map(|section| ApprovedSection {
            id: section.id.clone(),
            title: section.title.clone(),
            script: effective_script(section, edits).to_string(),
        })
        .collect();
    if sections.is_empty() {
        return Err(ValidationError::field("outlineDisabledIds", "No sections selected.").into());
    }

    let local_avatar = project
        .clip_planner
        .as_ref()
        .and_then(|planner| planner.active_avatar())
        .map(|avatar| {
            LocalAvatarManifestBlock::prepared(avatar.avatar_id.clone(), avatar.fps, avatar.bbox_shift)
        });

    Ok(ApprovedManifest {
        manifest_version: ManifestVersion,
        course_title: project.name.clone(),
        approved_at: approved_at.to_string(),
        draft_signature: draft_signature(hasher, manifest, disabled, edits)?,
        sections,
        settings: project.generation_settings.clone(),
        cleanup_mode: project.script_cleanup_mode,
        local_avatar,
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GenerateBlocker {
    NotApproved,
    MissingManifest,
    SettingsIncomplete,
}

impl GenerateBlocker {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NotApproved => "not_approved",
            Self::MissingManifest => "missing_manifest",
            Self::SettingsIncomplete => "settings_incomplete",
        }
    }
}

impl fmt::Display for GenerateBlocker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether a generation job may be started for the project.
pub fn can_generate(project: &Project) -> Result<(), GenerateBlocker> {
    if !project.is_approved() {
        return Err(GenerateBlocker::NotApproved);
    }
    if project.approved_manifest.is_none() {
        return Err(GenerateBlocker::MissingManifest);
    }
    let complete = project.generation_settings.as_ref().is_some_and(|settings| {
        !settings.updated_at.is_empty() && validate_generation_settings(&settings.input()).is_ok()
    });
    if !complete {
        return Err(GenerateBlocker::SettingsIncomplete);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use courseforge_core::{
        ClipPlannerAvatarMode, ClipPlannerPreparedAvatar, ClipPlannerSettings, DocMeta, ProjectId,
    };

    fn section(id: &str, selected: bool, script: &str) -> DraftSection {
        DraftSection {
            id: SectionId::from(id),
            title: format!("Title {id}"),
            level: SectionLevel::new(2).unwrap(),
            selected,
            script: script.to_string(),
            media_refs: vec![format!("media/{id}.png")],
            table_images: None,
        }
    }

    fn manifest() -> DraftManifest {
        DraftManifest {
            manifest_version: ManifestVersion,
            course_title: "Course".into(),
            doc: DocMeta {
                file_name: "course.docx".into(),
                file_size: 2048,
                last_modified: 1_700_000_000_000,
                stored_at: "2024-01-01T00:00:00.000Z".into(),
            },
            sections: vec![
                section("s1", true, "One. Two!"),
                section("s2", false, "Three?"),
                section("s3", true, "Four."),
            ],
            local_avatar: None,
        }
    }

    fn project() -> Project {
        let mut project = Project::new(
            ProjectId::from("p1"),
            "My course".into(),
            None,
            "2024-01-01T00:00:00.000Z".into(),
        );
        let manifest = manifest();
        project.outline_disabled_ids = Some(disabled_ids_from_selection(&manifest));
        project.draft_manifest = Some(manifest);
        project
    }

    #[test]
    fn selection_helpers_follow_manifest_order() {
        let manifest = manifest();
        let disabled = disabled_ids_from_selection(&manifest);
        assert_eq!(disabled, vec![SectionId::from("s2")]);
        assert_eq!(
            selected_section_ids(&manifest, &disabled),
            vec![SectionId::from("s1"), SectionId::from("s3")]
        );
        assert_eq!(selected_section_ids(&manifest, &[]).len(), 3);
    }

    #[test]
    fn canonical_payload_has_fixed_shape() {
        let manifest = manifest();
        let disabled = disabled_ids_from_selection(&manifest);
        let payload = canonical_draft_payload(&manifest, &disabled, None).unwrap();
        assert!(payload.starts_with(
            r#"{"manifestVersion":"0.1","courseTitle":"Course","doc":{"fileName":"course.docx""#
        ));
        assert!(payload.ends_with(r#""localAvatar":null}"#));
        assert!(!payload.contains("\"s2\""));
        assert!(!payload.contains("tableImages"));
    }

    #[test]
    fn signature_is_deterministic_and_tracks_scripts() {
        let hasher = ContentHasher::preferred();
        let manifest = manifest();
        let a = draft_signature(&hasher, &manifest, &[], None).unwrap();
        let b = draft_signature(&hasher, &manifest.clone(), &[], None).unwrap();
        assert_eq!(a, b);

        let edits = ScriptEdits::from([(SectionId::from("s1"), "Changed.".to_string())]);
        let edited = draft_signature(&hasher, &manifest, &[], Some(&edits)).unwrap();
        assert_ne!(a, edited);

        let disabled = [SectionId::from("s3")];
        assert_ne!(a, draft_signature(&hasher, &manifest, &disabled, None).unwrap());
    }

    #[test]
    fn checksum_signature_uses_length_prefix() {
        let hasher = ContentHasher::new(HashAlgo::Checksum);
        let manifest = manifest();
        let payload = canonical_draft_payload(&manifest, &[], None).unwrap();
        let signature = draft_signature(&hasher, &manifest, &[], None).unwrap();
        assert!(signature.starts_with(&format!("{}_h", payload.len())));
    }

    #[test]
    fn approved_manifest_snapshots_enabled_sections() {
        let hasher = ContentHasher::preferred();
        let mut project = project();
        project.script_edits_by_node_id = Some(ScriptEdits::from([(
            SectionId::from("s3"),
            "Four, edited.".to_string(),
        )]));
        project.clip_planner = Some(ClipPlannerSettings {
            avatar_mode: ClipPlannerAvatarMode::Prepared,
            prepared_avatar: Some(ClipPlannerPreparedAvatar {
                avatar_id: "avatar-7".into(),
                fps: 25.0,
                bbox_shift: 3,
                ref_image_data_url: None,
            }),
        });

        let approved = build_approved_manifest(&hasher, &project, "2024-02-01T00:00:00.000Z").unwrap();
        let ids: Vec<&str> = approved.sections.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, ["s1", "s3"]);
        assert_eq!(approved.sections[1].script, "Four, edited.");
        assert_eq!(approved.course_title, "My course");
        assert_eq!(
            approved.local_avatar,
            Some(LocalAvatarManifestBlock::prepared("avatar-7", 25.0, 3))
        );
        assert_eq!(
            Some(approved.draft_signature),
            project_draft_signature(&hasher, &project).unwrap()
        );
    }

    #[test]
    fn approval_rejects_empty_selection() {
        let hasher = ContentHasher::preferred();
        let mut project = project();
        project.outline_disabled_ids = Some(selected_section_ids(&manifest(), &[]));
        let err = build_approved_manifest(&hasher, &project, "t").unwrap_err();
        assert_eq!(
            err.as_validation().map(|v| v.message.as_str()),
            Some("No sections selected.")
        );

        project.draft_manifest = None;
        let err = build_approved_manifest(&hasher, &project, "t").unwrap_err();
        assert!(err.as_validation().and_then(|v| v.field_error("draftManifest")).is_some());
    }

    #[test]
    fn approval_hashes_cover_every_section() {
        let hasher = ContentHasher::preferred();
        let hashes = approval_hashes(&hasher, &manifest(), None);
        assert_eq!(hashes.script_hash_by_node_id.len(), 3);
        assert_eq!(hashes.sentence_hashes_by_node_id[&SectionId::from("s1")].len(), 2);
        assert_eq!(hashes.algo, HashAlgo::Blake3);
    }

    #[test]
    fn generation_is_blocked_until_approved_with_settings() {
        let project = project();
        assert_eq!(can_generate(&project), Err(GenerateBlocker::NotApproved));
        assert_eq!(GenerateBlocker::SettingsIncomplete.to_string(), "settings_incomplete");
    }
}
