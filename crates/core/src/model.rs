//! Persisted project shapes.
//!
//! These types only derive `Serialize`: the sole way to obtain one from stored
//! bytes is through [`crate::decode::Decode`], which checks every field.

use std::collections::BTreeMap;

use serde::{Serialize, Serializer};

use crate::hash::HashAlgo;
use crate::ids::{AttachmentId, JobId, ProjectId, SectionId};

/// Declares a closed string enum with its wire spelling.
macro_rules! wire_enum {
    ($(#[$meta:meta])* $name:ident { $($variant:ident => $wire:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $wire),+
                }
            }

            pub fn parse(s: &str) -> Option<Self> {
                match s {
                    $($wire => Some(Self::$variant),)+
                    _ => None,
                }
            }
        }

        impl ::serde::Serialize for $name {
            fn serialize<S: ::serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_str(self.as_str())
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

pub(crate) use wire_enum;

wire_enum!(
    /// Lifecycle status shown for a project.
    ProjectStatus {
        Draft => "draft",
        NeedsApproval => "needs_approval",
        Approved => "approved",
        Generating => "generating",
        Ready => "ready",
        Failed => "failed",
    }
);

wire_enum!(ApprovalStatus {
    Draft => "draft",
    Approved => "approved",
});

wire_enum!(
    /// State of a remote generation job.
    JobStatus {
        Queued => "queued",
        Running => "running",
        Succeeded => "succeeded",
        Failed => "failed",
    }
);

wire_enum!(OutputMode {
    AvatarOnly => "avatar_only",
    AvatarPlusSlides => "avatar_plus_slides",
});

wire_enum!(CleanupMode {
    Off => "off",
    Deterministic => "deterministic",
    Llm => "llm",
});

wire_enum!(StubAvatarStyle {
    Silhouette => "silhouette",
    Illustration => "illustration",
    Photo => "photo",
    Badge => "badge",
});

wire_enum!(StubBackgroundStyle {
    Neutral => "neutral",
    Gradient => "gradient",
    Classroom => "classroom",
});

wire_enum!(ClipPlannerAvatarMode {
    None => "none",
    Prepared => "prepared",
});

wire_enum!(CaptionLanguage {
    En => "en",
    Fr => "fr",
});

pub const MANIFEST_VERSION: &str = "0.1";

/// Marker for the only manifest format version the store understands.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ManifestVersion;

impl Serialize for ManifestVersion {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(MANIFEST_VERSION)
    }
}

/// Outline depth of a section: 1, 2 or 3.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct SectionLevel(u8);

impl SectionLevel {
    pub const TOP: Self = Self(1);

    pub fn new(level: u8) -> Option<Self> {
        (1..=3).contains(&level).then_some(Self(level))
    }

    pub fn get(&self) -> u8 {
        self.0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DocMeta {
    pub file_name: String,
    pub file_size: u64,
    pub last_modified: i64,
    pub stored_at: String,
}

/// Metadata for an image found inside a table of the source document. The
/// bytes live in the asset store under `(project, id)`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TableImageAttachment {
    pub id: AttachmentId,
    pub section_id: SectionId,
    pub table_index: u32,
    pub row_index: u32,
    pub cell_index: u32,
    pub anchor_text: String,
    pub rel_id: String,
    pub file_name: String,
    pub mime_type: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DraftSection {
    pub id: SectionId,
    pub title: String,
    pub level: SectionLevel,
    pub selected: bool,
    pub script: String,
    pub media_refs: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub table_images: Option<Vec<TableImageAttachment>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LocalAvatarManifestBlock {
    pub kind: ClipPlannerAvatarMode,
    pub avatar_id: String,
    pub fps: f64,
    pub bbox_shift: i64,
}

impl LocalAvatarManifestBlock {
    pub fn prepared(avatar_id: impl Into<String>, fps: f64, bbox_shift: i64) -> Self {
        Self {
            kind: ClipPlannerAvatarMode::Prepared,
            avatar_id: avatar_id.into(),
            fps,
            bbox_shift,
        }
    }
}

/// Outline and scripts as produced by the document import.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DraftManifest {
    pub manifest_version: ManifestVersion,
    pub course_title: String,
    pub doc: DocMeta,
    pub sections: Vec<DraftSection>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub local_avatar: Option<LocalAvatarManifestBlock>,
}

impl DraftManifest {
    pub fn section(&self, id: &SectionId) -> Option<&DraftSection> {
        self.sections.iter().find(|section| &section.id == id)
    }

    pub fn contains(&self, id: &SectionId) -> bool {
        self.section(id).is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ApprovedSection {
    pub id: SectionId,
    pub title: String,
    pub script: String,
}

/// Frozen snapshot handed to remote generation.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApprovedManifest {
    pub manifest_version: ManifestVersion,
    pub course_title: String,
    pub approved_at: String,
    pub draft_signature: String,
    pub sections: Vec<ApprovedSection>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub settings: Option<GenerationSettings>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cleanup_mode: Option<CleanupMode>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub local_avatar: Option<LocalAvatarManifestBlock>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceSection {
    pub section_id: SectionId,
    pub level: SectionLevel,
    pub heading: String,
    pub text: String,
}

/// Raw outline returned by the import collaborator.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceDoc {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub sections: Vec<SourceSection>,
}

/// Generation settings as entered by the author, before they are stamped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationSettingsInput {
    pub output_mode: OutputMode,
    pub avatar_preset_id: String,
    pub voice_preset_id: String,
    pub style_preset_id: String,
    pub sentences_per_clip: u32,
    pub variations_per_section: u32,
}

impl GenerationSettingsInput {
    pub fn stamped(self, updated_at: String) -> GenerationSettings {
        GenerationSettings {
            output_mode: self.output_mode,
            avatar_preset_id: self.avatar_preset_id,
            voice_preset_id: self.voice_preset_id,
            style_preset_id: self.style_preset_id,
            sentences_per_clip: self.sentences_per_clip,
            variations_per_section: self.variations_per_section,
            updated_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationSettings {
    pub output_mode: OutputMode,
    pub avatar_preset_id: String,
    pub voice_preset_id: String,
    pub style_preset_id: String,
    pub sentences_per_clip: u32,
    pub variations_per_section: u32,
    pub updated_at: String,
}

impl GenerationSettings {
    pub fn input(&self) -> GenerationSettingsInput {
        GenerationSettingsInput {
            output_mode: self.output_mode,
            avatar_preset_id: self.avatar_preset_id.clone(),
            voice_preset_id: self.voice_preset_id.clone(),
            style_preset_id: self.style_preset_id.clone(),
            sentences_per_clip: self.sentences_per_clip,
            variations_per_section: self.variations_per_section,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectSettingsOverrides {
    pub sentences_per_clip: u32,
    pub variations_per_section: u32,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LocalAvatarAdvancedSettings {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fps: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bbox_shift: Option<i64>,
}

/// Result of the most recent avatar preparation on the local engine.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LocalAvatarPreparedState {
    pub avatar_id: String,
    pub fps: f64,
    pub bbox_shift: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prep_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_prepared_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_cache_hit: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ref_image_data_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClipPlannerPreparedAvatar {
    pub avatar_id: String,
    pub fps: f64,
    pub bbox_shift: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ref_image_data_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClipPlannerSettings {
    pub avatar_mode: ClipPlannerAvatarMode,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prepared_avatar: Option<ClipPlannerPreparedAvatar>,
}

impl ClipPlannerSettings {
    pub fn none() -> Self {
        Self {
            avatar_mode: ClipPlannerAvatarMode::None,
            prepared_avatar: None,
        }
    }

    /// The prepared avatar, when the planner is in prepared mode.
    pub fn active_avatar(&self) -> Option<&ClipPlannerPreparedAvatar> {
        match self.avatar_mode {
            ClipPlannerAvatarMode::Prepared => self.prepared_avatar.as_ref(),
            ClipPlannerAvatarMode::None => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CleanupConfigOverrides {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expand_abbreviations: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub abbreviations: Option<BTreeMap<String, String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_words_per_sentence: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_line_chars: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub add_pauses: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub synonym_substitutions: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub substitution_rate: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectSettings {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub caption_language: Option<CaptionLanguage>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JobProgress {
    pub phase: String,
    pub pct: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobArtifacts {
    pub mp4_path: String,
    pub vtt_path: String,
    pub srt_path: String,
    pub expires_at: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub manifest_path: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JobError {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobSectionProgress {
    pub section_id: SectionId,
    pub title: String,
    pub status: JobStatus,
    pub phase: String,
    pub pct: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<JobError>,
}

/// Status object reported by the remote generation service.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobRecord {
    pub id: JobId,
    pub status: JobStatus,
    pub progress: JobProgress,
    pub created_at: String,
    pub updated_at: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_count: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub artifacts: Option<JobArtifacts>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<JobError>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sections_progress: Option<Vec<JobSectionProgress>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationJobRef {
    pub job_id: JobId,
    pub created_at: String,
    pub updated_at: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instance_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_status: Option<JobRecord>,
}

/// Most recent jobs kept per project, newest first.
pub const HISTORY_LIMIT: usize = 5;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryItem {
    pub job_id: JobId,
    pub created_at: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<String>,
    pub status: JobStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mp4_path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vtt_path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub srt_path: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScriptDraftMeta {
    pub updated_at: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dirty_node_ids: Option<Vec<SectionId>>,
}

pub type ScriptEdits = BTreeMap<SectionId, String>;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub id: ProjectId,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub status: ProjectStatus,
    pub approval_status: ApprovalStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub approved_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub approved_by: Option<String>,
    pub created_at: String,
    pub updated_at: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_approved_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub approved_script_hash_by_node_id: Option<BTreeMap<SectionId, String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub approved_sentence_hashes_by_node_id: Option<BTreeMap<SectionId, Vec<String>>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub approved_script_hash_algo: Option<HashAlgo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generation_settings: Option<GenerationSettings>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project_settings_overrides: Option<ProjectSettingsOverrides>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub local_avatar_advanced: Option<LocalAvatarAdvancedSettings>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub local_avatar: Option<LocalAvatarPreparedState>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub clip_planner: Option<ClipPlannerSettings>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub script_cleanup_mode: Option<CleanupMode>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cleanup_config_overrides: Option<CleanupConfigOverrides>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stub_avatar_style: Option<StubAvatarStyle>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stub_background_style: Option<StubBackgroundStyle>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub settings: Option<ProjectSettings>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generation_job: Option<GenerationJobRef>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub generation_history: Vec<HistoryItem>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub draft_manifest: Option<DraftManifest>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub approved_manifest: Option<ApprovedManifest>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_doc: Option<SourceDoc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub selected_section_ids: Option<Vec<SectionId>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outline_disabled_ids: Option<Vec<SectionId>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub script_edits_by_node_id: Option<ScriptEdits>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub script_draft_meta: Option<ScriptDraftMeta>,
}

impl Project {
    /// A fresh, empty draft project.
    pub fn new(id: ProjectId, name: String, description: Option<String>, now: String) -> Self {
        Self {
            id,
            name,
            description,
            status: ProjectStatus::Draft,
            approval_status: ApprovalStatus::Draft,
            approved_at: None,
            approved_by: None,
            created_at: now.clone(),
            updated_at: now,
            last_approved_at: None,
            approved_script_hash_by_node_id: None,
            approved_sentence_hashes_by_node_id: None,
            approved_script_hash_algo: None,
            generation_settings: None,
            project_settings_overrides: None,
            local_avatar_advanced: None,
            local_avatar: None,
            clip_planner: Some(ClipPlannerSettings::none()),
            script_cleanup_mode: None,
            cleanup_config_overrides: None,
            stub_avatar_style: None,
            stub_background_style: None,
            settings: Some(ProjectSettings {
                caption_language: Some(CaptionLanguage::En),
            }),
            generation_job: None,
            generation_history: Vec::new(),
            draft_manifest: None,
            approved_manifest: None,
            source_doc: None,
            selected_section_ids: None,
            outline_disabled_ids: None,
            script_edits_by_node_id: None,
            script_draft_meta: None,
        }
    }

    pub fn is_approved(&self) -> bool {
        self.approval_status == ApprovalStatus::Approved
    }

    /// Ids currently excluded from approval and generation.
    pub fn disabled_ids(&self) -> &[SectionId] {
        self.outline_disabled_ids.as_deref().unwrap_or(&[])
    }
}
