//! Field validators for proposed mutations.
//!
//! These guard writes, not reads: a failure here is recoverable and means the
//! collection was not touched. Structural problems in stored data are reported
//! by the decoder as corruption instead.

use std::collections::{BTreeMap, BTreeSet};

use thiserror::Error;

use courseforge_core::presets::{Preset, avatar_preset, style_preset, voice_preset};
use courseforge_core::{
    CleanupConfigOverrides, ClipPlannerAvatarMode, ClipPlannerSettings, DraftManifest,
    GenerationSettingsInput, JobRecord, LocalAvatarAdvancedSettings, LocalAvatarPreparedState,
    ProjectSettingsOverrides, SectionId,
};

pub const NAME_MIN_CHARS: usize = 2;
pub const NAME_MAX_CHARS: usize = 80;
pub const DESCRIPTION_MAX_CHARS: usize = 280;

/// Inclusive bounds shared by the per-clip and per-section counters.
pub const MIN_PER_CLIP: u32 = 1;
pub const MAX_PER_CLIP: u32 = 5;

/// A rejected mutation, with per-field detail where one field is to blame.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct ValidationError {
    pub message: String,
    pub field_errors: BTreeMap<String, String>,
}

impl ValidationError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            field_errors: BTreeMap::new(),
        }
    }

    /// A failure blamed on a single field; the field message doubles as the
    /// summary.
    pub fn field(field: impl Into<String>, message: impl Into<String>) -> Self {
        let message = message.into();
        let mut field_errors = BTreeMap::new();
        field_errors.insert(field.into(), message.clone());
        Self {
            message,
            field_errors,
        }
    }

    pub fn field_error(&self, field: &str) -> Option<&str> {
        self.field_errors.get(field).map(String::as_str)
    }
}

/// Collects per-field messages and turns them into one error.
#[derive(Debug, Default)]
struct FieldErrors(BTreeMap<String, String>);

impl FieldErrors {
    fn add(&mut self, field: &str, message: &str) {
        self.0.insert(field.to_string(), message.to_string());
    }

    fn check(&mut self, ok: bool, field: &str, message: &str) {
        if !ok {
            self.add(field, message);
        }
    }

    fn finish(self, message: &str) -> Result<(), ValidationError> {
        if self.0.is_empty() {
            return Ok(());
        }
        Err(ValidationError {
            message: message.to_string(),
            field_errors: self.0,
        })
    }
}

fn positive_finite(value: f64) -> bool {
    value.is_finite() && value > 0.0
}

fn known_preset(id: &str, lookup: fn(&str) -> Option<&'static Preset>) -> bool {
    !id.trim().is_empty() && lookup(id).is_some()
}

fn in_counter_range(value: u32) -> bool {
    (MIN_PER_CLIP..=MAX_PER_CLIP).contains(&value)
}

/// Trims the name and checks its length in characters.
pub fn validate_name(raw: &str) -> Result<String, ValidationError> {
    let name = raw.trim();
    let len = name.chars().count();
    if !(NAME_MIN_CHARS..=NAME_MAX_CHARS).contains(&len) {
        return Err(ValidationError::field(
            "name",
            format!("Name must be between {NAME_MIN_CHARS} and {NAME_MAX_CHARS} characters."),
        ));
    }
    Ok(name.to_string())
}

/// Trims the description; blank means none.
pub fn validate_description(raw: Option<&str>) -> Result<Option<String>, ValidationError> {
    let Some(description) = raw.map(str::trim).filter(|d| !d.is_empty()) else {
        return Ok(None);
    };
    if description.chars().count() > DESCRIPTION_MAX_CHARS {
        return Err(ValidationError::field(
            "description",
            format!("Description must be {DESCRIPTION_MAX_CHARS} characters or fewer."),
        ));
    }
    Ok(Some(description.to_string()))
}

pub fn validate_generation_settings(input: &GenerationSettingsInput) -> Result<(), ValidationError> {
    let mut errors = FieldErrors::default();
    errors.check(
        known_preset(&input.avatar_preset_id, avatar_preset),
        "avatarPresetId",
        "Choose a valid avatar preset.",
    );
    errors.check(
        known_preset(&input.voice_preset_id, voice_preset),
        "voicePresetId",
        "Choose a valid voice preset.",
    );
    errors.check(
        known_preset(&input.style_preset_id, style_preset),
        "stylePresetId",
        "Choose a valid style preset.",
    );
    errors.check(
        in_counter_range(input.sentences_per_clip),
        "sentencesPerClip",
        "Sentences per clip must be between 1 and 5.",
    );
    errors.check(
        in_counter_range(input.variations_per_section),
        "variationsPerSection",
        "Variations per section must be between 1 and 5.",
    );
    errors.finish("Generation settings are invalid.")
}

pub fn validate_overrides(overrides: &ProjectSettingsOverrides) -> Result<(), ValidationError> {
    let mut errors = FieldErrors::default();
    errors.check(
        in_counter_range(overrides.sentences_per_clip),
        "projectSettingsOverrides.sentencesPerClip",
        "Sentences per clip must be between 1 and 5.",
    );
    errors.check(
        in_counter_range(overrides.variations_per_section),
        "projectSettingsOverrides.variationsPerSection",
        "Variations per section must be between 1 and 5.",
    );
    errors.finish("Project overrides are invalid.")
}

pub fn validate_local_avatar_advanced(
    settings: &LocalAvatarAdvancedSettings,
) -> Result<(), ValidationError> {
    let mut errors = FieldErrors::default();
    if let Some(avatar_id) = &settings.avatar_id {
        errors.check(
            !avatar_id.trim().is_empty(),
            "localAvatarAdvanced.avatarId",
            "Avatar id must not be blank.",
        );
    }
    if let Some(fps) = settings.fps {
        errors.check(
            positive_finite(fps),
            "localAvatarAdvanced.fps",
            "Frame rate must be a positive number.",
        );
    }
    errors.finish("Local avatar advanced settings are invalid.")
}

pub fn validate_prepared_avatar(state: &LocalAvatarPreparedState) -> Result<(), ValidationError> {
    let mut errors = FieldErrors::default();
    errors.check(
        !state.avatar_id.trim().is_empty(),
        "localAvatar.avatarId",
        "Avatar id must not be blank.",
    );
    errors.check(
        positive_finite(state.fps),
        "localAvatar.fps",
        "Frame rate must be a positive number.",
    );
    errors.finish("Local avatar metadata is invalid.")
}

pub fn validate_clip_planner(settings: &ClipPlannerSettings) -> Result<(), ValidationError> {
    let mut errors = FieldErrors::default();
    match (settings.avatar_mode, &settings.prepared_avatar) {
        (ClipPlannerAvatarMode::Prepared, None) => {
            errors.add(
                "clipPlanner.preparedAvatar",
                "Prepared mode requires a prepared avatar.",
            );
        }
        (_, Some(avatar)) => {
            errors.check(
                !avatar.avatar_id.trim().is_empty(),
                "clipPlanner.preparedAvatar.avatarId",
                "Avatar id must not be blank.",
            );
            errors.check(
                positive_finite(avatar.fps),
                "clipPlanner.preparedAvatar.fps",
                "Frame rate must be a positive number.",
            );
        }
        (ClipPlannerAvatarMode::None, None) => {}
    }
    errors.finish("Clip planner settings are invalid.")
}

pub fn validate_cleanup_overrides(overrides: &CleanupConfigOverrides) -> Result<(), ValidationError> {
    let mut errors = FieldErrors::default();
    let numbers = [
        ("cleanupConfigOverrides.maxWordsPerSentence", overrides.max_words_per_sentence),
        ("cleanupConfigOverrides.maxLineChars", overrides.max_line_chars),
        ("cleanupConfigOverrides.substitutionRate", overrides.substitution_rate),
    ];
    for (field, value) in numbers {
        if let Some(value) = value {
            errors.check(value.is_finite(), field, "Must be a finite number.");
        }
    }
    errors.finish("Cleanup config overrides are invalid.")
}

/// Approved hash maps must reference sections of the manifest they were
/// computed from and carry non-blank hashes.
pub fn validate_hash_maps(
    manifest: &DraftManifest,
    script_hashes: &BTreeMap<SectionId, String>,
    sentence_hashes: &BTreeMap<SectionId, Vec<String>>,
) -> Result<(), ValidationError> {
    let mut errors = FieldErrors::default();
    for (id, hash) in script_hashes {
        if !manifest.contains(id) || hash.trim().is_empty() {
            errors.add(
                "approvedScriptHashByNodeId",
                &format!("Invalid script hash for section {id}."),
            );
        }
    }
    for (id, hashes) in sentence_hashes {
        if !manifest.contains(id) || hashes.iter().any(|h| h.trim().is_empty()) {
            errors.add(
                "approvedSentenceHashesByNodeId",
                &format!("Invalid sentence hashes for section {id}."),
            );
        }
    }
    errors.finish("Approved script hashes are invalid.")
}

/// Every disabled id must name a section of the manifest.
pub fn validate_outline_ids(
    manifest: &DraftManifest,
    ids: &[SectionId],
) -> Result<(), ValidationError> {
    if let Some(unknown) = ids.iter().find(|id| !manifest.contains(id)) {
        return Err(ValidationError::field(
            "outlineDisabledIds",
            format!("Outline selection references unknown section {unknown}."),
        ));
    }
    Ok(())
}

/// Imported manifests must have a title and unique section ids.
pub fn validate_draft_manifest(manifest: &DraftManifest) -> Result<(), ValidationError> {
    let mut errors = FieldErrors::default();
    errors.check(
        !manifest.course_title.trim().is_empty(),
        "draftManifest.courseTitle",
        "Course title must not be blank.",
    );
    let mut seen = BTreeSet::new();
    if let Some(dup) = manifest.sections.iter().find(|s| !seen.insert(&s.id)) {
        errors.add(
            "draftManifest.sections",
            &format!("Duplicate section id {}.", dup.id),
        );
    }
    if let Some(block) = &manifest.local_avatar {
        errors.check(
            block.kind == ClipPlannerAvatarMode::Prepared,
            "draftManifest.localAvatar.kind",
            "Local avatar block must be prepared.",
        );
        errors.check(
            !block.avatar_id.trim().is_empty(),
            "draftManifest.localAvatar.avatarId",
            "Avatar id must not be blank.",
        );
        errors.check(
            positive_finite(block.fps),
            "draftManifest.localAvatar.fps",
            "Fps must be a positive number.",
        );
    }
    errors.finish("Draft manifest is invalid.")
}

pub fn validate_job_record(record: &JobRecord) -> Result<(), ValidationError> {
    let mut errors = FieldErrors::default();
    errors.check(
        !record.id.as_str().trim().is_empty(),
        "generationJob.jobId",
        "Job id must not be blank.",
    );
    errors.check(
        record.progress.pct.is_finite(),
        "generationJob.lastStatus.progress.pct",
        "Progress must be a finite number.",
    );
    for (i, section) in record.sections_progress.iter().flatten().enumerate() {
        errors.check(
            section.pct.is_finite(),
            &format!("generationJob.lastStatus.sectionsProgress[{i}].pct"),
            "Progress must be a finite number.",
        );
    }
    errors.finish("Generation job status is invalid.")
}
