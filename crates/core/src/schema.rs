//! Decoders for every persisted shape.

use serde_json::Value;

use crate::decode::{Decode, Fields, decode_wire_enum, index_path};
use crate::error::DecodeError;
use crate::hash::HashAlgo;
use crate::ids::SectionId;
use crate::model::*;
use crate::presets;

decode_wire_enum!(
    ProjectStatus,
    ApprovalStatus,
    JobStatus,
    OutputMode,
    CleanupMode,
    StubAvatarStyle,
    StubBackgroundStyle,
    ClipPlannerAvatarMode,
    CaptionLanguage,
    HashAlgo,
);

pub const MIN_VARIATIONS: u32 = 1;
pub const MAX_VARIATIONS: u32 = 5;

fn non_blank(value: &Value, path: &str) -> Result<String, DecodeError> {
    let text = String::decode(value, path)?;
    if text.trim().is_empty() {
        return Err(DecodeError::new(path, "non-blank string"));
    }
    Ok(text)
}

fn positive(value: &Value, path: &str) -> Result<f64, DecodeError> {
    let n = f64::decode(value, path)?;
    if n <= 0.0 {
        return Err(DecodeError::new(path, "positive number"));
    }
    Ok(n)
}

fn bounded_history(value: &Value, path: &str) -> Result<Vec<HistoryItem>, DecodeError> {
    let items = Vec::<HistoryItem>::decode(value, path)?;
    if items.len() > HISTORY_LIMIT {
        return Err(DecodeError::new(path, format!("at most {HISTORY_LIMIT} entries")));
    }
    Ok(items)
}

/// Disabled ids must name sections of the draft outline.
fn disabled_ids(
    manifest: Option<&DraftManifest>,
) -> impl Fn(&Value, &str) -> Result<Vec<SectionId>, DecodeError> {
    move |value: &Value, path: &str| {
        let ids = Vec::<SectionId>::decode(value, path)?;
        let known = |id: &SectionId| manifest.is_some_and(|m| m.sections.iter().any(|s| &s.id == id));
        match ids.iter().position(|id| !known(id)) {
            Some(index) => Err(DecodeError::new(
                index_path(path, index),
                "id of a draftManifest section",
            )),
            None => Ok(ids),
        }
    }
}

fn in_range(value: &Value, path: &str, min: u32, max: u32) -> Result<u32, DecodeError> {
    let n = u32::decode(value, path)?;
    if !(min..=max).contains(&n) {
        return Err(DecodeError::new(path, format!("integer in {min}..={max}")));
    }
    Ok(n)
}

fn known_preset(
    lookup: fn(&str) -> Option<&'static presets::Preset>,
) -> impl Fn(&Value, &str) -> Result<String, DecodeError> {
    move |value: &Value, path: &str| {
        let id = String::decode(value, path)?;
        match lookup(&id) {
            Some(_) => Ok(id),
            None => Err(DecodeError::new(path, "known preset id")),
        }
    }
}

impl Decode for ManifestVersion {
    fn decode(value: &Value, path: &str) -> Result<Self, DecodeError> {
        match value.as_str() {
            Some(MANIFEST_VERSION) => Ok(ManifestVersion),
            _ => Err(DecodeError::new(path, format!("\"{MANIFEST_VERSION}\""))),
        }
    }
}

impl Decode for SectionLevel {
    fn decode(value: &Value, path: &str) -> Result<Self, DecodeError> {
        value
            .as_u64()
            .and_then(|n| u8::try_from(n).ok())
            .and_then(SectionLevel::new)
            .ok_or_else(|| DecodeError::new(path, "section level 1, 2 or 3"))
    }
}

impl Decode for DocMeta {
    fn decode(value: &Value, path: &str) -> Result<Self, DecodeError> {
        let f = Fields::of(value, path)?;
        Ok(Self {
            file_name: f.required("fileName")?,
            file_size: f.required("fileSize")?,
            last_modified: f.required("lastModified")?,
            stored_at: f.required("storedAt")?,
        })
    }
}

impl Decode for TableImageAttachment {
    fn decode(value: &Value, path: &str) -> Result<Self, DecodeError> {
        let f = Fields::of(value, path)?;
        Ok(Self {
            id: f.required("id")?,
            section_id: f.required("sectionId")?,
            table_index: f.required("tableIndex")?,
            row_index: f.required("rowIndex")?,
            cell_index: f.required("cellIndex")?,
            anchor_text: f.required("anchorText")?,
            rel_id: f.required("relId")?,
            file_name: f.required("fileName")?,
            mime_type: f.required("mimeType")?,
        })
    }
}

impl Decode for DraftSection {
    fn decode(value: &Value, path: &str) -> Result<Self, DecodeError> {
        let f = Fields::of(value, path)?;
        Ok(Self {
            id: f.required("id")?,
            title: f.required("title")?,
            level: f.required("level")?,
            selected: f.required("selected")?,
            script: f.required("script")?,
            media_refs: f.required("mediaRefs")?,
            table_images: f.optional("tableImages")?,
        })
    }
}

impl Decode for LocalAvatarManifestBlock {
    fn decode(value: &Value, path: &str) -> Result<Self, DecodeError> {
        let f = Fields::of(value, path)?;
        let kind = f.required_with("kind", |v, p| match ClipPlannerAvatarMode::decode(v, p)? {
            ClipPlannerAvatarMode::Prepared => Ok(ClipPlannerAvatarMode::Prepared),
            ClipPlannerAvatarMode::None => Err(DecodeError::new(p, "\"prepared\"")),
        })?;
        Ok(Self {
            kind,
            avatar_id: f.required_with("avatarId", non_blank)?,
            fps: f.required_with("fps", positive)?,
            bbox_shift: f.required("bboxShift")?,
        })
    }
}

impl Decode for DraftManifest {
    fn decode(value: &Value, path: &str) -> Result<Self, DecodeError> {
        let f = Fields::of(value, path)?;
        Ok(Self {
            manifest_version: f.required("manifestVersion")?,
            course_title: f.required("courseTitle")?,
            doc: f.required("doc")?,
            sections: f.required("sections")?,
            local_avatar: f.optional("localAvatar")?,
        })
    }
}

impl Decode for ApprovedSection {
    fn decode(value: &Value, path: &str) -> Result<Self, DecodeError> {
        let f = Fields::of(value, path)?;
        Ok(Self {
            id: f.required("id")?,
            title: f.required("title")?,
            script: f.required("script")?,
        })
    }
}

impl Decode for ApprovedManifest {
    fn decode(value: &Value, path: &str) -> Result<Self, DecodeError> {
        let f = Fields::of(value, path)?;
        Ok(Self {
            manifest_version: f.required("manifestVersion")?,
            course_title: f.required("courseTitle")?,
            approved_at: f.required("approvedAt")?,
            draft_signature: f.required("draftSignature")?,
            sections: f.required("sections")?,
            settings: f.optional("settings")?,
            cleanup_mode: f.optional("cleanupMode")?,
            local_avatar: f.optional("localAvatar")?,
        })
    }
}

impl Decode for SourceSection {
    fn decode(value: &Value, path: &str) -> Result<Self, DecodeError> {
        let f = Fields::of(value, path)?;
        Ok(Self {
            section_id: f.required("sectionId")?,
            level: f.required("level")?,
            heading: f.required("heading")?,
            text: f.required("text")?,
        })
    }
}

impl Decode for SourceDoc {
    fn decode(value: &Value, path: &str) -> Result<Self, DecodeError> {
        let f = Fields::of(value, path)?;
        Ok(Self {
            title: f.optional("title")?,
            sections: f.required("sections")?,
        })
    }
}

impl Decode for GenerationSettings {
    fn decode(value: &Value, path: &str) -> Result<Self, DecodeError> {
        let f = Fields::of(value, path)?;
        Ok(Self {
            output_mode: f.required("outputMode")?,
            avatar_preset_id: f.required_with("avatarPresetId", known_preset(presets::avatar_preset))?,
            voice_preset_id: f.required_with("voicePresetId", known_preset(presets::voice_preset))?,
            style_preset_id: f.required_with("stylePresetId", known_preset(presets::style_preset))?,
            sentences_per_clip: f.required("sentencesPerClip")?,
            // settings written before variations existed carry no value
            variations_per_section: f
                .optional_with("variationsPerSection", |v, p| {
                    in_range(v, p, MIN_VARIATIONS, MAX_VARIATIONS)
                })?
                .unwrap_or(MIN_VARIATIONS),
            updated_at: f.required("updatedAt")?,
        })
    }
}

impl Decode for ProjectSettingsOverrides {
    fn decode(value: &Value, path: &str) -> Result<Self, DecodeError> {
        let f = Fields::of(value, path)?;
        Ok(Self {
            sentences_per_clip: f.required_with("sentencesPerClip", |v, p| in_range(v, p, 1, 5))?,
            variations_per_section: f.required_with("variationsPerSection", |v, p| {
                in_range(v, p, MIN_VARIATIONS, MAX_VARIATIONS)
            })?,
        })
    }
}

impl Decode for LocalAvatarAdvancedSettings {
    fn decode(value: &Value, path: &str) -> Result<Self, DecodeError> {
        let f = Fields::of(value, path)?;
        Ok(Self {
            avatar_id: f.optional_with("avatarId", non_blank)?,
            fps: f.optional_with("fps", positive)?,
            bbox_shift: f.optional("bboxShift")?,
        })
    }
}

impl Decode for LocalAvatarPreparedState {
    fn decode(value: &Value, path: &str) -> Result<Self, DecodeError> {
        let f = Fields::of(value, path)?;
        Ok(Self {
            avatar_id: f.required_with("avatarId", non_blank)?,
            fps: f.required_with("fps", positive)?,
            bbox_shift: f.required("bboxShift")?,
            prep_key: f.optional("prepKey")?,
            last_prepared_at: f.optional("lastPreparedAt")?,
            last_cache_hit: f.optional("lastCacheHit")?,
            ref_image_data_url: f.nullable("refImageDataUrl")?,
        })
    }
}

impl Decode for ClipPlannerPreparedAvatar {
    fn decode(value: &Value, path: &str) -> Result<Self, DecodeError> {
        let f = Fields::of(value, path)?;
        Ok(Self {
            avatar_id: f.required_with("avatarId", non_blank)?,
            fps: f.required_with("fps", positive)?,
            bbox_shift: f.required("bboxShift")?,
            ref_image_data_url: f.nullable("refImageDataUrl")?,
        })
    }
}

impl Decode for ClipPlannerSettings {
    fn decode(value: &Value, path: &str) -> Result<Self, DecodeError> {
        let f = Fields::of(value, path)?;
        let avatar_mode: ClipPlannerAvatarMode = f.required("avatarMode")?;
        let prepared_avatar = match avatar_mode {
            ClipPlannerAvatarMode::Prepared => Some(f.required("preparedAvatar")?),
            ClipPlannerAvatarMode::None => f.optional("preparedAvatar")?,
        };
        Ok(Self {
            avatar_mode,
            prepared_avatar,
        })
    }
}

impl Decode for CleanupConfigOverrides {
    fn decode(value: &Value, path: &str) -> Result<Self, DecodeError> {
        let f = Fields::of(value, path)?;
        Ok(Self {
            expand_abbreviations: f.optional("expandAbbreviations")?,
            abbreviations: f.optional("abbreviations")?,
            max_words_per_sentence: f.optional("maxWordsPerSentence")?,
            max_line_chars: f.optional("maxLineChars")?,
            add_pauses: f.optional("addPauses")?,
            synonym_substitutions: f.optional("synonymSubstitutions")?,
            substitution_rate: f.optional("substitutionRate")?,
        })
    }
}

impl Decode for ProjectSettings {
    fn decode(value: &Value, path: &str) -> Result<Self, DecodeError> {
        let f = Fields::of(value, path)?;
        Ok(Self {
            caption_language: f.optional("captionLanguage")?,
        })
    }
}

impl Decode for JobProgress {
    fn decode(value: &Value, path: &str) -> Result<Self, DecodeError> {
        let f = Fields::of(value, path)?;
        Ok(Self {
            phase: f.required("phase")?,
            pct: f.required("pct")?,
        })
    }
}

impl Decode for JobArtifacts {
    fn decode(value: &Value, path: &str) -> Result<Self, DecodeError> {
        let f = Fields::of(value, path)?;
        Ok(Self {
            mp4_path: f.required("mp4Path")?,
            vtt_path: f.required("vttPath")?,
            srt_path: f.required("srtPath")?,
            expires_at: f.required("expiresAt")?,
            manifest_path: f.optional("manifestPath")?,
        })
    }
}

impl Decode for JobError {
    fn decode(value: &Value, path: &str) -> Result<Self, DecodeError> {
        let f = Fields::of(value, path)?;
        Ok(Self {
            message: f.required("message")?,
            details: f.optional("details")?,
        })
    }
}

impl Decode for JobSectionProgress {
    fn decode(value: &Value, path: &str) -> Result<Self, DecodeError> {
        let f = Fields::of(value, path)?;
        Ok(Self {
            section_id: f.required("sectionId")?,
            title: f.required("title")?,
            status: f.required("status")?,
            phase: f.required("phase")?,
            pct: f.required("pct")?,
            error: f.optional("error")?,
        })
    }
}

impl Decode for JobRecord {
    fn decode(value: &Value, path: &str) -> Result<Self, DecodeError> {
        let f = Fields::of(value, path)?;
        Ok(Self {
            id: f.required("id")?,
            status: f.required("status")?,
            progress: f.required("progress")?,
            created_at: f.required("createdAt")?,
            updated_at: f.required("updatedAt")?,
            retry_count: f.optional("retryCount")?,
            artifacts: f.optional("artifacts")?,
            error: f.optional("error")?,
            sections_progress: f.optional("sectionsProgress")?,
        })
    }
}

impl Decode for GenerationJobRef {
    fn decode(value: &Value, path: &str) -> Result<Self, DecodeError> {
        let f = Fields::of(value, path)?;
        Ok(Self {
            job_id: f.required("jobId")?,
            created_at: f.required("createdAt")?,
            updated_at: f.required("updatedAt")?,
            instance_id: f.optional("instanceId")?,
            last_status: f.optional("lastStatus")?,
        })
    }
}

impl Decode for HistoryItem {
    fn decode(value: &Value, path: &str) -> Result<Self, DecodeError> {
        let f = Fields::of(value, path)?;
        Ok(Self {
            job_id: f.required("jobId")?,
            created_at: f.required("createdAt")?,
            completed_at: f.optional("completedAt")?,
            status: f.required("status")?,
            mp4_path: f.optional("mp4Path")?,
            vtt_path: f.optional("vttPath")?,
            srt_path: f.optional("srtPath")?,
        })
    }
}

impl Decode for ScriptDraftMeta {
    fn decode(value: &Value, path: &str) -> Result<Self, DecodeError> {
        let f = Fields::of(value, path)?;
        Ok(Self {
            updated_at: f.required("updatedAt")?,
            dirty_node_ids: f.optional("dirtyNodeIds")?,
        })
    }
}

impl Decode for Project {
    fn decode(value: &Value, path: &str) -> Result<Self, DecodeError> {
        let f = Fields::of(value, path)?;
        let draft_manifest: Option<DraftManifest> = f.optional("draftManifest")?;
        let approved_manifest: Option<ApprovedManifest> = f.optional("approvedManifest")?;
        // records written before approval tracking derive it from the snapshot
        let approval_status = f.optional("approvalStatus")?.unwrap_or(match approved_manifest {
            Some(_) => ApprovalStatus::Approved,
            None => ApprovalStatus::Draft,
        });
        Ok(Self {
            id: f.required("id")?,
            name: f.required("name")?,
            description: f.optional("description")?,
            status: f.required("status")?,
            approval_status,
            approved_at: f.optional("approvedAt")?,
            approved_by: f.optional("approvedBy")?,
            created_at: f.required("createdAt")?,
            updated_at: f.required("updatedAt")?,
            last_approved_at: f.optional("lastApprovedAt")?,
            approved_script_hash_by_node_id: f.optional("approvedScriptHashByNodeId")?,
            approved_sentence_hashes_by_node_id: f.optional("approvedSentenceHashesByNodeId")?,
            approved_script_hash_algo: f.optional("approvedScriptHashAlgo")?,
            generation_settings: f.optional("generationSettings")?,
            project_settings_overrides: f.optional("projectSettingsOverrides")?,
            local_avatar_advanced: f.optional("localAvatarAdvanced")?,
            local_avatar: f.optional("localAvatar")?,
            clip_planner: f.optional("clipPlanner")?,
            script_cleanup_mode: f.optional("scriptCleanupMode")?,
            cleanup_config_overrides: f.optional("cleanupConfigOverrides")?,
            stub_avatar_style: f.optional("stubAvatarStyle")?,
            stub_background_style: f.optional("stubBackgroundStyle")?,
            settings: f.optional("settings")?,
            generation_job: f.optional("generationJob")?,
            generation_history: f
                .optional_with("generationHistory", bounded_history)?
                .unwrap_or_default(),
            approved_manifest,
            source_doc: f.optional("sourceDoc")?,
            selected_section_ids: f.optional("selectedSectionIds")?,
            outline_disabled_ids: f
                .optional_with("outlineDisabledIds", disabled_ids(draft_manifest.as_ref()))?,
            draft_manifest,
            script_edits_by_node_id: f.optional("scriptEditsByNodeId")?,
            script_draft_meta: f.optional("scriptDraftMeta")?,
        })
    }
}
