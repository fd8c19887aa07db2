//! Builders for the shapes the import collaborator and the remote
//! generation service hand to the store.

use courseforge_core::{
    AttachmentId, DocMeta, DraftManifest, DraftSection, GenerationSettingsInput, JobArtifacts,
    JobError, JobId, JobProgress, JobRecord, JobSectionProgress, JobStatus, ManifestVersion,
    OutputMode, SectionId, SectionLevel, SourceDoc, SourceSection, TableImageAttachment,
};

pub const T0: &str = "2024-01-01T00:00:00.000Z";

pub fn section(id: &str, selected: bool, script: &str) -> DraftSection {
    DraftSection {
        id: SectionId::from(id),
        title: format!("Section {id}"),
        level: SectionLevel::TOP,
        selected,
        script: script.to_string(),
        media_refs: Vec::new(),
        table_images: None,
    }
}

pub fn manifest_with(sections: Vec<DraftSection>) -> DraftManifest {
    DraftManifest {
        manifest_version: ManifestVersion,
        course_title: "Onboarding".into(),
        doc: DocMeta {
            file_name: "onboarding.docx".into(),
            file_size: 48_213,
            last_modified: 1_704_067_200_000,
            stored_at: T0.into(),
        },
        sections,
        local_avatar: None,
    }
}

/// A manifest whose sections are `(id, selected)` pairs with a two-sentence
/// script each.
pub fn manifest(sections: &[(&str, bool)]) -> DraftManifest {
    manifest_with(
        sections
            .iter()
            .map(|(id, selected)| {
                section(id, *selected, &format!("Welcome to {id}. Let us begin!"))
            })
            .collect(),
    )
}

pub fn table_image(section_id: &str, attachment_id: &str) -> TableImageAttachment {
    TableImageAttachment {
        id: AttachmentId::from(attachment_id),
        section_id: SectionId::from(section_id),
        table_index: 0,
        row_index: 1,
        cell_index: 2,
        anchor_text: "Figure".into(),
        rel_id: "rId7".into(),
        file_name: format!("{attachment_id}.png"),
        mime_type: "image/png".into(),
    }
}

pub fn source_doc(manifest: &DraftManifest) -> SourceDoc {
    SourceDoc {
        title: Some(manifest.course_title.clone()),
        sections: manifest
            .sections
            .iter()
            .map(|s| SourceSection {
                section_id: s.id.clone(),
                level: s.level,
                heading: s.title.clone(),
                text: s.script.clone(),
            })
            .collect(),
    }
}

pub fn settings() -> GenerationSettingsInput {
    GenerationSettingsInput {
        output_mode: OutputMode::AvatarPlusSlides,
        avatar_preset_id: "stub_avatar_f1".into(),
        voice_preset_id: "stub_voice_en_us_1".into(),
        style_preset_id: "stub_style_modern".into(),
        sentences_per_clip: 2,
        variations_per_section: 1,
    }
}

pub fn job_record(id: &str, status: JobStatus) -> JobRecord {
    let finished = matches!(status, JobStatus::Succeeded);
    JobRecord {
        id: JobId::from(id),
        status,
        progress: JobProgress {
            phase: status.as_str().into(),
            pct: if finished { 100.0 } else { 10.0 },
        },
        created_at: T0.into(),
        updated_at: "2024-01-01T00:10:00.000Z".into(),
        retry_count: Some(0),
        artifacts: finished.then(|| JobArtifacts {
            mp4_path: format!("jobs/{id}/out.mp4"),
            vtt_path: format!("jobs/{id}/out.vtt"),
            srt_path: format!("jobs/{id}/out.srt"),
            expires_at: "2024-01-08T00:00:00.000Z".into(),
            manifest_path: None,
        }),
        error: None,
        sections_progress: None,
    }
}

/// A failed record carrying an error and per-section progress.
pub fn failed_job_record(id: &str, section_ids: &[&str]) -> JobRecord {
    let error = |message: &str| JobError {
        message: message.into(),
        details: Some("exit status 137".into()),
    };
    JobRecord {
        status: JobStatus::Failed,
        progress: JobProgress {
            phase: "render".into(),
            pct: 42.5,
        },
        retry_count: Some(2),
        error: Some(error("Render worker crashed.")),
        sections_progress: Some(
            section_ids
                .iter()
                .enumerate()
                .map(|(i, section_id)| JobSectionProgress {
                    section_id: SectionId::from(*section_id),
                    title: format!("Section {section_id}"),
                    status: if i == 0 { JobStatus::Succeeded } else { JobStatus::Failed },
                    phase: "render".into(),
                    pct: if i == 0 { 100.0 } else { 12.5 },
                    error: (i > 0).then(|| error("Clip render failed.")),
                })
                .collect(),
        ),
        ..job_record(id, JobStatus::Failed)
    }
}
