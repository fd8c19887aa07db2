//! Remote generation job tracking and the bounded job history.

use courseforge_core::{GenerationJobRef, HistoryItem, JobId, JobRecord, JobStatus};

pub use courseforge_core::HISTORY_LIMIT;

/// History entry for a job that was just submitted.
pub fn history_item_for_start(
    job_id: &JobId,
    created_at: &str,
    initial: Option<&JobRecord>,
) -> HistoryItem {
    let artifacts = initial.and_then(|record| record.artifacts.as_ref());
    HistoryItem {
        job_id: job_id.clone(),
        created_at: created_at.to_string(),
        completed_at: None,
        status: initial.map_or(JobStatus::Queued, |record| record.status),
        mp4_path: artifacts.map(|a| a.mp4_path.clone()),
        vtt_path: artifacts.map(|a| a.vtt_path.clone()),
        srt_path: artifacts.map(|a| a.srt_path.clone()),
    }
}

/// Puts `item` first and drops whatever falls past [`HISTORY_LIMIT`].
pub fn push_history(history: &mut Vec<HistoryItem>, item: HistoryItem) {
    history.insert(0, item);
    history.truncate(HISTORY_LIMIT);
}

/// Copies the remote status onto the history entry for the same job.
/// Returns whether an entry matched.
pub fn patch_history(history: &mut [HistoryItem], record: &JobRecord) -> bool {
    let Some(item) = history.iter_mut().find(|item| item.job_id == record.id) else {
        return false;
    };
    let artifacts = record.artifacts.as_ref();
    item.status = record.status;
    item.completed_at = (record.status == JobStatus::Succeeded).then(|| record.updated_at.clone());
    item.mp4_path = artifacts.map(|a| a.mp4_path.clone());
    item.vtt_path = artifacts.map(|a| a.vtt_path.clone());
    item.srt_path = artifacts.map(|a| a.srt_path.clone());
    true
}

/// The job reference after a status report. Creation time and instance are
/// carried over from the current reference.
pub fn job_ref_for_status(
    current: Option<&GenerationJobRef>,
    record: &JobRecord,
    now: &str,
) -> GenerationJobRef {
    GenerationJobRef {
        job_id: record.id.clone(),
        created_at: current.map_or_else(|| now.to_string(), |job| job.created_at.clone()),
        updated_at: now.to_string(),
        instance_id: current.and_then(|job| job.instance_id.clone()),
        last_status: Some(record.clone()),
    }
}
