//! Per-section script drafts layered over the imported baseline.
//!
//! The imported manifest is never edited in place. Edited scripts live in a
//! separate map keyed by section id; discarding an entry restores the
//! baseline text. The map never keeps an entry that normalizes to its base.

use courseforge_core::hash::normalize_script;
use courseforge_core::{DraftSection, ScriptDraftMeta, ScriptEdits, SectionId};

/// The overlay text for `section` if one exists, else its base script.
pub fn effective_script<'a>(section: &'a DraftSection, edits: Option<&'a ScriptEdits>) -> &'a str {
    edits
        .and_then(|edits| edits.get(&section.id))
        .map(String::as_str)
        .unwrap_or(&section.script)
}

/// Applies `text` as the draft for `section_id` and returns the resulting map,
/// `None` once it is empty.
///
/// Base and candidate are compared normalized. On equality the entry is
/// removed; otherwise the raw candidate is stored.
pub fn update_overlay(
    edits: Option<&ScriptEdits>,
    section_id: &SectionId,
    base: &str,
    text: &str,
) -> Option<ScriptEdits> {
    let mut next = edits.cloned().unwrap_or_default();
    if normalize_script(text) == normalize_script(base) {
        next.remove(section_id);
    } else {
        next.insert(section_id.clone(), text.to_string());
    }
    (!next.is_empty()).then_some(next)
}

/// Removes one draft. Returns `None` if no draft existed for the section.
pub fn discard_overlay(edits: Option<&ScriptEdits>, section_id: &SectionId) -> Option<Option<ScriptEdits>> {
    let edits = edits?;
    if !edits.contains_key(section_id) {
        return None;
    }
    let mut next = edits.clone();
    next.remove(section_id);
    Some((!next.is_empty()).then_some(next))
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScriptDraftSave {
    pub edits: Option<ScriptEdits>,
    /// The save changed the effective script of an approved project.
    pub demote: bool,
}

/// Computes the outcome of saving `text` for `section`.
///
/// Approval is lost whenever the raw text differs from the current effective
/// script, without looking at what was approved. Saving the approved text
/// back after an edit therefore still demotes.
pub fn apply_script_draft_save(
    section: &DraftSection,
    edits: Option<&ScriptEdits>,
    text: &str,
    approved: bool,
) -> ScriptDraftSave {
    let changed = effective_script(section, edits) != text;
    ScriptDraftSave {
        edits: update_overlay(edits, &section.id, &section.script, text),
        demote: approved && changed,
    }
}

/// Metadata describing a non-empty overlay.
pub fn build_draft_meta(edits: Option<&ScriptEdits>, now: &str) -> Option<ScriptDraftMeta> {
    let edits = edits.filter(|edits| !edits.is_empty())?;
    Some(ScriptDraftMeta {
        updated_at: now.to_string(),
        dirty_node_ids: Some(edits.keys().cloned().collect()),
    })
}
