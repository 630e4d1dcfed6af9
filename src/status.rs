//! Read-time enrichment of derived chapter flags. Nothing here touches disk
//! directly; the store passes in an existence probe so this stays pure and
//! testable.

use crate::book_id::{chapter_key_number, chapter_number_from_url};
use crate::model::Chapter;

/// Overlays `has_content` onto every chapter using the given probe. The
/// result is never written back; stored flags stay untouched on disk.
pub fn project_content_flags<F>(chapters: &[Chapter], mut has_content: F) -> Vec<Chapter>
where
    F: FnMut(&Chapter) -> bool,
{
    chapters
        .iter()
        .map(|chapter| {
            let mut chapter = chapter.clone();
            chapter.has_content = Some(has_content(&chapter));
            chapter
        })
        .collect()
}

/// Best-effort signal that chapter text is no longer purely in the source
/// script: two consecutive ASCII letters anywhere in the content. Loose on
/// purpose; do not strengthen without revisiting the manual workflow that
/// relies on it.
pub fn looks_translated(content: &str) -> bool {
    let mut prev_was_letter = false;
    for c in content.chars() {
        let is_letter = c.is_ascii_alphabetic();
        if is_letter && prev_was_letter {
            return true;
        }
        prev_was_letter = is_letter;
    }
    false
}

/// Locates a chapter by a caller-supplied key that may be either the
/// chapter's assigned id or a value derived from its source URL.
///
/// Exact id match wins; otherwise the numeric suffix of the key is compared
/// against the numeric fragment of each chapter's URL. The fallback exists
/// because chapter ids are assigned as running indexes (`chapter-3`) while
/// one client addresses chapters by the number embedded in their URL.
pub fn find_chapter_index(chapters: &[Chapter], key: &str) -> Option<usize> {
    if let Some(idx) = chapters.iter().position(|c| c.id == key) {
        return Some(idx);
    }

    let wanted = chapter_key_number(key);
    chapters
        .iter()
        .position(|c| chapter_number_from_url(&c.url) == Some(wanted))
}
