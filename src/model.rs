use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One unit of source content belonging to a [`Book`].
///
/// `has_content` is derived from the existence of the chapter's content file
/// and is only persisted as an optimization; readers must treat the probe,
/// not the stored flag, as truth.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Chapter {
    pub id: String,
    pub title: String,
    pub url: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub processed: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub translated: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub done: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub has_content: Option<bool>,
}

impl Chapter {
    pub fn new(id: impl Into<String>, title: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            url: url.into(),
            processed: None,
            translated: None,
            done: None,
            has_content: None,
        }
    }
}

/// A scraped work, persisted as `{data}/books/{id}.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Book {
    pub id: String,
    pub url: String,
    pub title: String,
    pub chapters: Vec<Chapter>,
    pub last_updated: DateTime<Utc>,
}

/// Subset of chapter flags exposed through the status endpoints. Absent
/// fields are left untouched on update.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChapterStatus {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub done: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub translated: Option<bool>,
}

/// A saved translation, stored standalone under
/// `{data}/translations/{bookId}/{basename}.json` with a lifecycle
/// independent from the book it belongs to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranslationRecord {
    pub title: String,
    pub content: String,
}

/// Result of scraping a book's table-of-contents page.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScrapedCatalog {
    pub title: String,
    pub chapters: Vec<Chapter>,
}

/// Result of scraping a single chapter page.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScrapedChapter {
    pub title: String,
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_chapter_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prev_chapter_url: Option<String>,
}
