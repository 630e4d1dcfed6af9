use std::path::PathBuf;

use anyhow::Context as _;
use async_trait::async_trait;
use url::Url;

use crate::model::TranslationRecord;
use crate::store::{read_json, write_json_atomic};

/// Standalone `{ title, content }` records keyed by (book id, the basename
/// of the chapter URL's path). Created and updated only through explicit
/// saves; deleting a book does not touch them.
#[async_trait]
pub trait TranslationStore: Send + Sync {
    async fn save_translation(
        &self,
        book_id: &str,
        chapter_url: &str,
        record: &TranslationRecord,
    ) -> anyhow::Result<()>;

    async fn get_translation(
        &self,
        book_id: &str,
        chapter_url: &str,
    ) -> anyhow::Result<Option<TranslationRecord>>;
}

#[derive(Debug, Clone)]
pub struct LocalFsTranslationStore {
    translations_dir: PathBuf,
}

impl LocalFsTranslationStore {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            translations_dir: data_dir.into().join("translations"),
        }
    }

    fn record_path(&self, book_id: &str, chapter_url: &str) -> anyhow::Result<PathBuf> {
        let url = Url::parse(chapter_url)
            .with_context(|| format!("parse chapter url: {chapter_url}"))?;
        let basename = url
            .path()
            .rsplit('/')
            .next()
            .filter(|s| !s.is_empty())
            .ok_or_else(|| anyhow::anyhow!("chapter url has no path basename: {chapter_url}"))?
            .to_owned();
        Ok(self
            .translations_dir
            .join(book_id)
            .join(format!("{basename}.json")))
    }
}

#[async_trait]
impl TranslationStore for LocalFsTranslationStore {
    async fn save_translation(
        &self,
        book_id: &str,
        chapter_url: &str,
        record: &TranslationRecord,
    ) -> anyhow::Result<()> {
        let path = self.record_path(book_id, chapter_url)?;
        write_json_atomic(&path, record)
            .await
            .with_context(|| format!("write translation record: {}", path.display()))?;
        tracing::info!(book_id, path = %path.display(), "saved translation record");
        Ok(())
    }

    async fn get_translation(
        &self,
        book_id: &str,
        chapter_url: &str,
    ) -> anyhow::Result<Option<TranslationRecord>> {
        let path = self.record_path(book_id, chapter_url)?;
        read_json(&path)
            .await
            .with_context(|| format!("read translation record: {}", path.display()))
    }
}
