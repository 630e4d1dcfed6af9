use std::path::{Path, PathBuf};

use anyhow::Context as _;
use async_trait::async_trait;
use tokio::fs;

use crate::book_id::derive_book_id;
use crate::model::{Book, Chapter, ChapterStatus};
use crate::status::{find_chapter_index, looks_translated, project_content_flags};
use crate::store::{read_json, write_json_atomic};

/// Durable CRUD for book documents and chapter content blobs.
///
/// Absence is `None`/`false`, never an error; unexpected I/O failures
/// propagate so callers can tell "missing" from "broken". There is no
/// cross-request serialization: two concurrent read-modify-write updates on
/// the same book race, last write wins.
#[async_trait]
pub trait BookStore: Send + Sync {
    /// Derives the id from `url`, stamps `last_updated`, and overwrites any
    /// existing record for that id.
    async fn save_book(
        &self,
        url: &str,
        title: &str,
        chapters: Vec<Chapter>,
    ) -> anyhow::Result<String>;

    /// When `check_content` is set, `has_content` is overlaid on every
    /// chapter by probing for its content file; the overlay is never written
    /// back. `None` covers both a missing file and an unparsable one.
    async fn get_book(&self, book_id: &str, check_content: bool) -> anyhow::Result<Option<Book>>;

    /// All loadable books, in filesystem listing order. Entries that fail to
    /// load are dropped, not surfaced.
    async fn get_all_books(&self) -> anyhow::Result<Vec<Book>>;

    /// Writes the chapter body, then flips the chapter's stored
    /// `has_content` in the book JSON. The two writes are not atomic; the
    /// stored flag is an optimization and the content file is the truth.
    async fn save_chapter_content(
        &self,
        book_id: &str,
        chapter_id: &str,
        content: &str,
    ) -> anyhow::Result<()>;

    async fn get_chapter_content(
        &self,
        book_id: &str,
        chapter_id: &str,
    ) -> anyhow::Result<Option<String>>;

    /// Existence probe only; never reads the file.
    async fn has_chapter_content(&self, book_id: &str, chapter_id: &str) -> bool;

    /// Removes the book JSON and the book's content directory. Failure to
    /// remove the directory is swallowed (it may not exist); `false` means
    /// the JSON itself was not there, so repeated deletes are a no-op.
    /// Translation records are NOT cascaded; they live their own life.
    async fn delete_book(&self, book_id: &str) -> anyhow::Result<bool>;

    /// Looks the chapter up by exact id. `false` if book or chapter is
    /// missing.
    async fn update_chapter_processed(
        &self,
        book_id: &str,
        chapter_id: &str,
        processed: bool,
    ) -> anyhow::Result<bool>;

    /// `chapter_key` may be the assigned id or a URL-derived number; see
    /// [`find_chapter_index`].
    async fn get_chapter_status(
        &self,
        book_id: &str,
        chapter_key: &str,
    ) -> anyhow::Result<Option<ChapterStatus>>;

    /// Partial update: only flags present in `status` overwrite existing
    /// ones. Same key forms as [`BookStore::get_chapter_status`].
    async fn update_chapter_status(
        &self,
        book_id: &str,
        chapter_key: &str,
        status: ChapterStatus,
    ) -> anyhow::Result<bool>;

    /// Recomputes the best-effort `translated` flag for every chapter that
    /// has a content file, using [`looks_translated`]. Chapters without
    /// content are left unchanged. A missing book is a no-op.
    async fn update_translation_status(&self, book_id: &str) -> anyhow::Result<()>;
}

#[derive(Debug, Clone)]
pub struct LocalFsBookStore {
    books_dir: PathBuf,
}

impl LocalFsBookStore {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            books_dir: data_dir.into().join("books"),
        }
    }

    fn book_json_path(&self, book_id: &str) -> PathBuf {
        self.books_dir.join(format!("{book_id}.json"))
    }

    fn chapter_txt_path(&self, book_id: &str, chapter_id: &str) -> PathBuf {
        self.books_dir
            .join(book_id)
            .join("chapters")
            .join(format!("{chapter_id}.txt"))
    }

    async fn load_book(&self, book_id: &str) -> anyhow::Result<Option<Book>> {
        let path = self.book_json_path(book_id);
        match read_json::<Book>(&path).await {
            Ok(book) => Ok(book),
            Err(err) => {
                // An unparsable record reads as absent, same as the absence
                // of the file. The broken document stays on disk for manual
                // inspection.
                if err.downcast_ref::<serde_json::Error>().is_some() {
                    tracing::warn!(book_id, path = %path.display(), ?err, "book json is unparsable; treating as absent");
                    return Ok(None);
                }
                Err(err).with_context(|| format!("read book: {}", path.display()))
            }
        }
    }

    async fn write_book(&self, book: &Book) -> anyhow::Result<()> {
        write_json_atomic(&self.book_json_path(&book.id), book)
            .await
            .with_context(|| format!("write book json: {}", book.id))
    }

    /// Shared read-modify-write spine of the status updates. `false` when
    /// the book or the chapter is not found.
    async fn mutate_chapter<F>(
        &self,
        book_id: &str,
        chapter_key: &str,
        mutate: F,
    ) -> anyhow::Result<bool>
    where
        F: FnOnce(&mut Chapter) + Send,
    {
        let Some(mut book) = self.load_book(book_id).await? else {
            tracing::debug!(book_id, "book not found for chapter update");
            return Ok(false);
        };

        let Some(idx) = find_chapter_index(&book.chapters, chapter_key) else {
            tracing::debug!(book_id, chapter_key, "chapter not found for update");
            return Ok(false);
        };

        mutate(&mut book.chapters[idx]);
        self.write_book(&book).await?;
        Ok(true)
    }
}

#[async_trait]
impl BookStore for LocalFsBookStore {
    async fn save_book(
        &self,
        url: &str,
        title: &str,
        chapters: Vec<Chapter>,
    ) -> anyhow::Result<String> {
        fs::create_dir_all(&self.books_dir)
            .await
            .with_context(|| format!("create books dir: {}", self.books_dir.display()))?;

        let book_id = derive_book_id(url);
        let book = Book {
            id: book_id.clone(),
            url: url.to_owned(),
            title: title.to_owned(),
            chapters,
            last_updated: chrono::Utc::now(),
        };
        self.write_book(&book).await?;

        tracing::info!(book_id, title, chapters = book.chapters.len(), "saved book");
        Ok(book_id)
    }

    async fn get_book(&self, book_id: &str, check_content: bool) -> anyhow::Result<Option<Book>> {
        let Some(mut book) = self.load_book(book_id).await? else {
            return Ok(None);
        };

        if check_content {
            book.chapters = project_content_flags(&book.chapters, |chapter| {
                self.chapter_txt_path(book_id, &chapter.id).exists()
            });
        }

        Ok(Some(book))
    }

    async fn get_all_books(&self) -> anyhow::Result<Vec<Book>> {
        let mut dir = match fs::read_dir(&self.books_dir).await {
            Ok(dir) => dir,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => {
                return Err(err)
                    .with_context(|| format!("read books dir: {}", self.books_dir.display()));
            }
        };

        let mut books = Vec::new();
        while let Some(entry) = dir.next_entry().await? {
            let name = entry.file_name();
            let name = name.to_string_lossy();
            let Some(book_id) = name.strip_suffix(".json") else {
                continue;
            };

            match self.load_book(book_id).await {
                Ok(Some(book)) => books.push(book),
                Ok(None) => {}
                Err(err) => {
                    tracing::warn!(book_id, ?err, "skipping unloadable book");
                }
            }
        }
        Ok(books)
    }

    async fn save_chapter_content(
        &self,
        book_id: &str,
        chapter_id: &str,
        content: &str,
    ) -> anyhow::Result<()> {
        let path = self.chapter_txt_path(book_id, chapter_id);
        let parent = path
            .parent()
            .ok_or_else(|| anyhow::anyhow!("chapter path has no parent: {}", path.display()))?;
        fs::create_dir_all(parent)
            .await
            .with_context(|| format!("create chapters dir: {}", parent.display()))?;
        fs::write(&path, content)
            .await
            .with_context(|| format!("write chapter content: {}", path.display()))?;

        // Best-effort flag update. A crash or failure here leaves the flag
        // stale, which is fine: every reader that cares probes the file.
        let flagged = self
            .mutate_chapter(book_id, chapter_id, |chapter| {
                chapter.has_content = Some(true);
            })
            .await;
        match flagged {
            Ok(true) => {}
            Ok(false) => {
                tracing::debug!(book_id, chapter_id, "content saved for chapter missing from book json");
            }
            Err(err) => {
                tracing::warn!(book_id, chapter_id, ?err, "failed to update stored has_content flag");
            }
        }

        Ok(())
    }

    async fn get_chapter_content(
        &self,
        book_id: &str,
        chapter_id: &str,
    ) -> anyhow::Result<Option<String>> {
        let path = self.chapter_txt_path(book_id, chapter_id);
        match fs::read_to_string(&path).await {
            Ok(content) => Ok(Some(content)),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(err) => {
                Err(err).with_context(|| format!("read chapter content: {}", path.display()))
            }
        }
    }

    async fn has_chapter_content(&self, book_id: &str, chapter_id: &str) -> bool {
        self.chapter_txt_path(book_id, chapter_id).exists()
    }

    async fn delete_book(&self, book_id: &str) -> anyhow::Result<bool> {
        let json_path = self.book_json_path(book_id);
        match fs::remove_file(&json_path).await {
            Ok(()) => {}
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(false),
            Err(err) => {
                return Err(err)
                    .with_context(|| format!("remove book json: {}", json_path.display()));
            }
        }

        let book_dir = self.books_dir.join(book_id);
        if let Err(err) = fs::remove_dir_all(&book_dir).await
            && err.kind() != std::io::ErrorKind::NotFound
        {
            tracing::warn!(book_id, dir = %book_dir.display(), ?err, "failed to remove book content dir");
        }

        tracing::info!(book_id, "deleted book");
        Ok(true)
    }

    async fn update_chapter_processed(
        &self,
        book_id: &str,
        chapter_id: &str,
        processed: bool,
    ) -> anyhow::Result<bool> {
        self.mutate_chapter(book_id, chapter_id, |chapter| {
            chapter.processed = Some(processed);
        })
        .await
    }

    async fn get_chapter_status(
        &self,
        book_id: &str,
        chapter_key: &str,
    ) -> anyhow::Result<Option<ChapterStatus>> {
        let Some(book) = self.load_book(book_id).await? else {
            return Ok(None);
        };
        let Some(idx) = find_chapter_index(&book.chapters, chapter_key) else {
            return Ok(None);
        };

        let chapter = &book.chapters[idx];
        Ok(Some(ChapterStatus {
            done: chapter.done,
            translated: chapter.translated,
        }))
    }

    async fn update_chapter_status(
        &self,
        book_id: &str,
        chapter_key: &str,
        status: ChapterStatus,
    ) -> anyhow::Result<bool> {
        self.mutate_chapter(book_id, chapter_key, |chapter| {
            if let Some(done) = status.done {
                chapter.done = Some(done);
            }
            if let Some(translated) = status.translated {
                chapter.translated = Some(translated);
            }
        })
        .await
    }

    async fn update_translation_status(&self, book_id: &str) -> anyhow::Result<()> {
        let Some(mut book) = self.load_book(book_id).await? else {
            tracing::debug!(book_id, "book not found for translation status refresh");
            return Ok(());
        };

        for chapter in &mut book.chapters {
            let Some(content) = self.get_chapter_content(book_id, &chapter.id).await? else {
                continue;
            };
            chapter.translated = Some(looks_translated(&content));
        }

        self.write_book(&book).await?;
        tracing::info!(book_id, "refreshed translation status");
        Ok(())
    }
}
