use std::time::Duration;

use anyhow::Context as _;

use crate::cli::TranslateArgs;
use crate::gemini::{self, GenerationConfig};
use crate::model::{ChapterStatus, TranslationRecord};
use crate::status::find_chapter_index;
use crate::store::book_store::{BookStore as _, LocalFsBookStore};
use crate::store::translation_store::{LocalFsTranslationStore, TranslationStore as _};

pub const DEFAULT_CHUNK_SIZE: usize = 2000;

const MAX_ATTEMPTS: u32 = 3;
const RETRY_PAUSE: Duration = Duration::from_secs(1);

const PROMPT_HEADER: &str = "Task:
As an experienced literary translator specializing in modern city novels, \
translate the provided Chinese text into Vietnamese, capturing the \
atmospheric, poetic, and reflective tone typical of the genre.

Self-verification before finalizing:
- Completeness: no part of the original text is missing.
- No original text: no Chinese words or characters remain in the output.
- Fluency: the translation reads naturally in Vietnamese.

Output format:
Vietnamese translation only. Do not include explanations, comments, or the \
original text.";

/// `novelshelf translate`: translate a cached chapter, save the record,
/// and mark the chapter translated. The translation goes to stdout as well.
pub async fn run(args: TranslateArgs) -> anyhow::Result<()> {
    let store = LocalFsBookStore::new(&args.data_dir);
    let Some(book) = store.get_book(&args.book, false).await? else {
        anyhow::bail!("book not found: {}", args.book);
    };
    let Some(idx) = find_chapter_index(&book.chapters, &args.chapter) else {
        anyhow::bail!("chapter not found: {} in book {}", args.chapter, args.book);
    };
    let chapter = book.chapters[idx].clone();

    let content = store
        .get_chapter_content(&args.book, &chapter.id)
        .await?
        .ok_or_else(|| {
            anyhow::anyhow!(
                "chapter {} has no cached content; run `novelshelf fetch` first",
                chapter.id
            )
        })?;

    let translator = Translator::from_env()?;
    let translated = translator
        .translate(&content, args.chunk_size)
        .await
        .context("translate chapter")?;

    let translations = LocalFsTranslationStore::new(&args.data_dir);
    translations
        .save_translation(
            &args.book,
            &chapter.url,
            &TranslationRecord {
                title: chapter.title.clone(),
                content: translated.clone(),
            },
        )
        .await
        .context("save translation record")?;
    store
        .update_chapter_status(
            &args.book,
            &chapter.id,
            ChapterStatus {
                translated: Some(true),
                done: None,
            },
        )
        .await
        .context("mark chapter translated")?;

    println!("{translated}");
    Ok(())
}

/// Chunk-and-retry wrapper around the Gemini API. One instance per
/// process is fine; the underlying client pools connections.
#[derive(Debug, Clone)]
pub struct Translator {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
    generation: GenerationConfig,
}

impl Translator {
    pub fn new(
        base_url: &str,
        model: &str,
        api_key: impl Into<String>,
    ) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: gemini::generate_endpoint(base_url, model),
            api_key: api_key.into(),
            generation: GenerationConfig::default(),
        }
    }

    /// Reads `GEMINI_API_KEY` (required), `NOVELSHELF_GEMINI_BASE_URL` and
    /// `NOVELSHELF_GEMINI_MODEL` (optional).
    pub fn from_env() -> anyhow::Result<Self> {
        let api_key =
            std::env::var("GEMINI_API_KEY").map_err(|_| anyhow::anyhow!("GEMINI_API_KEY is not set"))?;
        let base_url = std::env::var("NOVELSHELF_GEMINI_BASE_URL")
            .unwrap_or_else(|_| gemini::DEFAULT_BASE_URL.to_owned());
        let model = std::env::var("NOVELSHELF_GEMINI_MODEL")
            .unwrap_or_else(|_| gemini::DEFAULT_MODEL.to_owned());
        Ok(Self::new(&base_url, &model, api_key))
    }

    /// Splits the source text into fixed-size chunks, translates each with
    /// retries, and joins the results with a single space. A chunk that
    /// still fails after all attempts fails the whole translation.
    pub async fn translate(&self, source: &str, chunk_size: usize) -> anyhow::Result<String> {
        anyhow::ensure!(chunk_size > 0, "chunk size must be > 0");

        let chunks = chunk_text(source, chunk_size);
        let total = chunks.len();
        tracing::info!(chunks = total, chunk_size, "translating text");

        let mut translated = Vec::with_capacity(total);
        for (index, chunk) in chunks.iter().enumerate() {
            tracing::debug!(chunk = index + 1, total, "translating chunk");
            let result = self
                .translate_chunk_with_retries(chunk)
                .await
                .with_context(|| format!("translate chunk {}/{total}", index + 1))?;
            translated.push(result);
        }

        Ok(translated.join(" "))
    }

    async fn translate_chunk_with_retries(&self, chunk: &str) -> anyhow::Result<String> {
        let mut attempt = 0;
        loop {
            attempt += 1;
            match self.translate_chunk(chunk).await {
                Ok(text) => return Ok(text),
                Err(err) if attempt < MAX_ATTEMPTS => {
                    tracing::warn!(
                        attempt,
                        remaining = MAX_ATTEMPTS - attempt,
                        ?err,
                        "chunk translation failed; retrying"
                    );
                    tokio::time::sleep(RETRY_PAUSE).await;
                }
                Err(err) => return Err(err),
            }
        }
    }

    async fn translate_chunk(&self, chunk: &str) -> anyhow::Result<String> {
        let prompt = format!("{PROMPT_HEADER}\n\n{chunk}");
        let text = gemini::generate_text(
            &self.client,
            &self.endpoint,
            &self.api_key,
            &prompt,
            self.generation,
        )
        .await?;
        Ok(gemini::strip_html_tags(&text))
    }
}

/// Fixed-size chunking by character count, so a multibyte character is never
/// split mid-sequence.
pub fn chunk_text(text: &str, chunk_size: usize) -> Vec<String> {
    if text.is_empty() {
        return Vec::new();
    }

    let chars: Vec<char> = text.chars().collect();
    chars
        .chunks(chunk_size)
        .map(|chunk| chunk.iter().collect())
        .collect()
}
