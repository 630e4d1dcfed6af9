//! HTTP surface consumed by the web UI. Route-for-route CRUD over the book
//! and translation stores plus the scrape/translate actions.

use std::sync::Arc;

use axum::Router;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::Json;
use axum::routing::{get, post, put};
use serde::{Deserialize, Serialize};
use tower_http::trace::TraceLayer;

use crate::model::{Book, Chapter, ChapterStatus, TranslationRecord};
use crate::scrape::SiteScraper;
use crate::store::book_store::BookStore;
use crate::store::translation_store::TranslationStore;
use crate::translate::{self, Translator};

#[derive(Clone)]
pub struct AppState {
    pub book_store: Arc<dyn BookStore>,
    pub translation_store: Arc<dyn TranslationStore>,
    pub scraper: SiteScraper,
    /// Absent when `GEMINI_API_KEY` is not configured; the translate
    /// endpoint then answers 503.
    pub translator: Option<Translator>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(|| async { "ok\n" }))
        .route("/api/books", get(list_books))
        .route("/api/books/:id", get(get_book).delete(delete_book))
        .route("/api/books/:id/chapters/:chapter_id", get(get_chapter_content))
        .route(
            "/api/books/:id/chapters/:chapter_id/status",
            get(get_chapter_content_status),
        )
        .route(
            "/api/books/:id/chapters/:chapter_id/processed",
            put(update_chapter_processed),
        )
        .route("/api/chapters", post(scrape_catalog))
        .route(
            "/api/chapters/:id/status",
            get(get_chapter_status).put(update_chapter_status),
        )
        .route("/api/extract", post(extract_chapter))
        .route("/api/translate", post(translate_content))
        .route(
            "/api/translation",
            get(get_translation).post(save_translation),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

type ApiError = (StatusCode, Json<serde_json::Value>);
type ApiResult<T> = Result<Json<T>, ApiError>;

fn error(status: StatusCode, message: impl Into<String>) -> ApiError {
    (status, Json(serde_json::json!({ "error": message.into() })))
}

fn internal(err: anyhow::Error) -> ApiError {
    tracing::error!(?err, "request failed");
    error(StatusCode::INTERNAL_SERVER_ERROR, format!("{err:#}"))
}

#[derive(Debug, Serialize)]
struct BooksResponse {
    books: Vec<Book>,
}

async fn list_books(State(state): State<AppState>) -> ApiResult<BooksResponse> {
    let books = state.book_store.get_all_books().await.map_err(internal)?;
    Ok(Json(BooksResponse { books }))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GetBookQuery {
    #[serde(default)]
    check_content: bool,
}

#[derive(Debug, Serialize)]
struct BookResponse {
    book: Book,
}

async fn get_book(
    State(state): State<AppState>,
    Path(book_id): Path<String>,
    Query(query): Query<GetBookQuery>,
) -> ApiResult<BookResponse> {
    let book = state
        .book_store
        .get_book(&book_id, query.check_content)
        .await
        .map_err(internal)?
        .ok_or_else(|| error(StatusCode::NOT_FOUND, "Book not found"))?;
    Ok(Json(BookResponse { book }))
}

#[derive(Debug, Serialize)]
struct SuccessResponse {
    success: bool,
}

async fn delete_book(
    State(state): State<AppState>,
    Path(book_id): Path<String>,
) -> ApiResult<SuccessResponse> {
    let deleted = state
        .book_store
        .delete_book(&book_id)
        .await
        .map_err(internal)?;
    if !deleted {
        return Err(error(StatusCode::NOT_FOUND, "Book not found"));
    }
    Ok(Json(SuccessResponse { success: true }))
}

#[derive(Debug, Deserialize)]
struct ScrapeCatalogRequest {
    url: String,
}

#[derive(Debug, Serialize)]
struct ScrapeCatalogResponse {
    id: String,
    title: String,
    chapters: Vec<Chapter>,
}

async fn scrape_catalog(
    State(state): State<AppState>,
    Json(request): Json<ScrapeCatalogRequest>,
) -> ApiResult<ScrapeCatalogResponse> {
    let url = request.url.trim();
    if url.is_empty() {
        return Err(error(StatusCode::BAD_REQUEST, "URL is required"));
    }

    let catalog = state
        .scraper
        .fetch_catalog(url)
        .await
        .map_err(internal)?;
    let book_id = state
        .book_store
        .save_book(url, &catalog.title, catalog.chapters.clone())
        .await
        .map_err(internal)?;

    Ok(Json(ScrapeCatalogResponse {
        id: book_id,
        title: catalog.title,
        chapters: catalog.chapters,
    }))
}

#[derive(Debug, Serialize)]
struct ChapterContentResponse {
    content: String,
}

async fn get_chapter_content(
    State(state): State<AppState>,
    Path((book_id, chapter_id)): Path<(String, String)>,
) -> ApiResult<ChapterContentResponse> {
    let content = state
        .book_store
        .get_chapter_content(&book_id, &chapter_id)
        .await
        .map_err(internal)?
        .ok_or_else(|| error(StatusCode::NOT_FOUND, "Chapter content not found"))?;
    Ok(Json(ChapterContentResponse { content }))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ContentStatusResponse {
    has_content: bool,
}

async fn get_chapter_content_status(
    State(state): State<AppState>,
    Path((book_id, chapter_id)): Path<(String, String)>,
) -> ApiResult<ContentStatusResponse> {
    let has_content = state
        .book_store
        .has_chapter_content(&book_id, &chapter_id)
        .await;
    Ok(Json(ContentStatusResponse { has_content }))
}

async fn update_chapter_processed(
    State(state): State<AppState>,
    Path((book_id, chapter_id)): Path<(String, String)>,
    Json(body): Json<serde_json::Value>,
) -> ApiResult<SuccessResponse> {
    // Explicit validation so a non-boolean is a 400, not a deserializer 422.
    let Some(processed) = body.get("processed").and_then(|v| v.as_bool()) else {
        return Err(error(
            StatusCode::BAD_REQUEST,
            "Processed status must be a boolean",
        ));
    };

    let updated = state
        .book_store
        .update_chapter_processed(&book_id, &chapter_id, processed)
        .await
        .map_err(internal)?;
    if !updated {
        return Err(error(StatusCode::NOT_FOUND, "Chapter not found"));
    }
    Ok(Json(SuccessResponse { success: true }))
}

/// The status endpoints address a chapter with a composite
/// `{bookId}--{chapterKey}` id.
fn split_composite_id(id: &str) -> Result<(&str, &str), ApiError> {
    id.split_once("--")
        .filter(|(book, chapter)| !book.is_empty() && !chapter.is_empty())
        .ok_or_else(|| {
            error(
                StatusCode::BAD_REQUEST,
                "id must be of the form {bookId}--{chapterId}",
            )
        })
}

async fn get_chapter_status(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<ChapterStatus> {
    let (book_id, chapter_key) = split_composite_id(&id)?;
    let status = state
        .book_store
        .get_chapter_status(book_id, chapter_key)
        .await
        .map_err(internal)?
        .ok_or_else(|| error(StatusCode::NOT_FOUND, "Chapter not found"))?;
    Ok(Json(status))
}

async fn update_chapter_status(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(status): Json<ChapterStatus>,
) -> ApiResult<SuccessResponse> {
    let (book_id, chapter_key) = split_composite_id(&id)?;
    let updated = state
        .book_store
        .update_chapter_status(book_id, chapter_key, status)
        .await
        .map_err(internal)?;
    if !updated {
        return Err(error(StatusCode::NOT_FOUND, "Chapter not found"));
    }
    Ok(Json(SuccessResponse { success: true }))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ExtractRequest {
    url: String,
    book_id: Option<String>,
    chapter_id: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ExtractResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    title: Option<String>,
    content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    next_chapter_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    prev_chapter_url: Option<String>,
    from_storage: bool,
}

async fn extract_chapter(
    State(state): State<AppState>,
    Json(request): Json<ExtractRequest>,
) -> ApiResult<ExtractResponse> {
    let url = request.url.trim();
    if url.is_empty() {
        return Err(error(StatusCode::BAD_REQUEST, "URL is required"));
    }

    // Serve from the cache when this chapter has already been scraped.
    if let (Some(book_id), Some(chapter_id)) = (&request.book_id, &request.chapter_id)
        && let Some(content) = state
            .book_store
            .get_chapter_content(book_id, chapter_id)
            .await
            .map_err(internal)?
    {
        tracing::debug!(book_id, chapter_id, "serving chapter content from storage");
        return Ok(Json(ExtractResponse {
            title: None,
            content,
            next_chapter_url: None,
            prev_chapter_url: None,
            from_storage: true,
        }));
    }

    let scraped = state.scraper.fetch_chapter(url).await.map_err(internal)?;

    if let (Some(book_id), Some(chapter_id)) = (&request.book_id, &request.chapter_id) {
        state
            .book_store
            .save_chapter_content(book_id, chapter_id, &scraped.content)
            .await
            .map_err(internal)?;
    }

    Ok(Json(ExtractResponse {
        title: Some(scraped.title),
        content: scraped.content,
        next_chapter_url: scraped.next_chapter_url,
        prev_chapter_url: scraped.prev_chapter_url,
        from_storage: false,
    }))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TranslateRequest {
    content: String,
    chunk_size: Option<usize>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct TranslateResponse {
    translated_content: String,
    success: bool,
}

async fn translate_content(
    State(state): State<AppState>,
    Json(request): Json<TranslateRequest>,
) -> ApiResult<TranslateResponse> {
    if request.content.is_empty() {
        return Err(error(StatusCode::BAD_REQUEST, "Content is required"));
    }
    let Some(translator) = &state.translator else {
        return Err(error(
            StatusCode::SERVICE_UNAVAILABLE,
            "translation is not configured (GEMINI_API_KEY is not set)",
        ));
    };

    let chunk_size = request.chunk_size.unwrap_or(translate::DEFAULT_CHUNK_SIZE);
    let translated_content = translator
        .translate(&request.content, chunk_size)
        .await
        .map_err(internal)?;

    Ok(Json(TranslateResponse {
        translated_content,
        success: true,
    }))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SaveTranslationRequest {
    book_id: String,
    url: String,
    translation: TranslationRecord,
}

async fn save_translation(
    State(state): State<AppState>,
    Json(request): Json<SaveTranslationRequest>,
) -> ApiResult<SuccessResponse> {
    if request.book_id.is_empty() || request.url.is_empty() {
        return Err(error(StatusCode::BAD_REQUEST, "Missing required fields"));
    }

    state
        .translation_store
        .save_translation(&request.book_id, &request.url, &request.translation)
        .await
        .map_err(internal)?;
    Ok(Json(SuccessResponse { success: true }))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GetTranslationQuery {
    book_id: String,
    url: String,
}

async fn get_translation(
    State(state): State<AppState>,
    Query(query): Query<GetTranslationQuery>,
) -> ApiResult<TranslationRecord> {
    let record = state
        .translation_store
        .get_translation(&query.book_id, &query.url)
        .await
        .map_err(internal)?
        .ok_or_else(|| error(StatusCode::NOT_FOUND, "Translation not found"))?;
    Ok(Json(record))
}
