use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use tower::util::ServiceExt as _;

use novelshelf::api::{AppState, router};
use novelshelf::model::Chapter;
use novelshelf::scrape::SiteScraper;
use novelshelf::store::book_store::{BookStore as _, LocalFsBookStore};
use novelshelf::store::translation_store::LocalFsTranslationStore;

fn state(dir: &tempfile::TempDir) -> AppState {
    AppState {
        book_store: Arc::new(LocalFsBookStore::new(dir.path())),
        translation_store: Arc::new(LocalFsTranslationStore::new(dir.path())),
        scraper: SiteScraper::new().expect("build scraper"),
        translator: None,
    }
}

async fn seed_book(state: &AppState) {
    state
        .book_store
        .save_book(
            "https://site.test/book/555/",
            "T",
            vec![
                Chapter::new("chapter-1", "C1", "https://site.test/book/555/1001.html"),
                Chapter::new("chapter-2", "C2", "https://site.test/book/555/1002.html"),
            ],
        )
        .await
        .expect("seed book");
}

fn get(uri: &str) -> Request<Body> {
    Request::get(uri).body(Body::empty()).expect("build request")
}

fn json_request(method: &str, uri: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .expect("build request")
}

async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("read body");
    serde_json::from_slice(&bytes).expect("parse body json")
}

#[tokio::test]
async fn healthz_answers_ok() {
    let dir = tempfile::tempdir().expect("temp dir");
    let app = router(state(&dir));
    let response = app.oneshot(get("/healthz")).await.expect("request");
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn books_listing_starts_empty_then_shows_saved_books() {
    let dir = tempfile::tempdir().expect("temp dir");
    let state = state(&dir);
    let app = router(state.clone());

    let response = app
        .clone()
        .oneshot(get("/api/books"))
        .await
        .expect("request");
    assert_eq!(response.status(), StatusCode::OK);
    let value = body_json(response).await;
    assert_eq!(value["books"], serde_json::json!([]));

    seed_book(&state).await;
    let response = app.oneshot(get("/api/books")).await.expect("request");
    let value = body_json(response).await;
    assert_eq!(value["books"][0]["id"], "555");
    assert_eq!(value["books"][0]["title"], "T");
}

#[tokio::test]
async fn get_book_enriches_on_request_and_404s_when_absent() {
    let dir = tempfile::tempdir().expect("temp dir");
    let state = state(&dir);
    let app = router(state.clone());
    seed_book(&state).await;

    let response = app
        .clone()
        .oneshot(get("/api/books/555?checkContent=true"))
        .await
        .expect("request");
    assert_eq!(response.status(), StatusCode::OK);
    let value = body_json(response).await;
    assert_eq!(value["book"]["chapters"][0]["hasContent"], false);

    let response = app
        .oneshot(get("/api/books/999"))
        .await
        .expect("request");
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn chapter_content_round_trips_through_the_api() {
    let dir = tempfile::tempdir().expect("temp dir");
    let state = state(&dir);
    let app = router(state.clone());
    seed_book(&state).await;

    let response = app
        .clone()
        .oneshot(get("/api/books/555/chapters/chapter-1"))
        .await
        .expect("request");
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    state
        .book_store
        .save_chapter_content("555", "chapter-1", "body text")
        .await
        .expect("save content");

    let response = app
        .clone()
        .oneshot(get("/api/books/555/chapters/chapter-1"))
        .await
        .expect("request");
    assert_eq!(response.status(), StatusCode::OK);
    let value = body_json(response).await;
    assert_eq!(value["content"], "body text");

    let response = app
        .oneshot(get("/api/books/555/chapters/chapter-1/status"))
        .await
        .expect("request");
    let value = body_json(response).await;
    assert_eq!(value["hasContent"], true);
}

#[tokio::test]
async fn processed_update_validates_and_persists() {
    let dir = tempfile::tempdir().expect("temp dir");
    let state = state(&dir);
    let app = router(state.clone());
    seed_book(&state).await;

    let response = app
        .clone()
        .oneshot(json_request(
            "PUT",
            "/api/books/555/chapters/chapter-1/processed",
            serde_json::json!({ "processed": "yes" }),
        ))
        .await
        .expect("request");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app
        .clone()
        .oneshot(json_request(
            "PUT",
            "/api/books/555/chapters/chapter-1/processed",
            serde_json::json!({ "processed": true }),
        ))
        .await
        .expect("request");
    assert_eq!(response.status(), StatusCode::OK);

    let book = state
        .book_store
        .get_book("555", false)
        .await
        .expect("get book")
        .expect("book exists");
    assert_eq!(book.chapters[0].processed, Some(true));

    let response = app
        .oneshot(json_request(
            "PUT",
            "/api/books/555/chapters/chapter-9/processed",
            serde_json::json!({ "processed": true }),
        ))
        .await
        .expect("request");
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn composite_status_route_accepts_url_derived_keys() {
    let dir = tempfile::tempdir().expect("temp dir");
    let state = state(&dir);
    let app = router(state.clone());
    seed_book(&state).await;

    // "1002" only matches chapter-2 through its URL suffix.
    let response = app
        .clone()
        .oneshot(json_request(
            "PUT",
            "/api/chapters/555--chapter-1002/status",
            serde_json::json!({ "translated": true }),
        ))
        .await
        .expect("request");
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .clone()
        .oneshot(json_request(
            "PUT",
            "/api/chapters/555--chapter-1002/status",
            serde_json::json!({ "done": true }),
        ))
        .await
        .expect("request");
    assert_eq!(response.status(), StatusCode::OK);

    // Partial updates kept both flags.
    let response = app
        .clone()
        .oneshot(get("/api/chapters/555--1002/status"))
        .await
        .expect("request");
    assert_eq!(response.status(), StatusCode::OK);
    let value = body_json(response).await;
    assert_eq!(value["translated"], true);
    assert_eq!(value["done"], true);

    let response = app
        .oneshot(get("/api/chapters/malformed-id/status"))
        .await
        .expect("request");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn translation_records_save_and_load() {
    let dir = tempfile::tempdir().expect("temp dir");
    let state = state(&dir);
    let app = router(state.clone());

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/translation",
            serde_json::json!({
                "bookId": "555",
                "url": "https://site.test/book/555/1001.html",
                "translation": { "title": "Chương 1", "content": "Bản dịch" },
            }),
        ))
        .await
        .expect("request");
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .clone()
        .oneshot(get(
            "/api/translation?bookId=555&url=https%3A%2F%2Fsite.test%2Fbook%2F555%2F1001.html",
        ))
        .await
        .expect("request");
    assert_eq!(response.status(), StatusCode::OK);
    let value = body_json(response).await;
    assert_eq!(value["title"], "Chương 1");
    assert_eq!(value["content"], "Bản dịch");

    let response = app
        .oneshot(get(
            "/api/translation?bookId=555&url=https%3A%2F%2Fsite.test%2Fbook%2F555%2F9999.html",
        ))
        .await
        .expect("request");
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn translate_without_a_configured_translator_is_unavailable() {
    let dir = tempfile::tempdir().expect("temp dir");
    let app = router(state(&dir));

    let response = app
        .oneshot(json_request(
            "POST",
            "/api/translate",
            serde_json::json!({ "content": "第一章" }),
        ))
        .await
        .expect("request");
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn delete_book_route_is_idempotent_failure() {
    let dir = tempfile::tempdir().expect("temp dir");
    let state = state(&dir);
    let app = router(state.clone());
    seed_book(&state).await;

    let response = app
        .clone()
        .oneshot(
            Request::delete("/api/books/555")
                .body(Body::empty())
                .expect("build request"),
        )
        .await
        .expect("request");
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .oneshot(
            Request::delete("/api/books/555")
                .body(Body::empty())
                .expect("build request"),
        )
        .await
        .expect("request");
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
